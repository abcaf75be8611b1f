//! Whole-tree overlay of an override descriptor onto a base descriptor.
//!
//! Rules, applied key by key in override-document order:
//!
//! - a key missing from the base is inserted verbatim;
//! - a key whose override value is a mapping recurses into the base child
//!   (or replaces it when the base child is not a mapping);
//! - any other override value (a plain string in particular) replaces the
//!   base child wholesale, dropping whatever structure lived there.
//!
//! A string override of a leaf therefore leaves a bare string behind, which
//! no longer resolves. To move a leaf while keeping its format and versions,
//! override its `location` key instead.

use serde_yaml::{Mapping, Value};
use tracing::debug;

/// Overlay `overrides` onto `base` in place.
pub fn merge(base: &mut Mapping, overrides: &Mapping) {
    for (key, value) in overrides {
        if let (Some(Value::Mapping(child)), Value::Mapping(sub)) = (base.get_mut(key), value) {
            merge(child, sub);
            continue;
        }
        if base.contains_key(key) {
            debug!(key = ?key, "override replaces existing entry");
        }
        base.insert(key.clone(), value.clone());
    }
}
