use std::borrow::Cow;

use crate::error::{RegistryError, RegistryResult};
use crate::record::LeafRecord;

/// Pick the effective record for an optional version id.
///
/// Without a version the leaf is borrowed as-is. With one, a new record is
/// derived whose location (and record count, when the entry names one) come
/// from the version entry; `leaf` itself is never touched. `path` is only
/// used for error reporting.
pub fn select_version<'a>(
    path: &str,
    leaf: &'a LeafRecord,
    version: Option<u32>,
) -> RegistryResult<Cow<'a, LeafRecord>> {
    let Some(version) = version else {
        return Ok(Cow::Borrowed(leaf));
    };
    let versions = leaf.versions().ok_or_else(|| RegistryError::MissingVersionMap {
        path: path.to_string(),
    })?;
    let entry = versions
        .get(&version)
        .ok_or_else(|| RegistryError::UnknownVersion {
            path: path.to_string(),
            version,
        })?;
    Ok(Cow::Owned(leaf.derive(entry)))
}
