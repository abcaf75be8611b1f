use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::record::LeafRecord;
use crate::tree::{Node, RegistryTree};

impl RegistryTree {
    /// Resolve a dot-delimited token path to its leaf record.
    ///
    /// Fails with `UnknownToken` at the first token without a matching child
    /// and with `IncompleteTokenPath` when the path ends on a node that
    /// carries no location.
    pub fn resolve(&self, token_path: &str) -> RegistryResult<&LeafRecord> {
        let mut node = &self.root;
        for token in token_path.split('.') {
            node = node.child(token).ok_or_else(|| RegistryError::UnknownToken {
                token: token.to_string(),
                path: token_path.to_string(),
            })?;
        }
        let record = node.record().ok_or_else(|| RegistryError::IncompleteTokenPath {
            path: token_path.to_string(),
        })?;
        debug!(path = token_path, location = record.location(), "resolved token path");
        Ok(record)
    }

    /// Every token path that resolves to a leaf, sorted.
    pub fn tokens(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect(&self.root, String::new(), &mut out);
        out
    }
}

fn collect(node: &Node, prefix: String, out: &mut Vec<String>) {
    if node.record().is_some() && !prefix.is_empty() {
        out.push(prefix.clone());
    }
    if let Node::Table { children, .. } = node {
        for (key, child) in children {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            collect(child, path, out);
        }
    }
}
