//! Per-format load/save implementations.
//!
//! Every [`FileFormat`] maps to exactly one [`FormatStrategy`]. Only the
//! binary-object strategy writes; the rest reject `save` with
//! `UnsupportedOperation`.

mod binary;
mod lines;
mod markup;
mod structured;
mod tabular;

use std::path::Path;

pub use binary::BinaryObjectFormat;
pub use lines::LineTextFormat;
pub use markup::MarkupFormat;
pub use structured::StructuredTextFormat;
pub use tabular::{Dataset, Dtype, Element, TabularFormat, TabularHandle, TabularWriter};

use crate::error::{RegistryError, RegistryResult};
use crate::record::{FileFormat, LeafRecord};
use crate::value::{Payload, Record};

/// Load/save/exists for one file format.
pub trait FormatStrategy: Send + Sync {
    /// The format this strategy implements.
    fn format(&self) -> FileFormat;

    /// Read the file at `path`. `leaf` carries per-entry parameters such as
    /// the record count.
    fn load(&self, path: &Path, leaf: &LeafRecord) -> RegistryResult<Payload>;

    /// Write `value` to `path`.
    fn save(&self, path: &Path, leaf: &LeafRecord, value: &Record) -> RegistryResult<()> {
        let _ = (path, leaf, value);
        Err(RegistryError::UnsupportedOperation {
            format: self.format(),
            operation: "save",
        })
    }

    /// Whether the file is present. Never opens the file.
    fn exists(&self, path: &Path) -> bool {
        exists(path)
    }
}

/// Filesystem presence check shared by every format.
pub fn exists(path: &Path) -> bool {
    path.exists()
}

impl FileFormat {
    /// The strategy bound to this format.
    pub fn strategy(self) -> &'static dyn FormatStrategy {
        match self {
            Self::BinaryObject => &BinaryObjectFormat,
            Self::StructuredText => &StructuredTextFormat,
            Self::TabularBinary => &TabularFormat,
            Self::LineText => &LineTextFormat,
            Self::MarkupConfig => &MarkupFormat,
        }
    }
}
