//! Token-addressed file registry for SGP.
//!
//! A YAML descriptor maps dot-delimited token paths such as
//! `data.visual_genome.images` to files on disk. Each leaf declares where its
//! file lives, how it is serialized, and optionally older versions of it.
//!
//! # Architecture
//!
//! - **Descriptor** ([`Descriptor`]): the parsed YAML document, base or
//!   overrides.
//! - **Merge** ([`merge()`]): overlays an override descriptor onto the base,
//!   once, before the tree is compiled.
//! - **Tree** ([`RegistryTree`]): compiled, read-only nodes; resolves token
//!   paths to [`LeafRecord`]s.
//! - **Versions** ([`select_version`]): derives a leaf pointing at an older
//!   file without touching the tree.
//! - **Formats** ([`FormatStrategy`]): one load/save/exists implementation
//!   per [`FileFormat`].
//! - **Service** ([`FileRegistry`]): the façade callers hold on to.
//!
//! # Design Rules
//!
//! 1. The tree never changes after construction.
//! 2. Version selection returns a new value; leaf records are immutable.
//! 3. Only binary-object files are written.
//! 4. Filesystem errors surface unchanged as [`RegistryError::Io`].

pub mod config;
pub mod descriptor;
pub mod error;
pub mod format;
pub mod log;
pub mod merge;
pub mod record;
mod resolve;
pub mod service;
pub mod tree;
pub mod value;
pub mod version;

pub use config::RegistryConfig;
pub use descriptor::Descriptor;
pub use error::{RegistryError, RegistryResult};
pub use format::{
    BinaryObjectFormat, Dataset, Dtype, Element, FormatStrategy, LineTextFormat, MarkupFormat,
    StructuredTextFormat, TabularFormat, TabularHandle, TabularWriter,
};
pub use log::{ConsoleSink, LogSink, TracingSink};
pub use merge::merge;
pub use record::{FileFormat, LeafRecord, VersionEntry};
pub use service::FileRegistry;
pub use tree::{Node, RegistryTree};
pub use value::{Payload, Record};
pub use version::select_version;
