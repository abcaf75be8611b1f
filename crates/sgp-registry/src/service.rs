use std::borrow::Cow;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::RegistryConfig;
use crate::descriptor::Descriptor;
use crate::error::{RegistryError, RegistryResult};
use crate::format;
use crate::log::{ConsoleSink, LogSink};
use crate::record::{FileFormat, LeafRecord};
use crate::tree::RegistryTree;
use crate::value::{Payload, Record};
use crate::version::select_version;

/// Token-addressed access to the files a descriptor names.
///
/// Built once, then shared by reference. The tree is read-only after
/// construction; only the sink can be swapped, and that needs `&mut self`.
pub struct FileRegistry {
    root: PathBuf,
    tree: RegistryTree,
    sink: Box<dyn LogSink>,
}

impl std::fmt::Debug for FileRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRegistry")
            .field("root", &self.root)
            .field("tree", &self.tree)
            .finish_non_exhaustive()
    }
}

impl FileRegistry {
    /// Read the descriptors named by `config` and build the registry.
    pub fn open(config: &RegistryConfig) -> RegistryResult<Self> {
        let base = Descriptor::from_path(config.descriptor())?;
        let overrides = config
            .overrides_path()
            .map(|path| Descriptor::from_path(&path))
            .transpose()?;
        Self::from_descriptors(config.root_dir(), base, overrides.as_ref())
    }

    /// Build from already-parsed descriptors.
    pub fn from_descriptors(
        root: impl Into<PathBuf>,
        mut base: Descriptor,
        overrides: Option<&Descriptor>,
    ) -> RegistryResult<Self> {
        let sink: Box<dyn LogSink> = Box::new(ConsoleSink);
        if let Some(overrides) = overrides {
            sink.log(&format!(
                "FileRegistry: overriding files according to {}",
                overrides.origin()
            ));
            base.apply_overrides(overrides);
        }
        let tree = RegistryTree::compile(&base)?;
        let root = root.into();
        info!(root = %root.display(), descriptor = base.origin(), "file registry ready");
        Ok(Self { root, tree, sink })
    }

    /// Replace the diagnostic sink for the rest of this registry's life.
    pub fn install_logger(&mut self, sink: impl LogSink + 'static) {
        self.sink = Box::new(sink);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tree(&self) -> &RegistryTree {
        &self.tree
    }

    /// Resolve `token_path` and apply `version`.
    pub fn leaf(&self, token_path: &str, version: Option<u32>) -> RegistryResult<Cow<'_, LeafRecord>> {
        let leaf = self.tree.resolve(token_path)?;
        let chosen = select_version(token_path, leaf, version)?;
        if let Some(version) = version {
            self.log(format!("FileRegistry: {token_path} - use old version {version}"));
            let doc = leaf
                .versions()
                .and_then(|versions| versions.get(&version))
                .and_then(|entry| entry.doc.as_deref());
            if let Some(doc) = doc {
                self.log(format!("FileRegistry: version {version} doc - {doc}"));
            }
        }
        Ok(chosen)
    }

    /// Absolute path of the file behind `token_path`.
    pub fn path(&self, token_path: &str, version: Option<u32>) -> RegistryResult<PathBuf> {
        let leaf = self.leaf(token_path, version)?;
        let path = self.root.join(leaf.location());
        self.log(format!("FileRegistry: file path: {token_path}={}", path.display()));
        Ok(path)
    }

    /// Load the file behind `token_path` according to its declared format.
    pub fn load(&self, token_path: &str, version: Option<u32>) -> RegistryResult<Payload> {
        let leaf = self.leaf(token_path, version)?;
        self.load_leaf(token_path, &leaf).map(|(_, payload)| payload)
    }

    /// Load and deserialize into `T`.
    ///
    /// Works for binary-object, structured-text, markup-config and line-text
    /// leaves. Tabular leaves must be loaded through [`load`](Self::load).
    pub fn load_as<T: DeserializeOwned>(
        &self,
        token_path: &str,
        version: Option<u32>,
    ) -> RegistryResult<T> {
        let leaf = self.leaf(token_path, version)?;
        let (path, payload) = self.load_leaf(token_path, &leaf)?;
        let decode = |reason: String| RegistryError::Decode { path, reason };
        match payload {
            Payload::Object(record) => {
                serde_json::from_value(record.to_json()).map_err(|e| decode(e.to_string()))
            }
            Payload::Json(value) => serde_json::from_value(value).map_err(|e| decode(e.to_string())),
            Payload::Markup(value) => serde_yaml::from_value(value).map_err(|e| decode(e.to_string())),
            Payload::Lines(lines) => {
                serde_json::from_value(lines.into()).map_err(|e| decode(e.to_string()))
            }
            Payload::Table(_) => Err(RegistryError::UnsupportedOperation {
                format: FileFormat::TabularBinary,
                operation: "typed load",
            }),
        }
    }

    /// Write `value` to the file behind `token_path`.
    pub fn save(&self, token_path: &str, value: &Record, version: Option<u32>) -> RegistryResult<()> {
        let leaf = self.leaf(token_path, version)?;
        let format = self.require_format(token_path, &leaf)?;
        let path = self.root.join(leaf.location());
        self.log(format!(
            "FileRegistry: save {format} file: {token_path}={}",
            path.display()
        ));
        format.strategy().save(&path, &leaf, value)
    }

    /// Whether the file behind `token_path` exists. Needs no format.
    pub fn exists(&self, token_path: &str, version: Option<u32>) -> RegistryResult<bool> {
        let leaf = self.leaf(token_path, version)?;
        let path = self.root.join(leaf.location());
        let present = format::exists(&path);
        self.log(format!(
            "FileRegistry: file exists: {token_path}={} ({present})",
            path.display()
        ));
        debug!(path = token_path, file = %path.display(), present, "exists check");
        Ok(present)
    }

    fn load_leaf(&self, token_path: &str, leaf: &LeafRecord) -> RegistryResult<(PathBuf, Payload)> {
        let format = self.require_format(token_path, leaf)?;
        let path = self.root.join(leaf.location());
        self.log(format!(
            "FileRegistry: load {format} file: {token_path}={}",
            path.display()
        ));
        let payload = format.strategy().load(&path, leaf)?;
        debug!(path = token_path, kind = payload.kind(), "loaded");
        Ok((path, payload))
    }

    fn require_format(&self, token_path: &str, leaf: &LeafRecord) -> RegistryResult<FileFormat> {
        leaf.format().ok_or_else(|| RegistryError::MissingFormat {
            path: token_path.to_string(),
        })
    }

    fn log(&self, line: String) {
        self.sink.log(&line);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io::ErrorKind;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::format::TabularWriter;

    const FILES: &str = "\
data:
  blob:
    location: x.bin
    format: binary-object
    objectCount: 1
  triples:
    location: triples.bin
    format: binary-object
    objectCount: 3
    versions:
      1:
        location: triples_v1.bin
        doc: before relabeling
  dir:
    location: raw
";

    fn registry(root: &Path) -> (FileRegistry, Arc<Mutex<Vec<String>>>) {
        let mut registry =
            FileRegistry::from_descriptors(root, Descriptor::parse("files.yaml", FILES).unwrap(), None)
                .unwrap();
        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&lines);
        registry.install_logger(move |line: &str| captured.lock().unwrap().push(line.to_string()));
        (registry, lines)
    }

    #[test]
    fn path_joins_root() {
        let (registry, lines) = registry(Path::new("/srv/sgp"));
        assert_eq!(registry.path("data.blob", None).unwrap(), PathBuf::from("/srv/sgp/x.bin"));
        assert_eq!(
            lines.lock().unwrap().as_slice(),
            ["FileRegistry: file path: data.blob=/srv/sgp/x.bin"]
        );
    }

    #[test]
    fn versioned_path_logs_doc() {
        let (registry, lines) = registry(Path::new("/srv/sgp"));
        let path = registry.path("data.triples", Some(1)).unwrap();
        assert_eq!(path, PathBuf::from("/srv/sgp/triples_v1.bin"));
        let lines = lines.lock().unwrap();
        assert!(lines.iter().any(|l| l.contains("use old version 1")));
        assert!(lines.iter().any(|l| l.contains("before relabeling")));
    }

    #[test]
    fn load_without_format_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _) = registry(dir.path());
        let err = registry.load("data.dir", None).unwrap_err();
        assert!(matches!(err, RegistryError::MissingFormat { .. }));
        assert!(!registry.exists("data.dir", None).unwrap());
    }

    #[test]
    fn save_then_load_typed() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _) = registry(dir.path());
        registry
            .save("data.triples", &Record::from(vec![1i64, 2, 3]), None)
            .unwrap();
        let values: Vec<i64> = registry.load_as("data.triples", None).unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn typed_load_resolves_once() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, lines) = registry(dir.path());
        registry
            .save("data.triples", &Record::from(vec![4i64, 5, 6]), Some(1))
            .unwrap();
        lines.lock().unwrap().clear();

        let values: Vec<i64> = registry.load_as("data.triples", Some(1)).unwrap();
        assert_eq!(values, vec![4, 5, 6]);
        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 3, "{lines:?}");
        assert_eq!(lines.iter().filter(|l| l.contains("use old version 1")).count(), 1);
        assert!(lines[2].starts_with("FileRegistry: load binary-object file: data.triples="));
        assert!(lines[2].ends_with("triples_v1.bin"));
    }

    #[test]
    fn registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FileRegistry>();
    }

    fn write(dir: &Path, name: &str, text: &str) {
        std::fs::write(dir.join(name), text).unwrap();
    }

    fn quiet(mut registry: FileRegistry) -> FileRegistry {
        registry.install_logger(|_: &str| {});
        registry
    }

    fn open(dir: &Path, files: &str, overrides: Option<&str>) -> FileRegistry {
        write(dir, "files.yaml", files);
        let mut config = RegistryConfig::new(dir.join("files.yaml"));
        if let Some(text) = overrides {
            write(dir, "overrides.yaml", text);
            config = config.with_overrides("overrides.yaml");
        }
        quiet(FileRegistry::open(&config).unwrap())
    }

    const BLOB: &str = "\
data:
  blob:
    location: x.bin
    format: binary-object
    objectCount: 1
";

    #[test]
    fn get_path_joins_root() {
        let dir = tempfile::tempdir().unwrap();
        let registry = open(dir.path(), BLOB, None);
        assert_eq!(registry.path("data.blob", None).unwrap(), dir.path().join("x.bin"));
    }

    #[test]
    fn load_missing_file_surfaces_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = open(dir.path(), BLOB, None);
        match registry.load("data.blob", None).unwrap_err() {
            RegistryError::Io(e) => assert_eq!(e.kind(), ErrorKind::NotFound),
            other => panic!("expected an I/O error, got {other}"),
        }
    }

    #[test]
    fn single_record_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let registry = open(dir.path(), BLOB, None);
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Record::Int(1));
        let value = Record::Map(map);

        registry.save("data.blob", &value, None).unwrap();
        assert_eq!(registry.load("data.blob", None).unwrap().into_object(), Some(value));
    }

    #[test]
    fn multi_record_round_trip_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let files = "data:\n  seq:\n    location: seq.bin\n    format: binary-object\n    objectCount: 3\n";
        let registry = open(dir.path(), files, None);

        registry.save("data.seq", &Record::from(vec![1i64, 2, 3]), None).unwrap();
        assert_eq!(
            registry.load("data.seq", None).unwrap().into_object(),
            Some(Record::from(vec![1i64, 2, 3]))
        );
    }

    #[test]
    fn exists_tracks_versioned_location_not_content() {
        let dir = tempfile::tempdir().unwrap();
        let files = "\
weights:
  gpi:
    location: gpi.json
    format: structured-text
    versions:
      1:
        location: gpi_v1.json
";
        let registry = open(dir.path(), files, None);
        assert!(!registry.exists("weights.gpi", None).unwrap());

        // Not JSON, but present: existence ignores content.
        write(dir.path(), "gpi.json", "\u{0}\u{1}binary");
        assert!(registry.exists("weights.gpi", None).unwrap());
        assert!(!registry.exists("weights.gpi", Some(1)).unwrap());

        write(dir.path(), "gpi_v1.json", "{}");
        assert!(registry.exists("weights.gpi", Some(1)).unwrap());
    }

    #[test]
    fn version_errors() {
        let dir = tempfile::tempdir().unwrap();
        let files = "\
a:
  location: a.bin
  format: binary-object
b:
  location: b.bin
  format: binary-object
  versions:
    1:
      location: b_v1.bin
";
        let registry = open(dir.path(), files, None);
        assert!(matches!(
            registry.path("a", Some(1)),
            Err(RegistryError::MissingVersionMap { .. })
        ));
        assert!(matches!(
            registry.path("b", Some(2)),
            Err(RegistryError::UnknownVersion { version: 2, .. })
        ));
        let leaf = registry.leaf("b", Some(1)).unwrap();
        assert_eq!(leaf.location(), "b_v1.bin");
        assert_eq!(leaf.object_count(), 1);
        // The tree still answers with the original location.
        assert_eq!(registry.leaf("b", None).unwrap().location(), "b.bin");
    }

    #[test]
    fn string_override_replaces_record_and_no_longer_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let registry = open(
            dir.path(),
            "a:\n  location: old.bin\n  format: binary-object\n",
            Some("a: new.bin\n"),
        );
        assert!(matches!(
            registry.path("a", None),
            Err(RegistryError::IncompleteTokenPath { ref path }) if path == "a"
        ));
    }

    #[test]
    fn location_override_keeps_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let registry = open(
            dir.path(),
            "data:\n  seq:\n    location: seq.bin\n    format: binary-object\n    objectCount: 2\n  other:\n    location: o.txt\n    format: line-text\n",
            Some("data:\n  seq:\n    location: moved/seq.bin\n  extra:\n    location: e.json\n    format: structured-text\n"),
        );
        let seq = registry.leaf("data.seq", None).unwrap();
        assert_eq!(seq.location(), "moved/seq.bin");
        assert_eq!(seq.format(), Some(FileFormat::BinaryObject));
        assert_eq!(seq.object_count(), 2);
        assert_eq!(registry.leaf("data.other", None).unwrap().location(), "o.txt");
        assert_eq!(registry.leaf("data.extra", None).unwrap().location(), "e.json");
    }

    #[test]
    fn location_override_on_legacy_leaf() {
        let base = Descriptor::parse("files.yaml", "a:\n  name: old.bin\n  type: pickle\n  nof_objects: 2\n").unwrap();
        let overrides = Descriptor::parse("overrides.yaml", "a:\n  location: new.bin\n").unwrap();
        let registry =
            quiet(FileRegistry::from_descriptors("/r", base, Some(&overrides)).unwrap());
        let a = registry.leaf("a", None).unwrap();
        assert_eq!(a.location(), "new.bin");
        assert_eq!(a.format(), Some(FileFormat::BinaryObject));
        assert_eq!(a.object_count(), 2);
    }

    #[test]
    fn malformed_override_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "files.yaml", BLOB);
        write(dir.path(), "overrides.yaml", "data: [unterminated\n");
        let config = RegistryConfig::new(dir.path().join("files.yaml")).with_overrides("overrides.yaml");
        assert!(matches!(
            FileRegistry::open(&config),
            Err(RegistryError::DescriptorParse { .. })
        ));
    }

    #[test]
    fn intermediate_and_unknown_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let registry = open(dir.path(), BLOB, None);
        assert!(matches!(
            registry.path("data", None),
            Err(RegistryError::IncompleteTokenPath { .. })
        ));
        assert!(matches!(
            registry.path("model.blob", None),
            Err(RegistryError::UnknownToken { ref token, .. }) if token == "model"
        ));
    }

    #[test]
    fn every_format_loads_through_the_registry() {
        let dir = tempfile::tempdir().unwrap();
        let files = "\
data:
  objects:
    location: objects.json
    format: structured-text
  predicates:
    location: predicates.txt
    format: line-text
  params:
    location: params.yaml
    format: markup-config
  images:
    location: images.h5
    format: tabular-binary
";
        let registry = open(dir.path(), files, None);
        write(dir.path(), "objects.json", r#"["man", "shirt"]"#);
        write(dir.path(), "predicates.txt", "on\nwearing\n");
        write(dir.path(), "params.yaml", "epochs: 4\n");
        let mut writer = TabularWriter::new();
        writer.add("labels", &[2], &[7i64, 9]).unwrap();
        writer.finish(&dir.path().join("images.h5")).unwrap();

        let objects: Vec<String> = registry.load_as("data.objects", None).unwrap();
        assert_eq!(objects, vec!["man", "shirt"]);

        assert_eq!(
            registry.load("data.predicates", None).unwrap().into_lines(),
            Some(vec!["on".to_string(), "wearing".to_string()])
        );

        #[derive(serde::Deserialize)]
        struct Params {
            epochs: u32,
        }
        let params: Params = registry.load_as("data.params", None).unwrap();
        assert_eq!(params.epochs, 4);

        let handle = match registry.load("data.images", None).unwrap() {
            Payload::Table(handle) => handle,
            other => panic!("expected a table, got {}", other.kind()),
        };
        assert_eq!(handle.dataset("labels").unwrap().to_vec::<i64>().unwrap(), vec![7, 9]);

        assert!(matches!(
            registry.save("data.objects", &Record::Null, None),
            Err(RegistryError::UnsupportedOperation { format: FileFormat::StructuredText, .. })
        ));
    }

    #[test]
    fn in_memory_construction_matches_open() {
        let dir = tempfile::tempdir().unwrap();
        let opened = open(dir.path(), BLOB, None);
        let built = quiet(
            FileRegistry::from_descriptors(dir.path(), Descriptor::parse("mem", BLOB).unwrap(), None)
                .unwrap(),
        );
        assert_eq!(opened.tree(), built.tree());
    }
}
