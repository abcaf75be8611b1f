//! Tabular containers: named, typed, fixed-width-row datasets in one file.
//!
//! On-disk format:
//! ```text
//! [4 bytes: magic "SGPT"]
//! [4 bytes: format version (little-endian u32)]
//! [8 bytes: index length (little-endian u64)]
//! [N bytes: index (bincode-serialized Vec<DatasetEntry>)]
//! [data section: dataset bytes, little-endian, row-major]
//! ```
//! Dataset offsets are relative to the start of the data section.
//!
//! Handles memory-map the file; rows are decoded only when asked for.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::FormatStrategy;
use crate::error::{RegistryError, RegistryResult};
use crate::record::{FileFormat, LeafRecord};
use crate::value::Payload;

const MAGIC: &[u8; 4] = b"SGPT";
const VERSION: u32 = 1;
const HEADER_SIZE: usize = 16;

/// Element type of a dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dtype {
    U8,
    I32,
    I64,
    F32,
    F64,
}

impl Dtype {
    /// Width of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::I32 | Self::F32 => 4,
            Self::I64 | Self::F64 => 8,
        }
    }
}

impl std::fmt::Display for Dtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::U8 => write!(f, "u8"),
            Self::I32 => write!(f, "i32"),
            Self::I64 => write!(f, "i64"),
            Self::F32 => write!(f, "f32"),
            Self::F64 => write!(f, "f64"),
        }
    }
}

/// A Rust type that can be stored as a dataset element.
pub trait Element: Copy {
    const DTYPE: Dtype;

    fn read_le(bytes: &[u8]) -> Self;

    fn write_le(self, out: &mut Vec<u8>);
}

macro_rules! element {
    ($ty:ty, $dtype:expr) => {
        impl Element for $ty {
            const DTYPE: Dtype = $dtype;

            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                <$ty>::from_le_bytes(buf)
            }

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        }
    };
}

element!(u8, Dtype::U8);
element!(i32, Dtype::I32);
element!(i64, Dtype::I64);
element!(f32, Dtype::F32);
element!(f64, Dtype::F64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct DatasetEntry {
    name: String,
    dtype: Dtype,
    shape: Vec<u64>,
    offset: u64,
}

impl DatasetEntry {
    fn byte_len(&self) -> Option<u64> {
        element_count(&self.shape)?.checked_mul(self.dtype.size() as u64)
    }

    /// Bytes per row; `None` when the row shape overflows.
    fn row_byte_len(&self) -> Option<u64> {
        element_count(row_dims(&self.shape))?.checked_mul(self.dtype.size() as u64)
    }
}

/// Product of `dims`, `None` on overflow.
fn element_count(dims: &[u64]) -> Option<u64> {
    dims.iter().try_fold(1u64, |acc, dim| acc.checked_mul(*dim))
}

/// Every dimension after the first.
fn row_dims(shape: &[u64]) -> &[u64] {
    shape.get(1..).unwrap_or(&[])
}

/// Open tabular container. The registry hands these out and never closes
/// them; dropping the handle (or calling [`close`](Self::close)) unmaps the
/// file.
#[derive(Debug)]
pub struct TabularHandle {
    path: PathBuf,
    map: Mmap,
    data_start: usize,
    datasets: BTreeMap<String, DatasetEntry>,
}

impl TabularHandle {
    /// Map `path` and read its dataset index.
    pub fn open(path: &Path) -> RegistryResult<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() < HEADER_SIZE as u64 {
            return Err(corrupt(path, "file is shorter than the header"));
        }
        // SAFETY: the mapping is read-only and the registry never writes a
        // tabular file it has handed out.
        let map = unsafe { MmapOptions::new().map(&file)? };

        if &map[0..4] != MAGIC {
            return Err(corrupt(path, "bad magic"));
        }
        let mut word = [0u8; 4];
        word.copy_from_slice(&map[4..8]);
        let version = u32::from_le_bytes(word);
        if version != VERSION {
            return Err(corrupt(path, format!("unsupported version {version}")));
        }
        let mut len = [0u8; 8];
        len.copy_from_slice(&map[8..16]);
        let index_len = usize::try_from(u64::from_le_bytes(len))
            .map_err(|_| corrupt(path, "index length overflows"))?;
        let data_start = HEADER_SIZE
            .checked_add(index_len)
            .filter(|end| *end <= map.len())
            .ok_or_else(|| corrupt(path, "index extends beyond end of file"))?;

        let entries: Vec<DatasetEntry> = bincode::deserialize(&map[HEADER_SIZE..data_start])
            .map_err(|e| corrupt(path, format!("index: {e}")))?;

        let data_len = (map.len() - data_start) as u64;
        let mut datasets = BTreeMap::new();
        for entry in entries {
            let end = entry
                .byte_len()
                .and_then(|len| entry.offset.checked_add(len))
                .filter(|end| *end <= data_len);
            if end.is_none() {
                return Err(corrupt(path, format!("dataset {} extends beyond end of file", entry.name)));
            }
            if entry.row_byte_len().and_then(|n| usize::try_from(n).ok()).is_none() {
                return Err(corrupt(path, format!("dataset {} row shape overflows", entry.name)));
            }
            datasets.insert(entry.name.clone(), entry);
        }

        debug!(path = %path.display(), datasets = datasets.len(), "opened tabular file");
        Ok(Self {
            path: path.to_path_buf(),
            map,
            data_start,
            datasets,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Dataset names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.datasets.contains_key(name)
    }

    /// Borrow a dataset by name.
    pub fn dataset(&self, name: &str) -> Option<Dataset<'_>> {
        let entry = self.datasets.get(name)?;
        let start = self.data_start + entry.offset as usize;
        let len = entry.byte_len()? as usize;
        Some(Dataset {
            path: &self.path,
            entry,
            bytes: &self.map[start..start + len],
        })
    }

    /// Release the mapping.
    pub fn close(self) {}
}

/// A borrowed view over one dataset. The first dimension indexes rows.
#[derive(Clone, Copy, Debug)]
pub struct Dataset<'a> {
    path: &'a Path,
    entry: &'a DatasetEntry,
    bytes: &'a [u8],
}

impl<'a> Dataset<'a> {
    pub fn name(&self) -> &'a str {
        &self.entry.name
    }

    pub fn dtype(&self) -> Dtype {
        self.entry.dtype
    }

    pub fn shape(&self) -> &'a [u64] {
        &self.entry.shape
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.entry.shape.first().copied().unwrap_or(1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements per row.
    pub fn row_width(&self) -> usize {
        // Checked when the handle was opened.
        element_count(row_dims(&self.entry.shape)).unwrap_or(0) as usize
    }

    /// Raw little-endian bytes of one row.
    pub fn row_bytes(&self, index: usize) -> Option<&'a [u8]> {
        if index >= self.len() {
            return None;
        }
        let width = self.row_width() * self.entry.dtype.size();
        self.bytes.get(index * width..(index + 1) * width)
    }

    /// Decode one row. `Ok(None)` when the index is out of range.
    pub fn row<T: Element>(&self, index: usize) -> RegistryResult<Option<Vec<T>>> {
        self.check_dtype::<T>()?;
        Ok(self.row_bytes(index).map(decode_all::<T>))
    }

    /// Decode a single element.
    pub fn get<T: Element>(&self, row: usize, column: usize) -> RegistryResult<Option<T>> {
        self.check_dtype::<T>()?;
        if column >= self.row_width() {
            return Ok(None);
        }
        let size = self.entry.dtype.size();
        Ok(self
            .row_bytes(row)
            .and_then(|bytes| bytes.get(column * size..(column + 1) * size))
            .map(T::read_le))
    }

    /// Decode the whole dataset, row-major.
    pub fn to_vec<T: Element>(&self) -> RegistryResult<Vec<T>> {
        self.check_dtype::<T>()?;
        Ok(decode_all(self.bytes))
    }

    fn check_dtype<T: Element>(&self) -> RegistryResult<()> {
        if T::DTYPE != self.entry.dtype {
            return Err(corrupt(
                self.path,
                format!(
                    "dataset {} holds {}, requested {}",
                    self.entry.name, self.entry.dtype, T::DTYPE
                ),
            ));
        }
        Ok(())
    }
}

fn decode_all<T: Element>(bytes: &[u8]) -> Vec<T> {
    bytes.chunks_exact(T::DTYPE.size()).map(T::read_le).collect()
}

fn corrupt(path: &Path, reason: impl Into<String>) -> RegistryError {
    RegistryError::Decode {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

#[derive(Debug)]
struct PendingDataset {
    dtype: Dtype,
    shape: Vec<u64>,
    bytes: Vec<u8>,
}

/// Builds a tabular container file.
#[derive(Debug, Default)]
pub struct TabularWriter {
    datasets: BTreeMap<String, PendingDataset>,
}

impl TabularWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a dataset. `data` is row-major and must hold exactly the number
    /// of elements `shape` describes. A later dataset with the same name
    /// replaces the earlier one.
    pub fn add<T: Element>(
        &mut self,
        name: impl Into<String>,
        shape: &[u64],
        data: &[T],
    ) -> RegistryResult<&mut Self> {
        let expected = element_count(shape)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(usize::MAX);
        if expected != data.len() {
            return Err(RegistryError::RecordCountMismatch {
                expected,
                actual: data.len(),
            });
        }
        let mut bytes = Vec::with_capacity(data.len() * T::DTYPE.size());
        for value in data {
            value.write_le(&mut bytes);
        }
        self.datasets.insert(
            name.into(),
            PendingDataset {
                dtype: T::DTYPE,
                shape: shape.to_vec(),
                bytes,
            },
        );
        Ok(self)
    }

    /// Number of queued datasets.
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Write the container to `path`.
    pub fn finish(self, path: &Path) -> RegistryResult<()> {
        let mut entries = Vec::with_capacity(self.datasets.len());
        let mut offset = 0u64;
        for (name, pending) in &self.datasets {
            let entry = DatasetEntry {
                name: name.clone(),
                dtype: pending.dtype,
                shape: pending.shape.clone(),
                offset,
            };
            if entry.row_byte_len().and_then(|n| usize::try_from(n).ok()).is_none() {
                return Err(RegistryError::Encode {
                    path: path.to_path_buf(),
                    reason: format!("dataset {name} row shape overflows"),
                });
            }
            entries.push(entry);
            offset += pending.bytes.len() as u64;
        }
        let index = bincode::serialize(&entries).map_err(|e| RegistryError::Encode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&(index.len() as u64).to_le_bytes())?;
        writer.write_all(&index)?;
        for pending in self.datasets.values() {
            writer.write_all(&pending.bytes)?;
        }
        writer.flush()?;
        debug!(path = %path.display(), datasets = entries.len(), "wrote tabular file");
        Ok(())
    }
}

/// Strategy for tabular containers: `load` opens a handle.
#[derive(Clone, Copy, Debug, Default)]
pub struct TabularFormat;

impl FormatStrategy for TabularFormat {
    fn format(&self) -> FileFormat {
        FileFormat::TabularBinary
    }

    fn load(&self, path: &Path, _leaf: &LeafRecord) -> RegistryResult<Payload> {
        TabularHandle::open(path).map(Payload::Table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(path: &Path) {
        let mut writer = TabularWriter::new();
        writer
            .add("boxes", &[3, 4], &[0i32, 0, 10, 10, 5, 5, 20, 20, 1, 2, 3, 4])
            .unwrap()
            .add("scores", &[3], &[0.5f32, 0.25, 1.0])
            .unwrap()
            .add("empty", &[0, 2], &[] as &[f64])
            .unwrap();
        assert_eq!(writer.len(), 3);
        writer.finish(path).unwrap();
    }

    #[test]
    fn indexed_row_access() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("images.h5");
        sample(&path);

        let handle = TabularHandle::open(&path).unwrap();
        assert_eq!(handle.names().collect::<Vec<_>>(), vec!["boxes", "empty", "scores"]);

        let boxes = handle.dataset("boxes").unwrap();
        assert_eq!(boxes.dtype(), Dtype::I32);
        assert_eq!(boxes.shape(), &[3, 4]);
        assert_eq!(boxes.len(), 3);
        assert_eq!(boxes.row_width(), 4);
        assert_eq!(boxes.row::<i32>(1).unwrap(), Some(vec![5, 5, 20, 20]));
        assert_eq!(boxes.row::<i32>(3).unwrap(), None);
        assert_eq!(boxes.get::<i32>(2, 3).unwrap(), Some(4));
        assert_eq!(boxes.get::<i32>(2, 4).unwrap(), None);

        let scores = handle.dataset("scores").unwrap();
        assert_eq!(scores.to_vec::<f32>().unwrap(), vec![0.5, 0.25, 1.0]);
        assert_eq!(scores.row::<f32>(2).unwrap(), Some(vec![1.0]));

        let empty = handle.dataset("empty").unwrap();
        assert!(empty.is_empty());
        assert!(handle.dataset("missing").is_none());
        handle.close();
    }

    #[test]
    fn dtype_mismatch_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("images.h5");
        sample(&path);

        let handle = TabularHandle::open(&path).unwrap();
        let err = handle.dataset("scores").unwrap().row::<f64>(0).unwrap_err();
        assert!(matches!(err, RegistryError::Decode { .. }));
    }

    #[test]
    fn shape_must_match_data() {
        let mut writer = TabularWriter::new();
        let err = writer.add("bad", &[2, 2], &[1u8, 2, 3]).unwrap_err();
        assert!(matches!(err, RegistryError::RecordCountMismatch { expected: 4, actual: 3 }));
    }

    #[test]
    fn reject_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-tabular");
        std::fs::write(&path, b"PK\x03\x04 zip bytes here, long enough").unwrap();
        assert!(matches!(TabularHandle::open(&path), Err(RegistryError::Decode { .. })));

        std::fs::write(&path, b"SGPT").unwrap();
        assert!(matches!(TabularHandle::open(&path), Err(RegistryError::Decode { .. })));
    }

    #[test]
    fn reject_overflowing_row_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.h5");
        let entries = vec![DatasetEntry {
            name: "wide".into(),
            dtype: Dtype::U8,
            shape: vec![0, 1 << 40, 1 << 40],
            offset: 0,
        }];
        let index = bincode::serialize(&entries).unwrap();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&(index.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&index);
        std::fs::write(&path, &bytes).unwrap();

        match TabularHandle::open(&path).unwrap_err() {
            RegistryError::Decode { reason, .. } => assert!(reason.contains("row shape overflows")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn writer_rejects_overflowing_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = TabularWriter::new();
        let err = writer.add("huge", &[1 << 40, 1 << 40, 2], &[1u8]).unwrap_err();
        assert!(matches!(err, RegistryError::RecordCountMismatch { expected: usize::MAX, actual: 1 }));

        writer.add("wide", &[0, 1 << 40, 1 << 40], &[] as &[u8]).unwrap();
        let err = writer.finish(&dir.path().join("wide.h5")).unwrap_err();
        assert!(matches!(err, RegistryError::Encode { .. }));
    }

    #[test]
    fn reject_truncated_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.h5");
        sample(&path);
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();
        assert!(matches!(TabularHandle::open(&path), Err(RegistryError::Decode { .. })));
    }

    #[test]
    fn strategy_returns_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.h5");
        sample(&path);
        let leaf = LeafRecord::new("t.h5", Some(FileFormat::TabularBinary));
        let handle = TabularFormat.load(&path, &leaf).unwrap().into_table().unwrap();
        assert!(handle.contains("boxes"));
        assert_eq!(handle.path(), path.as_path());
    }
}
