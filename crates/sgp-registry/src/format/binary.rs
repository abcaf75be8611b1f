use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::FormatStrategy;
use crate::error::{RegistryError, RegistryResult};
use crate::record::{FileFormat, LeafRecord};
use crate::value::{Payload, Record};

const PREALLOCATE_LIMIT: usize = 1024;

/// Sequential bincode records.
///
/// On-disk format: `objectCount` independently encoded records written back
/// to back with no framing or count header. Records are read in file order,
/// so a reader may stop after any prefix without decoding the rest.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryObjectFormat;

impl BinaryObjectFormat {
    /// Read the first `count` records from `path`.
    pub fn read_records<T: DeserializeOwned>(path: &Path, count: usize) -> RegistryResult<Vec<T>> {
        let mut reader = BufReader::new(File::open(path)?);
        // `count` comes from the descriptor; the file decides how many records exist.
        let mut records = Vec::with_capacity(count.min(PREALLOCATE_LIMIT));
        for index in 0..count {
            let record = bincode::deserialize_from(&mut reader)
                .map_err(|e| decode_error(path, index, count, e))?;
            records.push(record);
        }
        debug!(path = %path.display(), count, "read binary records");
        Ok(records)
    }

    /// Decode only the first `count` records of a file that may hold more.
    pub fn read_prefix(path: &Path, count: usize) -> RegistryResult<Vec<Record>> {
        Self::read_records(path, count)
    }

    /// Write each element of `records` as its own record, in order.
    ///
    /// The file is truncated first; a failure part way leaves the records
    /// written so far.
    pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> RegistryResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut writer = BufWriter::new(File::create(path)?);
        for record in records {
            bincode::serialize_into(&mut writer, record).map_err(|e| encode_error(path, e))?;
        }
        writer.flush()?;
        debug!(path = %path.display(), count = records.len(), "wrote binary records");
        Ok(())
    }
}

impl FormatStrategy for BinaryObjectFormat {
    fn format(&self) -> FileFormat {
        FileFormat::BinaryObject
    }

    fn load(&self, path: &Path, leaf: &LeafRecord) -> RegistryResult<Payload> {
        let count = leaf.object_count();
        let mut records = Self::read_records::<Record>(path, count)?;
        let value = if count == 1 {
            records.remove(0)
        } else {
            Record::List(records)
        };
        Ok(Payload::Object(value))
    }

    fn save(&self, path: &Path, leaf: &LeafRecord, value: &Record) -> RegistryResult<()> {
        let count = leaf.object_count();
        if count == 1 {
            return Self::write_records(path, std::slice::from_ref(value));
        }
        match value {
            Record::List(items) if items.len() == count => Self::write_records(path, items),
            other => Err(RegistryError::RecordCountMismatch {
                expected: count,
                actual: other.list_len().unwrap_or(1),
            }),
        }
    }
}

fn decode_error(path: &Path, index: usize, count: usize, err: bincode::Error) -> RegistryError {
    match *err {
        bincode::ErrorKind::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => RegistryError::Decode {
            path: path.to_path_buf(),
            reason: format!("file ended after {index} of {count} records"),
        },
        bincode::ErrorKind::Io(e) => RegistryError::Io(e),
        other => RegistryError::Decode {
            path: path.to_path_buf(),
            reason: format!("record {index}: {other}"),
        },
    }
}

fn encode_error(path: &Path, err: bincode::Error) -> RegistryError {
    match *err {
        bincode::ErrorKind::Io(e) => RegistryError::Io(e),
        other => RegistryError::Encode {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}
