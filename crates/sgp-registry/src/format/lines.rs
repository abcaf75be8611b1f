use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::FormatStrategy;
use crate::error::RegistryResult;
use crate::record::{FileFormat, LeafRecord};
use crate::value::Payload;

/// Plain text read as an ordered list of lines.
///
/// Line terminators (`\n` or `\r\n`) are stripped.
#[derive(Clone, Copy, Debug, Default)]
pub struct LineTextFormat;

impl FormatStrategy for LineTextFormat {
    fn format(&self) -> FileFormat {
        FileFormat::LineText
    }

    fn load(&self, path: &Path, _leaf: &LeafRecord) -> RegistryResult<Payload> {
        let reader = BufReader::new(File::open(path)?);
        let lines = reader.lines().collect::<Result<Vec<_>, _>>()?;
        Ok(Payload::Lines(lines))
    }
}
