//! Loading datasets from files.

use std::fs;
use std::path::Path;

use crate::csv::{DecodeOptions, decode};
use crate::error::ViewError;
use crate::json::records_from_json;
use crate::record::Dataset;

/// Input file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Json,
}

impl Format {
    /// `.json` files are JSON; everything else is delimited text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Csv,
        }
    }
}

/// Read a file as text. Invalid UTF-8 sequences become U+FFFD rather than
/// failing the load.
fn read(path: &Path) -> Result<String, ViewError> {
    let bytes = fs::read(path).map_err(|e| ViewError::io(path, e))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            log::warn!(
                "{}: invalid UTF-8 at byte {}, replaced with U+FFFD",
                path.display(),
                e.utf8_error().valid_up_to()
            );
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

pub fn load_csv(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<Dataset, ViewError> {
    let path = path.as_ref();
    let text = read(path)?;
    log::debug!("loaded {} bytes from {}", text.len(), path.display());
    Ok(decode(&text, options))
}

pub fn load_json(path: impl AsRef<Path>) -> Result<Dataset, ViewError> {
    let path = path.as_ref();
    let text = read(path)?;
    log::debug!("loaded {} bytes from {}", text.len(), path.display());
    records_from_json(&text)
}

/// Load `path` as `format`. CSV options are ignored for JSON.
pub fn load(
    path: impl AsRef<Path>,
    format: Format,
    options: &DecodeOptions,
) -> Result<Dataset, ViewError> {
    match format {
        Format::Csv => load_csv(path, options),
        Format::Json => load_json(path),
    }
}
