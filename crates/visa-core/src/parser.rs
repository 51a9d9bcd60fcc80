//! Turn import file text into raw rows

use crate::error::{Error, Result};
use crate::raw::{infer_cell, RawRow};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Import file contents with the name they arrived under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// File name, used for format detection
    pub name: String,
    /// Full text of the file
    pub content: String,
}

impl SourceFile {
    /// Create from a name and text already in memory
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk, keeping only its file name
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, content })
    }

    /// Lower-cased extension of the file name, empty when there is none
    pub fn extension(&self) -> String {
        extension_of(&self.name)
    }

    /// Parse the contents according to the extension
    pub fn rows(&self) -> Result<Vec<RawRow>> {
        parse_source(&self.name, &self.content)
    }
}

/// Lower-cased extension of a file name
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Fail with `UnsupportedExtension` unless the name ends in csv or json
pub fn check_extension(name: &str) -> Result<()> {
    match extension_of(name).as_str() {
        "csv" | "json" => Ok(()),
        other => Err(Error::UnsupportedExtension {
            name: name.to_string(),
            extension: other.to_string(),
        }),
    }
}

/// Parse file text into rows, choosing CSV or JSON by extension
pub fn parse_source(name: &str, content: &str) -> Result<Vec<RawRow>> {
    check_extension(name)?;
    if extension_of(name) == "json" {
        parse_json_str(content, name)
    } else {
        parse_csv_str(content, name)
    }
}

/// Parse CSV text with a header row; blank lines are skipped and cells typed
pub fn parse_csv_str(content: &str, source_name: &str) -> Result<Vec<RawRow>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(|e| Error::Csv {
            name: source_name.to_string(),
            source: e,
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(|e| Error::Csv {
            name: source_name.to_string(),
            source: e,
        })?;

        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let mut row = RawRow::new();
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            // Short rows read as null for the missing trailing columns
            let value = record.get(i).map(infer_cell).unwrap_or(Value::Null);
            row.insert(header.clone(), value);
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Parse JSON text holding an array of objects
pub fn parse_json_str(content: &str, source_name: &str) -> Result<Vec<RawRow>> {
    let value: Value = serde_json::from_str(content)?;
    let items = match value {
        Value::Array(items) => items,
        _ => {
            return Err(Error::JsonShape {
                name: source_name.to_string(),
                message: "expected a top-level array".to_string(),
            })
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(RawRow::from(map)),
            _ => Err(Error::JsonShape {
                name: source_name.to_string(),
                message: format!("element {} is not an object", i),
            }),
        })
        .collect()
}
