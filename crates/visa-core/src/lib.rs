//! visa-core: Core library for the visa service catalog editor
//!
//! This library provides functionality to:
//! - Parse CSV and JSON fee exports into raw rows
//! - Normalize the different export layouts into one canonical record shape
//! - Hold the records of a session and apply edits, bulk edits and deletes
//! - Search records by free text
//! - Export records as CSV or JSON

pub mod config;
pub mod edits;
pub mod error;
pub mod ids;
pub mod normalizer;
pub mod parser;
pub mod query;
pub mod raw;
pub mod record;
pub mod scanner;
pub mod serializer;
pub mod store;

pub use config::NormalizerConfig;
pub use edits::{apply_script, ApplyResult, EditScript, Operation, Selection};
pub use error::{Error, Result};
pub use ids::IdGenerator;
pub use normalizer::{
    detect_format, normalize_batch, normalize_rows, normalize_source, FileSummary, ImportFailure,
    ImportReport, SourceFormat,
};
pub use parser::{parse_source, SourceFile};
pub use query::{filter, matching_ids};
pub use raw::RawRow;
pub use record::{CanonicalRecord, Documents, LegacyRecord, NewRecord, Status};
pub use scanner::{read_sources, scan_directory, Candidate, ScanResult};
pub use serializer::{export, export_file_name, to_csv, to_json, to_legacy_json, ExportFormat};
pub use store::{Dataset, DatasetStats, ImportMode};
