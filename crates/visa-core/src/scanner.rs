//! Directory scanner for discovering importable fee files

use crate::config::NormalizerConfig;
use crate::error::Result;
use crate::normalizer::{ImportFailure, SourceFormat};
use crate::parser::{check_extension, extension_of, SourceFile};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions the importer can parse
pub const IMPORT_EXTENSIONS: &[&str] = &["csv", "json"];

/// A file found while scanning
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    /// Full path to the file
    pub path: PathBuf,
    /// Detected format, `None` when the name matches no known pattern
    pub format: Option<SourceFormat>,
}

impl Candidate {
    /// File name used for format detection
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Result of scanning directories
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    /// Root directories that were scanned
    pub roots: Vec<PathBuf>,
    /// CSV and JSON files found, sorted by path
    pub candidates: Vec<Candidate>,
}

impl ScanResult {
    /// Files whose name matches a known format
    pub fn importable(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| c.format.is_some())
    }

    /// Files that will be reported as unsupported
    pub fn unrecognized(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| c.format.is_none())
    }

    /// Paths of every candidate, recognized or not
    pub fn paths(&self) -> Vec<PathBuf> {
        self.candidates.iter().map(|c| c.path.clone()).collect()
    }
}

/// Scan one or more directories for CSV and JSON files
///
/// A root that is itself a file is taken as-is, whatever its extension, so
/// that an explicitly named file is never dropped without a report.
pub fn scan_directory<P: AsRef<Path>>(roots: &[P], config: &NormalizerConfig) -> Result<ScanResult> {
    let mut candidates = Vec::new();

    for root in roots {
        for entry in WalkDir::new(root.as_ref()).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            if entry.depth() > 0 && !IMPORT_EXTENSIONS.contains(&extension_of(name).as_str()) {
                continue;
            }

            candidates.push(Candidate {
                path: path.to_path_buf(),
                format: SourceFormat::detect(name, config),
            });
        }
    }

    candidates.sort_by(|a, b| a.path.cmp(&b.path));
    candidates.dedup_by(|a, b| a.path == b.path);

    Ok(ScanResult {
        roots: roots.iter().map(|r| r.as_ref().to_path_buf()).collect(),
        candidates,
    })
}

/// Read files from disk; unreadable files are returned as failures
///
/// Files with an extension the importer cannot parse are reported without
/// being read.
pub fn read_sources<P: AsRef<Path>>(paths: &[P]) -> (Vec<SourceFile>, Vec<ImportFailure>) {
    let mut sources = Vec::with_capacity(paths.len());
    let mut failures = Vec::new();

    for path in paths {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Err(error) = check_extension(&name) {
            failures.push(ImportFailure {
                name: path.display().to_string(),
                error,
            });
            continue;
        }

        match SourceFile::read(path) {
            Ok(source) => sources.push(source),
            Err(error) => failures.push(ImportFailure {
                name: path.display().to_string(),
                error,
            }),
        }
    }

    (sources, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs;

    fn temp_tree(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("visa-scan-{}-{}", tag, std::process::id()));
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("feesexport.csv"), "Destination Country,Cost\nFrance,1\n").unwrap();
        fs::write(root.join("nested").join("feespage.json"), "[]").unwrap();
        fs::write(root.join("notes.txt"), "ignore me").unwrap();
        fs::write(root.join("prices.csv"), "A\n1\n").unwrap();
        root
    }

    #[test]
    fn test_scan_finds_csv_and_json() {
        let root = temp_tree("find");
        let result = scan_directory(&[&root], &NormalizerConfig::default()).unwrap();
        fs::remove_dir_all(&root).ok();

        assert_eq!(result.candidates.len(), 3);
        assert_eq!(result.importable().count(), 2);
        let unrecognized: Vec<String> = result.unrecognized().map(|c| c.file_name()).collect();
        assert_eq!(unrecognized, vec!["prices.csv"]);
    }

    #[test]
    fn test_scan_accepts_file_roots() {
        let root = temp_tree("file");
        let file = root.join("feesexport.csv");
        let result = scan_directory(&[&file, &file], &NormalizerConfig::default()).unwrap();
        fs::remove_dir_all(&root).ok();

        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].format, Some(SourceFormat::Primary));
    }

    #[test]
    fn test_named_file_with_wrong_extension_is_reported() {
        let root = temp_tree("xlsx");
        let sheet = root.join("feesexport.xlsx");
        fs::write(&sheet, [0x50u8, 0x4b, 0x03, 0x04, 0xff]).unwrap();

        let result = scan_directory(&[&sheet], &NormalizerConfig::default()).unwrap();
        let (sources, failures) = read_sources(&result.paths());
        let walked = scan_directory(&[&root], &NormalizerConfig::default()).unwrap();
        fs::remove_dir_all(&root).ok();

        assert_eq!(result.candidates.len(), 1);
        assert!(sources.is_empty());
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures[0].error,
            Error::UnsupportedExtension { ref extension, .. } if extension == "xlsx"
        ));
        // Inside a walked directory the same file is still skipped
        assert_eq!(walked.candidates.len(), 3);
    }

    #[test]
    fn test_read_sources_reports_missing_files() {
        let root = temp_tree("read");
        let paths = vec![root.join("feesexport.csv"), root.join("missing.csv")];
        let (sources, failures) = read_sources(&paths);
        fs::remove_dir_all(&root).ok();

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "feesexport.csv");
        assert_eq!(failures.len(), 1);
    }
}
