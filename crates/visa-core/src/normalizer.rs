//! Import normalization
//!
//! Each supported export format has its own transform from raw rows to
//! canonical records. The format is picked from the file name:
//! - primary fee export (`feesexport`): one row gives at most one record
//! - corrected fee exports (`feescorrected`, `feespage`): one row gives zero,
//!   one or many records, split on its country list
//! - catalog (`visa-catalog`): this tool's own JSON export, read back with
//!   the legacy field names resolved. Only `.json` files qualify; the CSV
//!   export is a report and is not read back
//!
//! Column fallbacks are resolved here, once. Nothing downstream looks at
//! source column names again.

use crate::config::NormalizerConfig;
use crate::error::{Error, Result};
use crate::ids::IdGenerator;
use crate::parser::{check_extension, extension_of, SourceFile};
use crate::raw::RawRow;
use crate::record::{
    CanonicalRecord, Documents, DEFAULT_FEE_TYPE, DEFAULT_PASSPORT_ORIGIN, DEFAULT_PROVIDER,
    MULTIPLE_COUNTRIES, NOT_AVAILABLE,
};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Known import layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Primary,
    Corrected,
    Catalog,
}

impl SourceFormat {
    /// Pick the format whose filename token appears in `name` (case-sensitive)
    ///
    /// Catalog files must also be JSON.
    pub fn detect(name: &str, config: &NormalizerConfig) -> Option<Self> {
        let has_token = |tokens: &[String]| tokens.iter().any(|t| name.contains(t.as_str()));

        if has_token(&config.primary_tokens) {
            Some(SourceFormat::Primary)
        } else if has_token(&config.corrected_tokens) {
            Some(SourceFormat::Corrected)
        } else if has_token(&config.catalog_tokens) && extension_of(name) == "json" {
            Some(SourceFormat::Catalog)
        } else {
            None
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceFormat::Primary => "primary",
            SourceFormat::Corrected => "corrected",
            SourceFormat::Catalog => "catalog",
        };
        f.write_str(name)
    }
}

/// Detect the format of a file name, or report it as unsupported
pub fn detect_format(name: &str, config: &NormalizerConfig) -> Result<SourceFormat> {
    SourceFormat::detect(name, config).ok_or_else(|| Error::UnsupportedFile(name.to_string()))
}

// Primary export columns
const P_DESTINATION: &str = "Destination Country";
const P_COST: &str = "Cost";
const P_FEE: &[&str] = &["Cost", "Total Fee"];
const P_PASSPORT: &[&str] = &["Passport Origin"];
const P_SERVICE: &[&str] = &["Title", "Product Type"];
const P_VISA_TYPE: &[&str] = &["Trip Purpose"];
const P_PROVIDER: &[&str] = &["Partner Group"];
const P_PROCESSING: &[&str] = &["Processing Duration"];
const P_ENTRIES: &[&str] = &["Number of Entries"];
const P_VALIDITY: &[&str] = &["Visa Validity"];
const P_FEE_TYPE: &[&str] = &["Fee Type"];

// Corrected export columns
const C_COUNTRIES: &str = "Countries_Applied_To";
const C_FEE: &[&str] = &["Cost"];
const C_PASSPORT: &[&str] = &["Passport_Origin"];
const C_SERVICE: &[&str] = &["Title", "Visa_Type"];
const C_VISA_TYPE: &[&str] = &["Visa_Type", "Trip Purpose"];
const C_PROVIDER: &[&str] = &["Partner_Group"];
const C_PROCESSING: &[&str] = &["Processing_Time"];
const C_ENTRIES: &[&str] = &["Number_of_Entries", "Entries"];
const C_VALIDITY: &[&str] = &["Visa_Validity", "Validity"];
const C_FEE_TYPE: &[&str] = &["Fee_Type"];

// Catalog fields, current name first, legacy name second
const K_DESTINATION: &[&str] = &["destinationCountry", "country"];
const K_PASSPORT: &[&str] = &["passportOrigin"];
const K_SERVICE: &[&str] = &["serviceName", "service"];
const K_VISA_TYPE: &[&str] = &["visaType"];
const K_PROVIDER: &[&str] = &["provider", "partnerGroup"];
const K_FEE: &[&str] = &["fee", "cost"];
const K_FEE_TYPE: &[&str] = &["feeType"];
const K_PROCESSING: &[&str] = &["processingTime", "processingDuration"];
const K_ENTRIES: &[&str] = &["numberOfEntries", "entries"];
const K_VALIDITY: &[&str] = &["visaValidity", "validity"];
const K_APPLICABLE: &[&str] = &["applicableCountries"];

/// Primary export row: needs a destination and a cost column that is not null
pub fn transform_primary(row: &RawRow, ids: &mut IdGenerator) -> Option<CanonicalRecord> {
    let destination = row.text(P_DESTINATION)?;
    if row.is_null(P_COST) {
        return None;
    }

    Some(CanonicalRecord {
        id: ids.next_id(),
        destination_country: destination,
        passport_origin: row.text_or(P_PASSPORT, DEFAULT_PASSPORT_ORIGIN),
        service_name: row.text_or(P_SERVICE, "Visa"),
        visa_type: row.text_or(P_VISA_TYPE, "General"),
        provider: row.text_or(P_PROVIDER, DEFAULT_PROVIDER),
        fee: row.fee(P_FEE),
        fee_type: row.text_or(P_FEE_TYPE, DEFAULT_FEE_TYPE),
        processing_time: row.text_or(P_PROCESSING, NOT_AVAILABLE),
        number_of_entries: row.text_or(P_ENTRIES, "Single"),
        visa_validity: row.text_or(P_VALIDITY, NOT_AVAILABLE),
        documents: Documents::default(),
        applicable_countries: None,
    })
}

/// Corrected export row: expands to one record per listed country
///
/// Long lists (more than `aggregate_threshold` characters, containing the
/// separator) collapse into a single aggregate record instead. Rows with no
/// usable country give nothing. Ids of one row form a consecutive block, so
/// rows never collide with each other.
pub fn transform_corrected(
    row: &RawRow,
    config: &NormalizerConfig,
    ids: &mut IdGenerator,
) -> Vec<CanonicalRecord> {
    let countries = match row.text(C_COUNTRIES) {
        Some(text) if text != config.sentinel => text,
        _ => return Vec::new(),
    };

    let aggregate = countries.contains(config.country_separator)
        && countries.chars().count() > config.aggregate_threshold;

    if aggregate {
        let mut record = corrected_template(row, true);
        record.id = ids.next_id();
        record.destination_country = MULTIPLE_COUNTRIES.to_string();
        record.applicable_countries = Some(countries);
        return vec![record];
    }

    let names: Vec<&str> = countries
        .split(config.country_separator)
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != config.sentinel)
        .collect();
    if names.is_empty() {
        return Vec::new();
    }

    let template = corrected_template(row, false);
    let base = ids.reserve(names.len());
    names
        .into_iter()
        .enumerate()
        .map(|(offset, country)| CanonicalRecord {
            id: base + offset as i64,
            destination_country: country.to_string(),
            ..template.clone()
        })
        .collect()
}

fn corrected_template(row: &RawRow, aggregate: bool) -> CanonicalRecord {
    let (service, entries, validity) = if aggregate {
        ("Multi-Country Visa", "Multiple", "Varies")
    } else {
        ("Visa", "Single", "30 days")
    };

    CanonicalRecord {
        id: 0,
        destination_country: String::new(),
        passport_origin: row.text_or(C_PASSPORT, DEFAULT_PASSPORT_ORIGIN),
        service_name: row.text_or(C_SERVICE, service),
        visa_type: row.text_or(C_VISA_TYPE, "General"),
        provider: row.text_or(C_PROVIDER, DEFAULT_PROVIDER),
        fee: row.fee(C_FEE),
        fee_type: row.text_or(C_FEE_TYPE, DEFAULT_FEE_TYPE),
        processing_time: row.text_or(C_PROCESSING, NOT_AVAILABLE),
        number_of_entries: row.text_or(C_ENTRIES, entries),
        visa_validity: row.text_or(C_VALIDITY, validity),
        documents: Documents::default(),
        applicable_countries: None,
    }
}

/// Catalog row: a record exported earlier, possibly with legacy field names
///
/// An integral `id` is kept; the dataset reassigns it on collision. Defaults
/// apply only to fields that are missing or null, so stored empty strings
/// survive a round trip.
pub fn transform_catalog(row: &RawRow, ids: &mut IdGenerator) -> CanonicalRecord {
    let id = match row.get("id").and_then(|v| v.as_i64()) {
        Some(id) => {
            ids.observe(id);
            id
        }
        None => ids.next_id(),
    };

    let documents = row
        .nested("documents")
        .map(|docs| Documents::new(docs.string_list("required"), docs.string_list("special")))
        .unwrap_or_default();

    let service_name = row.stored_or(K_SERVICE, "");
    let visa_type = row
        .stored_text(K_VISA_TYPE)
        .unwrap_or_else(|| service_name.clone());

    CanonicalRecord {
        id,
        destination_country: row.stored_or(K_DESTINATION, ""),
        passport_origin: row.stored_or(K_PASSPORT, DEFAULT_PASSPORT_ORIGIN),
        service_name,
        visa_type,
        provider: row.stored_or(K_PROVIDER, DEFAULT_PROVIDER),
        fee: row.fee(K_FEE),
        fee_type: row.stored_or(K_FEE_TYPE, DEFAULT_FEE_TYPE),
        processing_time: row.stored_or(K_PROCESSING, NOT_AVAILABLE),
        number_of_entries: row.stored_or(K_ENTRIES, NOT_AVAILABLE),
        visa_validity: row.stored_or(K_VALIDITY, NOT_AVAILABLE),
        documents,
        applicable_countries: row.stored_text(K_APPLICABLE),
    }
}

/// Normalize already-parsed rows of one file
pub fn normalize_rows(
    filename: &str,
    rows: &[RawRow],
    config: &NormalizerConfig,
    ids: &mut IdGenerator,
) -> Result<Vec<CanonicalRecord>> {
    let format = detect_format(filename, config)?;
    Ok(normalize_with(format, rows, config, ids))
}

fn normalize_with(
    format: SourceFormat,
    rows: &[RawRow],
    config: &NormalizerConfig,
    ids: &mut IdGenerator,
) -> Vec<CanonicalRecord> {
    let mut records = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        match format {
            SourceFormat::Primary => match transform_primary(row, ids) {
                Some(record) => records.push(record),
                None => debug!(row = index, "skipping primary row without destination or cost"),
            },
            SourceFormat::Corrected => {
                let expanded = transform_corrected(row, config, ids);
                if expanded.is_empty() {
                    debug!(row = index, "skipping corrected row without countries");
                }
                records.extend(expanded);
            }
            SourceFormat::Catalog => records.push(transform_catalog(row, ids)),
        }
    }

    records
}

/// Detect, parse and normalize one file
///
/// The name is checked before the contents are parsed, so unsupported files
/// are reported without reading their rows. A wrong extension is reported
/// ahead of an unrecognized name.
pub fn normalize_source(
    file: &SourceFile,
    config: &NormalizerConfig,
    ids: &mut IdGenerator,
) -> Result<(SourceFormat, usize, Vec<CanonicalRecord>)> {
    check_extension(&file.name)?;
    let format = detect_format(&file.name, config)?;
    let rows = file.rows()?;
    let records = normalize_with(format, &rows, config, ids);
    debug!(
        file = %file.name,
        %format,
        rows = rows.len(),
        records = records.len(),
        "normalized file"
    );
    Ok((format, rows.len(), records))
}

/// Per-file outcome of a batch import
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub name: String,
    pub format: SourceFormat,
    /// Rows parsed from the file
    pub rows: usize,
    /// Records produced from those rows
    pub records: usize,
}

/// A file of a batch that could not be imported
#[derive(Debug)]
pub struct ImportFailure {
    pub name: String,
    pub error: Error,
}

/// Result of normalizing a batch of files
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Records from every file that succeeded, in file-name order
    pub records: Vec<CanonicalRecord>,
    pub files: Vec<FileSummary>,
    pub failures: Vec<ImportFailure>,
}

impl ImportReport {
    /// Whether the batch produced no records at all
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records produced
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

/// Normalize a batch of files
///
/// Files are processed in name order whatever order they were read in, so
/// the same batch always yields the same records and, with a seeded
/// generator, the same ids. A failing file is reported and skipped; records
/// from the other files are kept.
pub fn normalize_batch(
    files: &[SourceFile],
    config: &NormalizerConfig,
    ids: &mut IdGenerator,
) -> ImportReport {
    let mut ordered: Vec<&SourceFile> = files.iter().collect();
    ordered.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.content.cmp(&b.content)));

    let mut report = ImportReport::default();
    for file in ordered {
        match normalize_source(file, config, ids) {
            Ok((format, rows, records)) => {
                report.files.push(FileSummary {
                    name: file.name.clone(),
                    format,
                    rows,
                    records: records.len(),
                });
                report.records.extend(records);
            }
            Err(error) => {
                warn!(file = %file.name, %error, "file not imported");
                report.failures.push(ImportFailure {
                    name: file.name.clone(),
                    error,
                });
            }
        }
    }

    info!(
        files = report.files.len(),
        failed = report.failures.len(),
        records = report.records.len(),
        "import batch normalized"
    );
    report
}
