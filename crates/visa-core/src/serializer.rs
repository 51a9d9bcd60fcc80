//! Export of records to CSV and JSON text

use crate::error::{Error, Result};
use crate::record::{CanonicalRecord, LegacyRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

/// Column headers of the CSV export, in order
pub const CSV_HEADERS: [&str; 12] = [
    "ID",
    "Destination Country",
    "Passport Origin",
    "Visa Type/Service",
    "Service Provider",
    "Fee",
    "Processing Time",
    "Number of Entries",
    "Visa Validity",
    "Documents Required",
    "Special Requirements",
    "Status",
];

/// Separator between documents inside one CSV cell
pub const DOCUMENT_SEPARATOR: &str = "; ";

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    Csv,
    Json,
    /// JSON carrying both current and legacy field names
    LegacyJson,
}

impl ExportFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json | ExportFormat::LegacyJson => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "legacy-json" | "legacy" => Ok(ExportFormat::LegacyJson),
            _ => Err(format!(
                "unknown format '{}', supported formats: csv, json, legacy-json",
                s
            )),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => f.write_str("csv"),
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::LegacyJson => f.write_str("legacy-json"),
        }
    }
}

/// Default download name, e.g. `visa-catalog-2024-05-01.csv`
///
/// JSON exports under this name are picked up again as catalog imports.
pub fn export_file_name(format: ExportFormat, date: NaiveDate) -> String {
    format!("visa-catalog-{}.{}", date.format("%Y-%m-%d"), format.extension())
}

/// The twelve export cells of one record
pub fn csv_row(record: &CanonicalRecord) -> [String; 12] {
    [
        record.id.to_string(),
        record.destination_country.clone(),
        record.passport_origin.clone(),
        record.service_name.clone(),
        record.provider.clone(),
        record.fee.to_string(),
        record.processing_time.clone(),
        record.number_of_entries.clone(),
        record.visa_validity.clone(),
        record.documents.required.join(DOCUMENT_SEPARATOR),
        record.documents.special.join(DOCUMENT_SEPARATOR),
        record.status().to_string(),
    ]
}

/// Write records as CSV with every field quoted
pub fn write_csv<'a, W, I>(writer: W, records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    let csv_err = |e: csv::Error| Error::Csv {
        name: "export".to_string(),
        source: e,
    };

    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    wtr.write_record(CSV_HEADERS).map_err(csv_err)?;
    for record in records {
        wtr.write_record(csv_row(record)).map_err(csv_err)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Records as CSV text
pub fn to_csv<'a, I>(records: I) -> Result<String>
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    let mut buf = Vec::new();
    write_csv(&mut buf, records)?;
    String::from_utf8(buf).map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Records as pretty-printed JSON, readable again as a catalog import
pub fn to_json<'a, I>(records: I) -> Result<String>
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    let records: Vec<&CanonicalRecord> = records.into_iter().collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Records as pretty-printed JSON with the legacy dual field names
pub fn to_legacy_json<'a, I>(records: I) -> Result<String>
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    let records: Vec<LegacyRecord<'a>> = records.into_iter().map(|r| r.legacy()).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Render records in the given format
pub fn export<'a, I>(records: I, format: ExportFormat) -> Result<String>
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    match format {
        ExportFormat::Csv => to_csv(records),
        ExportFormat::Json => to_json(records),
        ExportFormat::LegacyJson => to_legacy_json(records),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizerConfig;
    use crate::ids::IdGenerator;
    use crate::normalizer::{normalize_batch, normalize_rows};
    use crate::parser::{parse_json_str, SourceFile};
    use crate::record::{sample_record, NewRecord};

    #[test]
    fn test_csv_header_and_quoting() {
        let csv = to_csv(&[sample_record(1)]).unwrap();
        let mut lines = csv.lines();

        assert_eq!(
            lines.next().unwrap(),
            "\"ID\",\"Destination Country\",\"Passport Origin\",\"Visa Type/Service\",\
             \"Service Provider\",\"Fee\",\"Processing Time\",\"Number of Entries\",\
             \"Visa Validity\",\"Documents Required\",\"Special Requirements\",\"Status\""
        );
        assert_eq!(
            lines.next().unwrap(),
            "\"1\",\"France\",\"All\",\"Schengen Visa\",\"VFS\",\"0\",\"15 days\",\
             \"Single\",\"N/A\",\"\",\"\",\"Incomplete\""
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_status_column() {
        let incomplete = sample_record(1);

        let mut complete = sample_record(2);
        complete.set_fee(50.0);
        complete.documents.required.push("Passport".to_string());

        assert_eq!(csv_row(&incomplete)[11], "Incomplete");
        assert_eq!(csv_row(&complete)[11], "Complete");
        assert_eq!(csv_row(&complete)[5], "50");
    }

    #[test]
    fn test_csv_joins_documents() {
        let mut record = sample_record(1);
        record.documents.required = vec!["Passport".into(), "Photo".into()];
        record.documents.special = vec!["Say \"hi\"".into()];

        let row = csv_row(&record);
        assert_eq!(row[9], "Passport; Photo");

        let csv = to_csv(&[record]).unwrap();
        assert!(csv.contains("\"Say \"\"hi\"\"\""));
    }

    #[test]
    fn test_json_round_trip_through_catalog_import() {
        let mut record = sample_record(17);
        record.set_fee(12.25);
        record.documents.required.push("Passport".to_string());
        record.applicable_countries = Some("A, B".to_string());

        let json = to_json(&[record.clone()]).unwrap();
        let rows = parse_json_str(&json, "visa-catalog-2024-01-01.json").unwrap();
        let back = normalize_rows(
            "visa-catalog-2024-01-01.json",
            &rows,
            &NormalizerConfig::default(),
            &mut IdGenerator::seeded(1),
        )
        .unwrap();

        assert_eq!(back, vec![record]);
    }

    #[test]
    fn test_json_round_trip_keeps_blank_fields() {
        let record = NewRecord::default().into_record(5);
        assert_eq!(record.number_of_entries, "");

        let json = to_json(&[record.clone()]).unwrap();
        let report = normalize_batch(
            &[SourceFile::new("visa-catalog-2024-01-01.json", json)],
            &NormalizerConfig::default(),
            &mut IdGenerator::seeded(1),
        );

        assert!(report.failures.is_empty());
        assert_eq!(report.records, vec![record]);
    }

    #[test]
    fn test_csv_export_is_not_read_back() {
        let csv = to_csv(&[sample_record(1)]).unwrap();
        let name = export_file_name(ExportFormat::Csv, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let report = normalize_batch(
            &[SourceFile::new(name, csv)],
            &NormalizerConfig::default(),
            &mut IdGenerator::seeded(1),
        );

        assert!(report.records.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, Error::UnsupportedFile(_)));
    }

    #[test]
    fn test_legacy_json_has_both_names() {
        let json = to_legacy_json(&[sample_record(1)]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["country"], "France");
        assert_eq!(value[0]["destinationCountry"], "France");
        assert_eq!(value[0]["service"], "Schengen Visa");
    }

    #[test]
    fn test_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(export_file_name(ExportFormat::Csv, date), "visa-catalog-2024-03-09.csv");
        assert_eq!(
            export_file_name(ExportFormat::LegacyJson, date),
            "visa-catalog-2024-03-09.json"
        );
    }

    #[test]
    fn test_export_format_from_str() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("legacy-json".parse::<ExportFormat>().unwrap(), ExportFormat::LegacyJson);
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }
}
