//! Canonical catalog record and its derived views

use serde::{Deserialize, Serialize};
use std::fmt;

/// Passport origin used when a source leaves it blank
pub const DEFAULT_PASSPORT_ORIGIN: &str = "All";
/// Provider used when a source leaves it blank
pub const DEFAULT_PROVIDER: &str = "Partner";
/// Fee type used when a source leaves it blank
pub const DEFAULT_FEE_TYPE: &str = "Standard";
/// Placeholder for unknown display text
pub const NOT_AVAILABLE: &str = "N/A";
/// Destination of aggregate records covering many countries
pub const MULTIPLE_COUNTRIES: &str = "Multiple Countries";

/// One normalized visa/service fee entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    /// Unique within the dataset
    pub id: i64,
    pub destination_country: String,
    pub passport_origin: String,
    /// Visa or service title
    pub service_name: String,
    /// Trip purpose or category
    pub visa_type: String,
    pub provider: String,
    /// Never negative
    pub fee: f64,
    pub fee_type: String,
    pub processing_time: String,
    /// Free display text ("Single", "Multiple", "2", ...)
    pub number_of_entries: String,
    pub visa_validity: String,
    #[serde(default)]
    pub documents: Documents,
    /// Raw country list of an aggregate record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicable_countries: Option<String>,
}

impl CanonicalRecord {
    /// Whether the record carries a positive fee
    pub fn has_fee(&self) -> bool {
        self.fee > 0.0
    }

    /// Whether at least one required document is listed
    pub fn has_docs(&self) -> bool {
        !self.documents.required.is_empty()
    }

    /// Completeness status
    pub fn status(&self) -> Status {
        if self.has_fee() && self.has_docs() {
            Status::Complete
        } else {
            Status::Incomplete
        }
    }

    /// Whether this record stands for a list of countries
    pub fn is_aggregate(&self) -> bool {
        self.applicable_countries.is_some()
    }

    /// Lower-cased concatenation of every display field and document
    pub fn searchable_text(&self) -> String {
        let fields = [
            self.destination_country.as_str(),
            self.service_name.as_str(),
            self.visa_type.as_str(),
            self.provider.as_str(),
            self.passport_origin.as_str(),
            self.processing_time.as_str(),
            self.number_of_entries.as_str(),
            self.visa_validity.as_str(),
        ];

        fields
            .into_iter()
            .chain(self.documents.required.iter().map(String::as_str))
            .chain(self.documents.special.iter().map(String::as_str))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Set the fee, coercing negative or non-finite input to 0
    pub fn set_fee(&mut self, value: f64) {
        self.fee = sanitize_fee(value);
    }

    /// Read-only view carrying both the current and the legacy field names
    pub fn legacy(&self) -> LegacyRecord<'_> {
        LegacyRecord {
            id: self.id,
            country: &self.destination_country,
            destination_country: &self.destination_country,
            passport_origin: &self.passport_origin,
            service: &self.service_name,
            service_name: &self.service_name,
            visa_type: &self.visa_type,
            provider: &self.provider,
            partner_group: &self.provider,
            fee: self.fee,
            cost: self.fee,
            fee_type: &self.fee_type,
            processing_time: &self.processing_time,
            processing_duration: &self.processing_time,
            entries: &self.number_of_entries,
            number_of_entries: &self.number_of_entries,
            validity: &self.visa_validity,
            visa_validity: &self.visa_validity,
            documents: &self.documents,
            applicable_countries: self.applicable_countries.as_deref(),
        }
    }
}

/// Clamp a fee to a finite, non-negative amount
pub fn sanitize_fee(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Required documents and special requirements of a record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Documents {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub special: Vec<String>,
}

impl Documents {
    /// Create from two lists, dropping blank entries
    pub fn new(required: Vec<String>, special: Vec<String>) -> Self {
        Self {
            required: clean(required),
            special: clean(special),
        }
    }

    /// Build from newline-separated text, one document per line
    pub fn from_lines(required: &str, special: &str) -> Self {
        Self {
            required: split_lines(required),
            special: split_lines(special),
        }
    }

    /// Union new entries into both lists, keeping first-seen order
    ///
    /// Duplicates already present are collapsed too, so the result never
    /// repeats an entry.
    pub fn merge(&mut self, required: &[String], special: &[String]) {
        union_into(&mut self.required, required);
        union_into(&mut self.special, special);
    }

    /// Total number of listed documents and requirements
    pub fn count(&self) -> usize {
        self.required.len() + self.special.len()
    }

    /// Whether both lists are empty
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.special.is_empty()
    }
}

fn clean(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split on newlines, trimming and dropping blank lines
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn union_into(existing: &mut Vec<String>, additions: &[String]) {
    let mut merged: Vec<String> = Vec::with_capacity(existing.len() + additions.len());
    let incoming = existing
        .drain(..)
        .chain(additions.iter().map(|s| s.trim().to_string()));
    for item in incoming {
        if !item.is_empty() && !merged.contains(&item) {
            merged.push(item);
        }
    }
    *existing = merged;
}

/// Completeness of a record: positive fee and at least one required document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Complete,
    Incomplete,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Complete => "Complete",
            Status::Incomplete => "Incomplete",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-entered values for a new record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewRecord {
    pub destination_country: String,
    pub passport_origin: String,
    pub service_name: String,
    /// Falls back to `service_name` when blank
    pub visa_type: String,
    pub provider: String,
    pub fee: f64,
    pub fee_type: String,
    pub processing_time: String,
    pub number_of_entries: String,
    pub visa_validity: String,
}

impl NewRecord {
    /// Turn the input into a record with the given id, filling blanks with defaults
    pub fn into_record(self, id: i64) -> CanonicalRecord {
        let service_name = self.service_name.trim().to_string();
        let visa_type = or_default(self.visa_type, &service_name);

        CanonicalRecord {
            id,
            destination_country: self.destination_country.trim().to_string(),
            passport_origin: or_default(self.passport_origin, DEFAULT_PASSPORT_ORIGIN),
            visa_type,
            service_name,
            provider: or_default(self.provider, DEFAULT_PROVIDER),
            fee: sanitize_fee(self.fee),
            fee_type: or_default(self.fee_type, DEFAULT_FEE_TYPE),
            processing_time: or_default(self.processing_time, NOT_AVAILABLE),
            number_of_entries: self.number_of_entries.trim().to_string(),
            visa_validity: or_default(self.visa_validity, NOT_AVAILABLE),
            documents: Documents::default(),
            applicable_countries: None,
        }
    }
}

fn or_default(value: String, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Compatibility projection exposing the old dual field names
///
/// Both names of each pair always carry the same value; nothing here is stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRecord<'a> {
    pub id: i64,
    pub country: &'a str,
    pub destination_country: &'a str,
    pub passport_origin: &'a str,
    pub service: &'a str,
    pub service_name: &'a str,
    pub visa_type: &'a str,
    pub provider: &'a str,
    pub partner_group: &'a str,
    pub fee: f64,
    pub cost: f64,
    pub fee_type: &'a str,
    pub processing_time: &'a str,
    pub processing_duration: &'a str,
    pub entries: &'a str,
    pub number_of_entries: &'a str,
    pub validity: &'a str,
    pub visa_validity: &'a str,
    pub documents: &'a Documents,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicable_countries: Option<&'a str>,
}

#[cfg(test)]
pub(crate) fn sample_record(id: i64) -> CanonicalRecord {
    NewRecord {
        destination_country: "France".to_string(),
        service_name: "Schengen Visa".to_string(),
        visa_type: "Tourism".to_string(),
        provider: "VFS".to_string(),
        processing_time: "15 days".to_string(),
        number_of_entries: "Single".to_string(),
        ..Default::default()
    }
    .into_record(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_requires_fee_and_docs() {
        let mut record = sample_record(1);
        assert_eq!(record.status(), Status::Incomplete);

        record.set_fee(50.0);
        assert_eq!(record.status(), Status::Incomplete);

        record.documents.required.push("Passport".to_string());
        assert_eq!(record.status(), Status::Complete);

        record.set_fee(0.0);
        assert_eq!(record.status(), Status::Incomplete);
    }

    #[test]
    fn test_set_fee_coerces_bad_values() {
        let mut record = sample_record(1);
        record.set_fee(-10.0);
        assert_eq!(record.fee, 0.0);
        record.set_fee(f64::NAN);
        assert_eq!(record.fee, 0.0);
        record.set_fee(35.5);
        assert_eq!(record.fee, 35.5);
    }

    #[test]
    fn test_searchable_text_is_lowercase_and_includes_documents() {
        let mut record = sample_record(1);
        record.documents.special.push("Hotel Booking".to_string());

        let text = record.searchable_text();
        assert!(text.contains("schengen visa"));
        assert!(text.contains("france"));
        assert!(text.contains("hotel booking"));
        assert!(!text.contains("Schengen"));
    }

    #[test]
    fn test_merge_documents_is_idempotent() {
        let mut docs = Documents::new(vec!["Passport".into()], vec![]);
        let add = vec!["Photo".to_string(), "Passport".to_string()];

        docs.merge(&add, &["Insurance".to_string()]);
        docs.merge(&add, &["Insurance".to_string()]);

        assert_eq!(docs.required, vec!["Passport", "Photo"]);
        assert_eq!(docs.special, vec!["Insurance"]);
    }

    #[test]
    fn test_merge_collapses_existing_duplicates() {
        let mut docs = Documents {
            required: vec!["Photo".into(), "Photo".into()],
            special: vec![],
        };
        docs.merge(&[], &[]);
        assert_eq!(docs.required, vec!["Photo"]);
    }

    #[test]
    fn test_documents_from_lines() {
        let docs = Documents::from_lines("Passport\n\n  Photo  \n", "  \nBank statement");
        assert_eq!(docs.required, vec!["Passport", "Photo"]);
        assert_eq!(docs.special, vec!["Bank statement"]);
        assert_eq!(docs.count(), 3);
    }

    #[test]
    fn test_new_record_defaults() {
        let record = NewRecord {
            destination_country: " Japan ".to_string(),
            service_name: "eVisa".to_string(),
            fee: -5.0,
            ..Default::default()
        }
        .into_record(7);

        assert_eq!(record.id, 7);
        assert_eq!(record.destination_country, "Japan");
        assert_eq!(record.passport_origin, "All");
        assert_eq!(record.visa_type, "eVisa");
        assert_eq!(record.provider, "Partner");
        assert_eq!(record.fee, 0.0);
        assert_eq!(record.fee_type, "Standard");
        assert_eq!(record.processing_time, "N/A");
        assert_eq!(record.visa_validity, "N/A");
        assert!(record.documents.is_empty());
    }

    #[test]
    fn test_legacy_projection_duplicates_names() {
        let mut record = sample_record(3);
        record.set_fee(80.0);

        let value = serde_json::to_value(record.legacy()).unwrap();
        assert_eq!(value["country"], value["destinationCountry"]);
        assert_eq!(value["cost"], value["fee"]);
        assert_eq!(value["partnerGroup"], "VFS");
        assert_eq!(value["processingDuration"], "15 days");
        assert_eq!(value["entries"], "Single");
        assert!(value.get("applicableCountries").is_none());
    }

    #[test]
    fn test_record_json_uses_camel_case() {
        let record = sample_record(9);
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("destinationCountry").is_some());
        assert!(value.get("numberOfEntries").is_some());
        assert_eq!(value["documents"]["required"], serde_json::json!([]));
    }
}
