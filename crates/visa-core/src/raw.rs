//! Raw parsed rows, before normalization
//!
//! A row is a mapping from source column name to a loosely typed value. CSV
//! cells are typed on the way in (integer, float, text, null); JSON rows keep
//! whatever structure the file had.

use serde_json::{Map, Number, Value};

/// One parsed row from an import file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    fields: Map<String, Value>,
}

impl RawRow {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field value
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Builder-style insert, mostly for fixtures
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value.into());
        self
    }

    /// Get a raw field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// True when the column exists but holds no value
    pub fn is_null(&self, key: &str) -> bool {
        matches!(self.fields.get(key), Some(Value::Null))
    }

    /// Number of fields in the row
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Display text of a field; `None` for absent, null or blank values
    pub fn text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// First present text among `keys`
    pub fn first_text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.text(key))
    }

    /// First present text among `keys`, or `default`
    pub fn text_or(&self, keys: &[&str], default: &str) -> String {
        self.first_text(keys).unwrap_or_else(|| default.to_string())
    }

    /// Stored text of the first of `keys` that is present and not null
    ///
    /// Unlike [`RawRow::text`], an empty string is a value here and is kept
    /// as written.
    pub fn stored_text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| match self.fields.get(*key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        })
    }

    /// Stored text of the first present key among `keys`, or `default`
    pub fn stored_or(&self, keys: &[&str], default: &str) -> String {
        self.stored_text(keys).unwrap_or_else(|| default.to_string())
    }

    /// Numeric value of a field, read the lenient way (`"12.5 USD"` is 12.5)
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.fields.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_leading_float(s),
            _ => None,
        }
    }

    /// Fee from the first of `keys` holding a non-zero number; 0 otherwise
    pub fn fee(&self, keys: &[&str]) -> f64 {
        let value = keys
            .iter()
            .filter_map(|key| self.number(key))
            .find(|n| n.is_finite() && *n != 0.0)
            .unwrap_or(0.0);
        crate::record::sanitize_fee(value)
    }

    /// Sequence of strings under `key`, if it holds a JSON array
    pub fn string_list(&self, key: &str) -> Vec<String> {
        match self.fields.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Nested object under `key`, viewed as a row
    pub fn nested(&self, key: &str) -> Option<RawRow> {
        match self.fields.get(key)? {
            Value::Object(map) => Some(RawRow::from(map.clone())),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for RawRow {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Type a CSV cell: integers, then floats, otherwise trimmed text; blanks are null
pub fn infer_cell(s: &str) -> Value {
    let trimmed = s.trim();

    if trimmed.is_empty() {
        return Value::Null;
    }

    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(i.into());
    }

    // Only plain decimal spellings count as numbers; "NaN" or "inf" stay text
    if trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }

    Value::String(trimmed.to_string())
}

/// Parse the longest numeric prefix of `s`, ignoring leading whitespace
///
/// `"12.50 USD"` gives 12.5, `"USD 12"` gives `None`.
pub fn parse_leading_float(s: &str) -> Option<f64> {
    let trimmed = s.trim_start();
    let candidate: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        .collect();

    (1..=candidate.len())
        .rev()
        .filter_map(|end| candidate.get(..end))
        .find_map(|prefix| prefix.parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_infer_cell_types() {
        assert_eq!(infer_cell("42"), json!(42));
        assert_eq!(infer_cell("-2.5"), json!(-2.5));
        assert_eq!(infer_cell("  Single "), json!("Single"));
        assert_eq!(infer_cell(""), Value::Null);
        assert_eq!(infer_cell("   "), Value::Null);
        assert_eq!(infer_cell("NaN"), json!("NaN"));
    }

    #[test]
    fn test_parse_leading_float() {
        assert_eq!(parse_leading_float("12.50 USD"), Some(12.5));
        assert_eq!(parse_leading_float("  80"), Some(80.0));
        assert_eq!(parse_leading_float("1e3x"), Some(1000.0));
        assert_eq!(parse_leading_float("USD 12"), None);
        assert_eq!(parse_leading_float(""), None);
        assert_eq!(parse_leading_float("-"), None);
    }

    #[test]
    fn test_text_skips_blank_and_null() {
        let row = RawRow::new()
            .with("Title", "  ")
            .with("Product Type", Value::Null)
            .with("Trip Purpose", "Tourism")
            .with("Entries", 2);

        assert_eq!(row.text("Title"), None);
        assert_eq!(row.text("Missing"), None);
        assert_eq!(row.first_text(&["Title", "Product Type", "Trip Purpose"]), Some("Tourism".to_string()));
        assert_eq!(row.text("Entries"), Some("2".to_string()));
        assert_eq!(row.text_or(&["Title"], "Visa"), "Visa");
    }

    #[test]
    fn test_stored_text_keeps_empty_strings() {
        let row = RawRow::new()
            .with("numberOfEntries", "")
            .with("entries", "Multiple")
            .with("visaValidity", Value::Null)
            .with("validity", "1 year");

        assert_eq!(row.stored_text(&["numberOfEntries", "entries"]), Some(String::new()));
        assert_eq!(row.stored_or(&["visaValidity", "validity"], "N/A"), "1 year");
        assert_eq!(row.stored_or(&["feeType"], "Standard"), "Standard");
    }

    #[test]
    fn test_fee_fallback_chain() {
        let row = RawRow::new().with("Cost", 0).with("Total Fee", "95.5");
        assert_eq!(row.fee(&["Cost", "Total Fee"]), 95.5);

        let row = RawRow::new().with("Cost", "n/a");
        assert_eq!(row.fee(&["Cost", "Total Fee"]), 0.0);

        let row = RawRow::new().with("Cost", -40);
        assert_eq!(row.fee(&["Cost"]), 0.0);
    }

    #[test]
    fn test_is_null_only_for_present_columns() {
        let row = RawRow::new().with("Cost", Value::Null);
        assert!(row.is_null("Cost"));
        assert!(!row.is_null("Total Fee"));
    }

    #[test]
    fn test_string_list_and_nested() {
        let row: RawRow = json!({
            "documents": { "required": ["Passport", " ", "Photo"], "special": [] }
        })
        .as_object()
        .cloned()
        .map(RawRow::from)
        .unwrap();

        let docs = row.nested("documents").unwrap();
        assert_eq!(docs.string_list("required"), vec!["Passport", "Photo"]);
        assert!(docs.string_list("special").is_empty());
        assert!(row.nested("missing").is_none());
    }
}
