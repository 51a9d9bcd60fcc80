//! Full-text filter over records

use crate::record::CanonicalRecord;

/// Records whose searchable text contains `query`, ignoring case
///
/// An empty query keeps everything. Order is preserved.
pub fn filter<'a>(records: &'a [CanonicalRecord], query: &str) -> Vec<&'a CanonicalRecord> {
    if query.is_empty() {
        return records.iter().collect();
    }

    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|r| r.searchable_text().contains(&needle))
        .collect()
}

/// Ids of the records matching `query`, for selecting search results
pub fn matching_ids(records: &[CanonicalRecord], query: &str) -> Vec<i64> {
    filter(records, query).into_iter().map(|r| r.id).collect()
}
