//! The in-memory dataset and its mutations

use crate::config::NormalizerConfig;
use crate::error::{Error, Result};
use crate::ids::IdGenerator;
use crate::normalizer::{normalize_batch, ImportReport};
use crate::parser::SourceFile;
use crate::record::{CanonicalRecord, Documents, NewRecord, Status};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// How an import batch combines with what is already loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Discard the current records
    Replace,
    /// Keep the current records and add the batch after them
    Append,
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(ImportMode::Replace),
            "append" | "merge" => Ok(ImportMode::Append),
            _ => Err(format!("unknown import mode '{}', expected replace or append", s)),
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::Replace => f.write_str("replace"),
            ImportMode::Append => f.write_str("append"),
        }
    }
}

/// Summary counters over the whole dataset
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DatasetStats {
    pub total: usize,
    pub complete: usize,
    pub total_cost: f64,
    pub total_documents: usize,
}

/// Owner of the canonical records of a session
///
/// Record ids stay unique through every operation. Insertion order is kept.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<CanonicalRecord>,
    ids: IdGenerator,
}

impl Dataset {
    /// Create an empty dataset with clock-seeded ids
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty dataset drawing ids from `ids`
    pub fn with_ids(ids: IdGenerator) -> Self {
        Self {
            records: Vec::new(),
            ids,
        }
    }

    /// All records, in insertion order
    pub fn all(&self) -> &[CanonicalRecord] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find a record by id
    pub fn get(&self, id: i64) -> Option<&CanonicalRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    fn get_mut(&mut self, id: i64) -> Result<&mut CanonicalRecord> {
        self.records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(Error::RecordNotFound(id))
    }

    /// Normalize a batch of files with this dataset's id generator
    ///
    /// Nothing is stored yet; pass the records to [`Dataset::import_batch`]
    /// once the caller has picked a mode.
    pub fn normalize(&mut self, files: &[SourceFile], config: &NormalizerConfig) -> ImportReport {
        normalize_batch(files, config, &mut self.ids)
    }

    /// Store a batch of records, replacing or appending
    ///
    /// Incoming ids that clash with a kept record or an earlier record of the
    /// batch are replaced with fresh ones. Returns the number of records added.
    pub fn import_batch(&mut self, records: Vec<CanonicalRecord>, mode: ImportMode) -> usize {
        if mode == ImportMode::Replace {
            self.records.clear();
        }

        let mut used: HashSet<i64> = self.records.iter().map(|r| r.id).collect();
        let added = records.len();
        self.records.reserve(added);

        for mut record in records {
            while used.contains(&record.id) {
                let fresh = self.ids.next_id();
                debug!(old = record.id, new = fresh, "reassigning clashing record id");
                record.id = fresh;
            }
            self.ids.observe(record.id);
            used.insert(record.id);
            self.records.push(record);
        }

        info!(%mode, added, total = self.records.len(), "import batch stored");
        added
    }

    /// Add a record built from user input; returns its id
    pub fn add_record(&mut self, fields: NewRecord) -> i64 {
        let id = self.ids.next_id();
        self.records.push(fields.into_record(id));
        id
    }

    /// Set the fee of one record
    pub fn update_fee(&mut self, id: i64, value: f64) -> Result<()> {
        self.get_mut(id)?.set_fee(value);
        Ok(())
    }

    /// Replace the documents of one record
    pub fn update_documents(
        &mut self,
        id: i64,
        required: Vec<String>,
        special: Vec<String>,
    ) -> Result<()> {
        self.get_mut(id)?.documents = Documents::new(required, special);
        Ok(())
    }

    /// Set the fee of every selected record; returns how many matched
    pub fn bulk_update_fee(&mut self, ids: &[i64], value: f64) -> Result<usize> {
        let selected = selection(ids)?;
        let mut updated = 0;
        for record in self.records.iter_mut().filter(|r| selected.contains(&r.id)) {
            record.set_fee(value);
            updated += 1;
        }
        info!(selected = selected.len(), updated, "bulk fee update");
        Ok(updated)
    }

    /// Union documents into every selected record; returns how many matched
    pub fn bulk_merge_documents(
        &mut self,
        ids: &[i64],
        new_required: &[String],
        new_special: &[String],
    ) -> Result<usize> {
        let selected = selection(ids)?;
        let mut updated = 0;
        for record in self.records.iter_mut().filter(|r| selected.contains(&r.id)) {
            record.documents.merge(new_required, new_special);
            updated += 1;
        }
        info!(selected = selected.len(), updated, "bulk document merge");
        Ok(updated)
    }

    /// Remove one record; missing ids are ignored
    pub fn delete_record(&mut self, id: i64) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        before != self.records.len()
    }

    /// Remove every selected record; returns how many were removed
    pub fn delete_records(&mut self, ids: &[i64]) -> Result<usize> {
        let selected = selection(ids)?;
        let before = self.records.len();
        self.records.retain(|r| !selected.contains(&r.id));
        let removed = before - self.records.len();
        info!(selected = selected.len(), removed, "bulk delete");
        Ok(removed)
    }

    /// Counters shown above the table
    pub fn stats(&self) -> DatasetStats {
        self.records.iter().fold(DatasetStats::default(), |mut stats, r| {
            stats.total += 1;
            if r.status() == Status::Complete {
                stats.complete += 1;
            }
            stats.total_cost += r.fee;
            stats.total_documents += r.documents.count();
            stats
        })
    }
}

fn selection(ids: &[i64]) -> Result<HashSet<i64>> {
    if ids.is_empty() {
        return Err(Error::NoRowsSelected);
    }
    Ok(ids.iter().copied().collect())
}
