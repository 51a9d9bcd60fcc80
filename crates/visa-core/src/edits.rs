//! Edit scripts: recorded dataset mutations replayed in order
//!
//! A script is a JSON file listing operations the way a user would perform
//! them in the editor (fee edits, document edits, bulk edits, deletes, new
//! rows). Bulk operations select rows by id, by search query, or both.

use crate::error::{Error, Result};
use crate::query::matching_ids;
use crate::record::NewRecord;
use crate::store::Dataset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Rows targeted by a bulk operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Explicit record ids
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<i64>,
    /// Also select every record matching this search query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl Selection {
    /// Select explicit ids
    pub fn ids(ids: impl Into<Vec<i64>>) -> Self {
        Self {
            ids: ids.into(),
            query: None,
        }
    }

    /// Select by search query
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            ids: Vec::new(),
            query: Some(query.into()),
        }
    }

    /// Resolve to record ids against the current dataset
    pub fn resolve(&self, dataset: &Dataset) -> Vec<i64> {
        let mut ids = self.ids.clone();
        if let Some(query) = &self.query {
            for id in matching_ids(dataset.all(), query) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }
}

/// A single edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    SetFee {
        id: i64,
        fee: f64,
    },
    SetDocuments {
        id: i64,
        #[serde(default)]
        required: Vec<String>,
        #[serde(default)]
        special: Vec<String>,
    },
    BulkFee {
        #[serde(flatten)]
        selection: Selection,
        fee: f64,
    },
    MergeDocuments {
        #[serde(flatten)]
        selection: Selection,
        #[serde(default)]
        required: Vec<String>,
        #[serde(default)]
        special: Vec<String>,
    },
    Delete {
        #[serde(flatten)]
        selection: Selection,
    },
    Add {
        record: NewRecord,
    },
}

/// An ordered list of edits
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditScript {
    pub operations: Vec<Operation>,
}

impl EditScript {
    /// Create an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation
    pub fn push(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    /// Load a script from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the script to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Outcome of running a script
#[derive(Debug, Default)]
pub struct ApplyResult {
    /// Operations that ran
    pub applied: usize,
    /// Records touched or removed across all operations
    pub records_affected: usize,
    /// Ids of records created by `add` operations
    pub added_ids: Vec<i64>,
    /// Operations that were skipped, with the reason
    pub failed: Vec<(Operation, Error)>,
}

/// Run every operation in order; a failing operation is recorded and skipped
pub fn apply_script(dataset: &mut Dataset, script: &EditScript) -> ApplyResult {
    let mut result = ApplyResult::default();

    for operation in &script.operations {
        match apply_operation(dataset, operation) {
            Ok(Applied::Records(count)) => {
                result.applied += 1;
                result.records_affected += count;
            }
            Ok(Applied::Added(id)) => {
                result.applied += 1;
                result.records_affected += 1;
                result.added_ids.push(id);
            }
            Err(error) => {
                warn!(?operation, %error, "edit skipped");
                result.failed.push((operation.clone(), error));
            }
        }
    }

    result
}

enum Applied {
    Records(usize),
    Added(i64),
}

fn apply_operation(dataset: &mut Dataset, operation: &Operation) -> Result<Applied> {
    match operation {
        Operation::SetFee { id, fee } => {
            dataset.update_fee(*id, *fee)?;
            Ok(Applied::Records(1))
        }
        Operation::SetDocuments {
            id,
            required,
            special,
        } => {
            dataset.update_documents(*id, required.clone(), special.clone())?;
            Ok(Applied::Records(1))
        }
        Operation::BulkFee { selection, fee } => {
            let ids = selection.resolve(dataset);
            dataset.bulk_update_fee(&ids, *fee).map(Applied::Records)
        }
        Operation::MergeDocuments {
            selection,
            required,
            special,
        } => {
            let ids = selection.resolve(dataset);
            dataset
                .bulk_merge_documents(&ids, required, special)
                .map(Applied::Records)
        }
        Operation::Delete { selection } => {
            let ids = selection.resolve(dataset);
            dataset.delete_records(&ids).map(Applied::Records)
        }
        Operation::Add { record } => Ok(Applied::Added(dataset.add_record(record.clone()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdGenerator;
    use crate::record::sample_record;
    use crate::store::ImportMode;

    fn dataset() -> Dataset {
        let mut dataset = Dataset::with_ids(IdGenerator::seeded(100));
        let mut japan = sample_record(2);
        japan.destination_country = "Japan".to_string();
        japan.service_name = "eVisa".to_string();
        dataset.import_batch(vec![sample_record(1), japan], ImportMode::Append);
        dataset
    }

    #[test]
    fn test_script_parses_from_json() {
        let json = r#"{
            "operations": [
                { "op": "set_fee", "id": 1, "fee": 80 },
                { "op": "bulk_fee", "query": "japan", "fee": 30 },
                { "op": "merge_documents", "ids": [1, 2], "required": ["Passport"] },
                { "op": "delete", "ids": [9] },
                { "op": "add", "record": { "destinationCountry": "Peru", "fee": 12 } }
            ]
        }"#;
        let script: EditScript = serde_json::from_str(json).unwrap();

        assert_eq!(script.operations.len(), 5);
        assert_eq!(script.operations[0], Operation::SetFee { id: 1, fee: 80.0 });
        assert_eq!(
            script.operations[1],
            Operation::BulkFee {
                selection: Selection::query("japan"),
                fee: 30.0
            }
        );
        assert_eq!(
            script.operations[4],
            Operation::Add {
                record: NewRecord {
                    destination_country: "Peru".to_string(),
                    fee: 12.0,
                    ..Default::default()
                }
            }
        );
    }

    #[test]
    fn test_apply_script() {
        let mut dataset = dataset();
        let mut script = EditScript::new();
        script.push(Operation::SetFee { id: 1, fee: 80.0 });
        script.push(Operation::BulkFee {
            selection: Selection::query("JAPAN"),
            fee: 30.0,
        });
        script.push(Operation::MergeDocuments {
            selection: Selection::ids(vec![1, 2]),
            required: vec!["Passport".to_string()],
            special: vec![],
        });
        script.push(Operation::Add {
            record: NewRecord {
                destination_country: "Peru".to_string(),
                ..Default::default()
            },
        });

        let result = apply_script(&mut dataset, &script);

        assert_eq!(result.applied, 4);
        assert!(result.failed.is_empty());
        assert_eq!(result.records_affected, 5);
        assert_eq!(result.added_ids, vec![100]);
        assert_eq!(dataset.get(1).unwrap().fee, 80.0);
        assert_eq!(dataset.get(2).unwrap().fee, 30.0);
        assert_eq!(dataset.get(2).unwrap().documents.required, vec!["Passport"]);
        assert_eq!(dataset.len(), 3);
    }

    #[test]
    fn test_failed_operations_do_not_stop_the_script() {
        let mut dataset = dataset();
        let mut script = EditScript::new();
        script.push(Operation::SetFee { id: 404, fee: 1.0 });
        script.push(Operation::Delete {
            selection: Selection::query("antarctica"),
        });
        script.push(Operation::Delete {
            selection: Selection::ids(vec![1, 404]),
        });

        let result = apply_script(&mut dataset, &script);

        assert_eq!(result.applied, 1);
        assert_eq!(result.failed.len(), 2);
        assert!(matches!(result.failed[0].1, Error::RecordNotFound(404)));
        assert!(matches!(result.failed[1].1, Error::NoRowsSelected));
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn test_script_save_and_load() {
        let path = std::env::temp_dir().join(format!("visa-edits-{}.json", std::process::id()));
        let mut script = EditScript::new();
        script.push(Operation::Delete {
            selection: Selection::ids(vec![3]),
        });
        script.save(&path).unwrap();

        let loaded = EditScript::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.operations, script.operations);
    }
}
