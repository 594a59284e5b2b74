//! Record Classifier & Grouper: routes each record of a batch to the table
//! named by the template and collects one group per distinct table.

use crate::db_types::Record;
use crate::error::EvaluationError;
use crate::template::TableTemplate;
use log::warn;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableGroup {
    pub table: String,
    /// Arrival order.
    pub records: Vec<Record>,
}

#[derive(Debug, Default)]
pub struct GroupedBatch {
    /// First-seen table order.
    pub groups: Vec<TableGroup>,
    pub dropped: Vec<(Record, EvaluationError)>,
}

impl GroupedBatch {
    pub fn record_count(&self) -> usize {
        self.groups.iter().map(|group| group.records.len()).sum()
    }
}

pub fn group_records(records: Vec<Record>, template: &TableTemplate) -> GroupedBatch {
    let mut batch = GroupedBatch::default();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let table = match template.table_name(&record) {
            Ok(table) => table,
            Err(e) => {
                warn!("Dropping record [{}]: {}", record, e);
                batch.dropped.push((record, e));
                continue;
            }
        };

        match index.get(&table) {
            Some(&position) => batch.groups[position].records.push(record),
            None => {
                index.insert(table.clone(), batch.groups.len());
                batch.groups.push(TableGroup {
                    table,
                    records: vec![record],
                });
            }
        }
    }

    batch
}
