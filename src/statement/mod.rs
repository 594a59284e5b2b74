//! Statement Builder: parameterized multi-row INSERT, per-record UPDATE for
//! duplicate keys, and the template-driven CREATE / post statements.

use crate::config::ColumnBinding;
use crate::db::sql_utils::{placeholder, substitute_table_token};
use crate::db_types::{DatabaseType, Record, Statement};

/// Source of one positional parameter: field `field` of row `row`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSource {
    pub row: usize,
    pub field: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertPlan {
    pub sql: String,
    /// One entry per placeholder, in placeholder order.
    pub params: Vec<ParamSource>,
}

impl InsertPlan {
    /// Binds the planned fields of `records`; absent fields bind as `""`.
    pub fn bind(&self, records: &[Record]) -> Statement {
        let params = self
            .params
            .iter()
            .map(|source| {
                records
                    .get(source.row)
                    .map(|record| record.field(source.field).to_string())
                    .unwrap_or_default()
            })
            .collect();
        Statement::new(self.sql.clone(), params)
    }
}

pub fn build_insert(
    db_type: &DatabaseType,
    table: &str,
    records: &[Record],
    binding: &ColumnBinding,
) -> InsertPlan {
    let columns = binding.columns();
    let column_list = columns
        .iter()
        .map(|column| column.name.as_str())
        .collect::<Vec<&str>>()
        .join(", ");

    let mut params = Vec::with_capacity(records.len() * columns.len());
    let mut rows = Vec::with_capacity(records.len());
    for row in 0..records.len() {
        let values = columns
            .iter()
            .map(|column| {
                params.push(ParamSource {
                    row,
                    field: column.field_index,
                });
                placeholder(db_type, params.len())
            })
            .collect::<Vec<String>>()
            .join(", ");
        rows.push(format!("({})", values));
    }

    InsertPlan {
        sql: format!(
            "INSERT INTO {} ({}) VALUES {}",
            table,
            column_list,
            rows.join(", ")
        ),
        params,
    }
}

/// `UPDATE table SET value = ? .. WHERE key = ? AND ..` for one record.
///
/// Empty field values are left out of both clauses. Returns `None` when the
/// record has no non-empty value column or no non-empty key column, since
/// such a statement would either do nothing or touch every row.
pub fn build_update(
    db_type: &DatabaseType,
    table: &str,
    record: &Record,
    binding: &ColumnBinding,
) -> Option<Statement> {
    let mut params = Vec::new();

    let mut assignments = Vec::new();
    for column in binding.value_columns() {
        let value = record.field(column.field_index);
        if value.is_empty() {
            continue;
        }
        params.push(value.to_string());
        assignments.push(format!("{} = {}", column.name, placeholder(db_type, params.len())));
    }

    let mut conditions = Vec::new();
    for column in binding.key_columns() {
        let value = record.field(column.field_index);
        if value.is_empty() {
            continue;
        }
        params.push(value.to_string());
        conditions.push(format!("{} = {}", column.name, placeholder(db_type, params.len())));
    }

    if assignments.is_empty() || conditions.is_empty() {
        return None;
    }

    Some(Statement::new(
        format!(
            "UPDATE {} SET {} WHERE {}",
            table,
            assignments.join(", "),
            conditions.join(" AND ")
        ),
        params,
    ))
}

pub fn build_updates(
    db_type: &DatabaseType,
    table: &str,
    records: &[Record],
    binding: &ColumnBinding,
) -> Vec<Option<Statement>> {
    records
        .iter()
        .map(|record| build_update(db_type, table, record, binding))
        .collect()
}

pub fn build_create(table: &str, template: Option<&str>) -> Option<String> {
    substitute_table_token(template, table)
}

pub fn build_post_query(table: &str, template: Option<&str>) -> Option<String> {
    substitute_table_token(template, table)
}
