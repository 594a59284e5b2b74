//! Sink configuration: the recognized options, how they are read from a JSON
//! file, and the startup validation that turns them into [`SinkSettings`].

use crate::db::sql_utils::is_safe_column_name;
use crate::db_types::{ConnectionConfig, DatabaseType};
use crate::error::ConfigError;
use crate::template::{DatePattern, TableTemplate, TimeSource};
use encoding_rs::Encoding;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_DELIMITER_ENTRY: &str = ",";
const DEFAULT_CHARSET_RESULTSET: &str = "UTF-8";

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_delimiter_entry() -> String {
    DEFAULT_DELIMITER_ENTRY.to_string()
}

fn default_charset_resultset() -> String {
    DEFAULT_CHARSET_RESULTSET.to_string()
}

/// `table.time.column` accepts a 1-based field index (as a number or a
/// numeric string) or the name of one of `columns.to.insert`.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum TimeColumnSpec {
    Index(usize),
    Name(String),
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    #[serde(rename = "table.prefix")]
    pub table_prefix: Option<String>,
    #[serde(rename = "columns.to.insert")]
    pub columns_to_insert: Option<String>,
    #[serde(rename = "key.columns")]
    pub key_columns: Option<String>,
    #[serde(rename = "table.time.column")]
    pub table_time_column: Option<TimeColumnSpec>,
    #[serde(rename = "table.formatter")]
    pub table_formatter: Option<String>,
    #[serde(rename = "table.create")]
    pub table_create: Option<String>,
    #[serde(rename = "post.query")]
    pub post_query: Option<String>,
    #[serde(rename = "batch.size", default = "default_batch_size")]
    pub batch_size: usize,
    /// Milliseconds; 0 disables adaptive waiting.
    #[serde(rename = "max.duration", default)]
    pub max_duration: u64,
    #[serde(rename = "delimiter.entry", default = "default_delimiter_entry")]
    pub delimiter_entry: String,
    #[serde(
        rename = "default.charset.resultset",
        default = "default_charset_resultset"
    )]
    pub default_charset_resultset: String,
    #[serde(rename = "connection.url", alias = "hibernate.connection.url")]
    pub connection_url: Option<String>,
    #[serde(rename = "connection.user", alias = "hibernate.connection.user")]
    pub connection_user: Option<String>,
    #[serde(rename = "connection.password", alias = "hibernate.connection.password")]
    pub connection_password: Option<String>,
}

/// Validated, ready-to-use configuration.
#[derive(Debug, Clone)]
pub struct SinkSettings {
    pub connection: ConnectionConfig,
    pub template: TableTemplate,
    pub binding: ColumnBinding,
    pub create_template: Option<String>,
    pub post_query: Option<String>,
    pub batch_size: usize,
    pub max_duration: Duration,
    pub delimiter: u8,
    pub charset: &'static Encoding,
}

impl SinkConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<SinkSettings, ConfigError> {
        let url = non_blank(&self.connection_url).ok_or(ConfigError::Missing("connection.url"))?;
        let prefix = non_blank(&self.table_prefix).ok_or(ConfigError::Missing("table.prefix"))?;

        let template = TableTemplate::parse(prefix);
        let columns = non_blank(&self.columns_to_insert);
        if template.references_fields() && columns.is_none() {
            return Err(ConfigError::ColumnsRequiredByTemplate);
        }

        let binding = match columns {
            Some(columns) => {
                ColumnBinding::parse(columns, self.key_columns.as_deref().unwrap_or(""))?
            }
            None => ColumnBinding::default(),
        };

        let time_column = self
            .table_time_column
            .as_ref()
            .map(|spec| resolve_time_column(spec, &binding))
            .transpose()?;
        let formatter = non_blank(&self.table_formatter);

        let time_source = match (time_column, formatter) {
            (Some(column), Some(pattern)) => Some(TimeSource {
                column,
                pattern: DatePattern::compile(pattern)?,
            }),
            (None, Some(_)) => return Err(ConfigError::TimeColumnRequired),
            (Some(_), None) => return Err(ConfigError::FormatterRequired),
            (None, None) => None,
        };
        if template.uses_time() && time_source.is_none() {
            return Err(ConfigError::TimeColumnRequired);
        }

        let username = self
            .connection_user
            .clone()
            .ok_or(ConfigError::Missing("connection.user"))?;
        let password = self
            .connection_password
            .clone()
            .ok_or(ConfigError::Missing("connection.password"))?;
        let db_type = DatabaseType::from_url(url)?;

        if binding.is_empty() {
            return Err(ConfigError::Missing("columns.to.insert"));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        let limit = db_type.max_parameters();
        if self.batch_size.saturating_mul(binding.len()) > limit {
            return Err(ConfigError::TooManyParameters {
                batch_size: self.batch_size,
                columns: binding.len(),
                limit,
            });
        }

        let delimiter = parse_delimiter(&self.delimiter_entry)?;
        let charset = Encoding::for_label(self.default_charset_resultset.trim().as_bytes())
            .ok_or_else(|| ConfigError::UnknownCharset(self.default_charset_resultset.clone()))?;

        Ok(SinkSettings {
            connection: ConnectionConfig {
                url: url.to_string(),
                username,
                password,
                db_type,
            },
            template: template.with_time_source(time_source),
            binding,
            create_template: non_blank(&self.table_create).map(str::to_string),
            post_query: non_blank(&self.post_query).map(str::to_string),
            batch_size: self.batch_size,
            max_duration: Duration::from_millis(self.max_duration),
            delimiter,
            charset,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn resolve_time_column(spec: &TimeColumnSpec, binding: &ColumnBinding) -> Result<usize, ConfigError> {
    match spec {
        TimeColumnSpec::Index(0) => Err(ConfigError::UnknownTimeColumn("0".to_string())),
        TimeColumnSpec::Index(index) => Ok(*index),
        TimeColumnSpec::Name(name) => {
            let name = name.trim();
            match name.parse::<usize>() {
                Ok(index) if index > 0 => Ok(index),
                _ => binding
                    .field_position(name)
                    .ok_or_else(|| ConfigError::UnknownTimeColumn(name.to_string())),
            }
        }
    }
}

fn parse_delimiter(raw: &str) -> Result<u8, ConfigError> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) if ch.is_ascii() => Ok(ch as u8),
        _ => Err(ConfigError::InvalidDelimiter(raw.to_string())),
    }
}

// --- Column Binding ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundColumn {
    pub name: String,
    /// 0-based index of the record field feeding this column.
    pub field_index: usize,
    pub key: bool,
}

/// Record-field to column mapping, stored in insert order: key columns first
/// (in `key.columns` order), then the remaining columns in
/// `columns.to.insert` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnBinding {
    columns: Vec<BoundColumn>,
}

impl ColumnBinding {
    /// Field *i* of a record feeds the *i*-th name of `columns_to_insert`;
    /// blank names leave that field out.
    pub fn parse(columns_to_insert: &str, key_columns: &str) -> Result<Self, ConfigError> {
        let mut declared: Vec<BoundColumn> = Vec::new();
        for (field_index, raw) in columns_to_insert.split(',').enumerate() {
            let name = raw.trim();
            if name.is_empty() {
                continue;
            }
            if !is_safe_column_name(name) {
                return Err(ConfigError::InvalidIdentifier(name.to_string()));
            }
            if declared
                .iter()
                .any(|column| column.name.eq_ignore_ascii_case(name))
            {
                return Err(ConfigError::DuplicateColumn(name.to_string()));
            }
            declared.push(BoundColumn {
                name: name.to_string(),
                field_index,
                key: false,
            });
        }

        let mut columns = Vec::with_capacity(declared.len());
        for raw in key_columns.split(',') {
            let name = raw.trim();
            if name.is_empty() {
                continue;
            }
            let position = declared
                .iter()
                .position(|column| column.name.eq_ignore_ascii_case(name));
            match position {
                Some(position) if !declared[position].key => {
                    declared[position].key = true;
                    columns.push(declared[position].clone());
                }
                Some(_) => {}
                None => return Err(ConfigError::KeyColumnNotInsertable(name.to_string())),
            }
        }
        columns.extend(declared.into_iter().filter(|column| !column.key));

        Ok(Self { columns })
    }

    /// Columns in insert order.
    pub fn columns(&self) -> &[BoundColumn] {
        &self.columns
    }

    pub fn key_columns(&self) -> impl Iterator<Item = &BoundColumn> {
        self.columns.iter().filter(|column| column.key)
    }

    pub fn value_columns(&self) -> impl Iterator<Item = &BoundColumn> {
        self.columns.iter().filter(|column| !column.key)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// 1-based position in `columns.to.insert` of the named column.
    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
            .map(|column| column.field_index + 1)
    }
}

#[cfg(test)]
mod tests;
