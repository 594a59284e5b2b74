// =====================================================
// COMMON DATABASE TYPES AND STRUCTURES
// =====================================================

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

// --- Database Type Enum ---
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    #[default]
    MySQL,
    PostgreSQL,
    SQLite,
}

impl DatabaseType {
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme.trim().to_ascii_lowercase())
            .unwrap_or_default();
        match scheme.as_str() {
            "mysql" | "mariadb" => Ok(DatabaseType::MySQL),
            "postgres" | "postgresql" => Ok(DatabaseType::PostgreSQL),
            "sqlite" => Ok(DatabaseType::SQLite),
            _ => Err(ConfigError::UnsupportedUrl(crate::security::redact_sensitive_text(url))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::MySQL => "mysql",
            DatabaseType::PostgreSQL => "postgresql",
            DatabaseType::SQLite => "sqlite",
        }
    }

    /// Highest number of bind parameters one statement may carry.
    pub fn max_parameters(&self) -> usize {
        match self {
            DatabaseType::MySQL => 65_535,
            DatabaseType::PostgreSQL => 65_535,
            DatabaseType::SQLite => 32_766,
        }
    }
}

// --- Connection Configuration ---
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    #[serde(rename = "dbType")]
    pub db_type: DatabaseType,
}

// --- Record ---
/// One decoded input line. Field counts may differ between records.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 0-based field access; absent fields read as the empty string.
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// A line holding a single empty field marks the end of a burst.
    pub fn is_end_of_burst(&self) -> bool {
        self.fields.is_empty() || (self.fields.len() == 1 && self.fields[0].is_empty())
    }
}

impl From<Vec<&str>> for Record {
    fn from(fields: Vec<&str>) -> Self {
        Self::new(fields.into_iter().map(str::to_string).collect())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields.join(","))
    }
}

// --- Statement ---
/// SQL text plus its positional parameters, ready to execute.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<String>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }
}
