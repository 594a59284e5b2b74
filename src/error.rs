use thiserror::Error;

/// Startup failures. The process does not start when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} property not set")]
    Missing(&'static str),

    #[error("property columns.to.insert not set but table.prefix references record fields")]
    ColumnsRequiredByTemplate,

    #[error("property table.time.column not set but the template or table.formatter needs it")]
    TimeColumnRequired,

    #[error("property table.formatter not set but table.time.column is configured")]
    FormatterRequired,

    #[error("table.time.column '{0}' is neither a field index nor a configured column")]
    UnknownTimeColumn(String),

    #[error("column '{0}' appears more than once in columns.to.insert")]
    DuplicateColumn(String),

    #[error("key column '{0}' is not listed in columns.to.insert")]
    KeyColumnNotInsertable(String),

    #[error("'{0}' is not a valid column identifier")]
    InvalidIdentifier(String),

    #[error("delimiter.entry must be a single ASCII character, got '{0}'")]
    InvalidDelimiter(String),

    #[error("unknown charset '{0}'")]
    UnknownCharset(String),

    #[error("unsupported connection url scheme in '{0}'")]
    UnsupportedUrl(String),

    #[error("batch.size must be greater than zero")]
    ZeroBatchSize,

    #[error("batch.size {batch_size} x {columns} columns exceeds the {limit} parameter limit of the database")]
    TooManyParameters {
        batch_size: usize,
        columns: usize,
        limit: usize,
    },

    #[error("invalid date pattern '{pattern}': {reason}")]
    InvalidDatePattern { pattern: String, reason: String },

    #[error("failed to read configuration: {0}")]
    Io(String),

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// Per-record routing failures; the record is dropped, the batch continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("time column {column} is out of range for a record with {fields} field(s)")]
    TimeColumnOutOfRange { column: usize, fields: usize },

    #[error("value '{value}' does not match date pattern '{pattern}'")]
    UnparsableTime { value: String, pattern: String },

    #[error("table name '{0}' is not a safe identifier")]
    UnsafeTableName(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload is not valid {charset}")]
    Charset { charset: String },

    #[error("malformed delimited line: {0}")]
    Malformed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("channel {operation} failed: {message}")]
pub struct ChannelError {
    pub operation: &'static str,
    pub message: String,
}

impl ChannelError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Closed classification of a database failure, produced once at the
/// database boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    TableNotFound,
    KeyViolation,
    Transport,
    Other,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::TableNotFound => "table_not_found",
            FailureKind::KeyViolation => "key_violation",
            FailureKind::Transport => "transport",
            FailureKind::Other => "other",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} error: {message}", kind.as_str())]
pub struct DbFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl DbFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Other, message)
    }
}

/// Why a table group was rolled back and abandoned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    #[error("table '{table}' is missing and could not be created: {reason}")]
    Schema { table: String, reason: String },

    #[error("duplicate keys in '{table}' could not be resolved: {reason}")]
    Conflict { table: String, reason: String },

    #[error("database connection lost: {0}")]
    Transport(String),

    #[error("statement failed: {0}")]
    Fatal(String),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("database session unavailable: {0}")]
    Session(#[from] DbFailure),
}

pub type Result<T> = std::result::Result<T, SinkError>;
