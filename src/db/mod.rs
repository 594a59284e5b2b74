// =====================================================
// DATABASE BOUNDARY
// Session abstraction, sqlx-backed session and failure classification
// =====================================================

pub mod session;
pub mod sql_utils;

pub use session::{Session, SqlxSession};

use crate::error::FailureKind;
use sqlx::error::ErrorKind;

/// SQLSTATE codes reported when the target table is missing.
const TABLE_NOT_FOUND_STATES: &[&str] = &["42P01", "42S02"];
/// PostgreSQL admin shutdown, crash shutdown and cannot-connect-now.
const TRANSPORT_STATES: &[&str] = &["57P01", "57P02", "57P03"];
/// MySQL client errors for "server has gone away" and "lost connection".
const MYSQL_TRANSPORT_ERRORS: &[u16] = &[2006, 2013];

pub fn classify_error(error: &sqlx::Error) -> FailureKind {
    match error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => FailureKind::Transport,
        sqlx::Error::Database(db_error) => {
            let number = db_error
                .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                .map(|mysql| mysql.number());
            classify_database_error(
                db_error.code().as_deref(),
                number,
                db_error.message(),
                matches!(db_error.kind(), ErrorKind::UniqueViolation),
            )
        }
        _ => FailureKind::Other,
    }
}

/// Classifies a server-reported error from its SQLSTATE, the MySQL error
/// number (if any), the message text and the driver's unique-violation flag.
pub fn classify_database_error(
    code: Option<&str>,
    number: Option<u16>,
    message: &str,
    unique_violation: bool,
) -> FailureKind {
    let code = code.unwrap_or_default();

    if code.starts_with("08")
        || TRANSPORT_STATES.contains(&code)
        || number.is_some_and(|n| MYSQL_TRANSPORT_ERRORS.contains(&n))
    {
        return FailureKind::Transport;
    }

    if TABLE_NOT_FOUND_STATES.contains(&code) || message.contains("no such table") {
        return FailureKind::TableNotFound;
    }

    if unique_violation
        || code == "23505"
        || (code == "23000" && message.contains("Duplicate entry"))
    {
        return FailureKind::KeyViolation;
    }

    FailureKind::Other
}
