// =====================================================
// DATABASE SESSION
// One long-lived connection, explicit local transactions
// =====================================================

use super::classify_error;
use crate::db_types::{ConnectionConfig, DatabaseType, Statement};
use crate::error::DbFailure;
use crate::security::{redact_known_secret, redact_sensitive_text};
use async_trait::async_trait;
use log::{debug, info, warn};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use std::str::FromStr;

/// A single database connection driven through explicit transactions.
///
/// Every failure is classified into a [`crate::error::FailureKind`] before it
/// leaves the session, so callers never inspect driver errors.
#[async_trait]
pub trait Session: Send {
    fn database_type(&self) -> DatabaseType;

    /// Reconnects when the connection is gone or no longer answers a ping.
    async fn ensure_open(&mut self) -> Result<(), DbFailure>;

    async fn begin(&mut self) -> Result<(), DbFailure>;

    /// Executes one statement and returns the number of affected rows.
    async fn execute(&mut self, statement: &Statement) -> Result<u64, DbFailure>;

    async fn commit(&mut self) -> Result<(), DbFailure>;

    async fn rollback(&mut self) -> Result<(), DbFailure>;

    /// Drops the current connection and opens a fresh one.
    async fn reset(&mut self) -> Result<(), DbFailure>;

    async fn close(&mut self);
}

enum Backend {
    Postgres(PgConnection),
    MySql(MySqlConnection),
    Sqlite(SqliteConnection),
}

macro_rules! on_backend {
    ($backend:expr, $conn:ident => $body:expr) => {
        match $backend {
            Backend::Postgres($conn) => $body,
            Backend::MySql($conn) => $body,
            Backend::Sqlite($conn) => $body,
        }
    };
}

pub struct SqlxSession {
    config: ConnectionConfig,
    backend: Option<Backend>,
}

impl SqlxSession {
    pub async fn connect(config: ConnectionConfig) -> Result<Self, DbFailure> {
        let backend = open_backend(&config)
            .await
            .map_err(|e| session_failure(&config, e))?;
        info!(
            "Connected to {} at {}",
            config.db_type.as_str(),
            redact_sensitive_text(&config.url)
        );
        Ok(Self {
            config,
            backend: Some(backend),
        })
    }

    fn connection(&mut self) -> Result<&mut Backend, DbFailure> {
        self.backend
            .as_mut()
            .ok_or_else(|| DbFailure::transport("session is not connected"))
    }

    async fn run_raw(&mut self, sql: &str) -> Result<u64, DbFailure> {
        let backend = self.connection()?;
        let result = on_backend!(backend, conn => sqlx::Executor::execute(&mut *conn, sql)
            .await
            .map(|done| done.rows_affected()));
        result.map_err(|e| session_failure(&self.config, e))
    }
}

async fn open_backend(config: &ConnectionConfig) -> Result<Backend, sqlx::Error> {
    let backend = match config.db_type {
        DatabaseType::PostgreSQL => {
            let mut options = PgConnectOptions::from_str(&config.url)?;
            if !config.username.is_empty() {
                options = options.username(&config.username);
            }
            if !config.password.is_empty() {
                options = options.password(&config.password);
            }
            options = options.log_statements(log::LevelFilter::Debug);
            Backend::Postgres(options.connect().await?)
        }
        DatabaseType::MySQL => {
            let mut options = MySqlConnectOptions::from_str(&config.url)?;
            if !config.username.is_empty() {
                options = options.username(&config.username);
            }
            if !config.password.is_empty() {
                options = options.password(&config.password);
            }
            options = options.log_statements(log::LevelFilter::Debug);
            Backend::MySql(options.connect().await?)
        }
        DatabaseType::SQLite => {
            let options = SqliteConnectOptions::from_str(&config.url)?
                .create_if_missing(true)
                .log_statements(log::LevelFilter::Debug);
            Backend::Sqlite(options.connect().await?)
        }
    };
    Ok(backend)
}

fn session_failure(config: &ConnectionConfig, error: sqlx::Error) -> DbFailure {
    let message = redact_known_secret(&error.to_string(), &config.password);
    DbFailure::new(classify_error(&error), message)
}

#[async_trait]
impl Session for SqlxSession {
    fn database_type(&self) -> DatabaseType {
        self.config.db_type
    }

    async fn ensure_open(&mut self) -> Result<(), DbFailure> {
        let healthy = match self.backend.as_mut() {
            Some(backend) => on_backend!(backend, conn => conn.ping().await).is_ok(),
            None => false,
        };
        if healthy {
            return Ok(());
        }
        warn!("Database connection unavailable, reconnecting");
        self.reset().await
    }

    async fn begin(&mut self) -> Result<(), DbFailure> {
        self.run_raw("BEGIN").await.map(|_| ())
    }

    async fn execute(&mut self, statement: &Statement) -> Result<u64, DbFailure> {
        if statement.params.is_empty() {
            return self.run_raw(&statement.sql).await;
        }

        let backend = self.connection()?;
        let result = on_backend!(backend, conn => {
            let mut query = sqlx::query(&statement.sql);
            for param in &statement.params {
                query = query.bind(param.as_str());
            }
            query.execute(&mut *conn).await.map(|done| done.rows_affected())
        });
        result.map_err(|e| session_failure(&self.config, e))
    }

    async fn commit(&mut self) -> Result<(), DbFailure> {
        self.run_raw("COMMIT").await.map(|_| ())
    }

    async fn rollback(&mut self) -> Result<(), DbFailure> {
        self.run_raw("ROLLBACK").await.map(|_| ())
    }

    async fn reset(&mut self) -> Result<(), DbFailure> {
        self.close().await;
        let backend = open_backend(&self.config)
            .await
            .map_err(|e| session_failure(&self.config, e))?;
        self.backend = Some(backend);
        info!("Database session re-established");
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(backend) = self.backend.take() {
            let closed = on_backend!(backend, conn => conn.close().await);
            if let Err(e) = closed {
                debug!("Ignoring error while closing connection: {}", e);
            }
        }
    }
}
