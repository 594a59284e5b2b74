//! In-memory doubles shared by the unit tests.

use crate::db::Session;
use crate::db_types::{DatabaseType, Statement};
use crate::error::{DbFailure, FailureKind};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

type Responder = Box<dyn FnMut(&Statement) -> Result<u64, DbFailure> + Send>;

/// Session whose `execute` results come from a closure. Every call is
/// appended to a shared log: `BEGIN`, `COMMIT`, `ROLLBACK`, `RESET`,
/// `CLOSE`, or the SQL text of an executed statement.
pub struct ScriptedSession {
    db_type: DatabaseType,
    responder: Responder,
    log: Arc<Mutex<Vec<String>>>,
    open_failure: Option<DbFailure>,
    pub executed: Arc<Mutex<Vec<Statement>>>,
}

impl ScriptedSession {
    pub fn new<F>(db_type: DatabaseType, responder: F) -> Self
    where
        F: FnMut(&Statement) -> Result<u64, DbFailure> + Send + 'static,
    {
        Self {
            db_type,
            responder: Box::new(responder),
            log: Arc::new(Mutex::new(Vec::new())),
            open_failure: None,
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Accepts every statement, reporting one affected row.
    pub fn accepting(db_type: DatabaseType) -> Self {
        Self::new(db_type, |_| Ok(1))
    }

    /// Makes every `ensure_open` call fail with `failure`.
    pub fn unreachable(mut self, failure: DbFailure) -> Self {
        self.open_failure = Some(failure);
        self
    }

    pub fn log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.log)
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, entry: &str) {
        self.log.lock().unwrap().push(entry.to_string());
    }
}

pub fn failure(kind: FailureKind) -> DbFailure {
    DbFailure::new(kind, format!("scripted {}", kind.as_str()))
}

#[async_trait]
impl Session for ScriptedSession {
    fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    async fn ensure_open(&mut self) -> Result<(), DbFailure> {
        match &self.open_failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }

    async fn begin(&mut self) -> Result<(), DbFailure> {
        self.record("BEGIN");
        Ok(())
    }

    async fn execute(&mut self, statement: &Statement) -> Result<u64, DbFailure> {
        self.record(&statement.sql);
        self.executed.lock().unwrap().push(statement.clone());
        (self.responder)(statement)
    }

    async fn commit(&mut self) -> Result<(), DbFailure> {
        self.record("COMMIT");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbFailure> {
        self.record("ROLLBACK");
        Ok(())
    }

    async fn reset(&mut self) -> Result<(), DbFailure> {
        self.record("RESET");
        Ok(())
    }

    async fn close(&mut self) {
        self.record("CLOSE");
    }
}
