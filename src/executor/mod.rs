//! Transactional Executor.
//!
//! Writes one table group with a single multi-row INSERT and heals the two
//! failures a sink can fix by itself: a missing table (CREATE, then INSERT
//! again) and duplicate keys (UPDATE per record, then INSERT what is left).
//! Each attempt runs in its own local transaction and each corrective step
//! runs at most once per group.

use crate::config::ColumnBinding;
use crate::db::Session;
use crate::db_types::{Record, Statement};
use crate::error::{DbFailure, FailureKind, GroupError};
use crate::grouper::TableGroup;
use crate::statement::{build_create, build_insert, build_post_query, build_updates};
use log::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    Success,
    NeedsTableCreation,
    NeedsConflictResolution,
    TransientConnectionError,
    FatalError,
}

impl From<FailureKind> for RetryOutcome {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::TableNotFound => RetryOutcome::NeedsTableCreation,
            FailureKind::KeyViolation => RetryOutcome::NeedsConflictResolution,
            FailureKind::Transport => RetryOutcome::TransientConnectionError,
            FailureKind::Other => RetryOutcome::FatalError,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupReport {
    pub table: String,
    /// Records written by an INSERT, including re-inserted leftovers.
    pub rows_inserted: usize,
    /// Records that already existed and were updated in place.
    pub rows_updated: usize,
    /// Conflicting records with no key or value to update; left untouched.
    pub rows_skipped: usize,
    pub table_created: bool,
}

pub type GroupOutcome = Result<GroupReport, GroupError>;

enum Step {
    Insert,
    CreateThenInsert(Statement),
    ResolveConflicts(Vec<Option<Statement>>),
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Insert => "insert",
            Step::CreateThenInsert(_) => "create-then-insert",
            Step::ResolveConflicts(_) => "resolve-conflicts",
        }
    }
}

#[derive(Default)]
struct StepResult {
    inserted: usize,
    updated: usize,
    skipped: usize,
}

#[derive(Debug, Clone)]
pub struct GroupExecutor {
    binding: ColumnBinding,
    create_template: Option<String>,
    post_query: Option<String>,
}

impl GroupExecutor {
    pub fn new(
        binding: ColumnBinding,
        create_template: Option<String>,
        post_query: Option<String>,
    ) -> Self {
        Self {
            binding,
            create_template,
            post_query,
        }
    }

    pub async fn execute_group<S: Session + ?Sized>(
        &self,
        session: &mut S,
        group: &TableGroup,
    ) -> GroupOutcome {
        let outcome = self.write_group(session, group).await;
        match &outcome {
            Ok(report) => {
                debug!(
                    "Committed {} row(s) to {} ({} inserted, {} updated, {} skipped)",
                    report.rows_inserted + report.rows_updated,
                    report.table,
                    report.rows_inserted,
                    report.rows_updated,
                    report.rows_skipped
                );
                self.run_post_query(session, &group.table).await;
            }
            Err(e) => {
                let first = group.records.first().map(Record::to_string).unwrap_or_default();
                error!(
                    "Abandoning {} row(s) for table {} (first record [{}]): {}",
                    group.records.len(),
                    group.table,
                    first,
                    e
                );
            }
        }
        outcome
    }

    async fn write_group<S: Session + ?Sized>(
        &self,
        session: &mut S,
        group: &TableGroup,
    ) -> GroupOutcome {
        let db_type = session.database_type();
        let insert = build_insert(&db_type, &group.table, &group.records, &self.binding)
            .bind(&group.records);

        let mut report = GroupReport {
            table: group.table.clone(),
            ..GroupReport::default()
        };
        let mut step = Step::Insert;
        let mut create_attempted = false;
        let mut conflicts_attempted = false;

        loop {
            let failure = match self.run_step(session, &step, group, &insert).await {
                Ok(result) => {
                    report.rows_inserted = result.inserted;
                    report.rows_updated = result.updated;
                    report.rows_skipped = result.skipped;
                    report.table_created = matches!(step, Step::CreateThenInsert(_));
                    return Ok(report);
                }
                Err(failure) => failure,
            };

            debug!("Step {} failed for {}: {}", step.name(), group.table, failure);
            step = match RetryOutcome::from(failure.kind) {
                RetryOutcome::NeedsTableCreation => {
                    if create_attempted {
                        return Err(GroupError::Schema {
                            table: group.table.clone(),
                            reason: failure.message,
                        });
                    }
                    create_attempted = true;
                    let create = build_create(&group.table, self.create_template.as_deref())
                        .ok_or_else(|| GroupError::Schema {
                            table: group.table.clone(),
                            reason: "no table.create statement configured".to_string(),
                        })?;
                    info!("Table {} does not exist, creating it", group.table);
                    Step::CreateThenInsert(Statement::raw(create))
                }
                RetryOutcome::NeedsConflictResolution => {
                    if conflicts_attempted {
                        return Err(GroupError::Conflict {
                            table: group.table.clone(),
                            reason: failure.message,
                        });
                    }
                    conflicts_attempted = true;
                    let updates =
                        build_updates(&db_type, &group.table, &group.records, &self.binding);
                    if updates.iter().all(Option::is_none) {
                        return Err(GroupError::Conflict {
                            table: group.table.clone(),
                            reason: "no record carries both a key and a value to update"
                                .to_string(),
                        });
                    }
                    info!("Duplicate keys in {}, updating existing rows", group.table);
                    Step::ResolveConflicts(updates)
                }
                RetryOutcome::TransientConnectionError => {
                    if let Err(e) = session.reset().await {
                        warn!("Failed to re-establish database session: {}", e);
                    }
                    return Err(GroupError::Transport(failure.message));
                }
                RetryOutcome::FatalError | RetryOutcome::Success => {
                    return Err(GroupError::Fatal(failure.message));
                }
            };
        }
    }

    /// Runs `step` inside BEGIN .. COMMIT, rolling back on any failure.
    async fn run_step<S: Session + ?Sized>(
        &self,
        session: &mut S,
        step: &Step,
        group: &TableGroup,
        insert: &Statement,
    ) -> Result<StepResult, DbFailure> {
        session.begin().await?;

        let result = match self.step_body(session, step, group, insert).await {
            Ok(result) => session.commit().await.map(|_| result),
            Err(e) => Err(e),
        };

        if result.is_err() {
            if let Err(e) = session.rollback().await {
                debug!("Rollback failed: {}", e);
            }
        }
        result
    }

    async fn step_body<S: Session + ?Sized>(
        &self,
        session: &mut S,
        step: &Step,
        group: &TableGroup,
        insert: &Statement,
    ) -> Result<StepResult, DbFailure> {
        match step {
            Step::Insert => {
                session.execute(insert).await?;
                Ok(StepResult {
                    inserted: group.records.len(),
                    ..StepResult::default()
                })
            }
            Step::CreateThenInsert(create) => {
                session.execute(create).await?;
                session.execute(insert).await?;
                Ok(StepResult {
                    inserted: group.records.len(),
                    ..StepResult::default()
                })
            }
            Step::ResolveConflicts(updates) => {
                let mut result = StepResult::default();
                let mut leftovers: Vec<Record> = Vec::new();

                for (record, update) in group.records.iter().zip(updates) {
                    let Some(update) = update else {
                        warn!(
                            "Skipping conflicting record [{}] for {}: no key or value to update",
                            record, group.table
                        );
                        result.skipped += 1;
                        continue;
                    };
                    if session.execute(update).await? == 0 {
                        leftovers.push(record.clone());
                    } else {
                        result.updated += 1;
                    }
                }

                if !leftovers.is_empty() {
                    let db_type = session.database_type();
                    let reinsert = build_insert(&db_type, &group.table, &leftovers, &self.binding)
                        .bind(&leftovers);
                    session.execute(&reinsert).await?;
                    result.inserted = leftovers.len();
                }
                Ok(result)
            }
        }
    }

    /// Autocommit statement run after a successful group; failures are only
    /// logged.
    async fn run_post_query<S: Session + ?Sized>(&self, session: &mut S, table: &str) {
        let Some(sql) = build_post_query(table, self.post_query.as_deref()) else {
            return;
        };
        if let Err(e) = session.execute(&Statement::raw(sql)).await {
            warn!("Post query for {} failed: {}", table, e);
        }
    }
}
