//! Worker loop: pace, accumulate, group, write, repeat.

use crate::accumulator::{Accumulator, Batch};
use crate::channel::Channel;
use crate::config::SinkSettings;
use crate::db::Session;
use crate::decoder::RecordDecoder;
use crate::error::Result;
use crate::executor::GroupExecutor;
use crate::grouper::group_records;
use crate::template::TableTemplate;
use log::{debug, error, info};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

/// How long an idle worker waits when no adaptive wait is configured.
pub const IDLE_BACKOFF: Duration = Duration::from_millis(250);

/// Process-local counters, logged after every batch and on exit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SinkStats {
    pub batches: u64,
    pub rows_committed: u64,
    pub rows_updated: u64,
    /// Conflicting records left untouched because they had nothing to update.
    pub rows_skipped: u64,
    /// Records that never reached a table group (undecodable or unroutable).
    pub rows_dropped: u64,
    /// Records of abandoned groups.
    pub rows_lost: u64,
    pub groups_committed: u64,
    pub groups_abandoned: u64,
    pub tables_created: u64,
}

pub struct SqlSink<C: Channel, S: Session> {
    id: Uuid,
    template: TableTemplate,
    executor: GroupExecutor,
    accumulator: Accumulator<C>,
    session: S,
    stats: SinkStats,
    idle_backoff: Duration,
}

impl<C: Channel, S: Session> SqlSink<C, S> {
    pub fn new(settings: SinkSettings, channel: C, session: S) -> Self {
        let decoder = RecordDecoder::new(settings.delimiter, settings.charset);
        Self {
            id: Uuid::new_v4(),
            template: settings.template,
            executor: GroupExecutor::new(
                settings.binding,
                settings.create_template,
                settings.post_query,
            ),
            accumulator: Accumulator::new(
                channel,
                decoder,
                settings.batch_size,
                settings.max_duration,
            ),
            session,
            stats: SinkStats::default(),
            idle_backoff: IDLE_BACKOFF,
        }
    }

    pub fn with_idle_backoff(mut self, idle_backoff: Duration) -> Self {
        self.idle_backoff = idle_backoff;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stats(&self) -> &SinkStats {
        &self.stats
    }

    /// Runs until `shutdown` flips to `true` or the channel is closed and
    /// drained. Shutdown is only honoured between batches. The session is
    /// closed before returning.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<SinkStats> {
        self.session.ensure_open().await?;
        info!("Sink {} started (table template '{}')", self.id, self.template.source());

        loop {
            if *shutdown.borrow() {
                info!("Sink {} stopping on request", self.id);
                break;
            }

            let wait = self.accumulator.next_wait();
            if !wait.is_zero() && pause(&mut shutdown, wait).await {
                continue;
            }

            let batch = self.accumulator.next_batch().await;
            if batch.is_empty() {
                self.stats.rows_dropped += batch.dropped as u64;
                if self.accumulator.is_closed() {
                    info!("Sink {} input closed", self.id);
                    break;
                }
                if self.accumulator.next_wait().is_zero() {
                    pause(&mut shutdown, self.idle_backoff).await;
                }
                continue;
            }

            self.process_batch(batch).await;
        }

        self.session.close().await;
        Ok(self.stats.clone())
    }

    /// Groups one batch by table and writes every group in first-seen order.
    pub async fn process_batch(&mut self, batch: Batch) {
        self.stats.batches += 1;
        self.stats.rows_dropped += batch.dropped as u64;

        let grouped = group_records(batch.records, &self.template);
        self.stats.rows_dropped += grouped.dropped.len() as u64;

        if let Err(e) = self.session.ensure_open().await {
            error!(
                "Sink {} has no database session, abandoning {} group(s): {}",
                self.id,
                grouped.groups.len(),
                e
            );
            self.stats.groups_abandoned += grouped.groups.len() as u64;
            self.stats.rows_lost += grouped.record_count() as u64;
            return;
        }

        for group in &grouped.groups {
            match self.executor.execute_group(&mut self.session, group).await {
                Ok(report) => {
                    self.stats.groups_committed += 1;
                    self.stats.rows_committed +=
                        (report.rows_inserted + report.rows_updated) as u64;
                    self.stats.rows_updated += report.rows_updated as u64;
                    self.stats.rows_skipped += report.rows_skipped as u64;
                    if report.table_created {
                        self.stats.tables_created += 1;
                    }
                }
                Err(_) => {
                    self.stats.groups_abandoned += 1;
                    self.stats.rows_lost += group.records.len() as u64;
                }
            }
        }

        debug!("Sink {} stats after batch: {:?}", self.id, self.stats);
    }
}

/// Sleeps for `duration`; returns `true` if a shutdown was requested
/// meanwhile.
async fn pause(shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        changed = shutdown.changed() => match changed {
            Ok(()) => *shutdown.borrow(),
            Err(_) => {
                // nobody can request a shutdown any more
                tokio::time::sleep(duration).await;
                false
            }
        },
    }
}
