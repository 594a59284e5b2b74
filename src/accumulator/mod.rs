//! Batch Accumulator: pulls messages one transaction at a time until the
//! batch is full, the burst ends, or the channel misbehaves.

use crate::channel::Channel;
use crate::db_types::Record;
use crate::decoder::RecordDecoder;
use log::{debug, warn};
use std::time::Duration;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Batch {
    pub records: Vec<Record>,
    /// Messages taken from the channel that could not be decoded.
    pub dropped: usize,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Adaptive wait between batches.
///
/// A full batch clears the wait. A batch that came back less than half full
/// waits `max_wait * shortfall` before the next pull. Anything in between
/// keeps the previous wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    batch_size: usize,
    max_wait: Duration,
    next_wait: Duration,
}

impl Pacer {
    pub fn new(batch_size: usize, max_wait: Duration) -> Self {
        Self {
            batch_size,
            max_wait,
            next_wait: Duration::ZERO,
        }
    }

    pub fn observe(&mut self, delivered: usize) -> Duration {
        if delivered >= self.batch_size {
            self.next_wait = Duration::ZERO;
        } else if !self.max_wait.is_zero() {
            let missing = (self.batch_size - delivered) as u128;
            // shortfall > 0.5
            if missing * 2 > self.batch_size as u128 {
                let nanos = self.max_wait.as_nanos() * missing / self.batch_size as u128;
                self.next_wait = Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX));
            }
        }
        self.next_wait
    }

    pub fn next_wait(&self) -> Duration {
        self.next_wait
    }
}

pub struct Accumulator<C: Channel> {
    channel: C,
    decoder: RecordDecoder,
    batch_size: usize,
    pacer: Pacer,
}

impl<C: Channel> Accumulator<C> {
    pub fn new(channel: C, decoder: RecordDecoder, batch_size: usize, max_wait: Duration) -> Self {
        Self {
            channel,
            decoder,
            batch_size,
            pacer: Pacer::new(batch_size, max_wait),
        }
    }

    /// Collects up to `batch_size` records, one channel transaction per
    /// message. Channel failures end the batch early but keep what was
    /// already collected.
    pub async fn next_batch(&mut self) -> Batch {
        let mut batch = Batch::default();

        while batch.records.len() < self.batch_size {
            let Some(payload) = self.take_one().await else {
                break;
            };

            match self.decoder.decode(&payload) {
                Ok(Some(record)) => batch.records.push(record),
                Ok(None) => {
                    debug!("End of burst after {} record(s)", batch.records.len());
                    break;
                }
                Err(e) => {
                    warn!("Dropping undecodable message: {}", e);
                    batch.dropped += 1;
                }
            }
        }

        self.pacer.observe(batch.records.len());
        batch
    }

    /// One committed take. `None` when the queue is empty or the channel
    /// transaction failed.
    async fn take_one(&mut self) -> Option<Vec<u8>> {
        if let Err(e) = self.channel.begin().await {
            warn!("{}", e);
            return None;
        }

        let message = match self.channel.take().await {
            Ok(message) => message,
            Err(e) => {
                warn!("{}", e);
                self.rollback_quietly().await;
                return None;
            }
        };

        if let Err(e) = self.channel.commit().await {
            warn!("{}", e);
            self.rollback_quietly().await;
            return None;
        }

        message
    }

    async fn rollback_quietly(&mut self) {
        if let Err(e) = self.channel.rollback().await {
            warn!("{}", e);
        }
    }

    pub fn next_wait(&self) -> Duration {
        self.pacer.next_wait()
    }

    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }

    #[cfg(test)]
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }
}
