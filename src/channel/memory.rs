use super::{Channel, TxState};
use crate::error::ChannelError;
use async_trait::async_trait;
use std::collections::VecDeque;

/// In-process queue, used for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    queue: VecDeque<Vec<u8>>,
    tx: TxState,
    closed: bool,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut channel = Self::new();
        for line in lines {
            channel.push(line.as_ref().as_bytes().to_vec());
        }
        channel
    }

    pub fn push(&mut self, message: Vec<u8>) {
        self.queue.push_back(message);
    }

    /// No further pushes are expected; the channel reports closed once drained.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    async fn begin(&mut self) -> Result<(), ChannelError> {
        self.tx.begin()
    }

    async fn take(&mut self) -> Result<Option<Vec<u8>>, ChannelError> {
        self.tx.check_take()?;
        let message = self.queue.pop_front();
        self.tx.taken = message.clone();
        Ok(message)
    }

    async fn commit(&mut self) -> Result<(), ChannelError> {
        self.tx.commit()
    }

    async fn rollback(&mut self) -> Result<(), ChannelError> {
        if let Some(message) = self.tx.rollback() {
            self.queue.push_front(message);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed && self.queue.is_empty() && !self.tx.open
    }
}
