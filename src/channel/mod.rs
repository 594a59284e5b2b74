//! Upstream transactional queue.
//!
//! A message is only gone once the transaction that took it commits; a
//! rollback puts it back at the head of the queue.

mod memory;
mod stdin;

pub use memory::MemoryChannel;
pub use stdin::StdinChannel;

use crate::error::ChannelError;
use async_trait::async_trait;

#[async_trait]
pub trait Channel: Send {
    async fn begin(&mut self) -> Result<(), ChannelError>;

    /// Takes at most one message in the open transaction. `None` means the
    /// queue is empty right now.
    async fn take(&mut self) -> Result<Option<Vec<u8>>, ChannelError>;

    async fn commit(&mut self) -> Result<(), ChannelError>;

    async fn rollback(&mut self) -> Result<(), ChannelError>;

    /// True once no message will ever arrive again.
    fn is_closed(&self) -> bool;
}

/// Transaction bookkeeping shared by the channel implementations.
#[derive(Debug, Default)]
struct TxState {
    open: bool,
    taken: Option<Vec<u8>>,
}

impl TxState {
    fn begin(&mut self) -> Result<(), ChannelError> {
        if self.open {
            return Err(ChannelError::new("begin", "transaction already open"));
        }
        self.open = true;
        Ok(())
    }

    fn check_take(&self) -> Result<(), ChannelError> {
        if !self.open {
            return Err(ChannelError::new("take", "no open transaction"));
        }
        if self.taken.is_some() {
            return Err(ChannelError::new("take", "message already taken in this transaction"));
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ChannelError> {
        if !self.open {
            return Err(ChannelError::new("commit", "no open transaction"));
        }
        self.open = false;
        self.taken = None;
        Ok(())
    }

    /// Ends the transaction and hands back the message to restore, if any.
    fn rollback(&mut self) -> Option<Vec<u8>> {
        self.open = false;
        self.taken.take()
    }
}
