use super::{Channel, TxState};
use crate::error::ChannelError;
use async_trait::async_trait;
use log::{debug, error};
use std::collections::VecDeque;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

const LINE_BUFFER: usize = 1024;

/// One message per input line, read by a background task.
///
/// `take` never waits: an empty buffer reads as end-of-burst, and the
/// channel closes once the input hits EOF and every line was consumed.
pub struct StdinChannel {
    receiver: mpsc::Receiver<Vec<u8>>,
    restored: VecDeque<Vec<u8>>,
    tx: TxState,
    disconnected: bool,
}

impl StdinChannel {
    pub fn spawn() -> Self {
        Self::from_reader(tokio::io::stdin())
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(LINE_BUFFER);
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).split(b'\n');
            loop {
                match lines.next_segment().await {
                    Ok(Some(line)) => {
                        if sender.send(line).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("Input reached EOF");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        break;
                    }
                }
            }
        });

        Self {
            receiver,
            restored: VecDeque::new(),
            tx: TxState::default(),
            disconnected: false,
        }
    }
}

#[async_trait]
impl Channel for StdinChannel {
    async fn begin(&mut self) -> Result<(), ChannelError> {
        self.tx.begin()
    }

    async fn take(&mut self) -> Result<Option<Vec<u8>>, ChannelError> {
        self.tx.check_take()?;
        let message = match self.restored.pop_front() {
            Some(message) => Some(message),
            None => match self.receiver.try_recv() {
                Ok(message) => Some(message),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    None
                }
            },
        };
        self.tx.taken = message.clone();
        Ok(message)
    }

    async fn commit(&mut self) -> Result<(), ChannelError> {
        self.tx.commit()
    }

    async fn rollback(&mut self) -> Result<(), ChannelError> {
        if let Some(message) = self.tx.rollback() {
            self.restored.push_front(message);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.disconnected && self.restored.is_empty() && !self.tx.open
    }
}
