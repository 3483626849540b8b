//! Transport seams
//!
//! The bridge talks to two collaborators it does not own: the embedded
//! player's driver (command-out) and the host (event delivery). Both are
//! one-way and FIFO.

use crate::{codec::DriverInstruction, method::HostMessage, Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Outbound channel for driver instructions
pub trait InstructionSink: Send + Sync {
    fn send(&self, instruction: DriverInstruction) -> Result<()>;

    /// Release transport resources; later sends fail
    fn close(&self) {}
}

/// Receives notifications destined for the host
pub trait HostSink: Send + Sync {
    fn deliver(&self, message: HostMessage) -> Result<()>;
}

/// Executes scripts inside the embedded player
#[async_trait]
pub trait ScriptDriver: Send + Sync {
    async fn evaluate(&self, script: &str) -> Result<()>;
}

/// Instruction sink backed by an unbounded tokio channel
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<DriverInstruction>,
    closed: AtomicBool,
    sent: AtomicU64,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DriverInstruction>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                closed: AtomicBool::new(false),
                sent: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Instructions accepted so far
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Acquire)
    }
}

impl InstructionSink for ChannelSink {
    fn send(&self, instruction: DriverInstruction) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Transport("instruction channel closed".to_string()));
        }
        self.tx
            .send(instruction)
            .map_err(|_| Error::Transport("driver receiver dropped".to_string()))?;
        self.sent.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Host sink backed by an unbounded tokio channel
pub struct ChannelHostSink {
    tx: mpsc::UnboundedSender<HostMessage>,
}

impl ChannelHostSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl HostSink for ChannelHostSink {
    fn deliver(&self, message: HostMessage) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| Error::Transport("host receiver dropped".to_string()))
    }
}
