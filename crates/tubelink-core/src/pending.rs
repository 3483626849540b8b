//! Readiness buffer
//!
//! Holds the one initialization request that arrived before the embedded
//! player was ready. Later requests overwrite earlier ones.

use crate::types::PendingInit;
use tracing::debug;

/// Single-slot buffer for a pre-readiness `initialize`
#[derive(Debug, Default)]
pub struct ReadinessBuffer {
    slot: Option<PendingInit>,
}

impl ReadinessBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a pending init, replacing any previous one
    pub fn record(&mut self, pending: PendingInit) {
        if let Some(previous) = self.slot.replace(pending) {
            debug!(superseded = %previous.video_id, "Pending init overwritten");
        }
    }

    /// Take the pending init, leaving the buffer empty
    pub fn drain(&mut self) -> Option<PendingInit> {
        self.slot.take()
    }

    pub fn peek(&self) -> Option<&PendingInit> {
        self.slot.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(id: &str) -> PendingInit {
        PendingInit {
            video_id: id.to_string(),
            auto_play: false,
            start_at: 0,
            muted: false,
        }
    }

    #[test]
    fn test_last_write_wins() {
        let mut buffer = ReadinessBuffer::new();
        buffer.record(pending("first"));
        buffer.record(pending("second"));
        assert_eq!(buffer.peek().map(|p| p.video_id.as_str()), Some("second"));
    }

    #[test]
    fn test_drain_is_idempotent() {
        let mut buffer = ReadinessBuffer::new();
        buffer.record(pending("abc"));
        assert_eq!(buffer.drain(), Some(pending("abc")));
        assert_eq!(buffer.drain(), None);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_empty() {
        let mut buffer = ReadinessBuffer::new();
        assert_eq!(buffer.drain(), None);
    }
}
