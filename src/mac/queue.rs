use std::collections::VecDeque;

use super::{DropReason, LinkFrame};
use crate::time::{Duration, SimTime};

/// A frame waiting for its turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub frame: LinkFrame,
    pub enqueued: SimTime,
}

/// Frames removed by a queue operation, with the reason.
pub type Dropped = Vec<(LinkFrame, DropReason)>;

/// The outbound FIFO of a MAC.
///
/// A `max_len` of zero allows an unbounded queue, a `max_time` of zero
/// disables the timeout.
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    entries: VecDeque<QueueEntry>,
    max_len: usize,
    max_time: Duration,
}

impl OutboundQueue {
    #[must_use]
    pub fn new(max_len: usize, max_time: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            max_len,
            max_time,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends a frame after removing outdated entries. A frame that does
    /// not fit is returned as dropped with [`DropReason::QueueFull`].
    pub fn push(&mut self, frame: LinkFrame) -> Dropped {
        let mut dropped = self.remove_outdated();
        if self.max_len > 0 && self.entries.len() >= self.max_len {
            dropped.push((frame, DropReason::QueueFull));
        } else {
            self.entries.push_back(QueueEntry {
                frame,
                enqueued: SimTime::now(),
            });
        }
        dropped
    }

    /// Removes the head of the queue, dropping outdated entries first.
    pub fn pop(&mut self) -> (Option<QueueEntry>, Dropped) {
        let dropped = self.remove_outdated();
        (self.entries.pop_front(), dropped)
    }

    /// Empties the queue.
    pub fn drain(&mut self) -> impl Iterator<Item = LinkFrame> + '_ {
        self.entries.drain(..).map(|e| e.frame)
    }

    fn remove_outdated(&mut self) -> Dropped {
        let mut dropped = Dropped::new();
        if self.max_time.is_zero() {
            return dropped;
        }
        let now = SimTime::now();
        while let Some(head) = self.entries.front() {
            if head.enqueued + self.max_time >= now {
                break;
            }
            if let Some(entry) = self.entries.pop_front() {
                dropped.push((entry.frame, DropReason::QueueTimeout));
            }
        }
        dropped
    }
}
