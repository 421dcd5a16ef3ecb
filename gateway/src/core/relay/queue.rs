//! Pending frame queue.
//!
//! Client frames that arrive while the upstream handshake is still running are
//! staged here and flushed in arrival order once the upstream is ready. The
//! queue is bounded; what happens when it fills up is decided by the
//! configured [`OverflowPolicy`].

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::frame::Frame;

/// Default number of frames staged before the overflow policy applies.
pub const DEFAULT_PENDING_CAPACITY: usize = 256;

/// What to do with a frame that arrives while the pending queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the incoming frame. The head of the queue (usually the
    /// session setup message) is kept.
    #[default]
    DropNewest,
    /// Evict the oldest staged frame to make room.
    DropOldest,
    /// Treat overflow as fatal and close the session.
    Close,
}

impl OverflowPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverflowPolicy::DropNewest => "drop_newest",
            OverflowPolicy::DropOldest => "drop_oldest",
            OverflowPolicy::Close => "close",
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "drop_newest" => Ok(OverflowPolicy::DropNewest),
            "drop_oldest" => Ok(OverflowPolicy::DropOldest),
            "close" => Ok(OverflowPolicy::Close),
            other => Err(format!(
                "Unknown overflow policy '{other}'. Expected one of: drop_newest, drop_oldest, close"
            )),
        }
    }
}

/// Outcome of [`PendingQueue::push`].
#[derive(Debug, PartialEq, Eq)]
pub enum Enqueue {
    /// The frame was appended
    Accepted,
    /// The frame was appended after evicting the returned oldest frame
    Displaced(Frame),
    /// The queue was full and the incoming frame was discarded
    Rejected(Frame),
    /// The queue was full and the policy requires closing the session
    Overflow,
}

/// FIFO staging buffer for frames received before upstream readiness.
#[derive(Debug)]
pub struct PendingQueue {
    frames: VecDeque<Frame>,
    capacity: Option<usize>,
    policy: OverflowPolicy,
    buffered_bytes: usize,
}

impl PendingQueue {
    /// Create a queue holding at most `capacity` frames. A capacity of zero
    /// means unbounded.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = (capacity > 0).then_some(capacity);
        Self {
            frames: VecDeque::with_capacity(capacity.unwrap_or(16).min(64)),
            capacity,
            policy,
            buffered_bytes: 0,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0, OverflowPolicy::default())
    }

    pub fn push(&mut self, frame: Frame) -> Enqueue {
        let full = self
            .capacity
            .is_some_and(|capacity| self.frames.len() >= capacity);

        if !full {
            self.append(frame);
            return Enqueue::Accepted;
        }

        match self.policy {
            OverflowPolicy::DropNewest => Enqueue::Rejected(frame),
            OverflowPolicy::Close => Enqueue::Overflow,
            OverflowPolicy::DropOldest => match self.frames.pop_front() {
                Some(evicted) => {
                    self.buffered_bytes -= evicted.len();
                    self.append(frame);
                    Enqueue::Displaced(evicted)
                }
                None => {
                    self.append(frame);
                    Enqueue::Accepted
                }
            },
        }
    }

    fn append(&mut self, frame: Frame) {
        self.buffered_bytes += frame.len();
        self.frames.push_back(frame);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total payload bytes currently staged.
    pub fn buffered_bytes(&self) -> usize {
        self.buffered_bytes
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Consume the queue, yielding frames in arrival order.
    pub fn into_frames(self) -> VecDeque<Frame> {
        self.frames
    }
}
