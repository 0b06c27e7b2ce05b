//! Bounded outbound command queue
//!
//! One queue exists per live connection; the sender worker drains it in
//! FIFO order. Overflow means the peer has stopped reading: the whole queue
//! is cleared (including the entry that triggered the overflow) so the
//! engine resynchronizes instead of blocking the caller or silently
//! shedding only the newest command.

use std::collections::VecDeque;

use avr_state::SendCommands;
use parking_lot::{Condvar, Mutex};

/// Default queue capacity.
pub const QUEUE_CAPACITY: usize = 128;

struct Inner {
    entries: VecDeque<String>,
    shutdown: bool,
}

/// FIFO of outbound command lines, without terminators.
pub struct CommandQueue {
    inner: Mutex<Inner>,
    available: Condvar,
    capacity: usize,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::with_capacity(QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: VecDeque::new(),
                shutdown: false,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Append a command. Returns false when the command was not queued,
    /// either because the queue is shut down or because it overflowed.
    pub fn push(&self, command: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.shutdown {
            tracing::debug!("dropping command {:?}: queue is shut down", command);
            return false;
        }
        if inner.entries.len() >= self.capacity {
            tracing::error!(
                "outbound queue overflow at {} entries, clearing; {:?} dropped",
                self.capacity,
                command
            );
            inner.entries.clear();
            return false;
        }
        inner.entries.push_back(command.to_string());
        self.available.notify_one();
        true
    }

    /// Block until an entry is available or the queue shuts down.
    pub fn pop(&self) -> Option<String> {
        let mut inner = self.inner.lock();
        loop {
            if inner.shutdown {
                return None;
            }
            if let Some(entry) = inner.entries.pop_front() {
                return Some(entry);
            }
            self.available.wait(&mut inner);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Release any blocked `pop` and refuse further entries. Pending
    /// entries are dropped; the connection they were meant for is gone.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock();
        inner.shutdown = true;
        inner.entries.clear();
        self.available.notify_all();
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SendCommands for CommandQueue {
    fn send(&self, command: &str) {
        self.push(command);
    }
}
