//! Bounded diagnostics buffer
//!
//! Every reported condition is logged immediately and kept until the host
//! drains it. When full, the oldest entry is dropped.

use std::collections::VecDeque;

use jb_core::JbError;

pub struct Diagnostics {
    entries: VecDeque<JbError>,
    capacity: usize,
    dropped: u64,
}

impl Diagnostics {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    pub fn report(&mut self, error: JbError) {
        error.log();
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(error);
    }

    /// Drain everything reported since the last call, oldest first
    pub fn take(&mut self) -> Vec<JbError> {
        self.entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries lost to overflow since creation
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
