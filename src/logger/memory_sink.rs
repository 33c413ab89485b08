use super::{ActionLogEntry, ActionLogSink};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

/// Keeps the most recent action entries in memory.
#[derive(Clone)]
pub struct MemoryLogSink {
    buffer: Arc<RwLock<VecDeque<ActionLogEntry>>>,
    capacity: usize,
}

impl MemoryLogSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn get_recent(&self) -> Vec<ActionLogEntry> {
        match self.buffer.read() {
            Ok(buffer) => buffer.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }
}

impl ActionLogSink for MemoryLogSink {
    fn log(&self, entry: &ActionLogEntry) {
        let mut buffer = match self.buffer.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(entry.clone());
    }
}
