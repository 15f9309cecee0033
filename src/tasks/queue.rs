use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::domain::QueueSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Visible,
    Offscreen,
}

/// Two-lane FIFO; visible work always leaves before offscreen work.
#[derive(Debug)]
pub struct ScanQueue<T> {
    visible: Mutex<VecDeque<T>>,
    offscreen: Mutex<VecDeque<T>>,
}

impl<T> Default for ScanQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ScanQueue<T> {
    pub fn new() -> Self {
        Self {
            visible: Mutex::new(VecDeque::new()),
            offscreen: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, lane: Lane, value: T) {
        match lane {
            Lane::Visible => self.visible.lock().push_back(value),
            Lane::Offscreen => self.offscreen.lock().push_back(value),
        }
    }

    pub fn take(&self, limit: usize) -> Vec<T> {
        let mut taken = Vec::with_capacity(limit);
        let mut visible = self.visible.lock();
        let mut offscreen = self.offscreen.lock();
        while taken.len() < limit {
            match visible.pop_front().or_else(|| offscreen.pop_front()) {
                Some(value) => taken.push(value),
                None => break,
            }
        }
        taken
    }

    pub fn clear(&self) -> Vec<T> {
        let mut drained = Vec::new();
        drained.extend(self.visible.lock().drain(..));
        drained.extend(self.offscreen.lock().drain(..));
        drained
    }

    pub fn is_empty(&self) -> bool {
        self.visible.lock().is_empty() && self.offscreen.lock().is_empty()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            visible: self.visible.lock().len(),
            offscreen: self.offscreen.lock().len(),
        }
    }
}
