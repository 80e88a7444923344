use std::collections::VecDeque;

use crate::pcb::Pid;

/// FIFO of processes waiting for the CPU. A pid appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadyQueue {
    pids: VecDeque<Pid>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `pid`; returns `false` if it is already queued.
    pub fn enqueue(&mut self, pid: Pid) -> bool {
        if self.contains(pid) {
            return false;
        }
        self.pids.push_back(pid);
        true
    }

    pub fn dequeue(&mut self) -> Option<Pid> {
        self.pids.pop_front()
    }

    /// Removes `pid` wherever it sits, keeping the order of the rest.
    pub fn remove(&mut self, pid: Pid) -> bool {
        let before = self.pids.len();
        self.pids.retain(|p| *p != pid);
        self.pids.len() != before
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.pids.contains(&pid)
    }

    pub fn clear(&mut self) {
        self.pids.clear();
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Pid> + '_ {
        self.pids.iter().copied()
    }
}
