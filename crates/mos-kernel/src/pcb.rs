//! Process control blocks.

use std::fmt;

use mos_mem::Window;
use serde::Serialize;

use crate::error::KernelError;

/// Process id. Assigned from a strictly increasing counter and never reused within a run.
pub type Pid = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProcessState {
    New,
    Resident,
    Ready,
    Running,
    Terminated,
}

impl ProcessState {
    /// Legal lifecycle edges: `New -> Resident -> Ready -> Running -> {Ready, Terminated}`, plus
    /// termination from any live state (kill, trap).
    pub fn can_transition_to(self, next: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, next),
            (New, Resident)
                | (Resident, Ready)
                | (Ready, Running)
                | (Running, Ready)
                | (New | Resident | Ready | Running, Terminated)
        )
    }

    pub fn is_live(self) -> bool {
        self != ProcessState::Terminated
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessState::New => "New",
            ProcessState::Resident => "Resident",
            ProcessState::Ready => "Ready",
            ProcessState::Running => "Running",
            ProcessState::Terminated => "Terminated",
        };
        f.write_str(s)
    }
}

/// Where a process currently resides. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Location {
    Memory,
    ReadyQueue,
    Cpu,
    Released,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Location::Memory => "Memory",
            Location::ReadyQueue => "Ready Queue",
            Location::Cpu => "CPU",
            Location::Released => "Released",
        };
        f.write_str(s)
    }
}

/// The architectural register set, live on the CPU or saved in a PCB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Registers {
    pub pc: u8,
    pub acc: u8,
    pub x: u8,
    pub y: u8,
    pub z: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SchedStats {
    /// Cycles left in the current slice (display value).
    pub quantum: u32,
    pub wait_time: u64,
    pub turnaround_time: u64,
    /// Carried for future policies; round robin ignores it.
    pub priority: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pcb {
    pid: Pid,
    pub regs: Registers,
    window: Window,
    partition_size: usize,
    state: ProcessState,
    pub location: Location,
    pub stats: SchedStats,
}

impl Pcb {
    /// A fresh process in state `New`, owning `window`.
    pub fn new(pid: Pid, window: Window, partition_size: usize) -> Self {
        Self {
            pid,
            regs: Registers::default(),
            window,
            partition_size,
            state: ProcessState::New,
            location: Location::Memory,
            stats: SchedStats::default(),
        }
    }

    /// A process that has just been placed in memory (`New -> Resident`).
    pub(crate) fn resident(pid: Pid, window: Window, partition_size: usize) -> Self {
        let mut pcb = Self::new(pid, window, partition_size);
        pcb.state = ProcessState::Resident;
        pcb
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn base(&self) -> usize {
        self.window.base()
    }

    pub fn limit(&self) -> usize {
        self.window.limit()
    }

    /// Partition index, `base / partition_size`.
    pub fn segment(&self) -> usize {
        self.window.base() / self.partition_size
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == ProcessState::Terminated
    }

    /// Moves to `next`, rejecting edges outside the lifecycle.
    pub fn transition(&mut self, next: ProcessState) -> Result<(), KernelError> {
        if !self.state.can_transition_to(next) {
            return Err(KernelError::IllegalTransition {
                pid: self.pid,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn info(&self) -> ProcessInfo {
        ProcessInfo {
            pid: self.pid,
            state: self.state,
            location: self.location,
            base: self.base(),
            limit: self.limit(),
            segment: self.segment(),
            regs: self.regs,
            stats: self.stats,
        }
    }
}

/// Snapshot row for `ps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub state: ProcessState,
    pub location: Location,
    pub base: usize,
    pub limit: usize,
    pub segment: usize,
    pub regs: Registers,
    pub stats: SchedStats,
}
