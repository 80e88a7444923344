use mos_mem::MemoryError;
use thiserror::Error;

use crate::pcb::{Pid, ProcessState};

/// Load-time failures of [`crate::MemoryManager::load_program`]. No state is mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("cannot load while the CPU is executing a program")]
    SystemBusy,
    #[error("invalid program: {0}")]
    InvalidProgram(String),
    #[error("program size {len} exceeds partition size {max}")]
    ProgramTooLarge { len: usize, max: usize },
    #[error("no partitions available")]
    NoPartitionsAvailable,
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// A fault raised while executing one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error("invalid opcode {opcode:02X} at PC={pc:02X}")]
    InvalidOpcode { opcode: u8, pc: u8 },
}

/// Trap report for the process that raised `fault`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("process {pid} trapped: {fault}")]
pub struct Trap {
    pub pid: Pid,
    pub fault: Fault,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("no process with PID {0}")]
    UnknownProcess(Pid),
    #[error("process {0} has already terminated")]
    AlreadyTerminated(Pid),
    #[error("process {0} is already running")]
    AlreadyRunning(Pid),
    #[error("process {0} is already scheduled")]
    AlreadyScheduled(Pid),
    #[error("cannot clear memory while processes are active")]
    ProcessesActive,
    #[error("process {pid}: illegal transition {from} -> {to}")]
    IllegalTransition {
        pid: Pid,
        from: ProcessState,
        to: ProcessState,
    },
}
