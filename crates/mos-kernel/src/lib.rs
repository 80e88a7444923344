//! Kernel and CPU of the `mos` machine.
//!
//! A single-core, accumulator-based CPU executes small machine-code programs out of fixed-size
//! memory partitions under preemptive round-robin scheduling:
//!
//! - [`MemoryManager`] allocates partitions, validates and loads program images, and owns the
//!   table of [`Pcb`]s.
//! - [`Cpu`] runs one fetch-decode-execute step per [`Machine::pulse`] against the bound process.
//! - [`Scheduler`] counts cycles per quantum, ages the [`ReadyQueue`] and picks the next process.
//! - [`Dispatcher`] moves register state between the CPU and PCBs on a context switch.
//!
//! [`Machine`] owns all of them and exposes the command surface (`load`, `run`, `kill`, ...).

#![forbid(unsafe_code)]

mod config;
mod cpu;
mod dispatcher;
mod error;
mod interrupts;
mod isa;
mod machine;
mod memory_manager;
mod pcb;
mod ready_queue;
mod scheduler;
mod sink;

pub use config::{
    ConfigError, MachineConfig, DEFAULT_MEMORY_SIZE, DEFAULT_PARTITION_SIZE, DEFAULT_QUANTUM,
    MAX_PARTITION_SIZE,
};
pub use cpu::{Cpu, CycleContext, CycleOutcome};
pub use dispatcher::{DispatchStats, Dispatcher};
pub use error::{Fault, KernelError, LoadError, Trap};
pub use interrupts::{Interrupt, InterruptQueue};
pub use isa::Opcode;
pub use machine::{Machine, RunExit};
pub use memory_manager::MemoryManager;
pub use pcb::{Location, Pcb, Pid, ProcessInfo, ProcessState, Registers, SchedStats};
pub use ready_queue::ReadyQueue;
pub use scheduler::Scheduler;
pub use sink::{BufferSink, OutputSink};
