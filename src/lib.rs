//! `mos`: a small teaching machine with a partitioned memory, an accumulator CPU and a
//! round-robin kernel.
//!
//! This crate re-exports the workspace crates so embedders can depend on a single package:
//!
//! - [`mem`]: byte-addressable memory, base/limit windows and hex helpers.
//! - [`kernel`]: CPU, memory manager, scheduler, dispatcher and the [`Machine`] driving them.

#![forbid(unsafe_code)]

pub use mos_kernel as kernel;
pub use mos_mem as mem;

pub use mos_kernel::{
    BufferSink, CycleOutcome, KernelError, LoadError, Machine, MachineConfig, OutputSink, Pid,
    ProcessState, RunExit, Trap,
};
