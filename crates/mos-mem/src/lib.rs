//! Simulated physical memory for the `mos` machine.
//!
//! Two layers live here:
//!
//! - [`ProtectedMemory`]: a fixed-size array of byte cells with bounds-checked direct addressing.
//!   It has no notion of processes.
//! - [`MemoryAccessor`]: wraps [`ProtectedMemory`] and checks every access against the memory
//!   [`Window`] of the process currently bound to the CPU.
//!
//! Bytes are stored as plain `u8`. The two-hex-digit textual form only exists at the external
//! boundary; see [`hex`].

#![forbid(unsafe_code)]

mod access;
mod error;
pub mod hex;
mod protected;

pub use access::{MemoryAccessor, Window};
pub use error::{HexError, MemoryError, MemoryResult};
pub use protected::ProtectedMemory;
