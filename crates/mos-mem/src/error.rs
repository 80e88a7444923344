use thiserror::Error;

pub type MemoryResult<T> = Result<T, MemoryError>;

/// Errors returned by [`crate::ProtectedMemory`] and [`crate::MemoryAccessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// The address lies outside the whole memory space.
    #[error("address 0x{addr:04X} out of range (memory size 0x{size:04X})")]
    AddressOutOfRange { addr: usize, size: usize },

    /// The address lies outside the base/limit window of the bound process.
    #[error("memory access violation: 0x{addr:04X} outside 0x{base:04X}..=0x{limit:04X}")]
    AccessViolation {
        addr: usize,
        base: usize,
        limit: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    /// The token is not exactly two hexadecimal digits.
    #[error("invalid byte '{0}': expected two hexadecimal digits")]
    InvalidByte(String),
}
