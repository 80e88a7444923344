use serde::Serialize;

use crate::{MemoryError, MemoryResult, ProtectedMemory};

/// Inclusive `base..=limit` address window owned by one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Window {
    base: usize,
    limit: usize,
}

impl Window {
    /// Window covering `len` bytes starting at `base`. `len` must be non-zero.
    pub fn new(base: usize, len: usize) -> Self {
        debug_assert!(len > 0, "window must cover at least one byte");
        Self {
            base,
            limit: base + len.max(1) - 1,
        }
    }

    /// Window of partition `index` when memory is split into `partition_size`-byte partitions.
    pub fn partition(index: usize, partition_size: usize) -> Self {
        Self::new(index * partition_size, partition_size)
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.limit - self.base + 1
    }

    pub fn contains(&self, addr: usize) -> bool {
        self.base <= addr && addr <= self.limit
    }
}

/// Process-aware access layer over [`ProtectedMemory`].
///
/// Every access is first range-checked against the whole memory, then, while a window is bound,
/// against that window. Binding is driven by the kernel dispatcher whenever the process on the
/// CPU changes.
#[derive(Debug, Clone)]
pub struct MemoryAccessor {
    memory: ProtectedMemory,
    window: Option<Window>,
}

impl MemoryAccessor {
    pub fn new(memory: ProtectedMemory) -> Self {
        Self {
            memory,
            window: None,
        }
    }

    pub fn with_size(size: usize) -> Self {
        Self::new(ProtectedMemory::new(size))
    }

    pub fn size(&self) -> usize {
        self.memory.size()
    }

    /// Binds (or with `None`, unbinds) the window every subsequent access is checked against.
    pub fn bind(&mut self, window: Option<Window>) {
        self.window = window;
    }

    pub fn window(&self) -> Option<Window> {
        self.window
    }

    pub fn read(&self, addr: usize) -> MemoryResult<u8> {
        self.check(addr)?;
        self.memory.read(addr)
    }

    pub fn write(&mut self, addr: usize, value: u8) -> MemoryResult<()> {
        self.check(addr)?;
        self.memory.write(addr, value)
    }

    /// Reads `len` bytes starting at `start`.
    ///
    /// Both ends of the range are validated before any cell is touched.
    pub fn read_block(&self, start: usize, len: usize) -> MemoryResult<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        self.memory.check_range(start, len)?;
        (start..start + len).map(|addr| self.read(addr)).collect()
    }

    /// Writes `bytes` starting at `start`.
    ///
    /// Both ends are validated against the whole memory first; a window violation part-way
    /// through leaves the bytes before the violating address written.
    pub fn write_block(&mut self, start: usize, bytes: &[u8]) -> MemoryResult<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.memory.check_range(start, bytes.len())?;
        for (offset, value) in bytes.iter().enumerate() {
            self.write(start + offset, *value)?;
        }
        Ok(())
    }

    /// The raw substrate, bypassing window checks.
    pub fn physical(&self) -> &ProtectedMemory {
        &self.memory
    }

    /// Mutable raw substrate. Used by the memory manager to place program images, which happens
    /// while no process is executing.
    pub fn physical_mut(&mut self) -> &mut ProtectedMemory {
        &mut self.memory
    }

    fn check(&self, addr: usize) -> MemoryResult<()> {
        let size = self.memory.size();
        if addr >= size {
            return Err(MemoryError::AddressOutOfRange { addr, size });
        }
        if let Some(window) = self.window {
            if !window.contains(addr) {
                return Err(MemoryError::AccessViolation {
                    addr,
                    base: window.base,
                    limit: window.limit,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_windows_tile_memory() {
        let w0 = Window::partition(0, 256);
        let w2 = Window::partition(2, 256);
        assert_eq!((w0.base(), w0.limit()), (0, 255));
        assert_eq!((w2.base(), w2.limit()), (512, 767));
        assert_eq!(w2.len(), 256);
        assert!(w2.contains(512) && w2.contains(767));
        assert!(!w2.contains(511) && !w2.contains(768));
    }

    #[test]
    fn unbound_accessor_only_checks_range() {
        let mut mem = MemoryAccessor::with_size(64);
        mem.write(63, 7).unwrap();
        assert_eq!(mem.read(63).unwrap(), 7);
        assert_eq!(
            mem.read(64),
            Err(MemoryError::AddressOutOfRange { addr: 64, size: 64 })
        );
    }

    #[test]
    fn bound_window_rejects_foreign_addresses() {
        let mut mem = MemoryAccessor::with_size(64);
        mem.bind(Some(Window::partition(1, 16)));

        mem.write(16, 0xAA).unwrap();
        mem.write(31, 0xBB).unwrap();
        assert_eq!(
            mem.write(32, 0xCC),
            Err(MemoryError::AccessViolation {
                addr: 32,
                base: 16,
                limit: 31
            })
        );
        assert!(matches!(
            mem.read(15),
            Err(MemoryError::AccessViolation { addr: 15, .. })
        ));
        // Range is checked before the window.
        assert!(matches!(
            mem.read(1000),
            Err(MemoryError::AddressOutOfRange { .. })
        ));

        mem.bind(None);
        assert_eq!(mem.read(32).unwrap(), 0);
    }

    #[test]
    fn block_helpers_validate_ends_first() {
        let mut mem = MemoryAccessor::with_size(32);
        mem.write_block(4, &[1, 2, 3]).unwrap();
        assert_eq!(mem.read_block(3, 5).unwrap(), vec![0, 1, 2, 3, 0]);

        assert!(matches!(
            mem.write_block(30, &[9, 9, 9]),
            Err(MemoryError::AddressOutOfRange { addr: 32, .. })
        ));
        // Nothing was written since the end was validated up front.
        assert_eq!(mem.read(30).unwrap(), 0);
        assert!(mem.read_block(0, 0).unwrap().is_empty());
    }
}
