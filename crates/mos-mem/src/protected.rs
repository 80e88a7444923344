use crate::{MemoryError, MemoryResult};

/// Raw byte-addressable memory.
///
/// The size is fixed at construction and every access is range-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedMemory {
    cells: Vec<u8>,
}

impl ProtectedMemory {
    pub fn new(size: usize) -> Self {
        Self {
            cells: vec![0; size],
        }
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn read(&self, addr: usize) -> MemoryResult<u8> {
        self.cells
            .get(addr)
            .copied()
            .ok_or(MemoryError::AddressOutOfRange {
                addr,
                size: self.cells.len(),
            })
    }

    pub fn write(&mut self, addr: usize, value: u8) -> MemoryResult<()> {
        let size = self.cells.len();
        let slot = self
            .cells
            .get_mut(addr)
            .ok_or(MemoryError::AddressOutOfRange { addr, size })?;
        *slot = value;
        Ok(())
    }

    /// Sets `len` cells starting at `start` to `value`.
    pub fn fill(&mut self, start: usize, len: usize, value: u8) -> MemoryResult<()> {
        if len == 0 {
            return Ok(());
        }
        self.check_range(start, len)?;
        self.cells[start..start + len].fill(value);
        Ok(())
    }

    /// Zeroes every cell.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }

    pub(crate) fn check_range(&self, start: usize, len: usize) -> MemoryResult<()> {
        let size = self.cells.len();
        let last = start
            .checked_add(len.saturating_sub(1))
            .ok_or(MemoryError::AddressOutOfRange { addr: start, size })?;
        if start >= size {
            return Err(MemoryError::AddressOutOfRange { addr: start, size });
        }
        if last >= size {
            return Err(MemoryError::AddressOutOfRange { addr: last, size });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed() {
        let mem = ProtectedMemory::new(16);
        assert_eq!(mem.size(), 16);
        assert!(mem.as_slice().iter().all(|b| *b == 0));
    }

    #[test]
    fn read_write_in_range() {
        let mut mem = ProtectedMemory::new(16);
        mem.write(15, 0xAB).unwrap();
        assert_eq!(mem.read(15).unwrap(), 0xAB);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut mem = ProtectedMemory::new(16);
        assert_eq!(
            mem.read(16),
            Err(MemoryError::AddressOutOfRange { addr: 16, size: 16 })
        );
        assert_eq!(
            mem.write(100, 1),
            Err(MemoryError::AddressOutOfRange {
                addr: 100,
                size: 16
            })
        );
    }

    #[test]
    fn fill_checks_both_ends() {
        let mut mem = ProtectedMemory::new(16);
        mem.fill(4, 4, 0xEE).unwrap();
        assert_eq!(&mem.as_slice()[3..9], &[0, 0xEE, 0xEE, 0xEE, 0xEE, 0]);

        let err = mem.fill(12, 8, 0xFF).unwrap_err();
        assert_eq!(err, MemoryError::AddressOutOfRange { addr: 19, size: 16 });
        // Nothing was written.
        assert_eq!(mem.read(12).unwrap(), 0);

        mem.clear();
        assert!(mem.as_slice().iter().all(|b| *b == 0));
    }
}
