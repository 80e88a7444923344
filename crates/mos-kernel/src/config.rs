use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest partition the 8-bit program counter can address.
pub const MAX_PARTITION_SIZE: usize = 256;

pub const DEFAULT_MEMORY_SIZE: usize = 768;
pub const DEFAULT_PARTITION_SIZE: usize = 256;
pub const DEFAULT_QUANTUM: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("partition size must be in 1..=256 (got {0})")]
    InvalidPartitionSize(usize),
    #[error("memory size {memory_size} cannot hold a single {partition_size}-byte partition")]
    MemoryTooSmall {
        memory_size: usize,
        partition_size: usize,
    },
    #[error("quantum must be at least 1")]
    ZeroQuantum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Total number of memory cells.
    pub memory_size: usize,
    /// Size of each fixed partition. Memory holds `memory_size / partition_size` partitions; any
    /// remainder is never allocated.
    pub partition_size: usize,
    /// Initial round-robin quantum, in instruction cycles.
    pub quantum: u32,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            partition_size: DEFAULT_PARTITION_SIZE,
            quantum: DEFAULT_QUANTUM,
        }
    }
}

impl MachineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partition_size == 0 || self.partition_size > MAX_PARTITION_SIZE {
            return Err(ConfigError::InvalidPartitionSize(self.partition_size));
        }
        if self.memory_size < self.partition_size {
            return Err(ConfigError::MemoryTooSmall {
                memory_size: self.memory_size,
                partition_size: self.partition_size,
            });
        }
        if self.quantum == 0 {
            return Err(ConfigError::ZeroQuantum);
        }
        Ok(())
    }

    pub fn partition_count(&self) -> usize {
        self.memory_size / self.partition_size.max(1)
    }
}
