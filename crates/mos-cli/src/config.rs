use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use mos_kernel::MachineConfig;

#[derive(Debug, Clone, Parser)]
#[command(name = "mos", version, about = "Runs shell scripts against the mos teaching machine")]
pub struct Args {
    /// Total memory in bytes.
    ///
    /// Environment variable: `MOS_MEMORY_SIZE`.
    #[arg(long, env = "MOS_MEMORY_SIZE")]
    pub memory_size: Option<usize>,

    /// Partition size in bytes (at most 256).
    ///
    /// Environment variable: `MOS_PARTITION_SIZE`.
    #[arg(long, env = "MOS_PARTITION_SIZE")]
    pub partition_size: Option<usize>,

    /// Round-robin quantum in instruction cycles.
    ///
    /// Environment variable: `MOS_QUANTUM`.
    #[arg(long, env = "MOS_QUANTUM")]
    pub quantum: Option<u32>,

    /// JSON file with any of `memory_size`, `partition_size` and `quantum`.
    ///
    /// Flags and environment variables override values from the file.
    #[arg(long, env = "MOS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter (tracing-subscriber EnvFilter syntax). Falls back to `RUST_LOG`, then `warn`.
    ///
    /// Environment variable: `MOS_LOG_LEVEL`.
    #[arg(long, env = "MOS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Upper bound on clock pulses for a single `wait`.
    #[arg(long, env = "MOS_MAX_PULSES", default_value_t = 100_000)]
    pub max_pulses: u64,

    /// Script to execute, one command per line. Reads stdin when omitted.
    pub script: Option<PathBuf>,
}

impl Args {
    /// Layers flags over the config file over the built-in defaults.
    pub fn machine_config(&self) -> Result<MachineConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => MachineConfig::default(),
        };

        if let Some(memory_size) = self.memory_size {
            config.memory_size = memory_size;
        }
        if let Some(partition_size) = self.partition_size {
            config.partition_size = partition_size;
        }
        if let Some(quantum) = self.quantum {
            config.quantum = quantum;
        }

        config.validate().context("invalid machine configuration")?;
        Ok(config)
    }
}
