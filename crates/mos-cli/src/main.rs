#![forbid(unsafe_code)]

mod config;
mod script;
mod sink;

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
};

use anyhow::{Context, Result};
use clap::Parser;
use mos_kernel::Machine;
use tracing_subscriber::EnvFilter;

use crate::{config::Args, script::Runner, sink::WriteSink};

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level filter")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = args.machine_config()?;
    tracing::debug!(?config, "machine configured");

    let machine = Machine::new(config, WriteSink::new(io::stdout()))
        .context("invalid machine configuration")?;
    let mut runner = Runner::new(machine, args.max_pulses);

    let input: Box<dyn BufRead> = match &args.script {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open script {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    for line in input.lines() {
        let line = line.context("failed to read script")?;
        runner.execute_line(&line);
    }
    runner.finish()?;

    runner
        .machine_mut()
        .sink_mut()
        .flush()
        .context("failed to write output")?;
    Ok(())
}
