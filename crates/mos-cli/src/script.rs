//! Line-oriented shell over a [`Machine`].

use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use mos_kernel::{Machine, OutputSink, Pid, RunExit};
use mos_mem::hex;
use tracing::debug;

const DUMP_ROW: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Load(String),
    Run(Pid),
    RunAll,
    Kill(Pid),
    KillAll,
    Ps,
    Quantum(u32),
    ClearMem,
    /// Deliver this many clock pulses.
    Step(u64),
    /// Pulse until idle.
    Wait,
    Mem {
        start: usize,
        len: Option<usize>,
    },
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or_else(|| anyhow!("empty command"))?;
        let rest: Vec<&str> = words.collect();

        let cmd = match (name.to_ascii_lowercase().as_str(), rest.as_slice()) {
            ("load", bytes) => Command::Load(bytes.join(" ")),
            ("run", [pid]) => Command::Run(parse_number(pid, "PID")?),
            ("run", _) => bail!("usage: run <pid>"),
            ("runall", []) => Command::RunAll,
            ("kill", [pid]) => Command::Kill(parse_number(pid, "PID")?),
            ("kill", _) => bail!("usage: kill <pid>"),
            ("killall", []) => Command::KillAll,
            ("ps", []) => Command::Ps,
            ("quantum" | "q", [q]) => {
                let q: u32 = parse_number(q, "quantum")?;
                if q == 0 {
                    bail!("quantum must be a positive integer");
                }
                Command::Quantum(q)
            }
            ("quantum" | "q", _) => bail!("usage: quantum <n>"),
            ("clearmem", []) => Command::ClearMem,
            ("step", []) => Command::Step(1),
            ("step", [n]) => Command::Step(parse_number(n, "pulse count")?),
            ("wait", []) => Command::Wait,
            ("mem", []) => Command::Mem {
                start: 0,
                len: None,
            },
            ("mem", [start]) => Command::Mem {
                start: parse_address(start)?,
                len: None,
            },
            ("mem", [start, len]) => Command::Mem {
                start: parse_address(start)?,
                len: Some(parse_number(len, "length")?),
            },
            (
                "runall" | "killall" | "ps" | "clearmem" | "step" | "wait" | "mem",
                _,
            ) => bail!("too many arguments to `{name}`"),
            _ => bail!("unknown command `{name}`"),
        };
        Ok(cmd)
    }
}

fn parse_number<T: FromStr>(text: &str, what: &str) -> Result<T> {
    text.parse()
        .map_err(|_| anyhow!("{what} must be a non-negative integer (got `{text}`)"))
}

/// Decimal, or hex with a `0x` prefix.
fn parse_address(text: &str) -> Result<usize> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(digits) => usize::from_str_radix(digits, 16)
            .with_context(|| format!("invalid hex address `{text}`")),
        None => parse_number(text, "address"),
    }
}

/// Executes shell commands one line at a time. All feedback goes through the machine's sink so
/// program output and command output interleave in order.
pub struct Runner<S: OutputSink> {
    machine: Machine<S>,
    max_pulses: u64,
}

impl<S: OutputSink> Runner<S> {
    pub fn new(machine: Machine<S>, max_pulses: u64) -> Self {
        Self {
            machine,
            max_pulses,
        }
    }

    pub fn machine(&self) -> &Machine<S> {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine<S> {
        &mut self.machine
    }

    /// Runs one script line. Blank lines and `#` comments are skipped; failures are reported and
    /// swallowed.
    pub fn execute_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return;
        }
        debug!(line, "command");

        let result = line.parse::<Command>().and_then(|cmd| self.execute(cmd));
        if let Err(err) = result {
            self.say(&format!("Error: {err:#}"));
        }
    }

    pub fn execute(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::Load(image) => {
                let pid = self.machine.load(&image)?;
                self.say("Program loaded into memory.");
                if let Some(pcb) = self.machine.pcb(pid) {
                    let line = format!(
                        "PID: {pid}, Base: 0x{:04x}, Limit: 0x{:04x}",
                        pcb.base(),
                        pcb.limit()
                    );
                    self.say(&line);
                }
            }
            Command::Run(pid) => {
                self.machine.run(pid)?;
                self.say(&format!("Process {pid} added to the ready queue."));
            }
            Command::RunAll => {
                let count = self.machine.run_all()?;
                if count == 0 {
                    self.say("No resident processes to run.");
                } else {
                    self.say(&format!("{count} process(es) added to the ready queue."));
                }
            }
            Command::Kill(pid) => {
                self.machine.kill(pid)?;
                self.say(&format!("Process {pid} terminated."));
            }
            Command::KillAll => match self.machine.kill_all() {
                0 => self.say("No active processes."),
                _ => self.say("All processes terminated."),
            },
            Command::Ps => self.ps(),
            Command::Quantum(q) => {
                let q = self.machine.set_quantum(q);
                self.say(&format!("Quantum set to {q}"));
            }
            Command::ClearMem => {
                self.machine.clear_memory()?;
                self.say("Memory cleared.");
            }
            Command::Step(n) => {
                for _ in 0..n {
                    self.machine.pulse()?;
                }
            }
            Command::Wait => self.wait()?,
            Command::Mem { start, len } => self.dump(start, len)?,
        }
        Ok(())
    }

    /// Drains outstanding work at end of input.
    pub fn finish(&mut self) -> Result<()> {
        if !self.machine.is_idle() {
            self.wait()?;
        }
        Ok(())
    }

    fn wait(&mut self) -> Result<()> {
        if let RunExit::Completed { executed } = self.machine.run_slice(self.max_pulses)? {
            self.say(&format!(
                "Stopped after {} pulses ({executed} instructions); processes still active.",
                self.max_pulses
            ));
        }
        Ok(())
    }

    fn ps(&mut self) {
        let rows = self.machine.ps();
        if rows.is_empty() {
            self.say("No active processes.");
            return;
        }
        self.say("PID\tState\tLocation\tBase\tLimit\tPC\tACC\tX\tY\tZ\tQuantum\tWait\tTurnaround");
        for p in rows {
            let line = format!(
                "{}\t{}\t{}\t0x{:04x}\t0x{:04x}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                p.pid,
                p.state,
                p.location,
                p.base,
                p.limit,
                hex::format_byte(p.regs.pc),
                hex::format_byte(p.regs.acc),
                hex::format_byte(p.regs.x),
                hex::format_byte(p.regs.y),
                u8::from(p.regs.z),
                p.stats.quantum,
                p.stats.wait_time,
                p.stats.turnaround_time,
            );
            self.say(&line);
        }
    }

    fn dump(&mut self, start: usize, len: Option<usize>) -> Result<()> {
        let memory = self.machine.memory();
        let size = memory.len();
        let len = len.unwrap_or(size.saturating_sub(start));
        let end = start
            .checked_add(len)
            .filter(|end| start < size && *end <= size)
            .ok_or_else(|| anyhow!("range 0x{start:04x}+{len} is outside memory (size {size})"))?;

        let rows: Vec<String> = memory[start..end]
            .chunks(DUMP_ROW)
            .enumerate()
            .map(|(i, row)| {
                format!("0x{:04x}: {}", start + i * DUMP_ROW, hex::format_bytes(row))
            })
            .collect();
        for row in rows {
            self.say(&row);
        }
        Ok(())
    }

    fn say(&mut self, line: &str) {
        let sink = self.machine.sink_mut();
        sink.put_text(line);
        sink.advance_line();
    }
}
