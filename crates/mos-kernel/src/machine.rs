use mos_mem::MemoryAccessor;
use tracing::{debug, warn};

use crate::config::{ConfigError, MachineConfig};
use crate::cpu::{Cpu, CycleContext, CycleOutcome};
use crate::dispatcher::{DispatchStats, Dispatcher};
use crate::error::{KernelError, LoadError, Trap};
use crate::interrupts::{Interrupt, InterruptQueue};
use crate::memory_manager::MemoryManager;
use crate::pcb::{Pcb, Pid, ProcessInfo, ProcessState};
use crate::scheduler::Scheduler;
use crate::sink::{BufferSink, OutputSink};

/// Why [`Machine::run_slice`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// Nothing left to run: no process bound, nothing queued, no pending interrupt.
    Idle { executed: u64 },
    /// The pulse budget ran out while work remained.
    Completed { executed: u64 },
}

impl RunExit {
    /// Instructions executed during the slice.
    pub fn executed(&self) -> u64 {
        match *self {
            RunExit::Idle { executed } | RunExit::Completed { executed } => executed,
        }
    }
}

/// The whole simulated computer: CPU, memory, process table, scheduler and dispatcher, driven by
/// external clock pulses.
///
/// All state lives here and is handed to each component explicitly; there is no ambient global
/// "current process". The bound process is whatever [`Cpu::bound`] reports, and only the
/// [`Dispatcher`] changes it.
pub struct Machine<S: OutputSink = BufferSink> {
    config: MachineConfig,
    cpu: Cpu,
    memory: MemoryAccessor,
    mm: MemoryManager,
    scheduler: Scheduler,
    dispatcher: Dispatcher,
    interrupts: InterruptQueue,
    sink: S,
    traps: Vec<Trap>,
    pulses: u64,
}

impl<S: OutputSink> Machine<S> {
    pub fn new(config: MachineConfig, sink: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, sink))
    }

    fn build(config: MachineConfig, sink: S) -> Self {
        Self {
            config,
            cpu: Cpu::new(config.partition_size),
            memory: MemoryAccessor::with_size(config.memory_size),
            mm: MemoryManager::new(config.memory_size, config.partition_size),
            scheduler: Scheduler::new(config.quantum),
            dispatcher: Dispatcher::new(),
            interrupts: InterruptQueue::new(),
            sink,
            traps: Vec::new(),
            pulses: 0,
        }
    }

    /// Loads a whitespace-separated program image into the first free partition.
    pub fn load(&mut self, image: &str) -> Result<Pid, LoadError> {
        self.mm.load_program(
            image.split_whitespace(),
            self.cpu.is_executing(),
            &mut self.memory,
            self.scheduler.ready_mut(),
        )
    }

    /// Queues a resident process; starts it right away if the CPU is idle.
    pub fn run(&mut self, pid: Pid) -> Result<(), KernelError> {
        let pcb = self.mm.pcb(pid).ok_or(KernelError::UnknownProcess(pid))?;
        if pcb.is_terminated() {
            return Err(KernelError::AlreadyTerminated(pid));
        }
        if self.cpu.bound() == Some(pid) || pcb.state() == ProcessState::Running {
            return Err(KernelError::AlreadyRunning(pid));
        }
        if self.scheduler.ready().contains(pid) {
            return Err(KernelError::AlreadyScheduled(pid));
        }

        self.scheduler.admit(pid, &mut self.mm)?;
        debug!(pid, "process queued");
        self.dispatch_if_idle()
    }

    /// Queues every resident process in pid order. Returns how many were queued.
    pub fn run_all(&mut self) -> Result<usize, KernelError> {
        let pids: Vec<Pid> = self
            .mm
            .processes()
            .filter(|pcb| pcb.state() == ProcessState::Resident)
            .map(Pcb::pid)
            .collect();
        for pid in &pids {
            self.scheduler.admit(*pid, &mut self.mm)?;
        }
        if !pids.is_empty() {
            self.dispatch_if_idle()?;
        }
        Ok(pids.len())
    }

    /// Terminates `pid` immediately and releases its partition.
    pub fn kill(&mut self, pid: Pid) -> Result<(), KernelError> {
        let pcb = self.mm.pcb(pid).ok_or(KernelError::UnknownProcess(pid))?;
        if pcb.is_terminated() {
            return Err(KernelError::AlreadyTerminated(pid));
        }

        let was_bound = self.cpu.bound() == Some(pid);
        if was_bound {
            self.dispatcher
                .unbind(&mut self.cpu, &mut self.memory, &mut self.mm);
        }
        self.mm.mark_terminated(pid, self.scheduler.ready_mut());
        debug!(pid, was_bound, "process killed");

        if was_bound {
            self.scheduler.reset_cycle_count(None, &mut self.mm);
            self.interrupts.request_context_switch();
        } else if !self.scheduler.ready().is_empty() {
            self.dispatch_if_idle()?;
        }
        Ok(())
    }

    /// Terminates every live process. Returns how many were terminated.
    pub fn kill_all(&mut self) -> usize {
        let live: Vec<Pid> = self
            .mm
            .processes()
            .filter(|pcb| pcb.state().is_live())
            .map(Pcb::pid)
            .collect();

        if self.cpu.bound().is_some() {
            self.dispatcher
                .unbind(&mut self.cpu, &mut self.memory, &mut self.mm);
        }
        for pid in &live {
            self.mm.mark_terminated(*pid, self.scheduler.ready_mut());
        }
        self.scheduler.ready_mut().clear();
        self.scheduler.reset_cycle_count(None, &mut self.mm);
        debug!(count = live.len(), "all processes killed");
        live.len()
    }

    pub fn ps(&self) -> Vec<ProcessInfo> {
        self.mm.processes().map(Pcb::info).collect()
    }

    /// Sets the round-robin quantum. Returns the effective (clamped) value.
    pub fn set_quantum(&mut self, quantum: u32) -> u32 {
        self.scheduler
            .set_quantum(quantum, self.cpu.bound(), &mut self.mm)
    }

    /// Zeroes memory and forgets every process. Refused while anything is running or queued.
    pub fn clear_memory(&mut self) -> Result<(), KernelError> {
        if self.cpu.is_executing()
            || self.cpu.bound().is_some()
            || !self.scheduler.ready().is_empty()
        {
            return Err(KernelError::ProcessesActive);
        }
        self.memory.physical_mut().clear();
        self.mm.reset();
        debug!("memory cleared");
        Ok(())
    }

    /// One clock pulse: service pending interrupts, then execute at most one instruction.
    pub fn pulse(&mut self) -> Result<CycleOutcome, KernelError> {
        self.pulses += 1;

        while let Some(irq) = self.interrupts.pop() {
            match irq {
                Interrupt::ContextSwitch => self.schedule_next()?,
            }
        }

        let mut ctx = CycleContext {
            memory: &mut self.memory,
            mm: &mut self.mm,
            scheduler: &mut self.scheduler,
            dispatcher: &mut self.dispatcher,
            interrupts: &mut self.interrupts,
            sink: &mut self.sink,
        };
        let outcome = self.cpu.cycle(&mut ctx);

        if let CycleOutcome::Trapped(trap) = outcome {
            self.handle_trap(trap);
        }
        Ok(outcome)
    }

    /// Pulses until the machine is idle or `max_pulses` pulses have elapsed.
    pub fn run_slice(&mut self, max_pulses: u64) -> Result<RunExit, KernelError> {
        let mut executed = 0u64;
        for _ in 0..max_pulses {
            if self.is_idle() {
                return Ok(RunExit::Idle { executed });
            }
            if matches!(
                self.pulse()?,
                CycleOutcome::Executed { .. } | CycleOutcome::Halted { .. }
            ) {
                executed += 1;
            }
        }
        if self.is_idle() {
            Ok(RunExit::Idle { executed })
        } else {
            Ok(RunExit::Completed { executed })
        }
    }

    /// No process is executing, none is queued, and no request is pending.
    pub fn is_idle(&self) -> bool {
        !self.cpu.is_executing() && self.scheduler.ready().is_empty() && self.interrupts.is_empty()
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn pcb(&self, pid: Pid) -> Option<&Pcb> {
        self.mm.pcb(pid)
    }

    pub fn processes(&self) -> impl Iterator<Item = &Pcb> + '_ {
        self.mm.processes()
    }

    pub fn memory_manager(&self) -> &MemoryManager {
        &self.mm
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    /// Raw view of every memory cell.
    pub fn memory(&self) -> &[u8] {
        self.memory.physical().as_slice()
    }

    /// Every trap raised so far, oldest first.
    pub fn traps(&self) -> &[Trap] {
        &self.traps
    }

    /// Pulses delivered so far.
    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Dispatches the queue head right away when the CPU sits idle. A pending switch request
    /// already owns the next scheduling decision, so nothing happens until it is serviced.
    fn dispatch_if_idle(&mut self) -> Result<(), KernelError> {
        if self.cpu.is_executing() || self.interrupts.context_switch_pending() {
            return Ok(());
        }
        self.schedule_next()
    }

    fn schedule_next(&mut self) -> Result<(), KernelError> {
        self.scheduler.schedule_next(
            &mut self.cpu,
            &mut self.dispatcher,
            &mut self.memory,
            &mut self.mm,
        )
    }

    /// Fault handler: the trapping process dies, everything else keeps going.
    fn handle_trap(&mut self, trap: Trap) {
        warn!(pid = trap.pid, fault = %trap.fault, "process trapped");
        self.sink.put_text(&format!("Process {} terminated: {}", trap.pid, trap.fault));
        self.sink.advance_line();

        if self.cpu.bound() == Some(trap.pid) {
            self.dispatcher
                .unbind(&mut self.cpu, &mut self.memory, &mut self.mm);
        }
        self.mm.mark_terminated(trap.pid, self.scheduler.ready_mut());
        self.scheduler.reset_cycle_count(None, &mut self.mm);
        self.interrupts.request_context_switch();
        self.traps.push(trap);
    }
}

impl Machine<BufferSink> {
    /// Machine with the default geometry writing into a [`BufferSink`].
    pub fn with_defaults() -> Self {
        Self::build(MachineConfig::default(), BufferSink::new())
    }

    pub fn with_config(config: MachineConfig) -> Result<Self, ConfigError> {
        Self::new(config, BufferSink::new())
    }
}
