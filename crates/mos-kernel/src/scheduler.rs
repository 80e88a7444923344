//! Round-robin scheduling over the ready queue.

use mos_mem::MemoryAccessor;
use tracing::debug;

use crate::cpu::Cpu;
use crate::dispatcher::Dispatcher;
use crate::error::KernelError;
use crate::interrupts::InterruptQueue;
use crate::memory_manager::MemoryManager;
use crate::pcb::{Location, Pid, ProcessState};
use crate::ready_queue::ReadyQueue;

/// Counts instruction cycles per quantum and picks the next process in strict FIFO order.
#[derive(Debug, Clone)]
pub struct Scheduler {
    quantum: u32,
    cycle_count: u32,
    ready: ReadyQueue,
}

impl Scheduler {
    pub fn new(quantum: u32) -> Self {
        Self {
            quantum: quantum.max(1),
            cycle_count: 0,
            ready: ReadyQueue::new(),
        }
    }

    pub fn quantum(&self) -> u32 {
        self.quantum
    }

    /// Cycles executed in the current slice.
    pub fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    pub fn ready(&self) -> &ReadyQueue {
        &self.ready
    }

    pub fn ready_mut(&mut self) -> &mut ReadyQueue {
        &mut self.ready
    }

    /// Sets the quantum (at least 1) and restarts the current slice. Returns the effective value.
    pub fn set_quantum(&mut self, quantum: u32, bound: Option<Pid>, mm: &mut MemoryManager) -> u32 {
        self.quantum = quantum.max(1);
        self.reset_cycle_count(bound, mm);
        debug!(quantum = self.quantum, "quantum set");
        self.quantum
    }

    pub fn reset_cycle_count(&mut self, bound: Option<Pid>, mm: &mut MemoryManager) {
        self.cycle_count = 0;
        if let Some(pcb) = bound.and_then(|pid| mm.pcb_mut(pid)) {
            pcb.stats.quantum = self.quantum;
        }
    }

    /// Admits a resident process: `Resident -> Ready`, tagged with the current quantum.
    pub fn admit(&mut self, pid: Pid, mm: &mut MemoryManager) -> Result<(), KernelError> {
        let pcb = mm.pcb_mut(pid).ok_or(KernelError::UnknownProcess(pid))?;
        if self.ready.contains(pid) {
            return Err(KernelError::AlreadyScheduled(pid));
        }
        pcb.transition(ProcessState::Ready)?;
        pcb.location = Location::ReadyQueue;
        pcb.stats.quantum = self.quantum;
        self.ready.enqueue(pid);
        Ok(())
    }

    /// One scheduler tick, run after every executed instruction.
    ///
    /// Ages every queued process and raises a context-switch request once the running process
    /// has used up its quantum. The switch itself happens in the next interrupt pass.
    pub fn tick(
        &mut self,
        running: Option<Pid>,
        mm: &mut MemoryManager,
        interrupts: &mut InterruptQueue,
    ) {
        let Some(pid) = running else {
            return;
        };

        self.cycle_count += 1;
        if let Some(pcb) = mm.pcb_mut(pid) {
            pcb.stats.turnaround_time += 1;
            pcb.stats.quantum = self.quantum.saturating_sub(self.cycle_count);
        }
        for waiting in self.ready.iter() {
            if let Some(pcb) = mm.pcb_mut(waiting) {
                pcb.stats.wait_time += 1;
                pcb.stats.turnaround_time += 1;
            }
        }

        if self.cycle_count >= self.quantum {
            self.cycle_count = 0;
            debug!(pid, quantum = self.quantum, "quantum expired");
            interrupts.request_context_switch();
        }
    }

    /// Picks what runs next.
    ///
    /// With an empty queue a live running process simply keeps the CPU for another slice, and
    /// otherwise the CPU goes idle. Else the queue head is dispatched.
    pub fn schedule_next(
        &mut self,
        cpu: &mut Cpu,
        dispatcher: &mut Dispatcher,
        memory: &mut MemoryAccessor,
        mm: &mut MemoryManager,
    ) -> Result<(), KernelError> {
        let Some(next) = self.ready.dequeue() else {
            let alive = cpu
                .running()
                .and_then(|pid| mm.pcb(pid))
                .is_some_and(|pcb| pcb.state().is_live());
            if !alive {
                dispatcher.context_switch(None, cpu, memory, mm, &mut self.ready, self.quantum)?;
            }
            self.reset_cycle_count(cpu.bound(), mm);
            return Ok(());
        };

        dispatcher.context_switch(Some(next), cpu, memory, mm, &mut self.ready, self.quantum)?;
        self.reset_cycle_count(cpu.bound(), mm);
        Ok(())
    }
}
