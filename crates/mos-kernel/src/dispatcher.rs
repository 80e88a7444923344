//! Context switching between the live CPU registers and saved PCB state.

use mos_mem::MemoryAccessor;
use serde::Serialize;
use tracing::debug;

use crate::cpu::Cpu;
use crate::error::KernelError;
use crate::memory_manager::MemoryManager;
use crate::pcb::{Location, Pid, ProcessState};
use crate::ready_queue::ReadyQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DispatchStats {
    /// Processes bound to the CPU.
    pub dispatches: u64,
    /// Live processes saved back into the ready queue.
    pub preemptions: u64,
}

/// The only component that moves register state between the CPU and a PCB.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Copies the live registers into the bound process's PCB.
    pub fn save_state(&self, cpu: &Cpu, mm: &mut MemoryManager) {
        if let Some(pcb) = cpu.bound().and_then(|pid| mm.pcb_mut(pid)) {
            pcb.regs = *cpu.regs();
        }
    }

    /// Saves the outgoing process (re-queueing it unless terminated) and binds `next`, if any.
    ///
    /// With `next == None` the CPU is left unbound and idle.
    pub fn context_switch(
        &mut self,
        next: Option<Pid>,
        cpu: &mut Cpu,
        memory: &mut MemoryAccessor,
        mm: &mut MemoryManager,
        ready: &mut ReadyQueue,
        quantum: u32,
    ) -> Result<(), KernelError> {
        if let Some(pid) = cpu.bound() {
            let pcb = mm.pcb_mut(pid).ok_or(KernelError::UnknownProcess(pid))?;
            pcb.regs = *cpu.regs();
            if pcb.state().is_live() {
                pcb.transition(ProcessState::Ready)?;
                pcb.location = Location::ReadyQueue;
                pcb.stats.quantum = quantum;
                ready.enqueue(pid);
                self.stats.preemptions += 1;
            }
            debug!(pid, state = %pcb.state(), "context saved");
            cpu.unbind();
            memory.bind(None);
        }

        if let Some(pid) = next {
            let pcb = mm.pcb_mut(pid).ok_or(KernelError::UnknownProcess(pid))?;
            pcb.transition(ProcessState::Running)?;
            pcb.location = Location::Cpu;
            cpu.load(pid, pcb.regs, pcb.window());
            memory.bind(Some(pcb.window()));
            self.stats.dispatches += 1;
            debug!(pid, pc = pcb.regs.pc, "dispatched");
        }
        Ok(())
    }

    /// Saves and drops the current binding without re-queueing. Used when the bound process is
    /// killed or traps.
    pub fn unbind(&mut self, cpu: &mut Cpu, memory: &mut MemoryAccessor, mm: &mut MemoryManager) {
        self.save_state(cpu, mm);
        cpu.unbind();
        memory.bind(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Cpu, MemoryAccessor, MemoryManager, ReadyQueue) {
        let mut memory = MemoryAccessor::with_size(768);
        let mut mm = MemoryManager::new(768, 256);
        let mut ready = ReadyQueue::new();
        for _ in 0..2 {
            mm.load_program(["EA"], false, &mut memory, &mut ready)
                .unwrap();
        }
        for pid in 0..2 {
            mm.pcb_mut(pid)
                .unwrap()
                .transition(ProcessState::Ready)
                .unwrap();
        }
        (Cpu::new(256), memory, mm, ready)
    }

    #[test]
    fn binds_and_saves_registers() {
        let (mut cpu, mut memory, mut mm, mut ready) = setup();
        let mut dispatcher = Dispatcher::new();
        mm.pcb_mut(1).unwrap().regs.acc = 0x42;

        dispatcher
            .context_switch(Some(1), &mut cpu, &mut memory, &mut mm, &mut ready, 6)
            .unwrap();
        assert_eq!(cpu.bound(), Some(1));
        assert!(cpu.is_executing());
        assert_eq!(cpu.regs().acc, 0x42);
        assert_eq!(memory.window(), Some(mm.pcb(1).unwrap().window()));
        let pcb = mm.pcb(1).unwrap();
        assert_eq!((pcb.state(), pcb.location), (ProcessState::Running, Location::Cpu));

        dispatcher
            .context_switch(Some(0), &mut cpu, &mut memory, &mut mm, &mut ready, 4)
            .unwrap();
        let pcb = mm.pcb(1).unwrap();
        assert_eq!(pcb.state(), ProcessState::Ready);
        assert_eq!(pcb.location, Location::ReadyQueue);
        assert_eq!(pcb.stats.quantum, 4);
        assert_eq!(pcb.regs.acc, 0x42);
        assert_eq!(ready.iter().collect::<Vec<_>>(), vec![1]);
        assert_eq!(cpu.bound(), Some(0));
        assert_eq!(
            dispatcher.stats(),
            DispatchStats {
                dispatches: 2,
                preemptions: 1
            }
        );
    }

    #[test]
    fn terminated_process_is_not_requeued() {
        let (mut cpu, mut memory, mut mm, mut ready) = setup();
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .context_switch(Some(0), &mut cpu, &mut memory, &mut mm, &mut ready, 6)
            .unwrap();
        mm.mark_terminated(0, &mut ready);

        dispatcher
            .context_switch(None, &mut cpu, &mut memory, &mut mm, &mut ready, 6)
            .unwrap();
        assert!(ready.is_empty());
        assert_eq!(cpu.bound(), None);
        assert!(!cpu.is_executing());
        assert_eq!(memory.window(), None);
        assert_eq!(dispatcher.stats().preemptions, 0);
    }

    #[test]
    fn dispatching_a_resident_process_is_illegal() {
        let (mut cpu, mut memory, mut mm, mut ready) = setup();
        mm.load_program(["EA"], false, &mut memory, &mut ready)
            .unwrap();
        let err = Dispatcher::new()
            .context_switch(Some(2), &mut cpu, &mut memory, &mut mm, &mut ready, 6)
            .unwrap_err();
        assert!(matches!(err, KernelError::IllegalTransition { pid: 2, .. }));
        assert_eq!(cpu.bound(), None);
    }
}
