//! Fetch-decode-execute interpreter.

use mos_mem::{MemoryAccessor, Window};
use tracing::trace;

use crate::dispatcher::Dispatcher;
use crate::error::{Fault, Trap};
use crate::interrupts::InterruptQueue;
use crate::isa::Opcode;
use crate::memory_manager::MemoryManager;
use crate::pcb::{Pid, Registers};
use crate::scheduler::Scheduler;
use crate::sink::OutputSink;

/// Everything one cycle may touch besides the CPU itself.
pub struct CycleContext<'a, S: OutputSink + ?Sized> {
    pub memory: &'a mut MemoryAccessor,
    pub mm: &'a mut MemoryManager,
    pub scheduler: &'a mut Scheduler,
    pub dispatcher: &'a mut Dispatcher,
    pub interrupts: &'a mut InterruptQueue,
    pub sink: &'a mut S,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing bound or not executing.
    Idle,
    Executed { pid: Pid, opcode: Opcode },
    /// The process executed `BRK`.
    Halted { pid: Pid },
    /// The instruction faulted; the CPU stopped executing. The caller owns the trap.
    Trapped(Trap),
}

enum Step {
    Continue(Opcode),
    Halt,
}

/// Live register set plus the binding to the current process.
#[derive(Debug, Clone)]
pub struct Cpu {
    regs: Registers,
    ir: u8,
    executing: bool,
    bound: Option<Pid>,
    window: Option<Window>,
    partition_size: usize,
}

impl Cpu {
    pub fn new(partition_size: usize) -> Self {
        Self {
            regs: Registers::default(),
            ir: 0,
            executing: false,
            bound: None,
            window: None,
            partition_size: partition_size.max(1),
        }
    }

    /// Live registers. Only meaningful while a process is bound.
    pub fn regs(&self) -> &Registers {
        &self.regs
    }

    /// Instruction register: the last fetched opcode byte.
    pub fn ir(&self) -> u8 {
        self.ir
    }

    pub fn is_executing(&self) -> bool {
        self.executing
    }

    pub fn bound(&self) -> Option<Pid> {
        self.bound
    }

    /// The bound pid, but only while the CPU is executing it.
    pub fn running(&self) -> Option<Pid> {
        self.bound.filter(|_| self.executing)
    }

    /// Base/limit mirror of the bound process.
    pub fn window(&self) -> Option<Window> {
        self.window
    }

    pub(crate) fn load(&mut self, pid: Pid, regs: Registers, window: Window) {
        self.regs = regs;
        self.ir = 0;
        self.window = Some(window);
        self.bound = Some(pid);
        self.executing = true;
    }

    pub(crate) fn unbind(&mut self) {
        self.bound = None;
        self.window = None;
        self.executing = false;
    }

    /// Executes one instruction of the bound process.
    ///
    /// After the instruction the scheduler ticks and the registers are saved back into the PCB.
    /// Faults are returned as [`CycleOutcome::Trapped`], never propagated.
    pub fn cycle<S: OutputSink + ?Sized>(&mut self, ctx: &mut CycleContext<'_, S>) -> CycleOutcome {
        let (Some(pid), Some(window)) = (self.running(), self.window) else {
            return CycleOutcome::Idle;
        };

        match self.step(pid, window, ctx) {
            Ok(step) => {
                ctx.scheduler.tick(self.running(), ctx.mm, ctx.interrupts);
                ctx.dispatcher.save_state(self, ctx.mm);
                match step {
                    Step::Continue(opcode) => CycleOutcome::Executed { pid, opcode },
                    Step::Halt => CycleOutcome::Halted { pid },
                }
            }
            Err(fault) => {
                self.executing = false;
                CycleOutcome::Trapped(Trap { pid, fault })
            }
        }
    }

    fn step<S: OutputSink + ?Sized>(
        &mut self,
        pid: Pid,
        window: Window,
        ctx: &mut CycleContext<'_, S>,
    ) -> Result<Step, Fault> {
        let pc = self.regs.pc;
        self.ir = ctx.memory.read(window.base() + pc as usize)?;
        let opcode = Opcode::decode(self.ir).ok_or(Fault::InvalidOpcode {
            opcode: self.ir,
            pc,
        })?;
        trace!(pid, pc, op = opcode.mnemonic(), "execute");
        let mut next_pc = pc.wrapping_add(opcode.len());
        let mem = &mut *ctx.memory;

        match opcode {
            Opcode::LdaImm => self.regs.acc = self.operand(mem, window, 1)?,
            Opcode::LdaAbs => {
                let addr = self.effective_address(mem, window)?;
                self.regs.acc = mem.read(addr)?;
            }
            Opcode::StaAbs => {
                let addr = self.effective_address(mem, window)?;
                mem.write(addr, self.regs.acc)?;
            }
            Opcode::AdcAbs => {
                let addr = self.effective_address(mem, window)?;
                self.regs.acc = self.regs.acc.wrapping_add(mem.read(addr)?);
            }
            Opcode::LdxImm => self.regs.x = self.operand(mem, window, 1)?,
            Opcode::LdxAbs => {
                let addr = self.effective_address(mem, window)?;
                self.regs.x = mem.read(addr)?;
            }
            Opcode::LdyImm => self.regs.y = self.operand(mem, window, 1)?,
            Opcode::LdyAbs => {
                let addr = self.effective_address(mem, window)?;
                self.regs.y = mem.read(addr)?;
            }
            Opcode::Nop => {}
            Opcode::Brk => {
                self.executing = false;
                ctx.mm.mark_terminated(pid, ctx.scheduler.ready_mut());
                ctx.sink.put_text(&format!("Program {pid} finished."));
                ctx.sink.advance_line();
                ctx.interrupts.request_context_switch();
                return Ok(Step::Halt);
            }
            Opcode::CpxAbs => {
                let addr = self.effective_address(mem, window)?;
                self.regs.z = self.regs.x == mem.read(addr)?;
            }
            Opcode::Bne => {
                let offset = self.operand(mem, window, 1)? as i8;
                if !self.regs.z {
                    next_pc = next_pc.wrapping_add(offset as u8);
                }
            }
            Opcode::IncAbs => {
                let addr = self.effective_address(mem, window)?;
                let value = mem.read(addr)?.wrapping_add(1);
                mem.write(addr, value)?;
            }
            Opcode::Sys => match self.regs.x {
                1 => ctx.sink.put_text(&self.regs.y.to_string()),
                2 => {
                    let text = read_c_string(mem, window, self.regs.y)?;
                    ctx.sink.put_text(&text);
                }
                _ => {}
            },
        }

        self.regs.pc = next_pc;
        Ok(Step::Continue(opcode))
    }

    /// Inline operand byte at `pc + offset`; the PC wraps at 256.
    fn operand(&self, mem: &MemoryAccessor, window: Window, offset: u8) -> Result<u8, Fault> {
        let logical = self.regs.pc.wrapping_add(offset);
        Ok(mem.read(window.base() + logical as usize)?)
    }

    /// Two-byte little-endian logical address, folded into the owning partition.
    fn effective_address(&self, mem: &MemoryAccessor, window: Window) -> Result<usize, Fault> {
        let lo = self.operand(mem, window, 1)?;
        let hi = self.operand(mem, window, 2)?;
        let logical = u16::from_le_bytes([lo, hi]) as usize;
        Ok(window.base() + logical % self.partition_size)
    }
}

/// Zero-terminated string at logical address `start`, cut off at the partition limit.
fn read_c_string(mem: &MemoryAccessor, window: Window, start: u8) -> Result<String, Fault> {
    let mut out = String::new();
    let mut addr = window.base() + start as usize;
    while addr <= window.limit() {
        let byte = mem.read(addr)?;
        if byte == 0 {
            break;
        }
        out.push(char::from(byte));
        addr += 1;
    }
    Ok(out)
}
