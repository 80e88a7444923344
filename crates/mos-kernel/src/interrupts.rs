use std::collections::VecDeque;

/// Requests raised during a cycle and serviced by the interrupt-processing pass that runs before
/// the next instruction fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    ContextSwitch,
}

#[derive(Debug, Clone, Default)]
pub struct InterruptQueue {
    pending: VecDeque<Interrupt>,
}

impl InterruptQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `irq` unless an identical request is already pending.
    pub fn raise(&mut self, irq: Interrupt) {
        if !self.is_pending(irq) {
            self.pending.push_back(irq);
        }
    }

    pub fn is_pending(&self, irq: Interrupt) -> bool {
        self.pending.contains(&irq)
    }

    pub fn context_switch_pending(&self) -> bool {
        self.is_pending(Interrupt::ContextSwitch)
    }

    pub fn request_context_switch(&mut self) {
        self.raise(Interrupt::ContextSwitch);
    }

    pub fn pop(&mut self) -> Option<Interrupt> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_switch_requests_coalesce() {
        let mut irq = InterruptQueue::new();
        irq.request_context_switch();
        irq.request_context_switch();
        assert_eq!(irq.len(), 1);
        assert!(irq.context_switch_pending());

        assert_eq!(irq.pop(), Some(Interrupt::ContextSwitch));
        assert!(irq.is_empty());
        assert!(!irq.context_switch_pending());

        irq.request_context_switch();
        assert_eq!(irq.len(), 1);
    }
}
