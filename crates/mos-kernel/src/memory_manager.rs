//! Partition allocation and the process table.

use std::collections::BTreeMap;

use mos_mem::{hex, MemoryAccessor, Window};
use tracing::debug;

use crate::error::LoadError;
use crate::pcb::{Location, Pcb, Pid, ProcessState};
use crate::ready_queue::ReadyQueue;

/// Owns the partition bitmap and the table of every PCB created in this run.
///
/// Memory is split statically into `memory_size / partition_size` equal partitions. Allocation is
/// lowest-index-first.
#[derive(Debug, Clone)]
pub struct MemoryManager {
    partition_size: usize,
    partitions: Vec<bool>,
    table: BTreeMap<Pid, Pcb>,
    resident: Vec<Pid>,
    next_pid: Pid,
}

impl MemoryManager {
    pub fn new(memory_size: usize, partition_size: usize) -> Self {
        let count = memory_size / partition_size.max(1);
        Self {
            partition_size,
            partitions: vec![false; count],
            table: BTreeMap::new(),
            resident: Vec::new(),
            next_pid: 0,
        }
    }

    pub fn partition_size(&self) -> usize {
        self.partition_size
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_allocated(&self, partition: usize) -> bool {
        self.partitions.get(partition).copied().unwrap_or(false)
    }

    pub fn free_partitions(&self) -> usize {
        self.partitions.iter().filter(|used| !**used).count()
    }

    /// Validates and loads a program image given as two-hex-digit tokens.
    ///
    /// On success the image sits at the start of the first free partition (the rest of the
    /// partition is zeroed) and a `Resident` PCB owning that partition is registered. Failures
    /// leave the manager and memory untouched.
    pub fn load_program<'a, I>(
        &mut self,
        tokens: I,
        cpu_executing: bool,
        memory: &mut MemoryAccessor,
        ready: &mut ReadyQueue,
    ) -> Result<Pid, LoadError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.cleanup_terminated(ready);

        if cpu_executing {
            return Err(LoadError::SystemBusy);
        }

        let image = hex::parse_bytes(tokens).map_err(|e| LoadError::InvalidProgram(e.to_string()))?;
        if image.is_empty() {
            return Err(LoadError::InvalidProgram("no program bytes provided".to_string()));
        }
        if image.len() > self.partition_size {
            return Err(LoadError::ProgramTooLarge {
                len: image.len(),
                max: self.partition_size,
            });
        }

        let partition = self
            .partitions
            .iter()
            .position(|used| !*used)
            .ok_or(LoadError::NoPartitionsAvailable)?;
        let window = Window::partition(partition, self.partition_size);

        let physical = memory.physical_mut();
        physical.fill(window.base(), window.len(), 0)?;
        for (offset, byte) in image.iter().enumerate() {
            physical.write(window.base() + offset, *byte)?;
        }

        self.partitions[partition] = true;
        let pid = self.next_pid;
        self.next_pid += 1;
        self.table
            .insert(pid, Pcb::resident(pid, window, self.partition_size));
        self.resident.push(pid);

        debug!(
            pid,
            partition,
            base = window.base(),
            limit = window.limit(),
            len = image.len(),
            "program loaded"
        );
        Ok(pid)
    }

    pub fn pcb(&self, pid: Pid) -> Option<&Pcb> {
        self.table.get(&pid)
    }

    pub fn pcb_mut(&mut self, pid: Pid) -> Option<&mut Pcb> {
        self.table.get_mut(&pid)
    }

    /// Every known PCB in pid order, whatever its state.
    pub fn processes(&self) -> impl Iterator<Item = &Pcb> + '_ {
        self.table.values()
    }

    /// Pids of processes loaded and not yet terminated, in load order.
    pub fn resident(&self) -> &[Pid] {
        &self.resident
    }

    /// Terminates `pid` and releases its partition.
    ///
    /// Returns `false` (and does nothing) if the pid is unknown or already terminated.
    pub fn mark_terminated(&mut self, pid: Pid, ready: &mut ReadyQueue) -> bool {
        let Some(pcb) = self.table.get_mut(&pid) else {
            return false;
        };
        if pcb.transition(ProcessState::Terminated).is_err() {
            return false;
        }
        self.release(pid, ready);
        true
    }

    /// Releases resources of PCBs marked `Terminated` whose partition is still held.
    ///
    /// Returns how many were released.
    pub fn cleanup_terminated(&mut self, ready: &mut ReadyQueue) -> usize {
        let pending: Vec<Pid> = self
            .table
            .values()
            .filter(|pcb| pcb.is_terminated() && pcb.location != Location::Released)
            .map(Pcb::pid)
            .collect();
        for pid in &pending {
            self.release(*pid, ready);
        }
        pending.len()
    }

    /// Forgets every process and frees every partition. Pids keep counting up.
    pub fn reset(&mut self) {
        self.table.clear();
        self.partitions.fill(false);
        self.resident.clear();
    }

    fn release(&mut self, pid: Pid, ready: &mut ReadyQueue) {
        let Some(pcb) = self.table.get_mut(&pid) else {
            return;
        };
        let partition = pcb.segment();
        pcb.location = Location::Released;
        if let Some(slot) = self.partitions.get_mut(partition) {
            *slot = false;
        }
        ready.remove(pid);
        self.resident.retain(|p| *p != pid);
        debug!(pid, partition, "partition released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        mm: MemoryManager,
        mem: MemoryAccessor,
        ready: ReadyQueue,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                mm: MemoryManager::new(768, 256),
                mem: MemoryAccessor::with_size(768),
                ready: ReadyQueue::new(),
            }
        }

        fn load(&mut self, image: &str) -> Result<Pid, LoadError> {
            self.mm
                .load_program(image.split_whitespace(), false, &mut self.mem, &mut self.ready)
        }
    }

    #[test]
    fn load_places_image_in_first_free_partition() {
        let mut f = Fixture::new();
        let pid = f.load("A9 01 8D 00 00 00").unwrap();
        assert_eq!(pid, 0);

        let pcb = f.mm.pcb(pid).unwrap();
        assert_eq!((pcb.base(), pcb.limit(), pcb.segment()), (0, 255, 0));
        assert_eq!(pcb.state(), ProcessState::Resident);
        assert_eq!(pcb.location, Location::Memory);
        assert_eq!(
            &f.mem.physical().as_slice()[..7],
            &[0xA9, 0x01, 0x8D, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(f.mm.resident(), &[0]);
        assert!(f.mm.is_allocated(0));
    }

    #[test]
    fn validation_failures_leave_no_trace() {
        let mut f = Fixture::new();
        assert!(matches!(f.load(""), Err(LoadError::InvalidProgram(_))));
        assert!(matches!(f.load("   \n "), Err(LoadError::InvalidProgram(_))));
        assert!(matches!(f.load("A9 1"), Err(LoadError::InvalidProgram(_))));
        assert!(matches!(f.load("A9 ZZ"), Err(LoadError::InvalidProgram(_))));
        assert!(matches!(f.load("A9 100"), Err(LoadError::InvalidProgram(_))));

        let too_big = vec!["EA"; 257].join(" ");
        assert_eq!(
            f.load(&too_big),
            Err(LoadError::ProgramTooLarge { len: 257, max: 256 })
        );

        let busy = f
            .mm
            .load_program(["EA"], true, &mut f.mem, &mut f.ready);
        assert_eq!(busy, Err(LoadError::SystemBusy));

        assert_eq!(f.mm.free_partitions(), 3);
        assert_eq!(f.mm.processes().count(), 0);
        assert!(f.mem.physical().as_slice().iter().all(|b| *b == 0));

        // The first successful load still gets pid 0.
        assert_eq!(f.load("EA").unwrap(), 0);
    }

    #[test]
    fn exactly_one_partition_fits() {
        let mut f = Fixture::new();
        let full = vec!["EA"; 256].join(" ");
        let pid = f.load(&full).unwrap();
        let pcb = f.mm.pcb(pid).unwrap();
        assert_eq!(pcb.limit() - pcb.base() + 1, 256);
    }

    #[test]
    fn exhaustion_then_reuse_of_released_partition() {
        let mut f = Fixture::new();
        for expected in 0..3 {
            assert_eq!(f.load("EA 00").unwrap(), expected);
        }
        assert_eq!(f.load("EA 00"), Err(LoadError::NoPartitionsAvailable));

        assert!(f.mm.mark_terminated(1, &mut f.ready));
        let pid = f.load("A9 07 00").unwrap();
        assert_eq!(pid, 3, "pids are never reused");
        assert_eq!(f.mm.pcb(pid).unwrap().segment(), 1);
        // Stale bytes of the previous owner are gone.
        assert_eq!(&f.mem.physical().as_slice()[256..260], &[0xA9, 0x07, 0x00, 0x00]);
    }

    #[test]
    fn mark_terminated_is_idempotent() {
        let mut f = Fixture::new();
        let a = f.load("EA").unwrap();
        let b = f.load("EA").unwrap();
        f.ready.enqueue(a);
        f.ready.enqueue(b);

        assert!(f.mm.mark_terminated(a, &mut f.ready));
        let snapshot = (f.mm.pcb(a).cloned(), f.ready.clone(), f.mm.free_partitions());

        assert!(!f.mm.mark_terminated(a, &mut f.ready));
        assert!(!f.mm.mark_terminated(99, &mut f.ready));
        assert_eq!(
            (f.mm.pcb(a).cloned(), f.ready.clone(), f.mm.free_partitions()),
            snapshot
        );

        let pcb = f.mm.pcb(a).unwrap();
        assert!(pcb.is_terminated());
        assert_eq!(pcb.location, Location::Released);
        assert_eq!(f.ready.iter().collect::<Vec<_>>(), vec![b]);
        assert_eq!(f.mm.resident(), &[b]);
    }

    #[test]
    fn cleanup_releases_only_unreleased_terminated() {
        let mut f = Fixture::new();
        let a = f.load("EA").unwrap();
        let b = f.load("EA").unwrap();

        // Terminated without going through `mark_terminated`.
        f.mm.pcb_mut(a)
            .unwrap()
            .transition(ProcessState::Terminated)
            .unwrap();
        assert!(f.mm.is_allocated(0));

        assert_eq!(f.mm.cleanup_terminated(&mut f.ready), 1);
        assert!(!f.mm.is_allocated(0));
        assert!(f.mm.is_allocated(1));

        // A new owner of partition 0 is not disturbed by a second sweep.
        let c = f.load("EA").unwrap();
        assert_eq!(f.mm.pcb(c).unwrap().segment(), 0);
        assert_eq!(f.mm.cleanup_terminated(&mut f.ready), 0);
        assert!(f.mm.is_allocated(0));
        assert_eq!(f.mm.pcb(b).unwrap().state(), ProcessState::Resident);
    }

    #[test]
    fn reset_frees_everything_but_keeps_pid_counter() {
        let mut f = Fixture::new();
        f.load("EA").unwrap();
        f.load("EA").unwrap();
        f.mm.reset();
        assert_eq!(f.mm.free_partitions(), 3);
        assert!(f.mm.processes().next().is_none());
        assert!(f.mm.resident().is_empty());
        assert_eq!(f.load("EA").unwrap(), 2);
    }
}
