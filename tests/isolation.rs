use mos::{Machine, MachineConfig, ProcessState, RunExit};
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn image(bytes: &[u8]) -> String {
    mos::mem::hex::format_bytes(bytes)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Arbitrary programs can only write inside their own partition, and every one of them either
    /// finishes, traps, or is still running when the budget runs out.
    #[test]
    fn random_programs_stay_in_their_partition(
        program in prop::collection::vec(any::<u8>(), 1..=64),
        neighbour in prop::collection::vec(any::<u8>(), 1..=64),
        quantum in 1u32..=8,
    ) {
        init_tracing();
        let config = MachineConfig { quantum, ..MachineConfig::default() };
        let mut m = Machine::with_config(config).unwrap();
        let guard = m.load(&image(&neighbour)).unwrap();
        let pid = m.load(&image(&program)).unwrap();
        let before = m.memory().to_vec();

        m.run(pid).unwrap();
        let exit = m.run_slice(2_000).unwrap();

        let pcb = m.pcb(pid).unwrap();
        let (base, limit) = (pcb.base(), pcb.limit());
        for (addr, (old, new)) in before.iter().zip(m.memory()).enumerate() {
            if addr < base || addr > limit {
                prop_assert_eq!(old, new, "cell 0x{:04x} outside 0x{:04x}..=0x{:04x}", addr, base, limit);
            }
        }
        prop_assert_eq!(m.pcb(guard).unwrap().state(), ProcessState::Resident);

        match exit {
            RunExit::Idle { .. } => prop_assert_eq!(pcb.state(), ProcessState::Terminated),
            // The budget may end on the very pulse that halted the process.
            RunExit::Completed { .. } => prop_assert!(matches!(
                pcb.state(),
                ProcessState::Running | ProcessState::Terminated
            )),
        }
        prop_assert!(m.traps().iter().all(|t| t.pid == pid));
    }
}

#[test]
fn facade_reexports_the_kernel() {
    init_tracing();
    let mut m = mos::Machine::with_defaults();
    let pid = m.load("A9 2A 00").unwrap();
    m.run(pid).unwrap();
    assert!(matches!(m.run_slice(10).unwrap(), RunExit::Idle { executed: 2 }));
    assert_eq!(m.pcb(pid).unwrap().regs.acc, 0x2A);
    assert_eq!(mos::kernel::DEFAULT_QUANTUM, m.config().quantum);
}
