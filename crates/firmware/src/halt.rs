//! Terminal halt.
//!
//! The dispatcher stops at `Halted` and returns; this module is where the
//! core actually stops. A [`HaltPolicy`] sees the finished [`Diagnosis`]
//! first, so a board integration can persist it or blink an LED, but every
//! path still ends in [`halt`].

use fault_core::{Diagnosis, FaultDispatcher, Halted, LogSink, SnapshotSource};

/// Hook run once, after diagnosis and before the core stops.
pub trait HaltPolicy {
    /// Inspect the diagnosis. Runs in HardFault context: no blocking, no
    /// allocation.
    fn before_halt(&mut self, diagnosis: &Diagnosis);
}

/// Policy that does nothing and lets the core halt.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinHalt;

impl HaltPolicy for SpinHalt {
    fn before_halt(&mut self, _diagnosis: &Diagnosis) {}
}

/// Hand the diagnosis to `policy` and return it.
///
/// The recoverability signal reaches the policy unchanged; nothing here
/// resumes execution.
pub fn conclude<L, P>(halted: Halted<L>, policy: &mut P) -> Diagnosis
where
    P: HaltPolicy + ?Sized,
{
    let (diagnosis, _sink) = halted.into_parts();
    policy.before_halt(&diagnosis);
    diagnosis
}

/// Capture from `source`, decode into `sink`, then hand the result to
/// `policy`.
///
/// Everything the HardFault entry does short of stopping the core.
pub fn diagnose_and_conclude<S, L, P>(source: &mut S, sink: L, policy: &mut P) -> Diagnosis
where
    S: SnapshotSource + ?Sized,
    L: LogSink,
    P: HaltPolicy + ?Sized,
{
    let halted = FaultDispatcher::new(sink).dispatch(source);
    conclude(halted, policy)
}

/// Stop the core: mask interrupts and sleep forever.
///
/// `wfi` keeps the part in a low-power state while a debugger attaches; with
/// interrupts masked no handler can run again.
#[cfg(feature = "hardware")]
pub fn halt() -> ! {
    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::wfi();
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use fault_core::decoder::CFSR_MMARVALID;
    use fault_core::decoder::SFSR_INVEP;
    use fault_core::{NullSink, RegisterSnapshot, ViolationKind};

    #[derive(Default)]
    struct Remember {
        seen: Option<Diagnosis>,
    }

    impl HaltPolicy for Remember {
        fn before_halt(&mut self, diagnosis: &Diagnosis) {
            self.seen = Some(diagnosis.clone());
        }
    }

    #[test]
    fn test_policy_receives_recoverability() {
        let mut snap = RegisterSnapshot::default();
        snap.secure.cfsr = CFSR_MMARVALID;
        snap.secure.mmfar = 0x2000_1000;

        let halted = FaultDispatcher::new(NullSink).dispatch(&mut snap);
        let mut policy = Remember::default();
        let diagnosis = conclude(halted, &mut policy);

        assert!(diagnosis.recoverability.secure);
        assert_eq!(policy.seen.as_ref(), Some(&diagnosis));
    }

    #[test]
    fn test_spin_halt_is_a_no_op() {
        let halted = FaultDispatcher::new(NullSink).dispatch(&mut RegisterSnapshot::default());
        let diagnosis = conclude(halted, &mut SpinHalt);
        assert!(diagnosis.report.is_empty());
    }

    #[derive(Default)]
    struct CountCalls {
        calls: usize,
        kinds: std::vec::Vec<ViolationKind>,
    }

    impl HaltPolicy for CountCalls {
        fn before_halt(&mut self, diagnosis: &Diagnosis) {
            self.calls += 1;
            self.kinds = diagnosis.report.flags().map(|f| f.kind).collect();
        }
    }

    #[test]
    fn test_entry_path_runs_the_supplied_policy_once() {
        let mut snap = RegisterSnapshot::default();
        snap.sau.sfsr = SFSR_INVEP;

        let mut policy = CountCalls::default();
        let diagnosis = diagnose_and_conclude(&mut snap, NullSink, &mut policy);

        assert_eq!(policy.calls, 1);
        assert_eq!(policy.kinds, [ViolationKind::InvalidEntryPoint]);
        assert!(!diagnosis.recoverability.secure);
    }

    #[test]
    fn test_entry_path_accepts_dyn_policy() {
        let mut remember = Remember::default();
        let policy: &mut dyn HaltPolicy = &mut remember;
        let diagnosis = diagnose_and_conclude(&mut RegisterSnapshot::default(), NullSink, policy);
        assert_eq!(remember.seen, Some(diagnosis));
    }
}
