//! Architecture boundary tests. Run with `cargo test -p firmware --test arch_boundaries`
// Architecture test file: unwrap/indexing are intentional test mechanisms.
#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::assertions_on_constants,
    clippy::arithmetic_side_effects
)]
//!
//! Layering rules:
//!   Rule 1: fault-core must not depend on firmware (decoding is hardware-free)
//!   Rule 2: fault-core is usable through its public API alone, with a stored
//!           snapshot standing in for the MMIO capture
//!   Rule 3: the firmware shim only adds capture, logging and halting; the
//!           decoded result is identical to calling fault-core directly
//!
//! The primary enforcement is the dependency graph itself: if `fault-core`
//! ever depended on `firmware`, this integration test binary would fail to
//! link (firmware -> fault-core -> firmware).

use fault_core::{diagnose, FaultDispatcher, NullSink, RegisterSnapshot, SnapshotSource};
use firmware::capture::{capture_with, CAPTURE_READS};
use firmware::exception_handlers::HARDFAULT_DEFINED;
use firmware::{conclude, SpinHalt};

/// The HardFault module compiles on the host.
#[test]
fn hardfault_module_exists() {
    assert!(HARDFAULT_DEFINED);
}

/// fault-core's traits are reachable without any firmware type.
#[test]
fn core_traits_are_independent() {
    fn _assert_source<T: SnapshotSource>() {}
    fn _assert_sink<T: fault_core::LogSink>() {}
    _assert_source::<RegisterSnapshot>();
    _assert_sink::<NullSink>();
}

/// A capture through the firmware address plan diagnoses exactly like the
/// same snapshot handed to fault-core directly.
#[test]
fn shim_adds_nothing_to_the_decoding() {
    let snap = capture_with(|addr| match addr {
        0xE000_EDE4 => 0x48,        // SFSR: AUVIOL | SFARVALID
        0xE000_EDE8 => 0x3000_0000, // SFAR
        0xE002_ED28 => 1 << 25,     // NS CFSR: DIVBYZERO
        _ => 0,
    });

    let mut replay = snap;
    let halted = FaultDispatcher::new(NullSink).dispatch(&mut replay);
    let via_shim = conclude(halted, &mut SpinHalt);

    assert_eq!(via_shim, diagnose(&snap));
    assert_eq!(via_shim.report.len(), 3);
}

/// One read per register, no more.
#[test]
fn capture_read_budget() {
    let mut reads = 0usize;
    let _ = capture_with(|_| {
        reads += 1;
        0
    });
    assert_eq!(reads, CAPTURE_READS);
    assert_eq!(CAPTURE_READS, 47);
}
