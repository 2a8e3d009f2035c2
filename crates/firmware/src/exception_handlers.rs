//! Cortex-M exception handlers for the TrustZone secure image.
//!
//! - **HardFault**: on ARMv8-M this is where SecureFault, BusFault,
//!   MemManage and UsageFault escalate when their own handlers are disabled,
//!   and where the AHB secure controller's violations surface as a secure bus
//!   fault. The handler captures every fault status register once, decodes
//!   them with [`fault_core::FaultDispatcher`], logs each finding over defmt
//!   and halts.
//!
//! # Hardware-only handler
//!
//! The `#[cortex_m_rt::exception]` attribute requires ARM target intrinsics and
//! is therefore gated behind `#[cfg(feature = "hardware")]`. The module itself
//! (and `HARDFAULT_DEFINED`) compiles unconditionally so host tests can verify
//! the module exists without needing an ARM toolchain.

#![allow(clippy::doc_markdown)]

#[cfg(feature = "hardware")]
use crate::capture::MmioRegisters;
#[cfg(feature = "hardware")]
use crate::halt::{diagnose_and_conclude, halt, HaltPolicy, SpinHalt};
#[cfg(feature = "hardware")]
use crate::log::DefmtSink;

/// Marker constant checked by the architecture tests.
///
/// `true` means this module compiled, so the HardFault handler below links
/// into any `hardware` build.
pub const HARDFAULT_DEFINED: bool = true;

/// Diagnose the current fault, run `policy`, and halt.
///
/// Board integrations that need to persist the diagnosis call this from their
/// own HardFault vector with their [`HaltPolicy`]. Never returns.
///
/// # Safety
///
/// Must run in secure state, from the HardFault handler.
#[cfg(feature = "hardware")]
#[allow(unsafe_code)]
pub unsafe fn on_hard_fault_with<P: HaltPolicy + ?Sized>(policy: &mut P) -> ! {
    // SAFETY: caller guarantees secure state on the RT6xx memory map.
    let mut registers = unsafe { MmioRegisters::new() };
    diagnose_and_conclude(&mut registers, DefmtSink, policy);
    halt()
}

/// [`on_hard_fault_with`] using [`SpinHalt`].
///
/// Zero-argument trap entry; the exception vector calls it through
/// [`HardFault`].
///
/// # Safety
///
/// Same as [`on_hard_fault_with`].
#[cfg(feature = "hardware")]
#[allow(unsafe_code)]
pub unsafe fn on_hard_fault() -> ! {
    // SAFETY: forwarded from the caller.
    unsafe { on_hard_fault_with(&mut SpinHalt) }
}

/// HardFault exception handler (hardware target only).
///
/// Logs the stacked PC and LR, then runs the full diagnosis.
///
/// # Safety
///
/// Returning from a HardFault handler is undefined behaviour on Cortex-M; the
/// `-> !` return type rules it out.
#[cfg(feature = "hardware")]
#[cortex_m_rt::exception]
#[allow(unsafe_code)]
unsafe fn HardFault(ef: &cortex_m_rt::ExceptionFrame) -> ! {
    defmt::error!(
        "HardFault: stacked PC {=u32:#010x} LR {=u32:#010x} xPSR {=u32:#010x}",
        ef.pc(),
        ef.lr(),
        ef.xpsr()
    );
    // SAFETY: the secure image installs this vector; HardFault targets the
    // secure state (AIRCR.BFHFNMINS = 0).
    unsafe { on_hard_fault() }
}
