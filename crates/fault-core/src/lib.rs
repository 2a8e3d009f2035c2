//! HardFault diagnosis for ARMv8-M TrustZone targets.
//!
//! Decodes the SAU, both security domains' CFSR and the AHB secure
//! controller into an ordered [`DiagnosticReport`], streaming each entry to a
//! [`LogSink`] as it is produced. Everything here is a pure function of a
//! [`RegisterSnapshot`]; the `firmware` crate supplies the MMIO capture, the
//! trap entry and the halt loop.
//!
//! # Pipeline
//!
//! ```text
//! SnapshotSource ──capture──▶ RegisterSnapshot
//!                                   │
//!                 FaultDispatcher ──┼──▶ sau::evaluate
//!                                   ├──▶ cfsr::evaluate_{mem_manage,usage,bus}  (S, then NS)
//!                                   └──▶ ahb::scan
//!                                   │
//!                                   ▼
//!                        DiagnosticReport + Recoverability ──▶ Halted
//! ```
//!
//! # Features
//!
//! - `std`: `std::error::Error` impls for the error types (host tools)
//! - `defmt`: `defmt::Format` on every diagnosis type (target builds)
//! - `serde`: `Serialize`/`Deserialize` on the snapshot types (register dumps)
//!
//! # Example
//!
//! ```
//! use fault_core::{diagnose, RegisterSnapshot, ViolationKind};
//!
//! let mut snap = RegisterSnapshot::default();
//! snap.secure.cfsr = fault_core::decoder::CFSR_MMARVALID;
//! snap.secure.mmfar = 0x2000_1000;
//!
//! let diagnosis = diagnose(&snap);
//! let flag = diagnosis.report.flags().next().unwrap();
//! assert_eq!(flag.kind, ViolationKind::MemManageFaultAddress);
//! assert_eq!(flag.fault_address(), Some(0x2000_1000));
//! assert!(diagnosis.recoverability.secure);
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in a HardFault handler
#![deny(clippy::unreachable)]
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_code)] // register access lives in the firmware crate
#![warn(clippy::print_stdout)]
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

// The thiserror derive emits `std::error::Error` impls when `std` is enabled.
#[cfg(feature = "std")]
extern crate std;

pub mod ahb;
pub mod cfsr;
pub mod config;
pub mod decoder;
pub mod dispatcher;
pub mod report;
pub mod sau;
pub mod secure_channel;
pub mod sink;
pub mod snapshot;
pub mod violation;

pub use ahb::{AccessType, AhbViolationRecord, MasterSecurityLevel};
pub use dispatcher::{
    diagnose, Diagnosis, DispatchState, FaultDispatcher, Halted, Recoverability, Stage,
};
pub use report::{DiagnosticReport, ReportEntry, ReportError};
pub use secure_channel::{CipherError, EciesCipher};
pub use sink::{DiagnosticEvent, LogSink, NullSink, Section, Severity};
pub use snapshot::{AhbSnapshot, CfsrSnapshot, RegisterSnapshot, SauSnapshot, SnapshotSource};
pub use violation::{FaultSource, SecurityDomain, ViolationFlag, ViolationKind};
