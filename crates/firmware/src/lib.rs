//! TrustZone secure-world fault handling shim.
//!
//! Glue between the RT6xx hardware and the pure decoding in `fault-core`:
//!
//! ```text
//! HardFault vector (exception_handlers)
//!         ↓
//! MmioRegisters (capture)  ──▶  fault_core::FaultDispatcher  ──▶  DefmtSink (log)
//!         ↓
//! HaltPolicy + halt() (halt)   on_hard_fault_with(&mut policy) picks the policy
//! ```
//!
//! # Features
//!
//! - `hardware` - Build for the Cortex-M33 secure image (cortex-m-rt handler,
//!   RT685 PAC register blocks, defmt-rtt, panic-probe)
//! - `defmt` - defmt logging sink only
//!
//! # Hardware Target
//!
//! ```bash
//! cargo build --release --target thumbv8m.main-none-eabihf -p firmware --features hardware
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
// unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
#![warn(clippy::dbg_macro)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod capture;
pub mod exception_handlers;
pub mod halt;

#[cfg(feature = "defmt")]
pub mod log;

pub use capture::{capture_from, capture_with, AddressPlan, RegisterBank};
pub use halt::{conclude, diagnose_and_conclude, HaltPolicy, SpinHalt};

#[cfg(feature = "hardware")]
pub use capture::MmioRegisters;

#[cfg(feature = "hardware")]
pub use halt::halt;

#[cfg(feature = "defmt")]
pub use log::DefmtSink;

// Global defmt logger and panic handler for the secure image.
#[cfg(feature = "hardware")]
use defmt_rtt as _;
#[cfg(feature = "hardware")]
use panic_probe as _;
