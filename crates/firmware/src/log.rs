//! defmt logging sink.
//!
//! Maps each [`Severity`] onto the matching defmt macro. Which levels survive
//! is decided at build time by `DEFMT_LOG`; the handler pays nothing for
//! filtered events.

use fault_core::{DiagnosticEvent, LogSink, Severity};

/// [`LogSink`] over the global defmt logger (RTT on target).
///
/// defmt-rtt never blocks when the host is not attached, so this sink is
/// safe to use from the HardFault handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefmtSink;

impl LogSink for DefmtSink {
    fn log(&mut self, severity: Severity, event: &DiagnosticEvent<'_>) {
        match severity {
            Severity::Trace => defmt::trace!("{}", event),
            Severity::Debug => defmt::debug!("{}", event),
            Severity::Info => defmt::info!("{}", event),
            Severity::Warn => defmt::warn!("{}", event),
            Severity::Error => defmt::error!("{}", event),
        }
    }
}
