//! Logging sink interface.
//!
//! The dispatcher reports progress as structured [`DiagnosticEvent`]s rather
//! than preformatted strings. Firmware forwards them to defmt; the host
//! decoder prints them with colour; tests record them.
//!
//! A sink runs inside the HardFault handler. Implementations must not block,
//! allocate or take a lock that the faulting context may already hold.

use core::fmt;

use crate::report::ReportEntry;
use crate::violation::SecurityDomain;

/// Log severity, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Severity {
    /// Per-stage progress.
    Trace,
    /// Section headers.
    Debug,
    /// Informational.
    Info,
    /// Recoverability and dropped-entry notices.
    Warn,
    /// Decoded violations.
    Error,
}

impl Severity {
    /// Upper-case label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

/// Group header emitted before a block of related entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Section {
    /// MemManage sub-field of one domain's CFSR.
    MemManage(SecurityDomain),
    /// UsageFault sub-field of one domain's CFSR.
    Usage(SecurityDomain),
    /// BusFault sub-field of one domain's CFSR.
    Bus(SecurityDomain),
    /// AHB secure controller violation registers.
    Ahb,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MemManage(d) => write!(f, "CFSR({}) MemManage fault", d.label()),
            Self::Usage(d) => write!(f, "CFSR({}) Usage fault", d.label()),
            Self::Bus(d) => write!(f, "CFSR({}) Bus fault", d.label()),
            Self::Ahb => f.write_str("additional AHB secure controller information"),
        }
    }
}

/// One thing the dispatcher has to say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticEvent<'a> {
    /// Trap entry banner.
    Entered,
    /// Group header. Never part of the report.
    Section(Section),
    /// A report entry, emitted as soon as it is produced.
    Entry(&'a ReportEntry),
    /// The MemManage evaluator of this domain saw a valid fault address.
    Recoverable(SecurityDomain),
    /// Entries that did not fit in the report.
    Dropped(usize),
    /// Diagnosis complete; the caller halts next.
    Halted,
}

impl DiagnosticEvent<'_> {
    /// Severity the dispatcher logs this event at.
    pub const fn severity(&self) -> Severity {
        match self {
            Self::Entered => Severity::Error,
            Self::Section(_) => Severity::Debug,
            Self::Entry(_) => Severity::Error,
            Self::Recoverable(_) | Self::Dropped(_) => Severity::Warn,
            Self::Halted => Severity::Info,
        }
    }
}

impl fmt::Display for DiagnosticEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entered => f.write_str("entering HardFault"),
            Self::Section(section) => write!(f, "-- {section} --"),
            Self::Entry(entry) => fmt::Display::fmt(entry, f),
            Self::Recoverable(d) => write!(
                f,
                "CFSR({}) MemManage fault address is valid; fault may be recoverable",
                d.label()
            ),
            Self::Dropped(n) => write!(f, "{n} report entries dropped"),
            Self::Halted => f.write_str("diagnosis complete, halting"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DiagnosticEvent<'_> {
    fn format(&self, f: defmt::Formatter<'_>) {
        match self {
            Self::Entered => defmt::write!(f, "entering HardFault"),
            Self::Section(section) => defmt::write!(f, "-- {} --", section),
            Self::Entry(entry) => defmt::write!(f, "{}", entry),
            Self::Recoverable(d) => defmt::write!(
                f,
                "CFSR({=str}) MemManage fault address is valid; fault may be recoverable",
                d.label()
            ),
            Self::Dropped(n) => defmt::write!(f, "{=usize} report entries dropped", *n),
            Self::Halted => defmt::write!(f, "diagnosis complete, halting"),
        }
    }
}

/// Receiver of [`DiagnosticEvent`]s.
pub trait LogSink {
    /// Record one event. Must return promptly and must not fail.
    fn log(&mut self, severity: Severity, event: &DiagnosticEvent<'_>);
}

impl<S: LogSink + ?Sized> LogSink for &mut S {
    fn log(&mut self, severity: Severity, event: &DiagnosticEvent<'_>) {
        (**self).log(severity, event);
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&mut self, _severity: Severity, _event: &DiagnosticEvent<'_>) {}
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::violation::{FaultSource, ViolationFlag, ViolationKind};

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Debug);
        assert!(Severity::Warn < Severity::Error);
    }

    #[test]
    fn test_section_headers() {
        assert_eq!(
            Section::MemManage(SecurityDomain::Secure).to_string(),
            "CFSR(S) MemManage fault"
        );
        assert_eq!(
            Section::Bus(SecurityDomain::NonSecure).to_string(),
            "CFSR(NS) Bus fault"
        );
    }

    #[test]
    fn test_entry_event_renders_entry() {
        let entry = ReportEntry::Flag(ViolationFlag::new(
            FaultSource::Cfsr(SecurityDomain::Secure),
            ViolationKind::DivideByZero,
        ));
        let event = DiagnosticEvent::Entry(&entry);
        assert_eq!(event.to_string(), "SCB(S)->CFSR: divide by zero");
        assert_eq!(event.severity(), Severity::Error);
    }

    #[test]
    fn test_sink_through_mutable_reference() {
        struct Count(usize);
        impl LogSink for Count {
            fn log(&mut self, _: Severity, _: &DiagnosticEvent<'_>) {
                self.0 += 1;
            }
        }
        fn emit<L: LogSink>(mut sink: L) {
            sink.log(Severity::Info, &DiagnosticEvent::Halted);
        }
        let mut count = Count(0);
        emit(&mut count);
        emit(&mut count);
        assert_eq!(count.0, 2);
    }
}
