//! HardFault dispatcher.
//!
//! `FaultDispatcher` drives one diagnosis pass: capture the register set once,
//! run the evaluators in fixed priority order, stream every entry to the
//! [`LogSink`] as it is produced, and stop in [`DispatchState::Halted`].
//!
//! ```text
//! Idle → CapturingSnapshot → Evaluating(Sau) → Evaluating(SecureCfsr)
//!      → Evaluating(NonSecureCfsr) → Evaluating(Ahb) → Halted
//! ```
//!
//! [`FaultDispatcher::dispatch`] consumes the dispatcher, so a pass cannot be
//! re-run and `Halted` has no outgoing edge. The dispatcher never halts the
//! CPU itself; it hands a [`Halted`] value back to the platform, which owns the
//! halt loop and decides what to do with the recoverability signal.

use heapless::Vec;

use crate::report::{DiagnosticReport, ReportEntry};
use crate::sink::{DiagnosticEvent, LogSink, NullSink, Section, Severity};
use crate::snapshot::{CfsrSnapshot, RegisterSnapshot, SnapshotSource};
use crate::violation::{SecurityDomain, ViolationFlag};
use crate::{ahb, cfsr, sau};

/// Evaluation stage, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    /// Security Attribution Unit.
    Sau,
    /// Secure SCB CFSR.
    SecureCfsr,
    /// Non-secure SCB CFSR.
    NonSecureCfsr,
    /// AHB secure controller.
    Ahb,
}

/// Dispatcher lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchState {
    /// Constructed, not yet entered.
    Idle,
    /// Reading the register set.
    CapturingSnapshot,
    /// Running one evaluator.
    Evaluating(Stage),
    /// Terminal.
    Halted,
}

/// Number of states in a complete pass, `Idle` and `Halted` included.
pub const STATE_TRACE_LEN: usize = 7;

impl DispatchState {
    /// The single state that may follow this one. `None` for `Halted`.
    pub const fn successor(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::CapturingSnapshot),
            Self::CapturingSnapshot => Some(Self::Evaluating(Stage::Sau)),
            Self::Evaluating(Stage::Sau) => Some(Self::Evaluating(Stage::SecureCfsr)),
            Self::Evaluating(Stage::SecureCfsr) => Some(Self::Evaluating(Stage::NonSecureCfsr)),
            Self::Evaluating(Stage::NonSecureCfsr) => Some(Self::Evaluating(Stage::Ahb)),
            Self::Evaluating(Stage::Ahb) => Some(Self::Halted),
            Self::Halted => None,
        }
    }

    /// `true` iff `next` is the successor of `self`.
    ///
    /// There are no self-loops: `Idle → Idle` and `Halted → Halted` are both
    /// rejected.
    pub fn can_advance_to(self, next: Self) -> bool {
        self.successor() == Some(next)
    }

    /// `true` for `Halted`.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Halted)
    }
}

/// MemManage recoverability signal, one per CFSR domain.
///
/// Only a valid MMFAR sets it. The dispatcher never acts on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Recoverability {
    /// Secure MemManage fault address was valid.
    pub secure: bool,
    /// Non-secure MemManage fault address was valid.
    pub non_secure: bool,
}

impl Recoverability {
    /// Signal for one domain.
    pub const fn for_domain(&self, domain: SecurityDomain) -> bool {
        match domain {
            SecurityDomain::Secure => self.secure,
            SecurityDomain::NonSecure => self.non_secure,
        }
    }

    /// `true` when either domain reported a recoverable fault.
    pub const fn any(&self) -> bool {
        self.secure || self.non_secure
    }

    fn set(&mut self, domain: SecurityDomain) {
        match domain {
            SecurityDomain::Secure => self.secure = true,
            SecurityDomain::NonSecure => self.non_secure = true,
        }
    }
}

/// Everything one pass produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnosis {
    /// Entries in evaluation order.
    pub report: DiagnosticReport,
    /// MemManage recoverability per domain.
    pub recoverability: Recoverability,
    /// Entries logged but not stored because the report was full.
    pub dropped: usize,
}

/// A dispatcher that has reached [`DispatchState::Halted`].
#[derive(Debug)]
pub struct Halted<L> {
    diagnosis: Diagnosis,
    trace: Vec<DispatchState, STATE_TRACE_LEN>,
    sink: L,
}

impl<L> Halted<L> {
    /// Always [`DispatchState::Halted`].
    pub const fn state(&self) -> DispatchState {
        DispatchState::Halted
    }

    /// Result of the pass.
    pub const fn diagnosis(&self) -> &Diagnosis {
        &self.diagnosis
    }

    /// Every state visited, `Idle` first and `Halted` last.
    pub fn trace(&self) -> &[DispatchState] {
        &self.trace
    }

    /// The sink the dispatcher logged to.
    pub fn sink(&self) -> &L {
        &self.sink
    }

    /// Split into the diagnosis and the sink.
    pub fn into_parts(self) -> (Diagnosis, L) {
        (self.diagnosis, self.sink)
    }
}

/// One-shot HardFault diagnosis.
///
/// Construct with [`FaultDispatcher::new`], run with
/// [`FaultDispatcher::dispatch`].
#[derive(Debug)]
pub struct FaultDispatcher<L: LogSink> {
    sink: L,
    state: DispatchState,
    trace: Vec<DispatchState, STATE_TRACE_LEN>,
    diagnosis: Diagnosis,
}

impl<L: LogSink> FaultDispatcher<L> {
    /// New dispatcher in [`DispatchState::Idle`].
    pub fn new(sink: L) -> Self {
        let mut trace = Vec::new();
        // Capacity is STATE_TRACE_LEN >= 1; an empty Vec always accepts one.
        let _ = trace.push(DispatchState::Idle);
        Self {
            sink,
            state: DispatchState::Idle,
            trace,
            diagnosis: Diagnosis::default(),
        }
    }

    /// Current state.
    pub const fn state(&self) -> DispatchState {
        self.state
    }

    /// Run the full pass and return the halted dispatcher.
    ///
    /// `source` is read exactly once. Evaluation order:
    ///
    /// 1. SAU (only when SFSR is non-zero).
    /// 2. Secure CFSR, then non-secure CFSR. Within each: MemManage, Usage,
    ///    Bus, each group only when its sub-field is non-zero and preceded by
    ///    a section header.
    /// 3. AHB secure controller, layers ascending, with a section header
    ///    when any validity bit is set.
    pub fn dispatch<S>(mut self, source: &mut S) -> Halted<L>
    where
        S: SnapshotSource + ?Sized,
    {
        self.sink.log(Severity::Error, &DiagnosticEvent::Entered);

        self.advance();
        let snapshot = source.capture();

        self.advance();
        self.evaluate_sau(&snapshot);

        self.advance();
        self.evaluate_cfsr(&snapshot.secure, SecurityDomain::Secure);

        self.advance();
        self.evaluate_cfsr(&snapshot.non_secure, SecurityDomain::NonSecure);

        self.advance();
        self.evaluate_ahb(&snapshot);

        if self.diagnosis.dropped > 0 {
            self.log(&DiagnosticEvent::Dropped(self.diagnosis.dropped));
        }

        self.advance();
        self.log(&DiagnosticEvent::Halted);

        Halted {
            diagnosis: self.diagnosis,
            trace: self.trace,
            sink: self.sink,
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.state.successor() {
            self.state = next;
            // One push per edge; a full pass has exactly STATE_TRACE_LEN states.
            let _ = self.trace.push(next);
        }
    }

    fn log(&mut self, event: &DiagnosticEvent<'_>) {
        self.sink.log(event.severity(), event);
    }

    fn record(&mut self, entry: ReportEntry) {
        self.log(&DiagnosticEvent::Entry(&entry));
        if self.diagnosis.report.push(entry).is_err() {
            self.diagnosis.dropped = self.diagnosis.dropped.saturating_add(1);
        }
    }

    fn record_flags(&mut self, flags: impl Iterator<Item = ViolationFlag>) {
        for flag in flags {
            self.record(ReportEntry::Flag(flag));
        }
    }

    fn evaluate_sau(&mut self, snapshot: &RegisterSnapshot) {
        if snapshot.sau.sfsr == 0 {
            return;
        }
        let findings = sau::evaluate(&snapshot.sau);
        self.record_flags(findings.flags());
    }

    fn evaluate_cfsr(&mut self, snapshot: &CfsrSnapshot, domain: SecurityDomain) {
        if snapshot.cfsr == 0 {
            return;
        }

        if snapshot.mem_manage_bits() != 0 {
            self.log(&DiagnosticEvent::Section(Section::MemManage(domain)));
            let findings = cfsr::evaluate_mem_manage(snapshot, domain);
            self.record_flags(findings.flags);
            if findings.recoverable {
                self.diagnosis.recoverability.set(domain);
                self.log(&DiagnosticEvent::Recoverable(domain));
            }
        }

        if snapshot.usage_bits() != 0 {
            self.log(&DiagnosticEvent::Section(Section::Usage(domain)));
            self.record_flags(cfsr::evaluate_usage(snapshot, domain));
        }

        if snapshot.bus_bits() != 0 {
            self.log(&DiagnosticEvent::Section(Section::Bus(domain)));
            self.record_flags(cfsr::evaluate_bus(snapshot, domain));
        }
    }

    fn evaluate_ahb(&mut self, snapshot: &RegisterSnapshot) {
        if snapshot.ahb.valid == 0 {
            return;
        }
        self.log(&DiagnosticEvent::Section(Section::Ahb));
        for record in ahb::scan(&snapshot.ahb) {
            self.record(ReportEntry::Ahb(record));
        }
    }
}

/// Run a silent pass over a stored snapshot.
///
/// Same result as [`FaultDispatcher::dispatch`] with a [`NullSink`]; the
/// snapshot is not modified.
pub fn diagnose(snapshot: &RegisterSnapshot) -> Diagnosis {
    let mut source = *snapshot;
    let (diagnosis, _) = FaultDispatcher::new(NullSink).dispatch(&mut source).into_parts();
    diagnosis
}
