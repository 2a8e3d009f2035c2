//! Configurable Fault Status Register evaluators.
//!
//! One evaluator per CFSR sub-field. All three read the same
//! [`CfsrSnapshot`]; the security domain only tags the output. Only the
//! MemManage evaluator produces a recoverability signal.

use crate::decoder::{decode, Decoded, BUS_RULES, CFSR_MMARVALID, MEM_MANAGE_RULES, USAGE_RULES};
use crate::snapshot::CfsrSnapshot;
use crate::violation::{FaultSource, SecurityDomain};

/// Output of [`evaluate_mem_manage`].
#[derive(Debug, Clone)]
pub struct MemManageFindings {
    /// Decoded MemManage flags, in table order.
    pub flags: Decoded<'static>,
    /// `true` iff MMARVALID is set, whatever the other MemManage bits say.
    pub recoverable: bool,
}

/// Decode the MemManage sub-field.
///
/// Recoverability is the single heuristic available: a valid MMFAR means the
/// faulting access is known and could in principle be skipped or remapped.
/// The dispatcher reports the signal and leaves the decision to the platform.
pub fn evaluate_mem_manage(snapshot: &CfsrSnapshot, domain: SecurityDomain) -> MemManageFindings {
    MemManageFindings {
        flags: decode(
            snapshot.mem_manage_bits(),
            MEM_MANAGE_RULES,
            FaultSource::Cfsr(domain),
            snapshot.mmfar,
        ),
        recoverable: snapshot.cfsr & CFSR_MMARVALID != 0,
    }
}

/// Decode the BusFault sub-field. Bus faults are never recoverable.
pub fn evaluate_bus(snapshot: &CfsrSnapshot, domain: SecurityDomain) -> Decoded<'static> {
    decode(
        snapshot.bus_bits(),
        BUS_RULES,
        FaultSource::Cfsr(domain),
        snapshot.bfar,
    )
}

/// Decode the UsageFault sub-field. Usage faults carry no address.
pub fn evaluate_usage(snapshot: &CfsrSnapshot, domain: SecurityDomain) -> Decoded<'static> {
    decode(snapshot.usage_bits(), USAGE_RULES, FaultSource::Cfsr(domain), 0)
}
