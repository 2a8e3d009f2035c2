//! Security Attribution Unit evaluator.
//!
//! The SFSR is decoded as a priority chain: at most one attribution flag is
//! reported (INVEP, then AUVIOL, then INVTRAN, else "unrecognized"), followed
//! by the SFAR address when SFARVALID is set. SAU faults never carry a
//! recoverability signal.

use crate::decoder::{first_match, SAU_PRIORITY_RULES, SFSR_SFARVALID};
use crate::snapshot::SauSnapshot;
use crate::violation::{FaultSource, ViolationFlag, ViolationKind};

/// Result of evaluating one [`SauSnapshot`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SauFindings {
    /// Highest-priority attribution condition, present whenever SFSR is
    /// non-zero.
    pub attribution: Option<ViolationFlag>,
    /// Faulting address, when SFARVALID is set.
    pub address: Option<ViolationFlag>,
}

impl SauFindings {
    /// Flags in report order.
    pub fn flags(&self) -> impl Iterator<Item = ViolationFlag> {
        self.attribution.into_iter().chain(self.address)
    }

    /// `true` when the SAU reported nothing.
    pub fn is_empty(&self) -> bool {
        self.attribution.is_none() && self.address.is_none()
    }
}

/// Decode the SAU fault status.
///
/// Any non-zero status yields exactly one attribution flag. A status word
/// that names none of INVEP, AUVIOL or INVTRAN (SFARVALID alone included)
/// is reported as [`ViolationKind::UnrecognizedSau`] with the raw SFSR.
pub fn evaluate(snapshot: &SauSnapshot) -> SauFindings {
    let status = snapshot.sfsr;

    let attribution = if status == 0 {
        None
    } else {
        Some(match first_match(status, SAU_PRIORITY_RULES) {
            Some(rule) => ViolationFlag::new(FaultSource::Sau, rule.kind),
            None => ViolationFlag::with_detail(FaultSource::Sau, ViolationKind::UnrecognizedSau, status),
        })
    };

    let address = (status & SFSR_SFARVALID != 0).then_some(ViolationFlag::with_detail(
        FaultSource::Sau,
        ViolationKind::SauFaultAddress,
        snapshot.sfar,
    ));

    SauFindings {
        attribution,
        address,
    }
}
