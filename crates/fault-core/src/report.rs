//! Ordered, bounded diagnostic report.
//!
//! Entries are appended in evaluation order (SAU, secure CFSR, non-secure
//! CFSR, AHB) and never reordered or removed. Storage is a fixed-capacity
//! `heapless::Vec`, so building a report never allocates.

use core::fmt;

use heapless::Vec;
use thiserror_no_std::Error;

use crate::ahb::AhbViolationRecord;
use crate::config::REPORT_CAPACITY;
use crate::violation::{FaultSource, ViolationFlag};

/// Report construction error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportError {
    /// The report already holds [`REPORT_CAPACITY`] entries.
    #[error("diagnostic report full ({capacity} entries)")]
    CapacityExceeded {
        /// Fixed capacity of the report.
        capacity: usize,
    },
}

/// One line of a [`DiagnosticReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportEntry {
    /// Decoded SAU or CFSR condition.
    Flag(ViolationFlag),
    /// Latched AHB secure controller violation.
    Ahb(AhbViolationRecord),
}

impl ReportEntry {
    /// Register set the entry came from.
    pub const fn source(&self) -> FaultSource {
        match self {
            Self::Flag(flag) => flag.source,
            Self::Ahb(_) => FaultSource::Ahb,
        }
    }

    /// The flag, if this is not an AHB record.
    pub const fn as_flag(&self) -> Option<&ViolationFlag> {
        match self {
            Self::Flag(flag) => Some(flag),
            Self::Ahb(_) => None,
        }
    }

    /// The AHB record, if this is one.
    pub const fn as_ahb(&self) -> Option<&AhbViolationRecord> {
        match self {
            Self::Flag(_) => None,
            Self::Ahb(record) => Some(record),
        }
    }
}

impl From<ViolationFlag> for ReportEntry {
    fn from(flag: ViolationFlag) -> Self {
        Self::Flag(flag)
    }
}

impl From<AhbViolationRecord> for ReportEntry {
    fn from(record: AhbViolationRecord) -> Self {
        Self::Ahb(record)
    }
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(flag) => fmt::Display::fmt(flag, f),
            Self::Ahb(record) => fmt::Display::fmt(record, f),
        }
    }
}

/// Append-only list of [`ReportEntry`] values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticReport {
    entries: Vec<ReportEntry, REPORT_CAPACITY>,
}

impl DiagnosticReport {
    /// Empty report.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append one entry.
    ///
    /// # Errors
    ///
    /// [`ReportError::CapacityExceeded`] when the report is full. The entry is
    /// discarded and the report is left unchanged.
    pub fn push(&mut self, entry: impl Into<ReportEntry>) -> Result<(), ReportError> {
        self.entries
            .push(entry.into())
            .map_err(|_| ReportError::CapacityExceeded {
                capacity: REPORT_CAPACITY,
            })
    }

    /// All entries in evaluation order.
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing was decoded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in evaluation order.
    pub fn iter(&self) -> core::slice::Iter<'_, ReportEntry> {
        self.entries.iter()
    }

    /// Entries reported by one register set, in evaluation order.
    pub fn from_source(&self, source: FaultSource) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(move |e| e.source() == source)
    }

    /// Every decoded flag, skipping AHB records.
    pub fn flags(&self) -> impl Iterator<Item = &ViolationFlag> {
        self.entries.iter().filter_map(ReportEntry::as_flag)
    }

    /// Every AHB record, in layer order.
    pub fn ahb_records(&self) -> impl Iterator<Item = &AhbViolationRecord> {
        self.entries.iter().filter_map(ReportEntry::as_ahb)
    }
}

impl<'a> IntoIterator for &'a DiagnosticReport {
    type Item = &'a ReportEntry;
    type IntoIter = core::slice::Iter<'a, ReportEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::violation::{SecurityDomain, ViolationKind};

    fn flag(source: FaultSource, kind: ViolationKind) -> ViolationFlag {
        ViolationFlag::new(source, kind)
    }

    #[test]
    fn test_new_report_is_empty() {
        let report = DiagnosticReport::new();
        assert!(report.is_empty());
        assert_eq!(report.len(), 0);
    }

    #[test]
    fn test_push_preserves_order() {
        let mut report = DiagnosticReport::new();
        report
            .push(flag(FaultSource::Sau, ViolationKind::InvalidTransition))
            .unwrap();
        report
            .push(AhbViolationRecord::decode(1, 0, 0x10))
            .unwrap();
        assert_eq!(report.len(), 2);
        assert!(matches!(report.entries()[0], ReportEntry::Flag(_)));
        assert!(matches!(report.entries()[1], ReportEntry::Ahb(_)));
    }

    #[test]
    fn test_full_report_rejects_push() {
        let mut report = DiagnosticReport::new();
        for _ in 0..REPORT_CAPACITY {
            report
                .push(flag(FaultSource::Sau, ViolationKind::UnrecognizedSau))
                .unwrap();
        }
        let err = report
            .push(flag(FaultSource::Sau, ViolationKind::UnrecognizedSau))
            .unwrap_err();
        assert_eq!(
            err,
            ReportError::CapacityExceeded {
                capacity: REPORT_CAPACITY
            }
        );
        assert_eq!(report.len(), REPORT_CAPACITY);
    }

    #[test]
    fn test_from_source_filters_by_domain() {
        let mut report = DiagnosticReport::new();
        let secure = FaultSource::Cfsr(SecurityDomain::Secure);
        let non_secure = FaultSource::Cfsr(SecurityDomain::NonSecure);
        report.push(flag(secure, ViolationKind::DivideByZero)).unwrap();
        report.push(flag(non_secure, ViolationKind::StackOverflow)).unwrap();
        report.push(flag(secure, ViolationKind::InvalidPc)).unwrap();

        let kinds: std::vec::Vec<_> = report
            .from_source(secure)
            .filter_map(ReportEntry::as_flag)
            .map(|f| f.kind)
            .collect();
        assert_eq!(kinds, [ViolationKind::DivideByZero, ViolationKind::InvalidPc]);
        assert_eq!(report.from_source(FaultSource::Ahb).count(), 0);
    }

    #[test]
    fn test_error_message() {
        let err = ReportError::CapacityExceeded { capacity: 61 };
        assert_eq!(err.to_string(), "diagnostic report full (61 entries)");
    }
}
