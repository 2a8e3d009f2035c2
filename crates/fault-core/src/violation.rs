//! Violation taxonomy shared by every evaluator.
//!
//! A [`ViolationFlag`] is one decoded condition: what happened
//! ([`ViolationKind`]), which register set reported it ([`FaultSource`]) and an
//! optional numeric detail (fault address or raw status word).

use core::fmt;

/// The two ARMv8-M security states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SecurityDomain {
    /// Secure world.
    Secure,
    /// Non-secure world.
    NonSecure,
}

impl SecurityDomain {
    /// Short label used in log output.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Secure => "S",
            Self::NonSecure => "NS",
        }
    }
}

/// Register set a flag was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultSource {
    /// Security Attribution Unit (secure only).
    Sau,
    /// Configurable Fault Status Register of the given domain.
    Cfsr(SecurityDomain),
    /// AHB secure controller.
    Ahb,
}

/// Fault-status register a [`ViolationKind`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultRegister {
    /// SAU_SFSR.
    Sfsr,
    /// CFSR[7:0], MemManage.
    Mmfsr,
    /// CFSR[15:8], BusFault.
    Bfsr,
    /// CFSR[31:16], UsageFault.
    Ufsr,
}

/// What the numeric detail of a flag means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DetailKind {
    /// No detail.
    None,
    /// Faulting address from SFAR, MMFAR or BFAR.
    FaultAddress,
    /// Raw status register value.
    RawStatus,
}

/// Every condition the decoder can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ViolationKind {
    // ── SAU ─────────────────────────────────────────────────────────────────
    /// SFSR.INVEP: branch into secure state at a non-SG address.
    InvalidEntryPoint,
    /// SFSR.AUVIOL: non-secure access to secure memory.
    AttributionViolation,
    /// SFSR.INVTRAN: domain-crossing branch without the right instruction.
    InvalidTransition,
    /// SFSR non-zero but none of the named bits set.
    UnrecognizedSau,
    /// SFSR.SFARVALID: SFAR holds the violating address.
    SauFaultAddress,

    // ── MemManage ──────────────────────────────────────────────────────────
    /// MMFSR.MMARVALID: MMFAR holds the violating address.
    MemManageFaultAddress,
    /// MMFSR.MLSPERR.
    MemManageLazyState,
    /// MMFSR.MSTKERR.
    MemManageStacking,
    /// MMFSR.MUNSTKERR.
    MemManageUnstacking,
    /// MMFSR.DACCVIOL.
    DataAccessViolation,
    /// MMFSR.IACCVIOL.
    InstructionAccessViolation,

    // ── BusFault ───────────────────────────────────────────────────────────
    /// BFSR.BFARVALID: BFAR holds the violating address.
    BusFaultAddress,
    /// BFSR.LSPERR.
    BusLazyState,
    /// BFSR.STKERR.
    BusStacking,
    /// BFSR.UNSTKERR.
    BusUnstacking,
    /// BFSR.PRECISERR.
    PreciseDataBusError,
    /// BFSR.IMPRECISERR.
    ImpreciseDataBusError,
    /// BFSR.IBUSERR.
    InstructionBusError,

    // ── UsageFault ─────────────────────────────────────────────────────────
    /// UFSR.DIVBYZERO.
    DivideByZero,
    /// UFSR.UNALIGNED.
    UnalignedAccess,
    /// UFSR.STKOF.
    StackOverflow,
    /// UFSR.NOCP.
    NoCoprocessor,
    /// UFSR.INVPC.
    InvalidPc,
    /// UFSR.INVSTATE.
    InvalidState,
    /// UFSR.UNDEFINSTR.
    UndefinedInstruction,
}

impl ViolationKind {
    /// Register this kind is decoded from.
    pub const fn register(self) -> FaultRegister {
        match self {
            Self::InvalidEntryPoint
            | Self::AttributionViolation
            | Self::InvalidTransition
            | Self::UnrecognizedSau
            | Self::SauFaultAddress => FaultRegister::Sfsr,
            Self::MemManageFaultAddress
            | Self::MemManageLazyState
            | Self::MemManageStacking
            | Self::MemManageUnstacking
            | Self::DataAccessViolation
            | Self::InstructionAccessViolation => FaultRegister::Mmfsr,
            Self::BusFaultAddress
            | Self::BusLazyState
            | Self::BusStacking
            | Self::BusUnstacking
            | Self::PreciseDataBusError
            | Self::ImpreciseDataBusError
            | Self::InstructionBusError => FaultRegister::Bfsr,
            Self::DivideByZero
            | Self::UnalignedAccess
            | Self::StackOverflow
            | Self::NoCoprocessor
            | Self::InvalidPc
            | Self::InvalidState
            | Self::UndefinedInstruction => FaultRegister::Ufsr,
        }
    }

    /// Meaning of the detail word attached to flags of this kind.
    pub const fn detail_kind(self) -> DetailKind {
        match self {
            Self::SauFaultAddress | Self::MemManageFaultAddress | Self::BusFaultAddress => {
                DetailKind::FaultAddress
            }
            Self::UnrecognizedSau => DetailKind::RawStatus,
            _ => DetailKind::None,
        }
    }

    /// `true` for the three address-valid kinds.
    pub const fn carries_address(self) -> bool {
        matches!(self.detail_kind(), DetailKind::FaultAddress)
    }

    /// Human-readable description.
    pub const fn description(self) -> &'static str {
        match self {
            Self::InvalidEntryPoint => "invalid entry point into the secure world",
            Self::AttributionViolation => "SAU violation: non-secure access to secure memory",
            Self::InvalidTransition => "invalid transition from secure to non-secure world",
            Self::UnrecognizedSau => "unrecognized SAU fault",
            Self::SauFaultAddress => "SAU violation address",
            Self::MemManageFaultAddress => "MPU access violation address",
            Self::MemManageLazyState => "MemManage lazy state preservation error",
            Self::MemManageStacking => "MemManage stacking error",
            Self::MemManageUnstacking => "MemManage unstacking error",
            Self::DataAccessViolation => "MemManage data access violation",
            Self::InstructionAccessViolation => "MemManage instruction access violation",
            Self::BusFaultAddress => "bus fault address",
            Self::BusLazyState => "bus fault lazy state preservation error",
            Self::BusStacking => "bus fault stacking error",
            Self::BusUnstacking => "bus fault unstacking error",
            Self::PreciseDataBusError => "precise data access bus error",
            Self::ImpreciseDataBusError => "imprecise data access bus error",
            Self::InstructionBusError => "instruction bus error on prefetch",
            Self::DivideByZero => "divide by zero",
            Self::UnalignedAccess => "unaligned access",
            Self::StackOverflow => "stack overflow",
            Self::NoCoprocessor => "no coprocessor",
            Self::InvalidPc => "invalid PC load on exception return",
            Self::InvalidState => "invalid execution state",
            Self::UndefinedInstruction => "undefined instruction",
        }
    }
}

/// One decoded condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViolationFlag {
    /// Register set the flag came from.
    pub source: FaultSource,
    /// Decoded condition.
    pub kind: ViolationKind,
    /// Fault address or raw status, see [`ViolationKind::detail_kind`].
    pub detail: Option<u32>,
}

impl ViolationFlag {
    /// Flag without a detail word.
    pub const fn new(source: FaultSource, kind: ViolationKind) -> Self {
        Self {
            source,
            kind,
            detail: None,
        }
    }

    /// Flag carrying a detail word.
    pub const fn with_detail(source: FaultSource, kind: ViolationKind, detail: u32) -> Self {
        Self {
            source,
            kind,
            detail: Some(detail),
        }
    }

    /// Faulting address, if this flag carries one.
    pub fn fault_address(&self) -> Option<u32> {
        if self.kind.carries_address() {
            self.detail
        } else {
            None
        }
    }
}

impl fmt::Display for FaultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sau => f.write_str("SAU->SFSR"),
            Self::Cfsr(domain) => write!(f, "SCB({})->CFSR", domain.label()),
            Self::Ahb => f.write_str("AHB_SECURE_CTRL"),
        }
    }
}

impl fmt::Display for ViolationFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.kind.description())?;
        match (self.kind.detail_kind(), self.detail) {
            (DetailKind::FaultAddress, Some(addr)) => write!(f, " at 0x{addr:08X}"),
            (DetailKind::RawStatus, Some(raw)) => write!(f, " (0x{raw:08X})"),
            _ => Ok(()),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ViolationFlag {
    fn format(&self, f: defmt::Formatter<'_>) {
        let desc = self.kind.description();
        match (self.kind.detail_kind(), self.detail) {
            (DetailKind::FaultAddress, Some(addr)) => {
                defmt::write!(f, "{}: {=str} at {=u32:#010x}", self.source, desc, addr);
            }
            (DetailKind::RawStatus, Some(raw)) => {
                defmt::write!(f, "{}: {=str} ({=u32:#010x})", self.source, desc, raw);
            }
            _ => defmt::write!(f, "{}: {=str}", self.source, desc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_address_valid_kinds_carry_addresses() {
        assert!(ViolationKind::SauFaultAddress.carries_address());
        assert!(ViolationKind::MemManageFaultAddress.carries_address());
        assert!(ViolationKind::BusFaultAddress.carries_address());
        assert!(!ViolationKind::UnrecognizedSau.carries_address());
        assert!(!ViolationKind::DivideByZero.carries_address());
    }

    #[test]
    fn test_fault_address_ignores_raw_status_detail() {
        let flag = ViolationFlag::with_detail(FaultSource::Sau, ViolationKind::UnrecognizedSau, 0x80);
        assert_eq!(flag.fault_address(), None);
    }

    #[test]
    fn test_display_formats_address() {
        let flag = ViolationFlag::with_detail(
            FaultSource::Cfsr(SecurityDomain::NonSecure),
            ViolationKind::BusFaultAddress,
            0x2000_1000,
        );
        assert_eq!(
            flag.to_string(),
            "SCB(NS)->CFSR: bus fault address at 0x20001000"
        );
    }

    #[test]
    fn test_register_grouping() {
        assert_eq!(ViolationKind::InvalidTransition.register(), FaultRegister::Sfsr);
        assert_eq!(ViolationKind::DataAccessViolation.register(), FaultRegister::Mmfsr);
        assert_eq!(ViolationKind::ImpreciseDataBusError.register(), FaultRegister::Bfsr);
        assert_eq!(ViolationKind::StackOverflow.register(), FaultRegister::Ufsr);
    }
}
