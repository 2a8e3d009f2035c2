//! Table-driven bit decoding.
//!
//! Each fault-status register is described by a static, ordered list of
//! [`FlagRule`]s. [`decode`] walks the table and yields one [`ViolationFlag`]
//! per matching rule, in table order. Bits that no rule names yield nothing.
//!
//! # CFSR layout (ARMv8-M, DDI0553 §D1.2.8)
//!
//! ```text
//! [31:16] UFSR  DIVBYZERO(25) UNALIGNED(24) STKOF(20) NOCP(19) INVPC(18) INVSTATE(17) UNDEFINSTR(16)
//! [15:8]  BFSR  BFARVALID(15) LSPERR(13) STKERR(12) UNSTKERR(11) IMPRECISERR(10) PRECISERR(9) IBUSERR(8)
//! [7:0]   MMFSR MMARVALID(7)  MLSPERR(5) MSTKERR(4) MUNSTKERR(3) DACCVIOL(1) IACCVIOL(0)
//! ```
//!
//! # SFSR layout (DDI0553 §D1.2.228)
//!
//! ```text
//! LSERR(7) SFARVALID(6) LSPERR(5) INVTRAN(4) AUVIOL(3) INVER(2) INVIS(1) INVEP(0)
//! ```

use crate::violation::{FaultSource, ViolationFlag, ViolationKind};

// ── SFSR ─────────────────────────────────────────────────────────────────────

/// SFSR.INVEP.
pub const SFSR_INVEP: u32 = 1 << 0;
/// SFSR.INVIS.
pub const SFSR_INVIS: u32 = 1 << 1;
/// SFSR.INVER.
pub const SFSR_INVER: u32 = 1 << 2;
/// SFSR.AUVIOL.
pub const SFSR_AUVIOL: u32 = 1 << 3;
/// SFSR.INVTRAN.
pub const SFSR_INVTRAN: u32 = 1 << 4;
/// SFSR.LSPERR.
pub const SFSR_LSPERR: u32 = 1 << 5;
/// SFSR.SFARVALID.
pub const SFSR_SFARVALID: u32 = 1 << 6;
/// SFSR.LSERR.
pub const SFSR_LSERR: u32 = 1 << 7;

// ── MMFSR (CFSR[7:0]) ────────────────────────────────────────────────────────

/// CFSR.IACCVIOL.
pub const CFSR_IACCVIOL: u32 = 1 << 0;
/// CFSR.DACCVIOL.
pub const CFSR_DACCVIOL: u32 = 1 << 1;
/// CFSR.MUNSTKERR.
pub const CFSR_MUNSTKERR: u32 = 1 << 3;
/// CFSR.MSTKERR.
pub const CFSR_MSTKERR: u32 = 1 << 4;
/// CFSR.MLSPERR.
pub const CFSR_MLSPERR: u32 = 1 << 5;
/// CFSR.MMARVALID.
pub const CFSR_MMARVALID: u32 = 1 << 7;

// ── BFSR (CFSR[15:8]) ────────────────────────────────────────────────────────

/// CFSR.IBUSERR.
pub const CFSR_IBUSERR: u32 = 1 << 8;
/// CFSR.PRECISERR.
pub const CFSR_PRECISERR: u32 = 1 << 9;
/// CFSR.IMPRECISERR.
pub const CFSR_IMPRECISERR: u32 = 1 << 10;
/// CFSR.UNSTKERR.
pub const CFSR_UNSTKERR: u32 = 1 << 11;
/// CFSR.STKERR.
pub const CFSR_STKERR: u32 = 1 << 12;
/// CFSR.LSPERR.
pub const CFSR_LSPERR: u32 = 1 << 13;
/// CFSR.BFARVALID.
pub const CFSR_BFARVALID: u32 = 1 << 15;

// ── UFSR (CFSR[31:16]) ───────────────────────────────────────────────────────

/// CFSR.UNDEFINSTR.
pub const CFSR_UNDEFINSTR: u32 = 1 << 16;
/// CFSR.INVSTATE.
pub const CFSR_INVSTATE: u32 = 1 << 17;
/// CFSR.INVPC.
pub const CFSR_INVPC: u32 = 1 << 18;
/// CFSR.NOCP.
pub const CFSR_NOCP: u32 = 1 << 19;
/// CFSR.STKOF (ARMv8-M only).
pub const CFSR_STKOF: u32 = 1 << 20;
/// CFSR.UNALIGNED.
pub const CFSR_UNALIGNED: u32 = 1 << 24;
/// CFSR.DIVBYZERO.
pub const CFSR_DIVBYZERO: u32 = 1 << 25;

/// MemManage sub-field of CFSR.
pub const CFSR_MEMFAULTSR_MASK: u32 = 0x0000_00FF;
/// BusFault sub-field of CFSR.
pub const CFSR_BUSFAULTSR_MASK: u32 = 0x0000_FF00;
/// UsageFault sub-field of CFSR.
pub const CFSR_USGFAULTSR_MASK: u32 = 0xFFFF_0000;

/// One entry of a decode table: a single-bit mask and the condition it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagRule {
    /// Bit (or bits) that must be set for the rule to match.
    pub mask: u32,
    /// Condition reported when the rule matches.
    pub kind: ViolationKind,
}

impl FlagRule {
    /// Build a rule.
    pub const fn new(mask: u32, kind: ViolationKind) -> Self {
        Self { mask, kind }
    }

    /// `true` if any bit of the mask is set in `value`.
    pub const fn matches(&self, value: u32) -> bool {
        value & self.mask != 0
    }

    /// Construct the flag for this rule. Address-carrying kinds take
    /// `fault_address` as their detail.
    pub const fn flag(&self, source: FaultSource, fault_address: u32) -> ViolationFlag {
        if self.kind.carries_address() {
            ViolationFlag::with_detail(source, self.kind, fault_address)
        } else {
            ViolationFlag::new(source, self.kind)
        }
    }
}

/// SAU attribution checks, in priority order. Only the first match is
/// reported.
pub const SAU_PRIORITY_RULES: &[FlagRule] = &[
    FlagRule::new(SFSR_INVEP, ViolationKind::InvalidEntryPoint),
    FlagRule::new(SFSR_AUVIOL, ViolationKind::AttributionViolation),
    FlagRule::new(SFSR_INVTRAN, ViolationKind::InvalidTransition),
];

/// MemManage bits, in report order.
pub const MEM_MANAGE_RULES: &[FlagRule] = &[
    FlagRule::new(CFSR_MMARVALID, ViolationKind::MemManageFaultAddress),
    FlagRule::new(CFSR_MLSPERR, ViolationKind::MemManageLazyState),
    FlagRule::new(CFSR_MSTKERR, ViolationKind::MemManageStacking),
    FlagRule::new(CFSR_MUNSTKERR, ViolationKind::MemManageUnstacking),
    FlagRule::new(CFSR_DACCVIOL, ViolationKind::DataAccessViolation),
    FlagRule::new(CFSR_IACCVIOL, ViolationKind::InstructionAccessViolation),
];

/// BusFault bits, in report order.
pub const BUS_RULES: &[FlagRule] = &[
    FlagRule::new(CFSR_BFARVALID, ViolationKind::BusFaultAddress),
    FlagRule::new(CFSR_LSPERR, ViolationKind::BusLazyState),
    FlagRule::new(CFSR_STKERR, ViolationKind::BusStacking),
    FlagRule::new(CFSR_UNSTKERR, ViolationKind::BusUnstacking),
    FlagRule::new(CFSR_PRECISERR, ViolationKind::PreciseDataBusError),
    FlagRule::new(CFSR_IMPRECISERR, ViolationKind::ImpreciseDataBusError),
    FlagRule::new(CFSR_IBUSERR, ViolationKind::InstructionBusError),
];

/// UsageFault bits, in report order.
pub const USAGE_RULES: &[FlagRule] = &[
    FlagRule::new(CFSR_DIVBYZERO, ViolationKind::DivideByZero),
    FlagRule::new(CFSR_UNALIGNED, ViolationKind::UnalignedAccess),
    FlagRule::new(CFSR_STKOF, ViolationKind::StackOverflow),
    FlagRule::new(CFSR_NOCP, ViolationKind::NoCoprocessor),
    FlagRule::new(CFSR_INVPC, ViolationKind::InvalidPc),
    FlagRule::new(CFSR_INVSTATE, ViolationKind::InvalidState),
    FlagRule::new(CFSR_UNDEFINSTR, ViolationKind::UndefinedInstruction),
];

/// Iterator over the flags of one decoded register, see [`decode`].
#[derive(Debug, Clone)]
pub struct Decoded<'r> {
    value: u32,
    rules: core::slice::Iter<'r, FlagRule>,
    source: FaultSource,
    fault_address: u32,
}

impl Iterator for Decoded<'_> {
    type Item = ViolationFlag;

    fn next(&mut self) -> Option<ViolationFlag> {
        let value = self.value;
        self.rules
            .find(|rule| rule.matches(value))
            .map(|rule| rule.flag(self.source, self.fault_address))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.rules.len()))
    }
}

/// Decode `value` against `rules`, yielding one flag per matching rule in
/// table order.
///
/// Pure and allocation-free; the iterator borrows the table only.
pub fn decode(value: u32, rules: &[FlagRule], source: FaultSource, fault_address: u32) -> Decoded<'_> {
    Decoded {
        value,
        rules: rules.iter(),
        source,
        fault_address,
    }
}

/// First matching rule, for registers decoded as a priority chain.
pub fn first_match(value: u32, rules: &[FlagRule]) -> Option<&FlagRule> {
    rules.iter().find(|rule| rule.matches(value))
}
