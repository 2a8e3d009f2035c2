//! Exhaustive per-bit tables: setting exactly one status bit yields exactly
//! the one flag that bit names, and reserved bits yield nothing. SFSR is the
//! exception: every non-zero status names one attribution condition, and
//! SFARVALID adds the address after it.
#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use fault_core::decoder::*;
use fault_core::{diagnose, FaultSource, RegisterSnapshot, SecurityDomain, ViolationKind};

/// Expected flag for a single CFSR bit, `None` for reserved bits.
fn cfsr_bit_kind(bit: u32) -> Option<ViolationKind> {
    let mask = 1u32 << bit;
    let table: &[(u32, ViolationKind)] = &[
        (CFSR_IACCVIOL, ViolationKind::InstructionAccessViolation),
        (CFSR_DACCVIOL, ViolationKind::DataAccessViolation),
        (CFSR_MUNSTKERR, ViolationKind::MemManageUnstacking),
        (CFSR_MSTKERR, ViolationKind::MemManageStacking),
        (CFSR_MLSPERR, ViolationKind::MemManageLazyState),
        (CFSR_MMARVALID, ViolationKind::MemManageFaultAddress),
        (CFSR_IBUSERR, ViolationKind::InstructionBusError),
        (CFSR_PRECISERR, ViolationKind::PreciseDataBusError),
        (CFSR_IMPRECISERR, ViolationKind::ImpreciseDataBusError),
        (CFSR_UNSTKERR, ViolationKind::BusUnstacking),
        (CFSR_STKERR, ViolationKind::BusStacking),
        (CFSR_LSPERR, ViolationKind::BusLazyState),
        (CFSR_BFARVALID, ViolationKind::BusFaultAddress),
        (CFSR_UNDEFINSTR, ViolationKind::UndefinedInstruction),
        (CFSR_INVSTATE, ViolationKind::InvalidState),
        (CFSR_INVPC, ViolationKind::InvalidPc),
        (CFSR_NOCP, ViolationKind::NoCoprocessor),
        (CFSR_STKOF, ViolationKind::StackOverflow),
        (CFSR_UNALIGNED, ViolationKind::UnalignedAccess),
        (CFSR_DIVBYZERO, ViolationKind::DivideByZero),
    ];
    table.iter().find(|(m, _)| *m == mask).map(|(_, k)| *k)
}

#[test]
fn every_cfsr_bit_in_both_domains() {
    for domain in [SecurityDomain::Secure, SecurityDomain::NonSecure] {
        for bit in 0..32 {
            let mut snap = RegisterSnapshot::default();
            let cfsr = match domain {
                SecurityDomain::Secure => &mut snap.secure,
                SecurityDomain::NonSecure => &mut snap.non_secure,
            };
            cfsr.cfsr = 1 << bit;
            cfsr.mmfar = 0x2000_0000 | bit;
            cfsr.bfar = 0x4000_0000 | bit;

            let report = diagnose(&snap).report;
            match cfsr_bit_kind(bit) {
                Some(kind) => {
                    assert_eq!(report.len(), 1, "bit {bit} in {domain:?}");
                    let flag = report.flags().next().unwrap();
                    assert_eq!(flag.kind, kind, "bit {bit}");
                    assert_eq!(flag.source, FaultSource::Cfsr(domain));
                    match kind {
                        ViolationKind::MemManageFaultAddress => {
                            assert_eq!(flag.fault_address(), Some(0x2000_0000 | bit));
                        }
                        ViolationKind::BusFaultAddress => {
                            assert_eq!(flag.fault_address(), Some(0x4000_0000 | bit));
                        }
                        _ => assert_eq!(flag.detail, None, "bit {bit}"),
                    }
                }
                None => assert!(report.is_empty(), "reserved bit {bit} produced {report:?}"),
            }
        }
    }
}

#[test]
fn every_sfsr_bit() {
    for bit in 0..32 {
        let mut snap = RegisterSnapshot::default();
        snap.sau.sfsr = 1 << bit;
        snap.sau.sfar = 0x3000_0000;

        let report = diagnose(&snap).report;
        let flags: Vec<_> = report.flags().collect();
        assert!(flags.iter().all(|f| f.source == FaultSource::Sau));

        let expected = match 1u32 << bit {
            SFSR_INVEP => ViolationKind::InvalidEntryPoint,
            SFSR_AUVIOL => ViolationKind::AttributionViolation,
            SFSR_INVTRAN => ViolationKind::InvalidTransition,
            _ => ViolationKind::UnrecognizedSau,
        };
        let flag = flags[0];
        assert_eq!(flag.kind, expected, "SFSR bit {bit}");

        // SFARVALID adds the address after the attribution flag.
        if 1u32 << bit == SFSR_SFARVALID {
            assert_eq!(flags.len(), 2, "SFSR bit {bit}");
            assert_eq!(flags[1].kind, ViolationKind::SauFaultAddress);
            assert_eq!(flags[1].fault_address(), Some(0x3000_0000));
        } else {
            assert_eq!(flags.len(), 1, "SFSR bit {bit}");
        }

        match expected {
            ViolationKind::UnrecognizedSau => assert_eq!(flag.detail, Some(1 << bit)),
            _ => assert_eq!(flag.detail, None),
        }
    }
}

#[test]
fn rule_tables_name_disjoint_single_bits() {
    let mut seen = 0u32;
    for rule in MEM_MANAGE_RULES.iter().chain(BUS_RULES).chain(USAGE_RULES) {
        assert_eq!(rule.mask.count_ones(), 1, "{:?}", rule.kind);
        assert_eq!(seen & rule.mask, 0, "{:?} overlaps", rule.kind);
        seen |= rule.mask;
    }
}

#[test]
fn rule_tables_stay_inside_their_subfield() {
    for rule in MEM_MANAGE_RULES {
        assert_eq!(rule.mask & !CFSR_MEMFAULTSR_MASK, 0);
    }
    for rule in BUS_RULES {
        assert_eq!(rule.mask & !CFSR_BUSFAULTSR_MASK, 0);
    }
    for rule in USAGE_RULES {
        assert_eq!(rule.mask & !CFSR_USGFAULTSR_MASK, 0);
    }
}
