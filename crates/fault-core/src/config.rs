//! Platform constants for the RT6xx secure world.
//!
//! Register addresses follow the ARMv8-M Architecture Reference Manual
//! (DDI0553, §D1.2 System Control Space) and the RT6xx user manual chapter on
//! the AHB secure controller. Only the fault-status subset is listed here;
//! nothing in this crate writes to any of these registers.
//!
//! | Register              | Address       | Notes                          |
//! |-----------------------|---------------|--------------------------------|
//! | SAU_SFSR              | 0xE000_EDE4   | Secure fault status            |
//! | SAU_SFAR              | 0xE000_EDE8   | Valid iff SFSR.SFARVALID       |
//! | SCB_CFSR              | 0xE000_ED28   | MMFSR[7:0] BFSR[15:8] UFSR[31:16] |
//! | SCB_MMFAR             | 0xE000_ED34   | Valid iff CFSR.MMARVALID       |
//! | SCB_BFAR              | 0xE000_ED38   | Valid iff CFSR.BFARVALID       |
//! | SCB_NS alias          | +0x0002_0000  | Non-secure view from secure code |
//! | AHB_SECURE_CTRL (S)   | 0x5014_8000   | Secure alias of the controller |

/// Number of AHB bus layers covered by the secure controller's violation
/// registers. One validity bit, one info and one address register per layer.
pub const AHB_LAYER_COUNT: usize = 19;

/// SAU Secure Fault Status Register.
pub const SAU_SFSR_ADDR: u32 = 0xE000_EDE4;

/// SAU Secure Fault Address Register.
pub const SAU_SFAR_ADDR: u32 = 0xE000_EDE8;

/// Configurable Fault Status Register (secure view).
pub const SCB_CFSR_ADDR: u32 = 0xE000_ED28;

/// MemManage Fault Address Register (secure view).
pub const SCB_MMFAR_ADDR: u32 = 0xE000_ED34;

/// BusFault Address Register (secure view).
pub const SCB_BFAR_ADDR: u32 = 0xE000_ED38;

/// Offset from a secure SCB register to its non-secure alias.
pub const SCB_NS_ALIAS_OFFSET: u32 = 0x0002_0000;

/// Secure alias base of the AHB secure controller.
pub const AHB_SECURE_CTRL_BASE: u32 = 0x5014_8000;

/// Offset of `SEC_VIO_ADDR[0]`; layer `n` is at `+ 4 * n`.
pub const AHB_SEC_VIO_ADDR_OFFSET: u32 = 0x0E00;

/// Offset of `SEC_VIO_MISC_INFO[0]`; layer `n` is at `+ 4 * n`.
pub const AHB_SEC_VIO_MISC_INFO_OFFSET: u32 = 0x0E80;

/// Offset of `SEC_VIO_INFO_VALID`.
pub const AHB_SEC_VIO_INFO_VALID_OFFSET: u32 = 0x0F00;

/// Upper bound on SAU entries in one report: one attribution flag plus the
/// fault address.
pub const SAU_MAX_ENTRIES: usize = 2;

/// Upper bound on entries produced by one CFSR (MemManage + Bus + Usage).
pub const CFSR_MAX_ENTRIES: usize = crate::decoder::MEM_MANAGE_RULES.len()
    + crate::decoder::BUS_RULES.len()
    + crate::decoder::USAGE_RULES.len();

/// Capacity of a [`DiagnosticReport`](crate::report::DiagnosticReport).
///
/// Every bit of every decoded register can contribute at most one entry, so a
/// report built from a single snapshot never exceeds this bound.
pub const REPORT_CAPACITY: usize = SAU_MAX_ENTRIES + 2 * CFSR_MAX_ENTRIES + AHB_LAYER_COUNT;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ns_alias_lands_in_scs_ns_window() {
        assert_eq!(SCB_CFSR_ADDR + SCB_NS_ALIAS_OFFSET, 0xE002_ED28);
        assert_eq!(SCB_BFAR_ADDR + SCB_NS_ALIAS_OFFSET, 0xE002_ED38);
    }

    #[test]
    fn test_ahb_register_banks_do_not_overlap() {
        let addr_end = AHB_SEC_VIO_ADDR_OFFSET + 4 * AHB_LAYER_COUNT as u32;
        let info_end = AHB_SEC_VIO_MISC_INFO_OFFSET + 4 * AHB_LAYER_COUNT as u32;
        assert!(addr_end <= AHB_SEC_VIO_MISC_INFO_OFFSET);
        assert!(info_end <= AHB_SEC_VIO_INFO_VALID_OFFSET);
    }

    #[test]
    fn test_validity_bitmap_fits_one_word() {
        assert!(AHB_LAYER_COUNT <= 32);
    }

    #[test]
    fn test_report_capacity_covers_all_sources() {
        assert_eq!(CFSR_MAX_ENTRIES, 20);
        assert_eq!(REPORT_CAPACITY, 2 + 40 + 19);
    }
}
