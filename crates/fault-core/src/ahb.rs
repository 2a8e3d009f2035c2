//! AHB secure controller violation scanner.
//!
//! The controller latches one violation per bus layer. `SEC_VIO_INFO_VALID`
//! holds one bit per layer; for each set bit the matching
//! `SEC_VIO_MISC_INFO[n]` and `SEC_VIO_ADDR[n]` describe the access.
//!
//! # SEC_VIO_MISC_INFO layout
//!
//! ```text
//! [11:8]  MASTER_NUMBER
//! [7:6]   ANTIPOL_MASTER_SEC_LEVEL
//! [5:4]   MASTER_SEC_LEVEL
//! [3:2]   reserved
//! [1:0]   ACCESS_TYPE
//! ```

use core::fmt;

use crate::config::AHB_LAYER_COUNT;
use crate::snapshot::AhbSnapshot;

const ACCESS_TYPE_MASK: u32 = 0b11;
const SEC_LEVEL_SHIFT: u32 = 4;
const ANTIPOL_SEC_LEVEL_SHIFT: u32 = 6;
const MASTER_NUMBER_SHIFT: u32 = 8;
const MASTER_NUMBER_MASK: u32 = 0xF;

/// Kind of access that tripped the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccessType {
    /// Instruction fetch.
    ReadCode,
    /// Data read.
    ReadData,
    /// Any encoding not listed above.
    Unknown,
}

impl AccessType {
    /// Decode the 2-bit ACCESS_TYPE field. Bits above the field are ignored.
    pub const fn from_field(raw: u32) -> Self {
        match raw & ACCESS_TYPE_MASK {
            0 | 3 => Self::ReadCode,
            2 => Self::ReadData,
            _ => Self::Unknown,
        }
    }

    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::ReadCode => "read code access",
            Self::ReadData => "read data access",
            Self::Unknown => "unknown access",
        }
    }
}

/// Security level of the bus master, as encoded in MASTER_SEC_LEVEL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MasterSecurityLevel {
    /// 0b00.
    NonSecureUser,
    /// 0b01.
    NonSecurePrivileged,
    /// 0b10.
    SecureUser,
    /// 0b11.
    SecurePrivileged,
}

impl MasterSecurityLevel {
    /// Decode a 2-bit security level field.
    pub const fn from_field(raw: u32) -> Self {
        match raw & 0b11 {
            0 => Self::NonSecureUser,
            1 => Self::NonSecurePrivileged,
            2 => Self::SecureUser,
            _ => Self::SecurePrivileged,
        }
    }

    /// The raw 2-bit encoding.
    pub const fn bits(self) -> u8 {
        match self {
            Self::NonSecureUser => 0,
            Self::NonSecurePrivileged => 1,
            Self::SecureUser => 2,
            Self::SecurePrivileged => 3,
        }
    }
}

/// One latched AHB violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AhbViolationRecord {
    /// Bus layer index, `0..AHB_LAYER_COUNT`.
    pub layer: u8,
    /// SEC_VIO_ADDR of the layer.
    pub address: u32,
    /// Bus master that issued the access.
    pub master_number: u8,
    /// MASTER_SEC_LEVEL.
    pub master_security_level: MasterSecurityLevel,
    /// ANTIPOL_MASTER_SEC_LEVEL, the inverted copy of the level.
    pub antipolarity_level: u8,
    /// ACCESS_TYPE.
    pub access: AccessType,
    /// Full SEC_VIO_MISC_INFO word.
    pub raw_info: u32,
}

impl AhbViolationRecord {
    /// Decode one layer's info word and pair it with its address.
    // Masked fields are at most 4 bits wide; layer < AHB_LAYER_COUNT <= 32.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn decode(layer: usize, info: u32, address: u32) -> Self {
        Self {
            layer: layer as u8,
            address,
            master_number: ((info >> MASTER_NUMBER_SHIFT) & MASTER_NUMBER_MASK) as u8,
            master_security_level: MasterSecurityLevel::from_field(info >> SEC_LEVEL_SHIFT),
            antipolarity_level: ((info >> ANTIPOL_SEC_LEVEL_SHIFT) & 0b11) as u8,
            access: AccessType::from_field(info),
            raw_info: info,
        }
    }

    /// `true` when ANTIPOL_MASTER_SEC_LEVEL is the bitwise inverse of
    /// MASTER_SEC_LEVEL. A mismatch points at a glitched or tampered latch.
    pub const fn antipolarity_consistent(&self) -> bool {
        self.antipolarity_level == !self.master_security_level.bits() & 0b11
    }
}

impl fmt::Display for AhbViolationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AHB layer {}: secure violation at 0x{:08X} by master {} (security level {}) during {}",
            self.layer,
            self.address,
            self.master_number,
            self.master_security_level.bits(),
            self.access.label()
        )
    }
}

/// Iterator over the violations latched in an [`AhbSnapshot`], see [`scan`].
#[derive(Debug, Clone)]
pub struct AhbScan<'a> {
    snapshot: &'a AhbSnapshot,
    pending: u32,
    layer: usize,
}

impl Iterator for AhbScan<'_> {
    type Item = AhbViolationRecord;

    fn next(&mut self) -> Option<AhbViolationRecord> {
        while self.layer < AHB_LAYER_COUNT {
            let layer = self.layer;
            let hit = self.pending & 1 != 0;
            self.pending = self.pending.wrapping_shr(1);
            self.layer = layer.saturating_add(1);

            if hit {
                if let (Some(&info), Some(&address)) =
                    (self.snapshot.info.get(layer), self.snapshot.address.get(layer))
                {
                    return Some(AhbViolationRecord::decode(layer, info, address));
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(AHB_LAYER_COUNT.saturating_sub(self.layer)))
    }
}

/// Walk layers `0..AHB_LAYER_COUNT` in ascending order and yield one record
/// per validity bit.
///
/// The scan consumes a working copy of the bitmap; the snapshot is only
/// borrowed. Validity bits at or above [`AHB_LAYER_COUNT`] are ignored.
pub fn scan(snapshot: &AhbSnapshot) -> AhbScan<'_> {
    AhbScan {
        snapshot,
        pending: snapshot.valid,
        layer: 0,
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_access_type_mapping() {
        assert_eq!(AccessType::from_field(0), AccessType::ReadCode);
        assert_eq!(AccessType::from_field(1), AccessType::Unknown);
        assert_eq!(AccessType::from_field(2), AccessType::ReadData);
        assert_eq!(AccessType::from_field(3), AccessType::ReadCode);
    }

    #[test]
    fn test_access_type_ignores_upper_bits() {
        assert_eq!(AccessType::from_field(0xFFFF_FFF2), AccessType::ReadData);
        assert_eq!(AccessType::from_field(0xFFFF_FFF1), AccessType::Unknown);
    }

    #[test]
    fn test_info_fields_decode() {
        // master 5, antipol 0b01, sec level 0b10, access read-data
        let info = (5 << 8) | (0b01 << 6) | (0b10 << 4) | 0b10;
        let rec = AhbViolationRecord::decode(7, info, 0x5000_0000);
        assert_eq!(rec.layer, 7);
        assert_eq!(rec.master_number, 5);
        assert_eq!(rec.master_security_level, MasterSecurityLevel::SecureUser);
        assert_eq!(rec.antipolarity_level, 0b01);
        assert_eq!(rec.access, AccessType::ReadData);
        assert_eq!(rec.address, 0x5000_0000);
        assert!(rec.antipolarity_consistent());
    }

    #[test]
    fn test_antipolarity_mismatch_detected() {
        let info = (0b11 << 6) | (0b11 << 4);
        assert!(!AhbViolationRecord::decode(0, info, 0).antipolarity_consistent());
    }

    #[test]
    fn test_scan_empty_bitmap() {
        assert_eq!(scan(&AhbSnapshot::default()).count(), 0);
    }

    #[test]
    fn test_scan_ascending_layers() {
        let ahb = AhbSnapshot::default()
            .with_layer(18, 0x2, 0x1800)
            .with_layer(0, 0x0, 0x0000)
            .with_layer(9, 0x3, 0x0900);
        let layers: Vec<_> = scan(&ahb).map(|r| r.layer).collect();
        assert_eq!(layers, [0, 9, 18]);
    }

    #[test]
    fn test_scan_ignores_bits_beyond_layer_count() {
        let mut ahb = AhbSnapshot::default().with_layer(2, 0, 0x20);
        ahb.valid |= 1 << 31;
        let records: Vec<_> = scan(&ahb).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].address, 0x20);
    }

    #[test]
    fn test_scan_leaves_snapshot_untouched() {
        let ahb = AhbSnapshot::default().with_layer(4, 0, 0x40);
        let before = ahb;
        let _ = scan(&ahb).count();
        assert_eq!(ahb, before);
    }

    #[test]
    fn test_display_mentions_layer_and_access() {
        let rec = AhbViolationRecord::decode(3, 0x2, 0x4000_0000);
        let text = rec.to_string();
        assert!(text.contains("layer 3"));
        assert!(text.contains("0x40000000"));
        assert!(text.contains("read data access"));
    }
}
