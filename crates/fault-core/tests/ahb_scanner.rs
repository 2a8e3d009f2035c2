//! AHB secure controller scanner properties.
#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use fault_core::ahb::scan;
use fault_core::config::AHB_LAYER_COUNT;
use fault_core::{diagnose, AccessType, AhbSnapshot, FaultSource, RegisterSnapshot};
use proptest::prelude::*;

fn layer_mask() -> u32 {
    (1u32 << AHB_LAYER_COUNT) - 1
}

fn snapshot_with(valid: u32, seed: u32) -> AhbSnapshot {
    let mut ahb = AhbSnapshot {
        valid,
        ..AhbSnapshot::default()
    };
    for layer in 0..AHB_LAYER_COUNT {
        ahb.info[layer] = seed.rotate_left(layer as u32);
        ahb.address[layer] = 0x2000_0000 | ((layer as u32) << 8);
    }
    ahb
}

#[test]
fn access_type_table() {
    assert_eq!(AccessType::from_field(0), AccessType::ReadCode);
    assert_eq!(AccessType::from_field(1), AccessType::Unknown);
    assert_eq!(AccessType::from_field(2), AccessType::ReadData);
    assert_eq!(AccessType::from_field(3), AccessType::ReadCode);
}

#[test]
fn every_single_layer() {
    for layer in 0..AHB_LAYER_COUNT {
        let ahb = AhbSnapshot::default().with_layer(layer, 0x0000_0702, 0x1000 + layer as u32);
        let records: Vec<_> = scan(&ahb).collect();
        assert_eq!(records.len(), 1, "layer {layer}");
        assert_eq!(usize::from(records[0].layer), layer);
        assert_eq!(records[0].address, 0x1000 + layer as u32);
        assert_eq!(records[0].master_number, 7);
        assert_eq!(records[0].access, AccessType::ReadData);
    }
}

#[test]
fn all_layers_set() {
    let ahb = snapshot_with(u32::MAX, 0);
    assert_eq!(scan(&ahb).count(), AHB_LAYER_COUNT);
}

#[test]
fn ahb_entries_come_last_in_report() {
    let mut snap = RegisterSnapshot::default();
    snap.ahb = snapshot_with(0b101, 0);
    snap.non_secure.cfsr = fault_core::decoder::CFSR_STKOF;

    let report = diagnose(&snap).report;
    let sources: Vec<_> = report.iter().map(|e| e.source()).collect();
    assert_eq!(sources.last(), Some(&FaultSource::Ahb));
    assert_eq!(report.ahb_records().count(), 2);
}

proptest! {
    /// m validity bits yield m records, in ascending layer order, each at its
    /// bit position.
    #[test]
    fn records_match_validity_bits(valid in any::<u32>(), seed in any::<u32>()) {
        let ahb = snapshot_with(valid, seed);
        let records: Vec<_> = scan(&ahb).collect();

        let in_range = valid & layer_mask();
        prop_assert_eq!(records.len(), in_range.count_ones() as usize);

        let expected: Vec<u8> = (0..AHB_LAYER_COUNT as u8)
            .filter(|l| in_range & (1 << l) != 0)
            .collect();
        let layers: Vec<u8> = records.iter().map(|r| r.layer).collect();
        prop_assert_eq!(layers, expected);

        for r in &records {
            prop_assert_eq!(r.address, ahb.address[usize::from(r.layer)]);
            prop_assert_eq!(r.raw_info, ahb.info[usize::from(r.layer)]);
        }
    }

    /// Scanning never modifies the snapshot and is repeatable.
    #[test]
    fn scan_is_pure(valid in any::<u32>(), seed in any::<u32>()) {
        let ahb = snapshot_with(valid, seed);
        let before = ahb;
        let first: Vec<_> = scan(&ahb).collect();
        let second: Vec<_> = scan(&ahb).collect();
        prop_assert_eq!(ahb, before);
        prop_assert_eq!(first, second);
    }

    /// Access type decoding is total.
    #[test]
    fn access_type_never_fails(info in any::<u32>()) {
        let access = AccessType::from_field(info);
        let expected = match info & 0b11 {
            0 | 3 => AccessType::ReadCode,
            2 => AccessType::ReadData,
            _ => AccessType::Unknown,
        };
        prop_assert_eq!(access, expected);
    }
}
