//! Immutable register captures.
//!
//! A [`RegisterSnapshot`] is read from hardware exactly once per fault and
//! then threaded by value into every evaluator. Nothing downstream of the
//! capture touches a register, so diagnosis is a pure function of the
//! snapshot and runs unchanged on the host.

use crate::config::AHB_LAYER_COUNT;
use crate::decoder::{CFSR_BUSFAULTSR_MASK, CFSR_MEMFAULTSR_MASK, CFSR_USGFAULTSR_MASK};

/// SAU fault status and address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SauSnapshot {
    /// SAU_SFSR.
    pub sfsr: u32,
    /// SAU_SFAR. Meaningful only when SFSR.SFARVALID is set.
    #[cfg_attr(feature = "serde", serde(default))]
    pub sfar: u32,
}

/// One security domain's Configurable Fault Status Register and the two
/// fault address registers that go with it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CfsrSnapshot {
    /// SCB_CFSR.
    pub cfsr: u32,
    /// SCB_MMFAR. Meaningful only when CFSR.MMARVALID is set.
    #[cfg_attr(feature = "serde", serde(default))]
    pub mmfar: u32,
    /// SCB_BFAR. Meaningful only when CFSR.BFARVALID is set.
    #[cfg_attr(feature = "serde", serde(default))]
    pub bfar: u32,
}

impl CfsrSnapshot {
    /// MemManage sub-field, still in CFSR bit positions.
    pub const fn mem_manage_bits(&self) -> u32 {
        self.cfsr & CFSR_MEMFAULTSR_MASK
    }

    /// BusFault sub-field, still in CFSR bit positions.
    pub const fn bus_bits(&self) -> u32 {
        self.cfsr & CFSR_BUSFAULTSR_MASK
    }

    /// UsageFault sub-field, still in CFSR bit positions.
    pub const fn usage_bits(&self) -> u32 {
        self.cfsr & CFSR_USGFAULTSR_MASK
    }
}

/// AHB secure controller violation registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AhbSnapshot {
    /// SEC_VIO_INFO_VALID: bit `n` set means layer `n` recorded a violation.
    pub valid: u32,
    /// SEC_VIO_MISC_INFO\[n\].
    #[cfg_attr(feature = "serde", serde(default = "zeroed_layers"))]
    pub info: [u32; AHB_LAYER_COUNT],
    /// SEC_VIO_ADDR\[n\].
    #[cfg_attr(feature = "serde", serde(default = "zeroed_layers"))]
    pub address: [u32; AHB_LAYER_COUNT],
}

#[cfg(feature = "serde")]
fn zeroed_layers() -> [u32; AHB_LAYER_COUNT] {
    [0; AHB_LAYER_COUNT]
}

impl Default for AhbSnapshot {
    fn default() -> Self {
        Self {
            valid: 0,
            info: [0; AHB_LAYER_COUNT],
            address: [0; AHB_LAYER_COUNT],
        }
    }
}

impl AhbSnapshot {
    /// Set one layer's registers and its validity bit. Layers past
    /// [`AHB_LAYER_COUNT`] are ignored.
    #[must_use]
    pub fn with_layer(mut self, layer: usize, info: u32, address: u32) -> Self {
        if let (Some(i), Some(a)) = (self.info.get_mut(layer), self.address.get_mut(layer)) {
            *i = info;
            *a = address;
            self.valid |= 1u32.checked_shl(u32::try_from(layer).unwrap_or(u32::MAX)).unwrap_or(0);
        }
        self
    }
}

/// Everything the dispatcher needs, captured once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterSnapshot {
    /// Secure Attribution Unit.
    #[cfg_attr(feature = "serde", serde(default))]
    pub sau: SauSnapshot,
    /// Secure SCB.
    #[cfg_attr(feature = "serde", serde(default))]
    pub secure: CfsrSnapshot,
    /// Non-secure SCB (read through the NS alias).
    #[cfg_attr(feature = "serde", serde(default))]
    pub non_secure: CfsrSnapshot,
    /// AHB secure controller.
    #[cfg_attr(feature = "serde", serde(default))]
    pub ahb: AhbSnapshot,
}

impl RegisterSnapshot {
    /// `true` when no fault source reports anything.
    pub fn is_quiet(&self) -> bool {
        self.sau.sfsr == 0
            && self.secure.cfsr == 0
            && self.non_secure.cfsr == 0
            && self.ahb.valid == 0
    }
}

/// Something that can produce a [`RegisterSnapshot`].
///
/// The firmware implements this over memory-mapped registers; tests and the
/// offline decoder use a stored snapshot.
pub trait SnapshotSource {
    /// Read every register once and return the result.
    fn capture(&mut self) -> RegisterSnapshot;
}

impl SnapshotSource for RegisterSnapshot {
    fn capture(&mut self) -> RegisterSnapshot {
        *self
    }
}
