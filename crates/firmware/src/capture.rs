//! Register capture for the HardFault handler.
//!
//! [`capture_from`] fixes which registers are read and in what order; a
//! [`RegisterBank`] supplies the reads. On target that is [`MmioRegisters`],
//! which goes through the cortex-m register blocks and the PAC's secure alias
//! of the AHB controller. On the host, [`capture_with`] drives the same plan
//! over raw addresses from a lookup table, so ordering is tested without
//! hardware.
//!
//! Every register is read exactly once. Nothing here writes to the fault
//! status registers; the sticky bits stay set for a debugger to inspect.

use fault_core::config::{
    AHB_LAYER_COUNT, AHB_SECURE_CTRL_BASE, AHB_SEC_VIO_ADDR_OFFSET,
    AHB_SEC_VIO_INFO_VALID_OFFSET, AHB_SEC_VIO_MISC_INFO_OFFSET, SAU_SFAR_ADDR, SAU_SFSR_ADDR,
    SCB_BFAR_ADDR, SCB_CFSR_ADDR, SCB_MMFAR_ADDR, SCB_NS_ALIAS_OFFSET,
};
use fault_core::{AhbSnapshot, CfsrSnapshot, RegisterSnapshot, SauSnapshot};

#[cfg(feature = "hardware")]
use fault_core::SnapshotSource;

/// Number of 32-bit reads one capture performs.
pub const CAPTURE_READS: usize = 2 + 3 + 3 + 1 + 2 * AHB_LAYER_COUNT;

/// Address of `SEC_VIO_MISC_INFO[layer]`.
///
/// `layer` is always `< AHB_LAYER_COUNT`, so the offset fits in a few bits.
#[allow(clippy::cast_possible_truncation, clippy::arithmetic_side_effects)]
pub const fn ahb_info_addr(layer: usize) -> u32 {
    AHB_SECURE_CTRL_BASE + AHB_SEC_VIO_MISC_INFO_OFFSET + 4 * layer as u32
}

/// Address of `SEC_VIO_ADDR[layer]`.
#[allow(clippy::cast_possible_truncation, clippy::arithmetic_side_effects)]
pub const fn ahb_addr_addr(layer: usize) -> u32 {
    AHB_SECURE_CTRL_BASE + AHB_SEC_VIO_ADDR_OFFSET + 4 * layer as u32
}

/// Address of `SEC_VIO_INFO_VALID`.
#[allow(clippy::arithmetic_side_effects)]
pub const AHB_INFO_VALID_ADDR: u32 = AHB_SECURE_CTRL_BASE + AHB_SEC_VIO_INFO_VALID_OFFSET;

/// Offset from the PAC's (non-secure) AHB secure controller base to its
/// secure alias.
pub const AHB_SECURE_ALIAS_OFFSET: u32 = 0x1000_0000;

/// One read per register, grouped the way the fault registers are banked.
///
/// Each method performs its reads exactly once and in the order of the
/// returned fields.
pub trait RegisterBank {
    /// SAU_SFSR, then SAU_SFAR.
    fn sau(&mut self) -> SauSnapshot;

    /// Secure SCB: CFSR, MMFAR, BFAR.
    fn secure_scb(&mut self) -> CfsrSnapshot;

    /// Non-secure SCB through the secure alias: CFSR, MMFAR, BFAR.
    fn non_secure_scb(&mut self) -> CfsrSnapshot;

    /// `SEC_VIO_INFO_VALID`.
    fn ahb_valid(&mut self) -> u32;

    /// `SEC_VIO_MISC_INFO[layer]`, then `SEC_VIO_ADDR[layer]`.
    fn ahb_layer(&mut self, layer: usize) -> (u32, u32);
}

/// Read the full register set from `bank`.
///
/// Order: SAU, secure SCB, non-secure SCB alias, AHB validity bitmap, then
/// each AHB layer's info and address registers.
pub fn capture_from<B: RegisterBank + ?Sized>(bank: &mut B) -> RegisterSnapshot {
    let sau = bank.sau();
    let secure = bank.secure_scb();
    let non_secure = bank.non_secure_scb();

    let mut ahb = AhbSnapshot {
        valid: bank.ahb_valid(),
        ..AhbSnapshot::default()
    };
    for (layer, (info, address)) in ahb
        .info
        .iter_mut()
        .zip(ahb.address.iter_mut())
        .enumerate()
    {
        (*info, *address) = bank.ahb_layer(layer);
    }

    RegisterSnapshot {
        sau,
        secure,
        non_secure,
        ahb,
    }
}

/// [`RegisterBank`] over raw register addresses.
///
/// The closure receives each address from [`fault_core::config`] and returns
/// the word stored there.
#[derive(Debug)]
pub struct AddressPlan<F>(pub F);

impl<F: FnMut(u32) -> u32> AddressPlan<F> {
    fn scb(&mut self, alias: u32) -> CfsrSnapshot {
        CfsrSnapshot {
            cfsr: (self.0)(SCB_CFSR_ADDR.wrapping_add(alias)),
            mmfar: (self.0)(SCB_MMFAR_ADDR.wrapping_add(alias)),
            bfar: (self.0)(SCB_BFAR_ADDR.wrapping_add(alias)),
        }
    }
}

impl<F: FnMut(u32) -> u32> RegisterBank for AddressPlan<F> {
    fn sau(&mut self) -> SauSnapshot {
        SauSnapshot {
            sfsr: (self.0)(SAU_SFSR_ADDR),
            sfar: (self.0)(SAU_SFAR_ADDR),
        }
    }

    fn secure_scb(&mut self) -> CfsrSnapshot {
        self.scb(0)
    }

    fn non_secure_scb(&mut self) -> CfsrSnapshot {
        self.scb(SCB_NS_ALIAS_OFFSET)
    }

    fn ahb_valid(&mut self) -> u32 {
        (self.0)(AHB_INFO_VALID_ADDR)
    }

    fn ahb_layer(&mut self, layer: usize) -> (u32, u32) {
        let info = (self.0)(ahb_info_addr(layer));
        let address = (self.0)(ahb_addr_addr(layer));
        (info, address)
    }
}

/// Read the full register set through `read`, one address at a time.
pub fn capture_with(read: impl FnMut(u32) -> u32) -> RegisterSnapshot {
    capture_from(&mut AddressPlan(read))
}

/// Live register set of the running core.
///
/// Only meaningful from secure state: the SAU, the non-secure SCB alias and
/// the secure AHB controller alias are all RAZ/WI or fault from non-secure
/// code.
#[cfg(feature = "hardware")]
#[derive(Debug)]
pub struct MmioRegisters {
    _private: (),
}

#[cfg(feature = "hardware")]
#[allow(unsafe_code)]
impl MmioRegisters {
    /// Handle to the live registers.
    ///
    /// # Safety
    ///
    /// The caller must be executing in secure state on a part whose memory
    /// map matches [`fault_core::config`].
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }

    fn secure_ahb() -> &'static mimxrt685s_pac::ahb_secure_ctrl::RegisterBlock {
        // SAFETY: secure state is guaranteed by `new`; the secure alias sits
        // a fixed offset above the PAC's base and maps the same block.
        unsafe {
            &*mimxrt685s_pac::AhbSecureCtrl::ptr()
                .byte_add(AHB_SECURE_ALIAS_OFFSET as usize)
        }
    }
}

#[cfg(feature = "hardware")]
#[allow(unsafe_code)]
impl RegisterBank for MmioRegisters {
    fn sau(&mut self) -> SauSnapshot {
        // SAFETY: the SAU block is always mapped on ARMv8-M mainline and
        // only read here.
        let sau = unsafe { &*cortex_m::peripheral::SAU::PTR };
        SauSnapshot {
            sfsr: sau.sfsr.read().0,
            sfar: sau.sfar.read().0,
        }
    }

    fn secure_scb(&mut self) -> CfsrSnapshot {
        // SAFETY: the SCB block is always mapped and only read here.
        let scb = unsafe { &*cortex_m::peripheral::SCB::PTR };
        CfsrSnapshot {
            cfsr: scb.cfsr.read(),
            mmfar: scb.mmfar.read(),
            bfar: scb.bfar.read(),
        }
    }

    fn non_secure_scb(&mut self) -> CfsrSnapshot {
        // cortex-m has no register block for the SCB_NS alias.
        AddressPlan(|addr: u32| {
            // SAFETY: secure state is guaranteed by `new`; the alias addresses
            // are word-aligned, read-only status registers.
            unsafe { core::ptr::read_volatile(addr as usize as *const u32) }
        })
        .non_secure_scb()
    }

    fn ahb_valid(&mut self) -> u32 {
        Self::secure_ahb().sec_vio_info_valid().read().bits()
    }

    fn ahb_layer(&mut self, layer: usize) -> (u32, u32) {
        let ahb = Self::secure_ahb();
        let info = ahb.sec_vio_misc_info(layer).read().bits();
        let address = ahb.sec_vio_addr(layer).read().bits();
        (info, address)
    }
}

#[cfg(feature = "hardware")]
impl SnapshotSource for MmioRegisters {
    fn capture(&mut self) -> RegisterSnapshot {
        capture_from(self)
    }
}
