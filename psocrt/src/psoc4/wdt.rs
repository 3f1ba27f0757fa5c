//! The PSoC 4 watchdog, as far as startup cares about it.
//!
//! The watchdog runs out of reset.  Writing the key to the disable register
//! stops it; the application is free to reconfigure and re-arm it later.

use crate::arm_m::reg::Reg;

/// Address of `CYREG_WDT_DISABLE_KEY`.
pub const WDT_DISABLE_KEY_ADDRESS: usize = 0x4003_0038;

/// The value that, written to the disable-key register, stops the watchdog.
pub const WDT_KEY: u32 = 0xACED_8865;

#[repr(C)]
struct Registers {
    disable_key: Reg<u32>,
}

pub struct Wdt {
    reg: *const Registers,
}

impl Wdt {
    /// Creates a driver for a watchdog whose disable-key register lives at
    /// `address`.
    ///
    /// # Safety
    ///
    /// `address` must point at the register (or at memory standing in for it)
    /// for as long as the driver is used.
    pub const unsafe fn at(address: usize) -> Self {
        Wdt { reg: address as *const Registers }
    }

    fn reg(&self) -> &Registers {
        unsafe { &*self.reg }
    }

    /// Stops the watchdog with a single store of the key.  No read, so no
    /// read-modify-write to race with.
    pub fn disable(&self) {
        self.reg().disable_key.set(WDT_KEY)
    }
}

unsafe impl Sync for Wdt {}

/// Shared static instance of the `Wdt` driver, at the chip's real address.
pub static WDT: Wdt = unsafe { Wdt::at(WDT_DISABLE_KEY_ADDRESS) };
