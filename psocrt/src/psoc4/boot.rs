//! The PSoC 4 reset vector, and the linker contract behind it.
//!
//! `psoc4.ld` (or an equivalent script) must define:
//!
//! - `__data_start`, `__data_end`: runtime bounds of `.data`; `_la_data`: its
//!   load address.
//! - `__bss_start__`, `__bss_end__`: bounds of `.bss`.
//! - `__custom_start__`, `__custom_end__`: runtime bounds of `.custom`;
//!   `__la_custom__`: its load address.
//! - `__init_array_start`, `__init_array_end`: bounds of the gathered
//!   `.psocrt_init_array` input sections.
//!
//! All bounds must be word-aligned.  The application must export
//! `psocrt_main`.

use core::ops::Range;
#[cfg(target_os = "none")]
use core::ptr::{addr_of, addr_of_mut};

use crate::arm_m::startup::{self, InitHook, Platform};
#[cfg(target_os = "none")]
use crate::arm_m::startup::{Layout, Region, RegionKind};
use crate::psoc4::wdt::Wdt;
#[cfg(target_os = "none")]
use crate::psoc4::wdt::WDT;

#[cfg(target_os = "none")]
extern "C" {
    static mut __data_start: u32;
    static mut __data_end: u32;
    static _la_data: u32;

    static mut __bss_start__: u32;
    static mut __bss_end__: u32;

    static mut __custom_start__: u32;
    static mut __custom_end__: u32;
    static __la_custom__: u32;

    static __init_array_start: InitHook;
    static __init_array_end: InitHook;

    fn psocrt_main();
}

/// The memory layout the linker gave us.
#[cfg(target_os = "none")]
pub fn layout() -> Layout {
    unsafe {
        Layout {
            data: Region::copied(RegionKind::Data,
                                 addr_of!(_la_data),
                                 addr_of_mut!(__data_start),
                                 addr_of_mut!(__data_end)),
            bss: Region::zeroed(RegionKind::Bss,
                                addr_of_mut!(__bss_start__),
                                addr_of_mut!(__bss_end__)),
            custom: Region::copied(RegionKind::Custom,
                                   addr_of!(__la_custom__),
                                   addr_of_mut!(__custom_start__),
                                   addr_of_mut!(__custom_end__)),
        }
    }
}

/// The real chip: which watchdog to stop, where the init hooks are, and what
/// to call as main.
pub struct Psoc4<'a> {
    pub wdt: &'a Wdt,
    pub init_hooks: Range<*const InitHook>,
    pub main: unsafe extern "C" fn(),
}

impl Platform for Psoc4<'_> {
    fn disable_watchdog(&mut self) {
        self.wdt.disable()
    }

    unsafe fn run_constructors(&mut self) {
        startup::run_init_hooks(self.init_hooks.start, self.init_hooks.end)
    }

    unsafe fn enter_main(&mut self) {
        (self.main)()
    }
}

/// This function will be "called" by the processor at reset.  Note that none of
/// the Rust environment has been established --- in particular, this function
/// is responsible for initializing any global data it might need!  That rules
/// out touching mutable statics, here or in anything called before `run` gets
/// to `enter_main`.  `WDT` is immutable and lives in flash, so it is fine.
///
/// Interrupts are never enabled here; that is up to the application.
#[cfg(target_os = "none")]
#[export_name = "ResetHandler"]
pub unsafe extern "C" fn reset_handler() -> ! {
    let mut chip = Psoc4 {
        wdt: &WDT,
        init_hooks: addr_of!(__init_array_start)..addr_of!(__init_array_end),
        main: psocrt_main,
    };
    startup::reset(&mut chip, &layout())
}
