//! Interrupt vectors for the PSoC 4100S Plus.
//!
//! This module provides:
//! - `struct InterruptTable` for modeling the vendor-specific vector table.
//! - `enum Interrupt` for naming an interrupt source by number.

use core::mem::size_of;

use static_assertions::const_assert_eq;

use crate::arm_m::exc::{default_handler, Reserved, EXCEPTION_WORDS};

/// Re-export the type used for interrupt vectors on ARMv6-M.
pub use crate::arm_m::exc::Handler;

/// The PSoC 4100S Plus vendor-specific (NVIC) vector table.  This is separate
/// from the ARMv6-M Exception Table, and must be placed immediately after it in
/// ROM.
///
/// The part wires up 28 interrupt lines; the table is padded out to 32 with
/// reserved (zero) slots.
#[repr(C)]
pub struct InterruptTable {
    /// GPIO port 0.
    pub gpio_0: Handler,
    /// GPIO port 1.
    pub gpio_1: Handler,
    /// GPIO port 2.
    pub gpio_2: Handler,
    /// GPIO port 3.
    pub gpio_3: Handler,
    /// GPIO, all ports.
    pub gpio_all: Handler,
    /// Low-power comparator trigger.
    pub lpcomp: Handler,
    pub srss_wdt: Handler,
    pub scb_0: Handler,
    pub scb_1: Handler,
    pub scb_2: Handler,
    pub scb_3: Handler,
    pub scb_4: Handler,
    /// All CTBm blocks.
    pub ctbs: Handler,
    /// WCO watchdog.
    pub wco: Handler,
    pub dma: Handler,
    pub spcif: Handler,
    /// CSD block (primarily CapSense).
    pub csd: Handler,
    pub tcpwm_0: Handler,
    pub tcpwm_1: Handler,
    pub tcpwm_2: Handler,
    pub tcpwm_3: Handler,
    pub tcpwm_4: Handler,
    pub tcpwm_5: Handler,
    pub tcpwm_6: Handler,
    pub tcpwm_7: Handler,
    pub sar: Handler,
    pub can: Handler,
    pub crypto: Handler,

    pub _reserved0: Reserved,
    pub _reserved1: Reserved,
    pub _reserved2: Reserved,
    pub _reserved3: Reserved,
}

/// Number of words in `InterruptTable`.
pub const INTERRUPT_WORDS: usize = 32;

/// Total words in the vector table, exceptions and interrupts together.
pub const VECTOR_WORDS: usize = EXCEPTION_WORDS + INTERRUPT_WORDS;

const_assert_eq!(size_of::<InterruptTable>(), INTERRUPT_WORDS * size_of::<usize>());
const_assert_eq!(VECTOR_WORDS, 48);

/// An `InterruptTable` with every source bound to `default_handler`.  This can
/// be used with struct update syntax to declare a vector table containing only
/// a few application handlers:
///
/// ```ignore
/// static INTERRUPTS : InterruptTable = InterruptTable {
///     sar: my_adc_handler,
///     .. DEFAULT_INTERRUPTS
/// };
/// ```
pub const DEFAULT_INTERRUPTS : InterruptTable = InterruptTable {
    gpio_0: default_handler,
    gpio_1: default_handler,
    gpio_2: default_handler,
    gpio_3: default_handler,
    gpio_all: default_handler,
    lpcomp: default_handler,
    srss_wdt: default_handler,
    scb_0: default_handler,
    scb_1: default_handler,
    scb_2: default_handler,
    scb_3: default_handler,
    scb_4: default_handler,
    ctbs: default_handler,
    wco: default_handler,
    dma: default_handler,
    spcif: default_handler,
    csd: default_handler,
    tcpwm_0: default_handler,
    tcpwm_1: default_handler,
    tcpwm_2: default_handler,
    tcpwm_3: default_handler,
    tcpwm_4: default_handler,
    tcpwm_5: default_handler,
    tcpwm_6: default_handler,
    tcpwm_7: default_handler,
    sar: default_handler,
    can: default_handler,
    crypto: default_handler,

    _reserved0: Reserved::Vector,
    _reserved1: Reserved::Vector,
    _reserved2: Reserved::Vector,
    _reserved3: Reserved::Vector,
};

/// Enumeration of the PSoC 4100S Plus interrupts.  This can be used to name an
/// interrupt vector, like an integer, but without the risk of receiving
/// out-of-range values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interrupt {
    Gpio0 = 0,
    Gpio1,
    Gpio2,
    Gpio3,
    GpioAll,
    Lpcomp,
    SrssWdt,
    Scb0,
    Scb1,
    Scb2,
    Scb3,
    Scb4,
    Ctbs,
    Wco,
    Dma,
    Spcif,
    Csd,
    Tcpwm0,
    Tcpwm1,
    Tcpwm2,
    Tcpwm3,
    Tcpwm4,
    Tcpwm5,
    Tcpwm6,
    Tcpwm7,
    Sar,
    Can,
    Crypto,
}

impl Interrupt {
    /// Every interrupt source, in vector order.
    pub const ALL: [Interrupt; 28] = [
        Interrupt::Gpio0, Interrupt::Gpio1, Interrupt::Gpio2, Interrupt::Gpio3,
        Interrupt::GpioAll, Interrupt::Lpcomp, Interrupt::SrssWdt,
        Interrupt::Scb0, Interrupt::Scb1, Interrupt::Scb2, Interrupt::Scb3,
        Interrupt::Scb4, Interrupt::Ctbs, Interrupt::Wco, Interrupt::Dma,
        Interrupt::Spcif, Interrupt::Csd,
        Interrupt::Tcpwm0, Interrupt::Tcpwm1, Interrupt::Tcpwm2,
        Interrupt::Tcpwm3, Interrupt::Tcpwm4, Interrupt::Tcpwm5,
        Interrupt::Tcpwm6, Interrupt::Tcpwm7,
        Interrupt::Sar, Interrupt::Can, Interrupt::Crypto,
    ];

    /// Index of this interrupt's word in the full vector table.
    pub const fn vector(self) -> usize {
        EXCEPTION_WORDS + self as usize
    }
}

impl InterruptTable {
    /// The handler the hardware will enter for `irq`.
    pub fn handler(&self, irq: Interrupt) -> Handler {
        match irq {
            Interrupt::Gpio0 => self.gpio_0,
            Interrupt::Gpio1 => self.gpio_1,
            Interrupt::Gpio2 => self.gpio_2,
            Interrupt::Gpio3 => self.gpio_3,
            Interrupt::GpioAll => self.gpio_all,
            Interrupt::Lpcomp => self.lpcomp,
            Interrupt::SrssWdt => self.srss_wdt,
            Interrupt::Scb0 => self.scb_0,
            Interrupt::Scb1 => self.scb_1,
            Interrupt::Scb2 => self.scb_2,
            Interrupt::Scb3 => self.scb_3,
            Interrupt::Scb4 => self.scb_4,
            Interrupt::Ctbs => self.ctbs,
            Interrupt::Wco => self.wco,
            Interrupt::Dma => self.dma,
            Interrupt::Spcif => self.spcif,
            Interrupt::Csd => self.csd,
            Interrupt::Tcpwm0 => self.tcpwm_0,
            Interrupt::Tcpwm1 => self.tcpwm_1,
            Interrupt::Tcpwm2 => self.tcpwm_2,
            Interrupt::Tcpwm3 => self.tcpwm_3,
            Interrupt::Tcpwm4 => self.tcpwm_4,
            Interrupt::Tcpwm5 => self.tcpwm_5,
            Interrupt::Tcpwm6 => self.tcpwm_6,
            Interrupt::Tcpwm7 => self.tcpwm_7,
            Interrupt::Sar => self.sar,
            Interrupt::Can => self.can,
            Interrupt::Crypto => self.crypto,
        }
    }
}
