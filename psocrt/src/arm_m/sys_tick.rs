//! ARMv6-M SysTick timer support.

use crate::arm_m::reg::Reg;

#[repr(C)]
struct Registers {
    csr:   Reg<u32>,
    rvr:   Reg<u32>,
    cvr:   Reg<u32>,
    calib: Reg<u32>,
}

const SYS_TICK_ADDRESS : usize = 0xe000e010;

/// Largest value the 24-bit reload register holds.
pub const RELOAD_MAX: u32 = 0x00FF_FFFF;

pub struct SysTick {
    reg: *const Registers,
}

impl SysTick {
    /// Creates a driver for a SysTick block at `address`.
    ///
    /// # Safety
    ///
    /// `address` must point at the SysTick registers (or at memory standing in
    /// for them) for as long as the driver is used.
    pub const unsafe fn at(address: usize) -> Self {
        SysTick { reg: address as *const Registers }
    }

    fn reg(&self) -> &Registers {
        unsafe { &*self.reg }
    }

    pub fn read_csr(&self) -> Csr {
        Csr(self.reg().csr.get())
    }

    pub fn write_csr(&self, v: Csr) {
        self.reg().csr.set(v.into())
    }

    pub fn write_rvr(&self, v: u32) {
        self.reg().rvr.set(v)
    }

    pub fn write_cvr(&self, v: u32) {
        self.reg().cvr.set(v)
    }

    /// Starts the counter from the processor clock, interrupting every
    /// `reload + 1` cycles.
    pub fn start(&self, reload: u32) {
        debug_assert!(reload <= RELOAD_MAX);
        self.write_csr(Csr::default().with_enable(false));
        self.write_rvr(reload & RELOAD_MAX);
        // Any write clears the current value and COUNTFLAG.
        self.write_cvr(0);
        self.write_csr(Csr::default()
                       .with_clksource(ClkSource::ProcessorClock)
                       .with_tickint(true)
                       .with_enable(true));
    }
}

unsafe impl Sync for SysTick {}

#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct Csr(u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClkSource {
    ExternalReference = 0,
    ProcessorClock = 1,
}

impl Csr {
    #[inline]
    pub fn get_enable(self) -> bool {
        (self.0 & (1 << 0)) != 0
    }

    #[inline]
    pub fn with_enable(self, v: bool) -> Self {
        Csr((self.0 & !(1 << 0)) | ((v as u32) << 0))
    }

    #[inline]
    pub fn get_tickint(self) -> bool {
        (self.0 & (1 << 1)) != 0
    }

    #[inline]
    pub fn with_tickint(self, v: bool) -> Self {
        Csr((self.0 & !(1 << 1)) | ((v as u32) << 1))
    }

    #[inline]
    pub fn get_clksource(self) -> ClkSource {
        match (self.0 & (1 << 2)) != 0 {
            false => ClkSource::ExternalReference,
            true => ClkSource::ProcessorClock,
        }
    }

    #[inline]
    pub fn with_clksource(self, v: ClkSource) -> Self {
        Csr((self.0 & !(1 << 2)) | ((v as u32) << 2))
    }

    #[inline]
    pub fn get_countflag(self) -> bool {
        (self.0 & (1 << 16)) != 0
    }
}

impl From<u32> for Csr {
    fn from(v: u32) -> Csr {
        Csr(v)
    }
}

impl From<Csr> for u32 {
    fn from(v: Csr) -> u32 {
        v.0
    }
}

pub static SYS_TICK : SysTick = unsafe { SysTick::at(SYS_TICK_ADDRESS) };
