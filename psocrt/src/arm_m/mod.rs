//! Architectural support for ARMv6-M (Cortex-M0/M0+) processors.

pub mod exc;
pub mod reg;
pub mod startup;
pub mod sys_tick;

/// Stops forward progress for good.
///
/// This is the terminal state for unhandled exceptions, hardware faults, and an
/// application that returns from its entry point.  Interrupt state is left
/// untouched, so any pending source stays pending where a debugger can find it;
/// only an external reset gets us out.
#[inline(always)]
pub fn halt() -> ! {
    loop {
        core::hint::spin_loop()
    }
}

/// `halt`, but with `marker` kept live in a register on every iteration.
///
/// Two functions that halt with different markers never compile to the same
/// code, so the optimizer cannot fold them into one address.
#[inline(always)]
pub fn halt_marked(marker: u32) -> ! {
    loop {
        let _ = core::hint::black_box(marker);
        core::hint::spin_loop()
    }
}
