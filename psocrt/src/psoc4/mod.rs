//! Support for the PSoC 4 family of SoCs.

pub mod boot;
pub mod irq;
pub mod wdt;

/// Base of on-chip SRAM.
pub const SRAM_START: usize = 0x2000_0000;

/// Size of on-chip SRAM, in bytes.
#[cfg(feature = "soc_family-psoc4100s_plus")]
pub const SRAM_SIZE: usize = 16 * 1024;

/// One past the last byte of SRAM.
pub const SRAM_END: usize = SRAM_START + SRAM_SIZE;

/// Initial stack pointer.  The stack is full-descending and gets the top of
/// SRAM to itself.
pub const STACK_TOP: usize = SRAM_END;
