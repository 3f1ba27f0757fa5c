//! Support for memory-mapped registers.

use core::cell::UnsafeCell;
use core::ptr;

/// A register whose contents can be represented as `T`.  The contents are
/// accessed using `volatile` operations only, ensuring that apparently dead
/// loads and stores are not optimized away.
///
/// Memory-mapped registers are the ultimate ambient authority, and are
/// inherently shared.  Thus, registers (like cells) can be mutated through a
/// shared reference `&`, and a unique reference `&mut` to a register is not
/// particularly meaningful.
///
/// ARMv6-M has no exclusive-access instructions, so unlike larger cores there
/// is no atomic read-modify-write here.  Callers that need one must mask
/// interrupts themselves.
#[repr(transparent)]
pub struct Reg<T> {
    value: UnsafeCell<T>,
}

impl<T: Copy> Reg<T> {
    /// Creates a register cell holding `value`.  Real registers are never
    /// constructed, only referenced at their fixed addresses; this exists so
    /// that ordinary memory can stand in for one.
    pub const fn new(value: T) -> Self {
        Reg { value: UnsafeCell::new(value) }
    }

    /// Reads the contents of the register using a volatile load.
    pub fn get(&self) -> T {
        unsafe { ptr::read_volatile(self.value.get()) }
    }

    /// Replaces the contents of the register using a volatile store.
    pub fn set(&self, value: T) {
        unsafe { ptr::write_volatile(self.value.get(), value) }
    }

    /// Reads the register, passes the contents through `f`, and writes back
    /// the result.  This is two separate volatile accesses, not an atomic
    /// operation.
    pub fn update<F: FnOnce(T) -> T>(&self, f: F) {
        self.set(f(self.get()))
    }
}
