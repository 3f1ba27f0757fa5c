use core::mem::size_of;

use static_assertions::const_assert_eq;

/// ARMv6-M interrupt and exception handlers are merely functions conforming to
/// the C ABI.
pub type Handler = extern "C" fn();

/// The reset vector is special: it must not return.  We can model this nicely
/// in Rust's type system as a diverging function.  We additionally mark the
/// reset handler as `unsafe` because it must do scary stuff, including zeroing
/// BSS.  Allowing a safe program to call it directly would be bad.
pub type ResetHandler = unsafe extern "C" fn() -> !;

/// Contents of a vector slot the architecture reserves.  The only value is
/// zero, so a reserved slot can never be made to hold something callable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum Reserved {
    Vector = 0,
}

/// Represents the ARMv6-M exception table: the first sixteen words of the
/// vector table, common to every Cortex-M0/M0+ part.
///
/// The vendor-specific interrupt vectors follow immediately after it.  We model
/// the two parts separately and concatenate them at link time (the exception
/// part goes in `.isr_vector.exceptions`, the interrupts in
/// `.isr_vector.interrupts`), so you will not find vendor vectors here.
///
/// Unlike the reserved slots, every exception slot holds a real handler.  An
/// exception nobody asked for lands in `default_handler` (or `fault_handler`
/// for HardFault) rather than jumping through a null vector.
#[repr(C)]
pub struct ExceptionTable {
    /// ARMv6-M processors load their initial stack pointer from the first word
    /// of the vector table.  This will be the contents of `sp` on entry to
    /// `reset` below.
    ///
    /// The stack is full-descending, so the initial `sp` points just past the
    /// end of RAM.  We model it as a `const` pointer to discourage such an
    /// invalid address from being dereferenced.
    pub initial_stack: *const u32,

    /// Reset vector.  At reset, the processor loads its stack pointer from
    /// `initial_stack` (above) and then enters this function using the ARM
    /// AAPCS C ABI.
    pub reset: ResetHandler,

    /// Non-Maskable Interrupt handler.
    pub nmi:          Handler,
    /// Hard Fault handler.  ARMv6-M has no configurable faults; everything
    /// escalates here.
    pub hard_fault:   Handler,
    pub _reserved0:   Reserved,
    pub _reserved1:   Reserved,
    pub _reserved2:   Reserved,
    pub _reserved3:   Reserved,
    pub _reserved4:   Reserved,
    pub _reserved5:   Reserved,
    pub _reserved6:   Reserved,
    /// Supervisor Call (`SVC`) handler.
    pub sv_call:      Handler,
    pub _reserved7:   Reserved,
    pub _reserved8:   Reserved,
    /// PendSV handler.
    pub pend_sv:      Handler,
    /// SysTick handler.
    pub sys_tick:     Handler,
}

/// Number of words in the ARMv6-M exception table, including the initial
/// stack pointer.
pub const EXCEPTION_WORDS: usize = 16;

const_assert_eq!(size_of::<ExceptionTable>(), EXCEPTION_WORDS * size_of::<usize>());

/// An exception table with every exception routed to the halting fallbacks.
/// In practice, this is used with functional struct update syntax like so:
///
/// ```ignore
/// pub static VECTORS : ExceptionTable = ExceptionTable {
///   sys_tick: my_tick_handler,
///   .. default_exception_table(stack_pointer, reset_handler)
/// };
/// ```
pub const fn default_exception_table(initial_stack: *const u32,
                                     reset: ResetHandler) -> ExceptionTable {
    ExceptionTable {
        initial_stack,
        reset,

        nmi: default_handler,
        hard_fault: fault_handler,
        _reserved0: Reserved::Vector,
        _reserved1: Reserved::Vector,
        _reserved2: Reserved::Vector,
        _reserved3: Reserved::Vector,
        _reserved4: Reserved::Vector,
        _reserved5: Reserved::Vector,
        _reserved6: Reserved::Vector,
        sv_call: default_handler,
        _reserved7: Reserved::Vector,
        _reserved8: Reserved::Vector,
        pend_sv: default_handler,
        sys_tick: default_handler,
    }
}

/// Most programs will have exactly one `ExceptionTable` `static`: the one that
/// gets deposited into ROM and read at processor startup.
///
/// To support a `static` `ExceptionTable`, the type must be `Sync`.  It is
/// *almost* `Sync` out of the box; the exception is the pointer used for the
/// `initial_stack` item, which is never dereferenced.
unsafe impl Sync for ExceptionTable {}

/// Value `default_handler` spins on.  Also visible in a register dump.
pub const DEFAULT_HANDLER_MARKER: u32 = 0xDEFA_0170;

/// Value `fault_handler` spins on.
pub const FAULT_HANDLER_MARKER: u32 = 0xFA17_0170;

/// Fallback for any exception or interrupt without a handler of its own.
///
/// Spins forever without acknowledging the source.  Exported under a fixed name
/// so that a debugger's backtrace says which fallback we are stuck in.
#[export_name = "DefaultHandler"]
#[inline(never)]
pub extern "C" fn default_handler() {
    super::halt_marked(DEFAULT_HANDLER_MARKER)
}

/// Fallback for HardFault.  Behaves exactly like `default_handler`, but lives
/// at a different address so "unhandled interrupt" and "hardware fault" can be
/// told apart from the PC alone.
#[export_name = "HardFaultHandler"]
#[inline(never)]
pub extern "C" fn fault_handler() {
    super::halt_marked(FAULT_HANDLER_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe extern "C" fn never_reset() -> ! {
        crate::arm_m::halt()
    }

    extern "C" fn tick() {}

    fn words(table: &ExceptionTable) -> [usize; EXCEPTION_WORDS] {
        unsafe { *(table as *const ExceptionTable as *const [usize; EXCEPTION_WORDS]) }
    }

    #[test]
    fn first_two_slots_are_stack_and_reset() {
        let stack = 0x2000_4000 as *const u32;
        let t = default_exception_table(stack, never_reset);
        let w = words(&t);
        assert_eq!(w[0], 0x2000_4000);
        assert_eq!(w[1], never_reset as usize);
    }

    #[test]
    fn reserved_slots_are_zero() {
        let t = default_exception_table(core::ptr::null(), never_reset);
        let w = words(&t);
        for slot in [4, 5, 6, 7, 8, 9, 10, 12, 13] {
            assert_eq!(w[slot], 0, "slot {slot}");
        }
    }

    #[test]
    fn fault_slot_is_distinct_from_default() {
        let t = default_exception_table(core::ptr::null(), never_reset);
        let w = words(&t);
        assert_eq!(w[3], fault_handler as usize);
        assert_ne!(fault_handler as usize, default_handler as usize);
        for slot in [2, 11, 14, 15] {
            assert_eq!(w[slot], default_handler as usize, "slot {slot}");
        }
    }

    #[test]
    fn hard_fault_slot_differs_from_nmi_slot() {
        // Holds in optimized builds too: the two fallbacks spin on different
        // markers, so they cannot be merged.
        let t = default_exception_table(core::ptr::null(), never_reset);
        let w = words(&t);
        assert_ne!(w[3], w[2]);
        assert_ne!(DEFAULT_HANDLER_MARKER, FAULT_HANDLER_MARKER);
    }

    #[test]
    fn struct_update_overrides_one_slot() {
        let t = ExceptionTable {
            sys_tick: tick,
            .. default_exception_table(core::ptr::null(), never_reset)
        };
        let w = words(&t);
        assert_eq!(w[15], tick as usize);
        assert_eq!(w[14], default_handler as usize);
    }
}
