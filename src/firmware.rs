//! Demo application: walks a QAM-16 constellation kept in `.custom`, stepping
//! once per SysTick.  Diagnostics go out over RTT via `defmt`.

use core::ptr;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use defmt_rtt as _;
// Supplies the critical-section implementation `defmt-rtt` needs.
use cortex_m as _;

use psocrt::arm_m::{self, exc};
use psocrt::arm_m::exc::ExceptionTable;
use psocrt::arm_m::sys_tick::SYS_TICK;
use psocrt::psoc4::{self, irq};
use psocrt::psoc4::boot::reset_handler;
use psocrt::psoc4::irq::InterruptTable;

/// Symbol table for the modulator, relocated to SRAM at reset.
#[link_section = ".custom"]
static CONSTELLATION: [[i16; 2]; 16] = [
    [-3, -3], [-3, -1], [-3, 3], [-3, 1],
    [-1, -3], [-1, -1], [-1, 3], [-1, 1],
    [ 3, -3], [ 3, -1], [ 3, 3], [ 3, 1],
    [ 1, -3], [ 1, -1], [ 1, 3], [ 1, 1],
];

/// 1 ms per tick from the 24 MHz IMO the chip comes out of reset on.
const TICK_RELOAD: u32 = 24_000 - 1;

/// Lives in `.data`: only correct if the copy from flash happened.
static SEED: AtomicU32 = AtomicU32::new(0xACE1);

/// Lives in `.bss`.
static TICKS: AtomicU32 = AtomicU32::new(0);

static CONSTRUCTED: AtomicBool = AtomicBool::new(false);

extern "C" fn mark_constructed() {
    CONSTRUCTED.store(true, Ordering::Relaxed)
}

psocrt::psocrt_init_hooks! {
    pub init_hook DEMO_CONSTRUCTOR = mark_constructed;
}

/// SysTick only counts; thumbv6m has no atomic read-modify-write, but this is
/// the only writer.
extern "C" fn on_sys_tick() {
    TICKS.store(TICKS.load(Ordering::Relaxed).wrapping_add(1), Ordering::Relaxed)
}

/// The ROM exception table.  Placed first in flash by the linker script
/// because of its assigned `link_section`.  Note that it is not `mut`.
///
/// `no_mangle` keeps the symbol visible, and predictably named, for the
/// linker script's `EXTERN`.
#[no_mangle]
#[link_section = ".isr_vector.exceptions"]
pub static ISR_EXCEPTIONS: ExceptionTable = ExceptionTable {
    sys_tick: on_sys_tick,

    .. exc::default_exception_table(psoc4::STACK_TOP as *const u32,
                                    reset_handler)
};

/// Vendor interrupts, immediately after the exceptions.  Nothing is enabled,
/// so every source keeps the default handler.
#[no_mangle]
#[link_section = ".isr_vector.interrupts"]
pub static ISR_INTERRUPTS: InterruptTable = irq::DEFAULT_INTERRUPTS;

/// 16-bit Galois LFSR, taps 16/14/13/11.
fn next_symbol(state: u32) -> u32 {
    let lsb = state & 1;
    let state = state >> 1;
    if lsb != 0 { state ^ 0xB400 } else { state }
}

/// Halts, with the reason on RTT, if the reset sequence left anything undone.
fn check_startup() {
    if let Err(e) = psoc4::boot::layout().validate() {
        defmt::error!("memory layout: {}", e);
        arm_m::halt()
    }
    if !CONSTRUCTED.load(Ordering::Relaxed) {
        defmt::error!("init hooks did not run");
        arm_m::halt()
    }
}

#[no_mangle]
pub extern "C" fn psocrt_main() {
    if cfg!(debug_assertions) {
        check_startup()
    }

    SYS_TICK.start(TICK_RELOAD);

    let mut state = SEED.load(Ordering::Relaxed);
    let mut last_tick = TICKS.load(Ordering::Relaxed);
    loop {
        let now = TICKS.load(Ordering::Relaxed);
        if now == last_tick {
            continue;
        }
        last_tick = now;

        state = next_symbol(state);
        // Volatile, so the read really comes from the relocated copy.
        let point = unsafe {
            ptr::read_volatile(&CONSTELLATION[(state & 0xF) as usize])
        };
        let _ = core::hint::black_box(point);
    }
}
