//! Runtime startup support for ARMv6-M bare metal targets.
//!
//! At reset nothing a Rust program takes for granted is true yet: statics with
//! initializers still hold whatever was in SRAM, `.bss` is not zero, and no
//! constructors have run.  `run` fixes that, in this order:
//!
//! 1. Suppress the watchdog, so slow flash can't get us reset halfway through.
//! 2. Copy `.data` from its load image in flash.
//! 3. Zero `.bss`.
//! 4. Copy the `.custom` region from its load image in flash.
//! 5. Call the init hooks (our equivalent of C++ global constructors).
//! 6. Call the application entry point.
//!
//! The chip-specific half (linker symbols, the watchdog register, the real
//! reset vector) lives in `psoc4::boot`.  Everything here is written against
//! the `Platform` trait so the sequence can be exercised off-target.
//!
//! Applications define their entry point like so:
//!
//! ```ignore
//! #[no_mangle]
//! pub extern "C" fn psocrt_main() {
//!     // code here
//! }
//! ```

use core::fmt;
use core::mem::size_of;
use core::ops::Range;
use core::ptr;

use thiserror::Error;

/// Which of the three boot-time regions a `Region` describes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegionKind {
    /// Statics with a non-zero initializer.
    Data,
    /// Statics that must read as zero.
    Bss,
    /// Build-specific blob relocated from flash, e.g. a lookup table.
    Custom,
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            RegionKind::Data => ".data",
            RegionKind::Bss => ".bss",
            RegionKind::Custom => ".custom",
        })
    }
}

/// A span of SRAM that must be brought into shape before the program runs.
///
/// `start` and `end` are the runtime (VMA) bounds, end-exclusive.  If `load` is
/// present the span is filled from that address (the LMA, usually in flash);
/// otherwise it is zeroed.
///
/// The addresses come from the linker and are treated as opaque; nothing here
/// looks at them except to walk between them word by word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub kind: RegionKind,
    pub load: Option<*const u32>,
    pub start: *mut u32,
    pub end: *mut u32,
}

impl Region {
    /// A region initialized by copying from `load`.
    pub const fn copied(kind: RegionKind,
                        load: *const u32,
                        start: *mut u32,
                        end: *mut u32) -> Self {
        Region { kind, load: Some(load), start, end }
    }

    /// A region initialized to zero.
    pub const fn zeroed(kind: RegionKind, start: *mut u32, end: *mut u32) -> Self {
        Region { kind, load: None, start, end }
    }

    /// Number of whole words between `start` and `end`.  An inverted region
    /// has none.
    pub fn len_words(&self) -> usize {
        (self.end as usize).saturating_sub(self.start as usize) / size_of::<u32>()
    }

    /// Runtime address range.
    pub fn destination(&self) -> Range<usize> {
        self.start as usize .. self.end as usize
    }

    /// Address range of the load image, if the region has one.
    pub fn source(&self) -> Option<Range<usize>> {
        self.load.map(|l| {
            let l = l as usize;
            l .. l + self.len_words() * size_of::<u32>()
        })
    }

    /// Fills the region: a copy from the load image, or zeroes.
    ///
    /// # Safety
    ///
    /// Both ranges must be valid for word access, and nothing may be holding a
    /// reference into the destination.
    pub unsafe fn initialize(&self) {
        match self.load {
            Some(load) => copy_words(load, self.start, self.len_words()),
            None => zero_words(self.start, self.len_words()),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Region {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} [{=usize:#x}, {=usize:#x})",
                      self.kind, self.start as usize, self.end as usize)
    }
}

/// Copies `count` words from `src` to `dst`.
///
/// Volatile stores keep the compiler from turning this into a `memcpy` call,
/// which is not guaranteed to be safe to call before `.data` exists.
unsafe fn copy_words(mut src: *const u32, mut dst: *mut u32, count: usize) {
    for _ in 0 .. count {
        ptr::write_volatile(dst, ptr::read(src));
        src = src.add(1);
        dst = dst.add(1);
    }
}

/// Stores zero to `count` words starting at `dst`.
unsafe fn zero_words(mut dst: *mut u32, count: usize) {
    for _ in 0 .. count {
        ptr::write_volatile(dst, 0);
        dst = dst.add(1);
    }
}

/// Reasons a memory layout is unfit to boot from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayoutError {
    #[error("{0} ends before it starts")]
    Inverted(RegionKind),
    #[error("{0} is not word-aligned")]
    Misaligned(RegionKind),
    #[error("{0} needs a load image but has none")]
    MissingLoad(RegionKind),
    #[error("{0} and {1} overlap")]
    Overlap(RegionKind, RegionKind),
    #[error("load image of {load} overlaps {destination}")]
    LoadOverlap { load: RegionKind, destination: RegionKind },
}

/// The three regions the reset sequence initializes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Layout {
    pub data: Region,
    pub bss: Region,
    pub custom: Region,
}

impl Layout {
    /// The regions in the order the reset sequence visits them.
    pub fn regions(&self) -> [&Region; 3] {
        [&self.data, &self.bss, &self.custom]
    }

    /// Checks the layout for the mistakes a bad linker script can make.
    ///
    /// Nothing on the boot path depends on this; `run` only calls it in debug
    /// builds.  Applications can call it once they have a way to report the
    /// result.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let regions = self.regions();

        for r in regions {
            if (r.end as usize) < (r.start as usize) {
                return Err(LayoutError::Inverted(r.kind));
            }
            let aligned = |a: usize| a % size_of::<u32>() == 0;
            if !aligned(r.start as usize)
                || !aligned(r.end as usize)
                || !r.load.map_or(true, |l| aligned(l as usize)) {
                return Err(LayoutError::Misaligned(r.kind));
            }
            if r.kind != RegionKind::Bss && r.load.is_none() {
                return Err(LayoutError::MissingLoad(r.kind));
            }
        }

        for (i, a) in regions.iter().enumerate() {
            for b in &regions[i + 1 ..] {
                if overlaps(&a.destination(), &b.destination()) {
                    return Err(LayoutError::Overlap(a.kind, b.kind));
                }
            }
        }

        for r in regions {
            let Some(src) = r.source() else { continue };
            for d in regions {
                // A region that is already where it runs (load == start) is
                // fine; any other overlap corrupts the image mid-copy.
                if d.kind == r.kind && src.start == d.start as usize {
                    continue;
                }
                if overlaps(&src, &d.destination()) {
                    return Err(LayoutError::LoadOverlap {
                        load: r.kind,
                        destination: d.kind,
                    });
                }
            }
        }

        Ok(())
    }
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    !a.is_empty() && !b.is_empty() && a.start < b.end && b.start < a.end
}

/// The side effects of the reset sequence, separated from their order.
///
/// `psoc4::boot` implements this for real hardware.  Each method is called
/// exactly once per region or step, by `run`, and by nothing else.
pub trait Platform {
    /// Stops the watchdog from resetting us during startup.
    fn disable_watchdog(&mut self);

    /// Brings one region into its runtime state.
    ///
    /// # Safety
    ///
    /// See `Region::initialize`.
    unsafe fn init_region(&mut self, region: &Region) {
        region.initialize()
    }

    /// Runs static initialization routines registered at build time.
    ///
    /// # Safety
    ///
    /// Only once, after all regions are initialized.
    unsafe fn run_constructors(&mut self);

    /// Calls the application.  Under normal operation this never returns.
    ///
    /// # Safety
    ///
    /// Only once, after `run_constructors`.
    unsafe fn enter_main(&mut self);
}

/// Runs the reset sequence against `platform`.
///
/// This returns only if the application entry point does; the caller is
/// expected to halt at that point.
///
/// # Safety
///
/// Must be called once, from reset, before anything touches a static.
pub unsafe fn run<P: Platform>(platform: &mut P, layout: &Layout) {
    platform.disable_watchdog();

    debug_assert_eq!(layout.validate(), Ok(()));

    for region in layout.regions() {
        platform.init_region(region);
    }

    platform.run_constructors();
    platform.enter_main();
}

/// Runs the reset sequence, then halts if the application ever returns.
///
/// This is the whole body of a reset vector; `psoc4::boot::reset_handler` is
/// one line around it.
///
/// # Safety
///
/// As for `run`.
pub unsafe fn reset<P: Platform>(platform: &mut P, layout: &Layout) -> ! {
    run(platform, layout);
    super::halt()
}

/// The startup routine can call functions after data is initialized, but
/// before main.  Functions must be of this type.
pub type InitHook = extern "C" fn();

/// Calls each hook in `[start, end)`, in address (that is, link) order.
///
/// # Safety
///
/// The range must hold valid `InitHook`s, such as the array the linker script
/// gathers from `.psocrt_init_array` sections.
pub unsafe fn run_init_hooks(start: *const InitHook, end: *const InitHook) {
    let mut hook = start;
    while hook < end {
        (ptr::read(hook))();
        hook = hook.add(1);
    }
}

/// Defines one or more init hooks, which are functions that will be called
/// after the basic Rust runtime invariants have been established, but before
/// main.
///
/// Each hook becomes a `#[used]` `pub static` in the `.psocrt_init_array`
/// section; the linker script gathers those into the array `run_init_hooks`
/// walks.  Hooks run in link order, which across crates is not something to
/// rely on.
///
/// Syntax:
///
/// ```ignore
/// extern "C" fn my_init_hook() {
///     activate_lasers()
/// }
///
/// psocrt_init_hooks! {
///     pub init_hook MY_INIT_HOOK = my_init_hook;
/// }
/// ```
#[macro_export]
macro_rules! psocrt_init_hooks {
    (
        $(
            $(#[$m:meta])*
            pub init_hook $name:ident = $f:path;
        )*
    ) => {
        $(
            $(#[$m])*
            #[link_section = ".psocrt_init_array"]
            #[used]
            #[allow(dead_code)]
            pub static $name : $crate::arm_m::startup::InitHook = $f;
        )*
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use proptest::prelude::*;

    const GUARD: u32 = 0xDEAD_BEEF;

    fn at(addr: usize) -> *mut u32 {
        addr as *mut u32
    }

    fn load_at(addr: usize) -> *const u32 {
        addr as *const u32
    }

    fn region_over(kind: RegionKind,
                   load: Option<*const u32>,
                   buf: &mut [u32],
                   words: Range<usize>) -> Region {
        let base = buf.as_mut_ptr();
        unsafe {
            Region { kind, load, start: base.add(words.start), end: base.add(words.end) }
        }
    }

    #[test]
    fn copy_sixteen_bytes() {
        let bytes: [u8; 16] = core::array::from_fn(|i| i as u8 + 1);
        let src: [u32; 4] = core::array::from_fn(|i| {
            u32::from_ne_bytes(bytes[i * 4 .. i * 4 + 4].try_into().unwrap())
        });
        let mut dst = [GUARD; 6];

        let r = region_over(RegionKind::Data, Some(src.as_ptr()), &mut dst, 1 .. 5);
        assert_eq!(r.len_words(), 4);
        unsafe { r.initialize() };

        let copied: Vec<u8> = dst[1 .. 5].iter().flat_map(|w| w.to_ne_bytes()).collect();
        assert_eq!(copied, bytes);
        assert_eq!(dst[0], GUARD);
        assert_eq!(dst[5], GUARD);
    }

    #[test]
    fn zero_fill_sixteen_bytes() {
        let mut mem = [0xFFFF_FFFFu32; 6];

        let r = region_over(RegionKind::Bss, None, &mut mem, 1 .. 5);
        unsafe { r.initialize() };

        assert_eq!(mem, [0xFFFF_FFFF, 0, 0, 0, 0, 0xFFFF_FFFF]);
    }

    #[test]
    fn empty_region_touches_nothing() {
        let mut mem = [GUARD; 2];
        let r = region_over(RegionKind::Bss, None, &mut mem, 1 .. 1);
        unsafe { r.initialize() };
        assert_eq!(mem, [GUARD; 2]);
    }

    proptest! {
        #[test]
        fn copy_is_exact_and_bounded(src in proptest::collection::vec(any::<u32>(), 0 .. 64),
                                     pad in 0usize .. 4) {
            let n = src.len();
            let mut dst = vec![GUARD; n + 2 * pad];
            let r = region_over(RegionKind::Custom, Some(src.as_ptr()), &mut dst, pad .. pad + n);
            unsafe { r.initialize() };

            prop_assert_eq!(&dst[pad .. pad + n], &src[..]);
            prop_assert!(dst[.. pad].iter().all(|&w| w == GUARD));
            prop_assert!(dst[pad + n ..].iter().all(|&w| w == GUARD));
        }

        #[test]
        fn zero_fill_is_exact_and_bounded(len in 0usize .. 64, pad in 0usize .. 4) {
            let mut mem = vec![GUARD; len + 2 * pad];
            let r = region_over(RegionKind::Bss, None, &mut mem, pad .. pad + len);
            unsafe { r.initialize() };

            prop_assert!(mem[pad .. pad + len].iter().all(|&w| w == 0));
            prop_assert!(mem[.. pad].iter().all(|&w| w == GUARD));
            prop_assert!(mem[pad + len ..].iter().all(|&w| w == GUARD));
        }
    }

    fn good_layout() -> Layout {
        Layout {
            data: Region::copied(RegionKind::Data, load_at(0x0000_8000),
                                 at(0x2000_0000), at(0x2000_0010)),
            bss: Region::zeroed(RegionKind::Bss, at(0x2000_0010), at(0x2000_0020)),
            custom: Region::copied(RegionKind::Custom, load_at(0x0000_8010),
                                   at(0x2000_0020), at(0x2000_0060)),
        }
    }

    #[test]
    fn good_layout_validates() {
        assert_eq!(good_layout().validate(), Ok(()));
    }

    #[test]
    fn inverted_region_is_rejected() {
        let mut l = good_layout();
        l.bss.end = at(0x2000_000c);
        assert_eq!(l.validate(), Err(LayoutError::Inverted(RegionKind::Bss)));
    }

    #[test]
    fn unaligned_bound_is_rejected() {
        let mut l = good_layout();
        l.custom.end = at(0x2000_0062);
        assert_eq!(l.validate(), Err(LayoutError::Misaligned(RegionKind::Custom)));
    }

    #[test]
    fn copied_region_without_load_is_rejected() {
        let mut l = good_layout();
        l.data.load = None;
        assert_eq!(l.validate(), Err(LayoutError::MissingLoad(RegionKind::Data)));
    }

    #[test]
    fn custom_region_overlapping_bss_is_rejected() {
        let mut l = good_layout();
        l.custom.start = at(0x2000_001c);
        assert_eq!(l.validate(),
                   Err(LayoutError::Overlap(RegionKind::Bss, RegionKind::Custom)));
    }

    #[test]
    fn empty_regions_never_overlap() {
        let mut l = good_layout();
        l.bss = Region::zeroed(RegionKind::Bss, at(0x2000_0004), at(0x2000_0004));
        assert_eq!(l.validate(), Ok(()));
    }

    #[test]
    fn load_image_inside_another_destination_is_rejected() {
        let mut l = good_layout();
        l.custom.load = Some(load_at(0x2000_0010));
        assert_eq!(l.validate(), Err(LayoutError::LoadOverlap {
            load: RegionKind::Custom,
            destination: RegionKind::Bss,
        }));
    }

    #[test]
    fn region_running_in_place_is_allowed() {
        let mut l = good_layout();
        l.data.load = Some(load_at(0x2000_0000));
        assert_eq!(l.validate(), Ok(()));
    }

    #[test]
    fn shifted_self_overlap_is_rejected() {
        let mut l = good_layout();
        l.data.load = Some(load_at(0x2000_0004));
        assert_eq!(l.validate(), Err(LayoutError::LoadOverlap {
            load: RegionKind::Data,
            destination: RegionKind::Data,
        }));
    }

    #[test]
    fn errors_name_the_sections() {
        let e = LayoutError::Overlap(RegionKind::Data, RegionKind::Custom);
        assert_eq!(e.to_string(), ".data and .custom overlap");
    }

    #[derive(Debug, PartialEq, Eq)]
    enum Step {
        Watchdog,
        Region(RegionKind),
        Constructors,
        Main,
    }

    /// Platform that performs the memory work for real but records what
    /// happened and when.
    struct Recorder {
        log: Rc<RefCell<Vec<Step>>>,
        on_main: Box<dyn FnMut()>,
    }

    impl Platform for Recorder {
        fn disable_watchdog(&mut self) {
            self.log.borrow_mut().push(Step::Watchdog);
        }

        unsafe fn init_region(&mut self, region: &Region) {
            self.log.borrow_mut().push(Step::Region(region.kind));
            region.initialize()
        }

        unsafe fn run_constructors(&mut self) {
            self.log.borrow_mut().push(Step::Constructors);
        }

        unsafe fn enter_main(&mut self) {
            self.log.borrow_mut().push(Step::Main);
            (self.on_main)()
        }
    }

    #[test]
    fn sequence_runs_in_order_and_main_sees_initialized_memory() {
        let flash: Vec<u32> = (1 ..= 12).collect();
        // data: 4 words, bss: 4 words, custom: 8 words.
        let mut sram = vec![0xA5A5_A5A5u32; 16];
        let base = sram.as_mut_ptr();
        let layout = unsafe {
            Layout {
                data: Region::copied(RegionKind::Data, flash.as_ptr(), base, base.add(4)),
                bss: Region::zeroed(RegionKind::Bss, base.add(4), base.add(8)),
                custom: Region::copied(RegionKind::Custom, flash.as_ptr().add(4),
                                       base.add(8), base.add(16)),
            }
        };

        let seen = Rc::new(RefCell::new(None));
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut platform = Recorder {
            log: log.clone(),
            on_main: {
                let seen = seen.clone();
                let sram = base as *const u32;
                Box::new(move || {
                    let snapshot: Vec<u32> =
                        (0 .. 16).map(|i| unsafe { *sram.add(i) }).collect();
                    *seen.borrow_mut() = Some(snapshot);
                })
            },
        };

        unsafe { run(&mut platform, &layout) };

        assert_eq!(*log.borrow(), [
            Step::Watchdog,
            Step::Region(RegionKind::Data),
            Step::Region(RegionKind::Bss),
            Step::Region(RegionKind::Custom),
            Step::Constructors,
            Step::Main,
        ]);
        let snapshot = seen.borrow_mut().take().unwrap();
        assert_eq!(&snapshot[.. 4], &[1, 2, 3, 4]);
        assert_eq!(&snapshot[4 .. 8], &[0; 4]);
        assert_eq!(&snapshot[8 ..], &[5, 6, 7, 8, 9, 10, 11, 12]);
        drop(sram);
    }

    #[test]
    fn returning_main_ends_the_sequence() {
        let mut mem = [0u32; 1];
        let base = mem.as_mut_ptr();
        let layout = Layout {
            data: Region::copied(RegionKind::Data, base, base, base),
            bss: Region::zeroed(RegionKind::Bss, base, base),
            custom: Region::copied(RegionKind::Custom, base, base, base),
        };
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut platform = Recorder { log: log.clone(), on_main: Box::new(|| ()) };

        unsafe { run(&mut platform, &layout) };

        let log = log.borrow();
        assert_eq!(log.iter().filter(|s| **s == Step::Main).count(), 1);
        assert_eq!(log.last(), Some(&Step::Main));
    }

    #[test]
    fn reset_stays_halted_after_main_returns() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let mains = Arc::new(AtomicUsize::new(0));

        let worker = {
            let mains = mains.clone();
            thread::spawn(move || {
                let mem: &'static mut [u32; 1] = Box::leak(Box::new([0u32; 1]));
                let base = mem.as_mut_ptr();
                let layout = Layout {
                    data: Region::copied(RegionKind::Data, base, base, base),
                    bss: Region::zeroed(RegionKind::Bss, base, base),
                    custom: Region::copied(RegionKind::Custom, base, base, base),
                };
                let mut platform = Recorder {
                    log: Rc::new(RefCell::new(Vec::new())),
                    on_main: Box::new(move || {
                        let _ = mains.fetch_add(1, Ordering::SeqCst);
                        entered_tx.send(()).unwrap();
                    }),
                };
                unsafe { reset(&mut platform, &layout) }
            })
        };

        entered_rx.recv_timeout(Duration::from_secs(10)).unwrap();
        // main has returned (or is about to); give reset every chance to
        // fall through.
        thread::sleep(Duration::from_millis(200));

        assert!(!worker.is_finished());
        assert_eq!(mains.load(Ordering::SeqCst), 1);
        // The worker spins until the test process exits.
        drop(worker);
    }

    static HOOK_CALLS: AtomicUsize = AtomicUsize::new(0);
    static HOOK_ORDER: Mutex<Vec<u8>> = Mutex::new(Vec::new());

    extern "C" fn first_hook() {
        let _ = HOOK_CALLS.fetch_add(1, Ordering::SeqCst);
        HOOK_ORDER.lock().unwrap().push(1);
    }

    extern "C" fn second_hook() {
        let _ = HOOK_CALLS.fetch_add(1, Ordering::SeqCst);
        HOOK_ORDER.lock().unwrap().push(2);
    }

    #[test]
    fn init_hooks_run_once_each_in_link_order() {
        let hooks: [InitHook; 3] = [first_hook, second_hook, first_hook];
        let range = hooks.as_ptr_range();
        unsafe { run_init_hooks(range.start, range.end) };

        assert_eq!(HOOK_CALLS.load(Ordering::SeqCst), 3);
        assert_eq!(*HOOK_ORDER.lock().unwrap(), [1, 2, 1]);
    }

    static MACRO_HOOK_CALLS: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn counted_hook() {
        let _ = MACRO_HOOK_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    crate::psocrt_init_hooks! {
        /// Exercised by `macro_hook_is_an_ordinary_init_hook`.
        pub init_hook COUNTED_HOOK = counted_hook;
    }

    #[test]
    fn macro_hook_is_an_ordinary_init_hook() {
        let hooks: [InitHook; 1] = [COUNTED_HOOK];
        let range = hooks.as_ptr_range();
        unsafe { run_init_hooks(range.start, range.end) };

        assert_eq!(MACRO_HOOK_CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_hook_array_calls_nothing() {
        let hooks: [InitHook; 0] = [];
        let range = hooks.as_ptr_range();
        unsafe { run_init_hooks(range.start, range.end) };
    }
}
