/// This will be invoked on `panic!`, including a failed debug assertion during
/// reset.  There is nowhere to report to, so we stop where a debugger can see
/// us.  Applications can override this by adding the `app_panic_handler`
/// feature.
#[cfg(all(target_os = "none", not(feature = "app_panic_handler")))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    crate::arm_m::halt()
}
