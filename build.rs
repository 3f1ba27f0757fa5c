// Build script for the demo firmware.
// Hands the memory layout to the linker when building for the chip.

use std::{env, path::PathBuf};

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let script = manifest_dir.join("psoc4.ld");

    println!("cargo:rerun-if-changed={}", script.display());

    // Host builds (tests, tooling) link normally.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("none") {
        return;
    }

    println!("cargo:rustc-link-search={}", manifest_dir.display());
    println!("cargo:rustc-link-arg-bins=-Tpsoc4.ld");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}
