#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod firmware;

/// Off-target there is nothing to run; the runtime's behavior is covered by
/// the `psocrt` unit tests.
#[cfg(not(target_os = "none"))]
fn main() {}
