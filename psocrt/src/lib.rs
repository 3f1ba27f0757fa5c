//! Reset and exception-vector runtime for PSoC 4 microcontrollers.
//!
//! `arm_m` holds the architectural pieces (exception table, registers, the
//! reset sequence itself); `psoc4` binds them to the chip's memory map,
//! watchdog, and interrupt sources.

#![cfg_attr(not(test), no_std)]

#![deny(
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results,
    )]

pub mod arm_m;
pub mod psoc4;

mod lang;
