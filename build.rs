//! Build script for the spectrum analyzer firmware
//!
//! Handles:
//! - Rebuild triggers
//! - defmt linker script on target builds

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Memory layout comes from embassy-stm32's `memory-x` feature; only the
    // defmt section script has to be requested for the firmware binary.
    if std::env::var_os("CARGO_FEATURE_EMBEDDED").is_some() {
        println!("cargo:rustc-link-arg-bins=--nmagic");
        println!("cargo:rustc-link-arg-bins=-Tlink.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }
}
