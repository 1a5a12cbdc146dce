// SPDX-License-Identifier: Apache-2.0 OR MIT
fn main() {
    // `cargo tarpaulin` sets this cfg during coverage runs; declare it so
    // normal builds do not warn about an unexpected cfg.
    println!("cargo:rustc-check-cfg=cfg(tarpaulin)");
}
