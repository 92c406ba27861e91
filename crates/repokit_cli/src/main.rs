//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `repokit_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("repokit_core version={}", repokit_core::core_version());
}
