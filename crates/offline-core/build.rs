//! Stamps the cache generation into the crate at build time.

use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    println!("cargo:rerun-if-env-changed=OFFLINE_CACHE_GENERATION");
    println!("cargo:rerun-if-changed=src");

    let generation = std::env::var("OFFLINE_CACHE_GENERATION").unwrap_or_else(|_| {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
        format!("fitness-cache-v{}-{}", version, stamp)
    });

    println!("cargo:rustc-env=OFFLINE_CACHE_GENERATION={}", generation);
}
