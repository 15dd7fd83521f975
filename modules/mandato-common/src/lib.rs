pub mod config;
pub mod error;
pub mod text;
pub mod types;
pub mod urlnorm;

pub use config::Config;
pub use error::MandatoError;
pub use types::*;
pub use urlnorm::{canonical_url, extract_domain};

/// Deterministic content hash for stable filenames (FNV-1a).
/// Must be stable across process restarts — `DefaultHasher` is NOT
/// (HashDoS randomization).
pub fn content_hash(content: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325; // FNV offset basis
    for byte in content.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3); // FNV prime
    }
    hash
}

/// Round a score to two decimal places.
///
/// ```
/// assert_eq!(mandato_common::round2(60.4999), 60.5);
/// assert_eq!(mandato_common::round2(100.0), 100.0);
/// ```
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
