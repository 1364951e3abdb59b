// src/config/checksum.rs

use blake3::Hasher;

/// Hex digest of the configuration file bytes, compared against the last
/// approved value before a changed file is trusted.
pub fn checksum(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    hasher.finalize().to_hex().to_string()
}
