//! Hash oracle: a collision-resistant, deterministic digest over
//! concatenated byte strings.

use sha2::{Digest, Sha256};

/// Hashes the concatenation of `parts` and returns the 32-byte digest.
pub fn hash(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}
