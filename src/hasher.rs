//! Label hashing — three pluggable algorithms producing 64-bit IDs.
//!
//! The algorithm identity is frozen as a single digit stored in the
//! header (`_a`).  A digit is NEVER reused for a different algorithm,
//! even if one is deprecated.  Every record's `_id` is the 16-char
//! lowercase-hex rendering of the 64-bit hash of its label under the
//! file's algorithm.
//!
//! IDs are 64 bits and may collide (birthday bound ~2^-64 for labels
//! differing in bytes).  Correctness never depends on absence of
//! collision: every positive ID match is confirmed against the label
//! field before use.

use crate::error::{Error, Result};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Runtime hash-algorithm discriminant.  The numeric code is the
/// on-disk identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlg {
    /// xxh3, 64-bit (default).
    Xxh3 = 1,
    /// FNV-1a, 64-bit.
    Fnv1a = 2,
    /// BLAKE2b with an 8-byte digest, read little-endian.
    Blake2b = 3,
}

impl HashAlg {
    /// The frozen on-disk code written into the header.
    #[inline]
    pub fn code(self) -> u64 {
        self as u64
    }

    /// Resolve an on-disk code.  Returns `CorruptHeader` for codes this
    /// build does not recognise — a file hashed with an unknown
    /// algorithm cannot be searched.
    pub fn from_code(code: u64) -> Result<Self> {
        match code {
            1 => Ok(HashAlg::Xxh3),
            2 => Ok(HashAlg::Fnv1a),
            3 => Ok(HashAlg::Blake2b),
            other => Err(Error::CorruptHeader(format!(
                "unknown hash algorithm code {other}"
            ))),
        }
    }

    /// Human-readable name (diagnostics and CLI only — never parsed
    /// from disk).
    pub fn name(self) -> &'static str {
        match self {
            HashAlg::Xxh3 => "xxh3",
            HashAlg::Fnv1a => "fnv1a",
            HashAlg::Blake2b => "blake2b",
        }
    }

    /// Parse from a CLI string.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "xxh3" => Some(HashAlg::Xxh3),
            "fnv1a" => Some(HashAlg::Fnv1a),
            "blake2b" => Some(HashAlg::Blake2b),
            _ => None,
        }
    }
}

/// Hash a label to its 64-bit ID under `alg`.
pub fn hash_id(label: &str, alg: HashAlg) -> u64 {
    let bytes = label.as_bytes();
    match alg {
        HashAlg::Xxh3 => xxhash_rust::xxh3::xxh3_64(bytes),
        HashAlg::Fnv1a => {
            let mut h = FNV_OFFSET;
            for &b in bytes {
                h ^= b as u64;
                h = h.wrapping_mul(FNV_PRIME);
            }
            h
        }
        HashAlg::Blake2b => {
            let digest = blake2b_simd::Params::new().hash_length(8).hash(bytes);
            let mut raw = [0u8; 8];
            raw.copy_from_slice(digest.as_bytes());
            u64::from_le_bytes(raw)
        }
    }
}

/// Hash a label and render it as the 16-char lowercase-hex record ID.
pub fn id_hex(label: &str, alg: HashAlg) -> String {
    format!("{:016x}", hash_id(label, alg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_16_lowercase_hex() {
        for alg in [HashAlg::Xxh3, HashAlg::Fnv1a, HashAlg::Blake2b] {
            let id = id_hex("readme", alg);
            assert_eq!(id.len(), 16);
            assert!(id.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
        }
    }

    #[test]
    fn algorithms_disagree() {
        // Not a guarantee, but catching an accidental shared code path.
        let a = hash_id("doc", HashAlg::Xxh3);
        let b = hash_id("doc", HashAlg::Fnv1a);
        let c = hash_id("doc", HashAlg::Blake2b);
        assert!(a != b || b != c);
    }

    #[test]
    fn fnv1a_reference_vector() {
        // FNV-1a 64 of "a" per the reference constants.
        assert_eq!(hash_id("a", HashAlg::Fnv1a), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn code_round_trip() {
        for alg in [HashAlg::Xxh3, HashAlg::Fnv1a, HashAlg::Blake2b] {
            assert_eq!(HashAlg::from_code(alg.code()).unwrap(), alg);
        }
        assert!(HashAlg::from_code(0).is_err());
        assert!(HashAlg::from_code(9).is_err());
    }
}
