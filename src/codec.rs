//! Snapshot codec — zstd + base85.
//!
//! Every data record carries a compressed snapshot of its content in
//! the `_h` field.  The snapshot is zstd-encoded at the speed-fastest
//! level, then base85-encoded so the result embeds in a JSON string
//! value byte-for-byte.
//!
//! # Alphabet
//! The base85 alphabet is the RFC 1924 set: `0-9`, `A-Z`, `a-z`, then
//! `!#$%&()*+-;<=>?@^_`{|}~`.  It contains neither `"` nor `\`, so an
//! encoded snapshot never needs JSON escaping and in-place byte
//! patching around it stays offset-stable.  This is frozen for format
//! version 1.
//!
//! # Empty input
//! `compress(b"") == ""` and `decompress("") == b""`.  An empty `_h`
//! therefore round-trips without touching either codec.

use crate::error::{Error, Result};

/// zstd speed-fastest level used for every snapshot.
const ZSTD_LEVEL: i32 = 1;

const ALPHABET: [u8; 85] =
    *b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&()*+-;<=>?@^_`{|}~";

/// Reverse lookup: byte value -> base85 digit, 0xFF for bytes outside
/// the alphabet.
const DECODE: [u8; 256] = {
    let mut t = [0xFFu8; 256];
    let mut i = 0;
    while i < 85 {
        t[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    t
};

/// Compress `data` into a JSON-embeddable snapshot string.
pub fn compress(data: &[u8]) -> Result<String> {
    if data.is_empty() {
        return Ok(String::new());
    }
    let packed = zstd::encode_all(data, ZSTD_LEVEL)?;
    Ok(base85_encode(&packed))
}

/// Decode a snapshot string back into the original bytes.
///
/// Either decode step's failure maps to [`Error::Decompress`].
pub fn decompress(text: &str) -> Result<Vec<u8>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let packed = base85_decode(text.as_bytes())?;
    zstd::decode_all(&packed[..]).map_err(|e| Error::Decompress(format!("zstd decode: {e}")))
}

// ── base85 ───────────────────────────────────────────────────────────────────

/// Encode `data` as base85.  Full 4-byte groups become 5 digits; a
/// trailing group of n bytes becomes n+1 digits (zero-padded before
/// encoding, truncated after).
fn base85_encode(data: &[u8]) -> String {
    let mut out = Vec::with_capacity((data.len() / 4 + 1) * 5);
    for group in data.chunks(4) {
        let mut word = [0u8; 4];
        word[..group.len()].copy_from_slice(group);
        let mut v = u32::from_be_bytes(word);

        let mut digits = [0u8; 5];
        for d in digits.iter_mut().rev() {
            *d = ALPHABET[(v % 85) as usize];
            v /= 85;
        }
        out.extend_from_slice(&digits[..group.len() + 1]);
    }
    // The alphabet is pure ASCII.
    String::from_utf8(out).expect("base85 output is ASCII")
}

/// Decode base85 text.  A trailing group of m digits (2..=4) yields
/// m-1 bytes; a single leftover digit is malformed.
fn base85_decode(text: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() / 5 * 4 + 4);
    for group in text.chunks(5) {
        if group.len() == 1 {
            return Err(Error::Decompress("truncated base85 group".into()));
        }
        let mut v: u64 = 0;
        for i in 0..5 {
            // Pad a partial group with the maximum digit so the
            // truncated bytes decode back to what the encoder dropped.
            let digit = if i < group.len() {
                let d = DECODE[group[i] as usize];
                if d == 0xFF {
                    return Err(Error::Decompress(format!(
                        "invalid base85 byte {:#04x}",
                        group[i]
                    )));
                }
                d as u64
            } else {
                84
            };
            v = v * 85 + digit;
        }
        if v > u32::MAX as u64 {
            return Err(Error::Decompress("base85 group overflows 32 bits".into()));
        }
        let bytes = (v as u32).to_be_bytes();
        out.extend_from_slice(&bytes[..group.len() - 1]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_round_trip() {
        assert_eq!(compress(b"").unwrap(), "");
        assert_eq!(decompress("").unwrap(), b"");
    }

    #[test]
    fn round_trip() {
        for data in [
            &b"hi"[..],
            b"the quick brown fox jumps over the lazy dog",
            &[0u8; 1024],
            &[0xFFu8; 7],
        ] {
            let s = compress(data).unwrap();
            assert_eq!(decompress(&s).unwrap(), data);
        }
    }

    #[test]
    fn output_is_json_safe() {
        let s = compress(b"\"quotes\" and \\backslashes\\ galore").unwrap();
        assert!(!s.contains('"'));
        assert!(!s.contains('\\'));
        assert!(s.bytes().all(|b| (0x21..=0x7E).contains(&b)));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decompress("\u{20} bad"), Err(Error::Decompress(_))));
        assert!(matches!(decompress("A"), Err(Error::Decompress(_))));
    }
}
