//! Header — format anchor at offset 0.
//!
//! # On-disk layout (exactly 128 bytes)
//!
//! ```text
//! Offset  Size  Field
//!    0    ..    JSON object, fields in frozen order:
//!                 "_v"  format version, single digit (= 1)
//!                 "_f"  dirty flag, single digit (0 clean / 1 dirty)
//!                 "_a"  hash algorithm code (1..=3)
//!                 "_ts" last header write, ms since epoch
//!                 "_s"  [heap_end, index_end, reserved, live_count,
//!                        writes_since_compaction, auto_compact_modulus]
//!   ..    126   ASCII space padding
//!  127      1   '\n'
//! ```
//!
//! # The dirty byte
//! With the frozen field order and a single-digit version, the dirty
//! digit always lands at byte offset 13.  That lets the write path
//! toggle it with a one-byte positioned write instead of re-serialising
//! the whole header.  [`DIRTY_POS`] is load-bearing; a layout change
//! that moves it is a format version bump.
//!
//! # Section boundaries
//! `heap_end`/`index_end` delimit the sorted regions.  Zero means the
//! section does not exist yet (a file that has never been compacted is
//! all sparse).  `heap_end <= index_end` always holds when both are
//! non-zero.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::hasher::HashAlg;

/// Fixed byte size of the header, including the trailing newline.
pub const HEADER_SIZE: usize = 128;

/// Current header/record layout version.
pub const FORMAT_VERSION: u8 = 1;

/// Byte offset of the dirty digit within the file.
pub const DIRTY_POS: u64 = 13;

#[derive(Debug, Clone)]
pub struct Header {
    pub version: u8,
    pub dirty: bool,
    pub algorithm: HashAlg,
    /// Millisecond timestamp of the last full header write.
    pub timestamp_ms: u64,
    /// End of the sorted heap region (exclusive); 0 = no heap section.
    pub heap_end: u64,
    /// End of the sorted index region (exclusive); 0 = no index section.
    pub index_end: u64,
    pub reserved: u64,
    /// Live label count.  Authoritative after a rebuild, best-effort
    /// between rebuilds.
    pub live_count: u64,
    /// Writes since the last rebuild; drives auto-compaction.
    pub writes_since_compaction: u64,
    /// Auto-compact every N writes; 0 disables.
    pub auto_compact_modulus: u64,
}

/// Parse-side mirror with the on-disk field names.
#[derive(Deserialize)]
struct HeaderWire {
    #[serde(rename = "_v")]
    version: u64,
    #[serde(rename = "_f")]
    dirty: u64,
    #[serde(rename = "_a")]
    algorithm: u64,
    #[serde(rename = "_ts")]
    timestamp_ms: u64,
    #[serde(rename = "_s")]
    state: [u64; 6],
}

impl Header {
    /// A fresh header for a newly created file.
    pub fn new(algorithm: HashAlg, timestamp_ms: u64, auto_compact_modulus: u64) -> Self {
        Self {
            version: FORMAT_VERSION,
            dirty: false,
            algorithm,
            timestamp_ms,
            heap_end: 0,
            index_end: 0,
            reserved: 0,
            live_count: 0,
            writes_since_compaction: 0,
            auto_compact_modulus,
        }
    }

    /// Serialise to exactly [`HEADER_SIZE`] bytes: JSON, space padding,
    /// trailing newline at byte 127.
    pub fn encode(&self) -> Result<[u8; HEADER_SIZE]> {
        let json = format!(
            "{{\"_v\":{},\"_f\":{},\"_a\":{},\"_ts\":{},\"_s\":[{},{},{},{},{},{}]}}",
            self.version,
            self.dirty as u8,
            self.algorithm.code(),
            self.timestamp_ms,
            self.heap_end,
            self.index_end,
            self.reserved,
            self.live_count,
            self.writes_since_compaction,
            self.auto_compact_modulus,
        );
        if json.len() > HEADER_SIZE - 1 {
            return Err(Error::CorruptHeader(format!(
                "header state does not fit the fixed width ({} > {})",
                json.len(),
                HEADER_SIZE - 1
            )));
        }
        debug_assert_eq!(json.as_bytes()[DIRTY_POS as usize], b'0' + self.dirty as u8);

        let mut buf = [b' '; HEADER_SIZE];
        buf[..json.len()].copy_from_slice(json.as_bytes());
        buf[HEADER_SIZE - 1] = b'\n';
        Ok(buf)
    }

    /// Parse and validate a header read from offset 0.
    ///
    /// `file_len` bounds the section-boundary checks.  Any violation
    /// returns `CorruptHeader` — a header that cannot be trusted makes
    /// every derived offset untrustworthy.
    pub fn decode(buf: &[u8], file_len: u64) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::CorruptHeader(format!(
                "file too short for a header ({} bytes)",
                buf.len()
            )));
        }
        if buf[HEADER_SIZE - 1] != b'\n' {
            return Err(Error::CorruptHeader("header is not newline-terminated".into()));
        }

        let body = trim_trailing_spaces(&buf[..HEADER_SIZE - 1]);
        let wire: HeaderWire = serde_json::from_slice(body)
            .map_err(|e| Error::CorruptHeader(format!("unparseable header JSON: {e}")))?;

        if wire.version != FORMAT_VERSION as u64 {
            return Err(Error::CorruptHeader(format!(
                "unsupported format version {}",
                wire.version
            )));
        }
        if wire.dirty > 1 {
            return Err(Error::CorruptHeader(format!("bad dirty flag {}", wire.dirty)));
        }
        let algorithm = HashAlg::from_code(wire.algorithm)?;

        let [heap_end, index_end, reserved, live_count, writes, modulus] = wire.state;
        if heap_end != 0 && heap_end < HEADER_SIZE as u64 {
            return Err(Error::CorruptHeader(format!(
                "heap end {heap_end} inside the header"
            )));
        }
        if index_end != 0 && heap_end > index_end {
            return Err(Error::CorruptHeader(format!(
                "heap end {heap_end} beyond index end {index_end}"
            )));
        }
        if index_end > file_len {
            return Err(Error::CorruptHeader(format!(
                "index end {index_end} beyond file length {file_len}"
            )));
        }

        Ok(Self {
            version: wire.version as u8,
            dirty: wire.dirty == 1,
            algorithm,
            timestamp_ms: wire.timestamp_ms,
            heap_end,
            index_end,
            reserved,
            live_count,
            writes_since_compaction: writes,
            auto_compact_modulus: modulus,
        })
    }

    /// Start of the sparse region: after the index section when one
    /// exists, else right after the header.
    #[inline]
    pub fn sparse_start(&self) -> u64 {
        if self.index_end == 0 {
            HEADER_SIZE as u64
        } else {
            self.index_end
        }
    }
}

fn trim_trailing_spaces(buf: &[u8]) -> &[u8] {
    let mut end = buf.len();
    while end > 0 && buf[end - 1] == b' ' {
        end -= 1;
    }
    &buf[..end]
}
