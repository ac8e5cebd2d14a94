//! Record format — three JSON line shapes with frozen byte positions.
//!
//! # Line shapes (field order is frozen)
//!
//! ```text
//! Index   {"_r":1,"_id":"<16 hex>","_ts":<13 digits>,"_o":N,"_l":"label"}
//! Data    {"_r":2,"_id":"<16 hex>","_ts":<13 digits>,"_l":"label","_d":"content","_h":"snapshot"}
//! History {"_r":3, ... same as Data with the "_d" value blanked to spaces in place}
//! ```
//!
//! # Fixed byte positions
//!
//! ```text
//! Offset  Size  Field
//!    6      1   type digit ('1' / '2' / '3')
//!   15     16   ID, lowercase hex
//!   39     13   millisecond timestamp
//! ```
//!
//! The shared `_r`,`_id`,`_ts` prefix is byte-identical across all
//! three shapes, so the positions hold for every record.  Binary
//! search and the rebuild pipeline read type/ID/timestamp straight
//! from these spans without JSON parsing.  The writer hand-builds
//! every line (serde field ordering is not a contract we want to lean
//! on for byte offsets); a property test in `tests/` pins the layout.
//!
//! # Blanked lines
//! An erased record is its byte range overwritten with ASCII spaces.
//! Scanners treat any line whose first byte is not `{` as blank and
//! skip it without parsing.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Byte offset of the type digit within a record line.
pub const TYPE_POS: usize = 6;
/// Byte offset of the 16-hex-char ID span.
pub const ID_POS: usize = 15;
pub const ID_LEN: usize = 16;
/// Byte offset of the 13-digit millisecond timestamp span.
pub const TS_POS: usize = 39;
pub const TS_LEN: usize = 13;

/// Shortest line that can carry the full fixed-position prefix.
pub const MIN_RECORD_LEN: usize = TS_POS + TS_LEN + 1;

/// Labels longer than this are rejected at the API boundary.
pub const MAX_LABEL_LEN: usize = 256;

/// Discriminates the role of a record line within the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// Index pointer: label/ID -> data record offset.
    Index = 1,
    /// Current document content plus its compressed snapshot.
    Data = 2,
    /// Retired version: content blanked, snapshot intact.
    History = 3,
}

impl RecordType {
    pub fn from_digit(d: u8) -> Option<Self> {
        match d {
            b'1' => Some(RecordType::Index),
            b'2' => Some(RecordType::Data),
            b'3' => Some(RecordType::History),
            _ => None,
        }
    }

    #[inline]
    pub fn digit(self) -> u8 {
        b'0' + self as u8
    }
}

// ── Line building ────────────────────────────────────────────────────────────

/// Build a data record line (no trailing newline).
///
/// `snapshot` is a base85 string and embeds verbatim; `label` and
/// `content` go through JSON string encoding.
pub fn encode_data(id: &str, ts: u64, label: &str, content: &str, snapshot: &str) -> String {
    debug_assert_eq!(id.len(), ID_LEN);
    format!(
        "{{\"_r\":2,\"_id\":\"{id}\",\"_ts\":{ts:013},\"_l\":{},\"_d\":{},\"_h\":\"{snapshot}\"}}",
        json_string(label),
        json_string(content),
    )
}

/// Build an index record line pointing at a data record (no trailing
/// newline).
pub fn encode_index(id: &str, ts: u64, offset: u64, label: &str) -> String {
    debug_assert_eq!(id.len(), ID_LEN);
    format!(
        "{{\"_r\":1,\"_id\":\"{id}\",\"_ts\":{ts:013},\"_o\":{offset},\"_l\":{}}}",
        json_string(label),
    )
}

fn json_string(s: &str) -> String {
    serde_json::to_string(s).expect("string serialisation is infallible")
}

// ── Full decode ──────────────────────────────────────────────────────────────

/// Fully parsed index record.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexRecord {
    #[serde(rename = "_r")]
    pub rtype: u8,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_ts")]
    pub ts: u64,
    #[serde(rename = "_o")]
    pub target: u64,
    #[serde(rename = "_l")]
    pub label: String,
}

/// Fully parsed data or history record.
#[derive(Debug, Clone, Deserialize)]
pub struct DataRecord {
    #[serde(rename = "_r")]
    pub rtype: u8,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_ts")]
    pub ts: u64,
    #[serde(rename = "_l")]
    pub label: String,
    #[serde(rename = "_d")]
    pub content: String,
    #[serde(rename = "_h")]
    pub snapshot: String,
}

/// Decode an index line.  `offset` is only for the error value.
pub fn decode_index(line: &[u8], offset: u64) -> Result<IndexRecord> {
    let rec: IndexRecord = serde_json::from_slice(line).map_err(|e| Error::CorruptIndex {
        offset,
        reason: e.to_string(),
    })?;
    if rec.rtype != RecordType::Index as u8 {
        return Err(Error::CorruptIndex {
            offset,
            reason: format!("wrong record type {}", rec.rtype),
        });
    }
    Ok(rec)
}

/// Decode a data or history line.  `offset` is only for the error value.
pub fn decode_data(line: &[u8], offset: u64) -> Result<DataRecord> {
    let rec: DataRecord = serde_json::from_slice(line).map_err(|e| Error::CorruptRecord {
        offset,
        reason: e.to_string(),
    })?;
    if rec.rtype != RecordType::Data as u8 && rec.rtype != RecordType::History as u8 {
        return Err(Error::CorruptRecord {
            offset,
            reason: format!("wrong record type {}", rec.rtype),
        });
    }
    Ok(rec)
}

// ── Fixed-position extraction ────────────────────────────────────────────────

/// True for a line that has been erased (all spaces) or is empty.
#[inline]
pub fn is_blank(line: &[u8]) -> bool {
    line.iter().all(|&b| b == b' ')
}

/// Extract the record type without parsing.  `None` for blank, short,
/// or malformed lines.
pub fn line_type(line: &[u8]) -> Option<RecordType> {
    if line.len() < MIN_RECORD_LEN || line[0] != b'{' {
        return None;
    }
    RecordType::from_digit(line[TYPE_POS])
}

/// Extract the 16-hex ID span without parsing.
pub fn line_id(line: &[u8]) -> Option<&str> {
    if line.len() < MIN_RECORD_LEN || line[0] != b'{' {
        return None;
    }
    let span = &line[ID_POS..ID_POS + ID_LEN];
    if !span.iter().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    std::str::from_utf8(span).ok()
}

/// Extract the 13-digit timestamp span without parsing.
pub fn line_ts(line: &[u8]) -> Option<u64> {
    if line.len() < MIN_RECORD_LEN || line[0] != b'{' {
        return None;
    }
    let span = &line[TS_POS..TS_POS + TS_LEN];
    if !span.iter().all(|b| b.is_ascii_digit()) {
        return None;
    }
    std::str::from_utf8(span).ok()?.parse().ok()
}

/// Extract and unescape the `_l` value by substring lookup — no JSON
/// parsing of the rest of the line.
///
/// Safe because every field before `_l` has a frozen shape that cannot
/// contain the `"_l":"` needle, and the label's escaped body carries no
/// raw quote.
pub fn line_label(line: &[u8]) -> Option<String> {
    let start = find(line, b"\"_l\":\"")? + 5;
    let end = string_end(line, start + 1)?;
    serde_json::from_slice(&line[start..=end]).ok()
}

/// Extract the `_o` value of an index line by substring lookup.
pub fn line_index_target(line: &[u8]) -> Option<u64> {
    let mut pos = find(line, b"\"_o\":")? + 5;
    let start = pos;
    while pos < line.len() && line[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos == start {
        return None;
    }
    std::str::from_utf8(&line[start..pos]).ok()?.parse().ok()
}

/// Byte bounds of the escaped `_d` value (quotes excluded): the span
/// the retire step overwrites with spaces and `All` byte-scans out.
///
/// Returns `None` when the line has no `"_d":"…","_h":"` bracket.  The
/// end bound comes from the *last* occurrence of the `_h` needle: the
/// snapshot alphabet contains no `"` so the needle cannot appear after
/// the real boundary.
pub fn content_bounds(line: &[u8]) -> Option<(usize, usize)> {
    let start = find(line, b",\"_d\":\"")? + 7;
    let end = rfind(line, b"\",\"_h\":\"")?;
    if end < start {
        return None;
    }
    Some((start, end))
}

/// Unescape the `_d` span extracted by [`content_bounds`].
pub fn unescape_content(raw: &[u8]) -> Option<String> {
    let mut quoted = Vec::with_capacity(raw.len() + 2);
    quoted.push(b'"');
    quoted.extend_from_slice(raw);
    quoted.push(b'"');
    serde_json::from_slice(&quoted).ok()
}

/// Position of the closing quote of a JSON string whose body starts at
/// `from`, honouring backslash escapes.
fn string_end(line: &[u8], from: usize) -> Option<usize> {
    let mut i = from;
    while i < line.len() {
        match line[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn find(hay: &[u8], needle: &[u8]) -> Option<usize> {
    hay.windows(needle.len()).position(|w| w == needle)
}

fn rfind(hay: &[u8], needle: &[u8]) -> Option<usize> {
    hay.windows(needle.len()).rposition(|w| w == needle)
}
