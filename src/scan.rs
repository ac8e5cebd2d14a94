//! Scan primitives — byte-range binary search, sparse linear scan,
//! and the minimal scan the rebuild pipeline runs.
//!
//! All three operate on byte offsets, not record indices, and share
//! one validity rule: a line is a candidate iff its first byte is `{`.
//! Blanked lines (leading space) are skipped without parsing.  The
//! linear scans never abort on a damaged line — damage to one line
//! must not make records written after it unreachable.

use std::fs::File;

use crate::error::Result;
use crate::io::read::{align, align_back, line, ReadLimits};
use crate::record::{
    line_id, line_index_target, line_label, line_ts, line_type, RecordType,
};

/// A record located by [`scan`]: offset, raw bytes, and the ID read
/// from the fixed span.
#[derive(Debug, Clone)]
pub struct ScanHit {
    pub offset: u64,
    pub line: Vec<u8>,
    pub id: String,
}

impl ScanHit {
    #[inline]
    pub fn len(&self) -> usize {
        self.line.len()
    }
}

/// One line collected by [`sparse`]: raw bytes only — callers parse
/// and decide what survives.
#[derive(Debug, Clone)]
pub struct SparseHit {
    pub offset: u64,
    pub line: Vec<u8>,
}

/// One entry produced by [`scanm`]: fixed-position fields only, plus
/// the substring-extracted label/target for index records.
#[derive(Debug, Clone)]
pub struct MinimalEntry {
    pub offset: u64,
    pub len: usize,
    pub rtype: RecordType,
    pub id: String,
    pub ts: u64,
    /// Extracted for index records only.
    pub label: Option<String>,
    /// The `_o` value, index records only.
    pub target: Option<u64>,
}

// ── Binary search ────────────────────────────────────────────────────────────

/// Binary-search `[lo, hi)` — a byte range known to contain records of
/// `rtype` sorted by ID — for `id`.
///
/// The pivot is the first valid line at or after the midpoint; when
/// everything from the midpoint to the range end is blank or foreign,
/// the search falls back to walking backward from the midpoint.  Ties
/// on ID return an arbitrary matching record: IDs are 64-bit hashes
/// and may collide, so the caller must confirm the label.
pub fn scan(
    file: &File,
    limits: &ReadLimits,
    id: &str,
    mut lo: u64,
    mut hi: u64,
    rtype: RecordType,
) -> Result<Option<ScanHit>> {
    loop {
        if lo >= hi {
            return Ok(None);
        }
        let mid = lo + (hi - lo) / 2;

        let pivot = match forward_pivot(file, limits, mid, hi, rtype)? {
            Some(p) => Some(p),
            None => backward_pivot(file, limits, lo, mid, rtype)?,
        };
        let (start, bytes) = match pivot {
            Some(p) => p,
            None => return Ok(None),
        };

        // Pivot selection guarantees a hex ID span.
        let pivot_id = line_id(&bytes).expect("pivot has a valid ID span").to_owned();

        if id == pivot_id {
            return Ok(Some(ScanHit {
                offset: start,
                id: pivot_id,
                line: bytes,
            }));
        }
        if id < pivot_id.as_str() {
            hi = start;
        } else {
            lo = start + bytes.len() as u64 + 1;
        }
    }
}

/// First valid line of `rtype` starting in `(mid, hi)`, found by
/// aligning forward and skipping blank or foreign lines.
fn forward_pivot(
    file: &File,
    limits: &ReadLimits,
    mid: u64,
    hi: u64,
    rtype: RecordType,
) -> Result<Option<(u64, Vec<u8>)>> {
    let mut pos = match align(file, mid, limits)? {
        Some(nl) => nl + 1,
        None => return Ok(None),
    };
    while pos < hi {
        let bytes = line(file, pos, limits)?;
        let len = bytes.len() as u64;
        if line_type(&bytes) == Some(rtype) && line_id(&bytes).is_some() {
            return Ok(Some((pos, bytes)));
        }
        pos += len + 1;
    }
    Ok(None)
}

/// Last valid line of `rtype` starting in `[lo, mid]`, found by
/// aligning backward and skipping blank or foreign lines.
fn backward_pivot(
    file: &File,
    limits: &ReadLimits,
    lo: u64,
    mid: u64,
    rtype: RecordType,
) -> Result<Option<(u64, Vec<u8>)>> {
    let mut probe = mid;
    loop {
        let start = match align_back(file, probe, lo, limits)? {
            Some(nl) => nl + 1,
            None if probe > lo => lo, // region start is a line start
            None => return Ok(None),
        };
        let bytes = line(file, start, limits)?;
        if line_type(&bytes) == Some(rtype) && line_id(&bytes).is_some() {
            return Ok(Some((start, bytes)));
        }
        if start == lo {
            return Ok(None);
        }
        probe = start - 1;
    }
}

// ── Sparse scan ──────────────────────────────────────────────────────────────

/// Linearly read every line in `[lo, hi)` and hand each one whose
/// fixed-position type is in `types` and whose ID equals `id` (any ID
/// when `id` is `None`) to `f`.  Blank and malformed lines are skipped
/// silently.  `f` returning `false` stops the walk immediately.
pub fn sparse_each<F>(
    file: &File,
    limits: &ReadLimits,
    id: Option<&str>,
    lo: u64,
    hi: u64,
    types: &[RecordType],
    mut f: F,
) -> Result<()>
where
    F: FnMut(SparseHit) -> bool,
{
    let mut pos = lo;
    while pos < hi {
        let bytes = line(file, pos, limits)?;
        let len = bytes.len() as u64;
        if let Some(t) = line_type(&bytes) {
            if types.contains(&t) {
                let matches = match id {
                    Some(want) => line_id(&bytes) == Some(want),
                    None => true,
                };
                if matches && !f(SparseHit { offset: pos, line: bytes }) {
                    return Ok(());
                }
            }
        }
        pos += len + 1;
    }
    Ok(())
}

/// [`sparse_each`] collected into a vector, in offset order.
pub fn sparse(
    file: &File,
    limits: &ReadLimits,
    id: Option<&str>,
    lo: u64,
    hi: u64,
    types: &[RecordType],
) -> Result<Vec<SparseHit>> {
    let mut hits = Vec::new();
    sparse_each(file, limits, id, lo, hi, types, |h| {
        hits.push(h);
        true
    })?;
    Ok(hits)
}

// ── Minimal scan ─────────────────────────────────────────────────────────────

/// Walk lines in `[lo, hi)` like [`sparse`] but without JSON parsing:
/// type, ID, and timestamp come from the fixed byte spans; label and
/// target are substring-extracted for index records only.  Entries
/// whose fixed spans are malformed are dropped.
///
/// This is the rebuild pipeline's scan — per-record JSON parsing would
/// dominate its cost.
pub fn scanm(
    file: &File,
    limits: &ReadLimits,
    lo: u64,
    hi: u64,
) -> Result<Vec<MinimalEntry>> {
    let mut entries = Vec::new();
    let mut pos = lo;
    while pos < hi {
        let bytes = line(file, pos, limits)?;
        let len = bytes.len();
        if let (Some(rtype), Some(rid), Some(ts)) =
            (line_type(&bytes), line_id(&bytes), line_ts(&bytes))
        {
            let (label, target) = if rtype == RecordType::Index {
                (line_label(&bytes), line_index_target(&bytes))
            } else {
                (None, None)
            };
            entries.push(MinimalEntry {
                offset: pos,
                len,
                rtype,
                id: rid.to_owned(),
                ts,
                label,
                target,
            });
        }
        pos += len as u64 + 1;
    }
    Ok(entries)
}
