//! Line-oriented read primitives over a shared descriptor.
//!
//! Both entry points use bounded, offset-addressed reads and are safe
//! for concurrent callers.  `line` may read past its intended boundary
//! into a scratch buffer that starts at `read_buffer` bytes and grows
//! up to `max_record_size`; a line longer than the cap is treated as
//! corruption, not as a reason to allocate without bound.

use std::fs::File;

use crate::error::{Error, Result};
use crate::io::pread;

/// Scanner buffer limits, taken from the store options at open time.
#[derive(Debug, Clone, Copy)]
pub struct ReadLimits {
    /// Initial scratch buffer size.
    pub read_buffer: usize,
    /// Upper bound for a single line.
    pub max_record_size: usize,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            read_buffer: 64 * 1024,
            max_record_size: 16 * 1024 * 1024,
        }
    }
}

/// Read the bytes from `offset` up to (not including) the next `'\n'`.
///
/// At true EOF (no bytes at `offset`) this is an error; a final
/// partial line without a terminator returns the bytes that exist —
/// the caller's validity checks reject it if it matters.
pub fn line(file: &File, offset: u64, limits: &ReadLimits) -> Result<Vec<u8>> {
    let mut cap = limits.read_buffer.max(64);
    loop {
        let mut buf = vec![0u8; cap];
        let n = pread(file, &mut buf, offset)?;
        if n == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("read past end of file at offset {offset}"),
            )));
        }
        if let Some(p) = buf[..n].iter().position(|&b| b == b'\n') {
            buf.truncate(p);
            return Ok(buf);
        }
        if n < cap {
            // EOF before a newline — unterminated tail.
            buf.truncate(n);
            return Ok(buf);
        }
        if cap >= limits.max_record_size {
            return Err(Error::CorruptRecord {
                offset,
                reason: format!("line exceeds max record size {}", limits.max_record_size),
            });
        }
        cap = (cap * 2).min(limits.max_record_size);
    }
}

/// Scan forward from `offset` for the next `'\n'`.
///
/// Returns its absolute position, or `None` if no newline exists
/// before EOF.  An `offset` already sitting on a newline is returned
/// unchanged — no off-by-one skip.
pub fn align(file: &File, offset: u64, limits: &ReadLimits) -> Result<Option<u64>> {
    let chunk = limits.read_buffer.max(64);
    let mut pos = offset;
    let mut buf = vec![0u8; chunk];
    loop {
        let n = pread(file, &mut buf, pos)?;
        if n == 0 {
            return Ok(None);
        }
        if let Some(p) = buf[..n].iter().position(|&b| b == b'\n') {
            return Ok(Some(pos + p as u64));
        }
        if n < chunk {
            return Ok(None);
        }
        pos += n as u64;
    }
}

/// Scan backward from `offset` (exclusive) for the nearest `'\n'`.
///
/// Returns its absolute position, or `None` when no newline exists in
/// `[floor, offset)`.  Backstop for the binary-search pivot when the
/// line after a midpoint is blank or out of range.
pub fn align_back(file: &File, offset: u64, floor: u64, limits: &ReadLimits) -> Result<Option<u64>> {
    let chunk = limits.read_buffer.max(64) as u64;
    let mut hi = offset;
    let mut buf = vec![0u8; chunk as usize];
    while hi > floor {
        let lo = hi.saturating_sub(chunk).max(floor);
        let want = (hi - lo) as usize;
        let n = pread(file, &mut buf[..want], lo)?;
        if let Some(p) = buf[..n].iter().rposition(|&b| b == b'\n') {
            return Ok(Some(lo + p as u64));
        }
        if n < want {
            return Ok(None);
        }
        hi = lo;
    }
    Ok(None)
}
