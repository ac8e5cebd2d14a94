//! Append and patch primitives.
//!
//! Three operations cover every mutation of an open file: `raw`
//! (append one newline-terminated chunk at the tail), `patch`
//! (positioned overwrite that never moves the tail), and `blank`
//! (patch with spaces — how records are erased).  The multi-record
//! append used by Set goes through `raw` as one concatenated buffer so
//! a single syscall carries both lines: the crash window is then only
//! the trailing newline, never a torn pair.

use std::fs::File;

use crate::error::Result;
use crate::header::DIRTY_POS;
use crate::io::pwrite;

/// Append `bytes` followed by `'\n'` at `tail`.  Returns the new tail
/// (`tail + bytes.len() + 1`).
pub fn raw(file: &File, tail: u64, bytes: &[u8], sync: bool) -> Result<u64> {
    let mut buf = Vec::with_capacity(bytes.len() + 1);
    buf.extend_from_slice(bytes);
    buf.push(b'\n');
    pwrite(file, &buf, tail)?;
    if sync {
        file.sync_data()?;
    }
    Ok(tail + buf.len() as u64)
}

/// Overwrite `bytes.len()` bytes at `offset` in place.
pub fn patch(file: &File, offset: u64, bytes: &[u8], sync: bool) -> Result<()> {
    pwrite(file, bytes, offset)?;
    if sync {
        file.sync_data()?;
    }
    Ok(())
}

/// Erase `len` bytes at `offset` with ASCII spaces.
pub fn blank(file: &File, offset: u64, len: usize, sync: bool) -> Result<()> {
    patch(file, offset, &vec![b' '; len], sync)
}

/// Flip the header's dirty digit with a one-byte positioned write.
pub fn set_dirty(file: &File, dirty: bool, sync: bool) -> Result<()> {
    let digit = if dirty { b"1" } else { b"0" };
    patch(file, DIRTY_POS, digit, sync)
}
