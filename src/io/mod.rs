//! Positioned file primitives.
//!
//! Everything in here is offset-addressed: no call mutates a shared
//! seek position, so the read descriptor can be used by any number of
//! concurrent callers.  `read` holds the line/align primitives the
//! scanners build on; `write` holds the append and patch primitives
//! the write path and the rebuild pipeline share.

pub mod read;
pub mod write;

use std::fs::File;
use std::io;

/// Read into `buf` at `offset` without touching the descriptor's seek
/// position.  Returns the number of bytes read (short only at EOF).
pub(crate) fn pread(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileExt;
        let mut done = 0;
        while done < buf.len() {
            let n = file.read_at(&mut buf[done..], offset + done as u64)?;
            if n == 0 {
                break;
            }
            done += n;
        }
        Ok(done)
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::FileExt;
        let mut done = 0;
        while done < buf.len() {
            let n = file.seek_read(&mut buf[done..], offset + done as u64)?;
            if n == 0 {
                break;
            }
            done += n;
        }
        Ok(done)
    }
}

/// Write all of `buf` at `offset` without touching the descriptor's
/// seek position.
pub(crate) fn pwrite(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileExt;
        file.write_all_at(buf, offset)
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::FileExt;
        let mut done = 0;
        while done < buf.len() {
            let n = file.seek_write(&buf[done..], offset + done as u64)?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ));
            }
            done += n;
        }
        Ok(())
    }
}
