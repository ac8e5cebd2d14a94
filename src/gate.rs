//! Concurrency gate — three layers, one acquisition order.
//!
//! Every public operation passes the layers in this order and releases
//! them in reverse:
//!
//! 1. **Admission state** — a mutex-guarded state value with a
//!    condition variable.  Writers require [`GateState::Open`];
//!    readers pass on `Open` or `ReadsOnly`; `Barred` admits nobody;
//!    `Closed` aborts every call with [`Error::Closed`].  Every
//!    transition wakes all waiters so they can recheck and proceed or
//!    bail.
//! 2. **Cross-process file lock** — a shared/exclusive flock held for
//!    the duration of the operation.  The process keeps an in-process
//!    hold count so the flock syscall fires only on the 0->1 shared
//!    transition and an exclusive request waits out in-process shared
//!    holders: the OS sees one coherent lock state per process.
//! 3. **In-process readers-writer mutex** — guards the descriptor set,
//!    the cached header, the tail offset, and the bloom filter.
//!
//! Only these three acquisitions may block; the primitives behind them
//! never do.  Acquisition is always blocking — there is no try-lock
//! and no timeout.

use std::fs::File;

use fs2::FileExt;
use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};

/// Admission state for new operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Readers and writers admitted.
    Open,
    /// Readers only — a rebuild is running.
    ReadsOnly,
    /// Nobody admitted — crash recovery or rehash is running.
    Barred,
    /// The store has been closed.
    Closed,
}

pub(crate) struct Admission {
    state: Mutex<GateState>,
    cond: Condvar,
}

impl Admission {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Open),
            cond: Condvar::new(),
        }
    }

    /// Block until readers are admitted.
    pub fn admit_read(&self) -> Result<()> {
        let mut state = self.state.lock();
        loop {
            match *state {
                GateState::Open | GateState::ReadsOnly => return Ok(()),
                GateState::Closed => return Err(Error::Closed),
                GateState::Barred => self.cond.wait(&mut state),
            }
        }
    }

    /// Block until writers are admitted.
    pub fn admit_write(&self) -> Result<()> {
        let mut state = self.state.lock();
        loop {
            match *state {
                GateState::Open => return Ok(()),
                GateState::Closed => return Err(Error::Closed),
                GateState::ReadsOnly | GateState::Barred => self.cond.wait(&mut state),
            }
        }
    }

    /// Wait for `Open`, then move to `target` in the same critical
    /// section.  Serialises rebuilds against each other: the second
    /// caller waits until the first restores `Open`.
    pub fn begin_restriction(&self, target: GateState) -> Result<()> {
        let mut state = self.state.lock();
        loop {
            match *state {
                GateState::Open => {
                    *state = target;
                    self.cond.notify_all();
                    return Ok(());
                }
                GateState::Closed => return Err(Error::Closed),
                GateState::ReadsOnly | GateState::Barred => self.cond.wait(&mut state),
            }
        }
    }

    /// Restore `Open`, but only when still in the restriction the
    /// caller installed — a concurrent Close must not be clobbered.
    pub fn restore(&self, from: GateState) {
        let mut state = self.state.lock();
        if *state == from {
            *state = GateState::Open;
        }
        self.cond.notify_all();
    }

    /// Unconditional transition; wakes every waiter.
    pub fn set(&self, target: GateState) {
        let mut state = self.state.lock();
        *state = target;
        self.cond.notify_all();
    }

    pub fn current(&self) -> GateState {
        *self.state.lock()
    }
}

// ── Cross-process file lock ──────────────────────────────────────────────────

struct FsLockInner {
    /// Dedicated descriptor the flock rides on.  Replaced when the
    /// rebuild pipeline renames a fresh file over the store.
    file: File,
    readers: usize,
    writer: bool,
    /// Exclusive requests queued up.  New shared holders wait behind
    /// them, so a steady stream of readers cannot starve a writer.
    waiting: usize,
}

pub(crate) struct FsLock {
    inner: Mutex<FsLockInner>,
    cond: Condvar,
}

impl FsLock {
    pub fn new(file: File) -> Self {
        Self {
            inner: Mutex::new(FsLockInner {
                file,
                readers: 0,
                writer: false,
                waiting: 0,
            }),
            cond: Condvar::new(),
        }
    }

    /// Acquire the shared (read) mode.  Blocks behind in-process
    /// writers, held or queued; the flock syscall runs only for the
    /// first concurrent reader.
    pub fn lock_shared(&self) -> Result<SharedFileLock<'_>> {
        let mut inner = self.inner.lock();
        while inner.writer || inner.waiting > 0 {
            self.cond.wait(&mut inner);
        }
        if inner.readers == 0 {
            inner.file.lock_shared()?;
        }
        inner.readers += 1;
        Ok(SharedFileLock { lock: self })
    }

    /// Acquire the exclusive (write) mode.  Blocks out both in-process
    /// holders and other processes.
    pub fn lock_exclusive(&self) -> Result<ExclusiveFileLock<'_>> {
        let mut inner = self.inner.lock();
        inner.waiting += 1;
        while inner.writer || inner.readers > 0 {
            self.cond.wait(&mut inner);
        }
        inner.waiting -= 1;
        let locked = inner.file.lock_exclusive();
        if let Err(e) = locked {
            self.cond.notify_all();
            return Err(e.into());
        }
        inner.writer = true;
        Ok(ExclusiveFileLock { lock: self })
    }

    /// Swap the descriptor the flock rides on.  Caller must hold the
    /// exclusive mode (it is the rebuild's swap step); the replacement
    /// is locked exclusively before the old descriptor is released.
    pub fn rebind(&self, file: File) -> Result<()> {
        let mut inner = self.inner.lock();
        debug_assert!(inner.writer, "rebind outside an exclusive hold");
        file.lock_exclusive()?;
        let old = std::mem::replace(&mut inner.file, file);
        let _ = old.unlock();
        Ok(())
    }
}

/// RAII shared hold; drops decrement the count and release the flock
/// on the last reader out.
pub(crate) struct SharedFileLock<'a> {
    lock: &'a FsLock,
}

impl Drop for SharedFileLock<'_> {
    fn drop(&mut self) {
        let mut inner = self.lock.inner.lock();
        inner.readers -= 1;
        if inner.readers == 0 {
            let _ = inner.file.unlock();
        }
        self.lock.cond.notify_all();
    }
}

/// RAII exclusive hold.
pub(crate) struct ExclusiveFileLock<'a> {
    lock: &'a FsLock,
}

impl Drop for ExclusiveFileLock<'_> {
    fn drop(&mut self) {
        let mut inner = self.lock.inner.lock();
        inner.writer = false;
        let _ = inner.file.unlock();
        self.lock.cond.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn closed_aborts_admission() {
        let a = Admission::new();
        a.set(GateState::Closed);
        assert!(matches!(a.admit_read(), Err(Error::Closed)));
        assert!(matches!(a.admit_write(), Err(Error::Closed)));
        assert!(matches!(
            a.begin_restriction(GateState::ReadsOnly),
            Err(Error::Closed)
        ));
    }

    #[test]
    fn reads_only_still_admits_readers() {
        let a = Admission::new();
        a.begin_restriction(GateState::ReadsOnly).unwrap();
        assert!(a.admit_read().is_ok());
    }

    #[test]
    fn shared_holders_exclude_exclusive() {
        let file = tempfile::tempfile().unwrap();
        let lock = Arc::new(FsLock::new(file));
        let entered = Arc::new(AtomicUsize::new(0));

        let shared = lock.lock_shared().unwrap();
        let l2 = Arc::clone(&lock);
        let e2 = Arc::clone(&entered);
        let t = std::thread::spawn(move || {
            let _x = l2.lock_exclusive().unwrap();
            e2.store(1, Ordering::SeqCst);
        });
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(entered.load(Ordering::SeqCst), 0);
        drop(shared);
        t.join().unwrap();
        assert_eq!(entered.load(Ordering::SeqCst), 1);
    }
}
