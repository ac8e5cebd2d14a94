//! High-level [`Folio`] API — the primary embedding surface.
//!
//! ```no_run
//! use folio::{Folio, Options};
//!
//! let db = Folio::open("/tmp/docs", "notes.folio", Options::default())?;
//! db.set("readme", "Hello, world!")?;
//! assert_eq!(db.get("readme")?, "Hello, world!");
//! db.close()?;
//! # Ok::<(), folio::Error>(())
//! ```
//!
//! Every operation passes the three concurrency layers in `gate.rs`
//! before touching the file, then locates records with the primitives
//! in `scan.rs` and mutates with the primitives in `io::write`.  The
//! cached header, the tail offset, and the descriptors live in [`Core`]
//! behind the readers-writer mutex; the header is mutated only while
//! the write half is held and flushed in full on close and rebuild.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::bloom::Bloom;
use crate::codec;
use crate::error::{Error, Result};
use crate::gate::{Admission, ExclusiveFileLock, FsLock, GateState, SharedFileLock};
use crate::hasher::{id_hex, HashAlg};
use crate::header::{Header, HEADER_SIZE};
use crate::io::read::{line, ReadLimits};
use crate::io::{pread, write};
use crate::record::{
    self, IndexRecord, RecordType, MAX_LABEL_LEN, TYPE_POS,
};
use crate::scan::{scan, sparse, sparse_each};

// ── Options ──────────────────────────────────────────────────────────────────

/// Configuration for [`Folio::open`].  Everything has a documented
/// default; an existing file's header overrides `hash_algorithm` and
/// `auto_compact`.
#[derive(Debug, Clone)]
pub struct Options {
    /// Label hash algorithm for a newly created file.
    pub hash_algorithm: HashAlg,
    /// Initial scanner buffer in bytes.
    pub read_buffer: usize,
    /// Upper bound for a single record line.
    pub max_record_size: usize,
    /// fsync after every write.
    pub sync_writes: bool,
    /// Keep a negative-lookup filter over the sparse region.
    pub bloom_filter: bool,
    /// Compact automatically every N writes; 0 disables.
    pub auto_compact: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlg::Xxh3,
            read_buffer: 64 * 1024,
            max_record_size: 16 * 1024 * 1024,
            sync_writes: false,
            bloom_filter: false,
            auto_compact: 0,
        }
    }
}

/// Header snapshot returned by [`Folio::info`].
#[derive(Debug, Clone)]
pub struct StoreInfo {
    pub algorithm: HashAlg,
    pub dirty: bool,
    pub heap_end: u64,
    pub index_end: u64,
    pub live_count: u64,
    pub writes_since_compaction: u64,
    pub auto_compact_modulus: u64,
    pub file_len: u64,
}

// ── Core ─────────────────────────────────────────────────────────────────────

/// Mutable state behind the readers-writer mutex: descriptors, cached
/// header, tail offset, and the optional bloom filter.
pub(crate) struct Core {
    pub read: File,
    pub write: File,
    pub header: Header,
    pub tail: u64,
    pub bloom: Option<Bloom>,
}

impl Core {
    /// Append `bytes` + `'\n'` at the tail; raise the dirty flag on
    /// the first write of a clean period.  Returns the offset the
    /// bytes landed at.
    pub(crate) fn raw(&mut self, bytes: &[u8], sync: bool) -> Result<u64> {
        let offset = self.tail;
        self.tail = write::raw(&self.write, self.tail, bytes, sync)?;
        if !self.header.dirty {
            write::set_dirty(&self.write, true, sync)?;
            self.header.dirty = true;
        }
        Ok(offset)
    }
}

/// A live pair located for Get/Set/Delete: the index line and the
/// current data record it points at.
pub(crate) struct Located {
    pub index_offset: u64,
    pub index_len: usize,
    pub index: IndexRecord,
    pub data_offset: u64,
    pub data_line: Vec<u8>,
}

// ── Gate guards ──────────────────────────────────────────────────────────────

// Field order is drop order: the RW guard releases before the flock.
pub(crate) struct ReadGuard<'a> {
    pub core: RwLockReadGuard<'a, Core>,
    _flock: SharedFileLock<'a>,
}

pub(crate) struct WriteGuard<'a> {
    pub core: RwLockWriteGuard<'a, Core>,
    _flock: ExclusiveFileLock<'a>,
}

// ── Folio ────────────────────────────────────────────────────────────────────

pub struct Folio {
    pub(crate) path: PathBuf,
    pub(crate) tmp_path: PathBuf,
    pub(crate) limits: ReadLimits,
    pub(crate) sync_writes: bool,
    pub(crate) admission: Admission,
    pub(crate) flock: FsLock,
    pub(crate) core: RwLock<Core>,
}

impl Folio {
    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Open (creating if necessary) the store at `dir/name`.
    ///
    /// A leftover `.tmp` sibling or a raised dirty flag means the
    /// previous session did not shut down cleanly; recovery rebuilds
    /// the file before the handle is returned.
    pub fn open(dir: impl AsRef<Path>, name: &str, opts: Options) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(name);
        let tmp_path = dir.join(format!("{name}.tmp"));

        if !path.exists() {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    let header = Header::new(opts.hash_algorithm, now_ms(), opts.auto_compact);
                    write::patch(&file, 0, &header.encode()?, false)?;
                    file.sync_all()?;
                    info!("created store {}", path.display());
                }
                // Another process won the creation race; open what it made.
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
        }

        let read = File::open(&path)?;
        let write_f = OpenOptions::new().read(true).write(true).open(&path)?;
        let lock_f = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_len = read.metadata()?.len();
        let mut head = [0u8; HEADER_SIZE];
        let n = pread(&read, &mut head, 0)?;
        let header = Header::decode(&head[..n], file_len)?;

        let folio = Self {
            path,
            tmp_path,
            limits: ReadLimits {
                read_buffer: opts.read_buffer,
                max_record_size: opts.max_record_size,
            },
            sync_writes: opts.sync_writes,
            admission: Admission::new(),
            flock: FsLock::new(lock_f),
            core: RwLock::new(Core {
                read,
                write: write_f,
                header,
                tail: file_len,
                bloom: None,
            }),
        };

        let crashed = folio.tmp_path.exists() || folio.core.read().header.dirty;
        if crashed {
            info!(
                "unclean shutdown detected on {}; running recovery",
                folio.path.display()
            );
            folio.recover()?;
        }

        if opts.bloom_filter {
            let bloom = {
                let core = folio.core.read();
                folio.build_bloom(&core)?
            };
            folio.core.write().bloom = Some(bloom);
        }

        Ok(folio)
    }

    /// Flush the cached header, clear the dirty flag, and refuse all
    /// further operations.
    ///
    /// The gate moves to `Closed` only once the flush has reached
    /// disk; a failed flush restores admission so the call can be
    /// retried.
    pub fn close(&self) -> Result<()> {
        self.admission.begin_restriction(GateState::Barred)?;
        let outcome = (|| {
            let _fl = self.flock.lock_exclusive()?;
            let mut core = self.core.write();
            let was_dirty = core.header.dirty;
            core.header.dirty = false;
            core.header.timestamp_ms = now_ms();
            let flushed = core
                .header
                .encode()
                .and_then(|buf| write::patch(&core.write, 0, &buf, false))
                .and_then(|()| core.write.sync_all().map_err(Error::from));
            if flushed.is_err() {
                core.header.dirty = was_dirty;
            }
            flushed
        })();
        match outcome {
            Ok(()) => {
                self.admission.set(GateState::Closed);
                debug!("closed {}", self.path.display());
                Ok(())
            }
            Err(e) => {
                self.admission.restore(GateState::Barred);
                Err(e)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A snapshot of the cached header.
    pub fn info(&self) -> Result<StoreInfo> {
        let g = self.read_gate()?;
        let h = &g.core.header;
        Ok(StoreInfo {
            algorithm: h.algorithm,
            dirty: h.dirty,
            heap_end: h.heap_end,
            index_end: h.index_end,
            live_count: h.live_count,
            writes_since_compaction: h.writes_since_compaction,
            auto_compact_modulus: h.auto_compact_modulus,
            file_len: g.core.tail,
        })
    }

    // ── CRUD ─────────────────────────────────────────────────────────────────

    /// Store `content` under `label`, retiring any previous version
    /// into history.
    pub fn set(&self, label: &str, content: &str) -> Result<()> {
        validate_label(label)?;
        if content.is_empty() {
            return Err(Error::EmptyContent);
        }

        let compact_due = {
            let mut g = self.write_gate()?;
            let core = &mut *g.core;
            let id = id_hex(label, core.header.algorithm);
            let prev = self.locate_live(core, &id, label)?;

            self.append_pair(core, &id, label, content, prev.as_ref())?;
            if let Some(prev) = prev {
                self.retire(core, &prev)?;
            } else {
                core.header.live_count += 1;
            }
            core.header.writes_since_compaction += 1;
            compaction_due(&core.header)
        };

        if compact_due {
            info!("auto-compaction threshold reached");
            self.compact()?;
        }
        Ok(())
    }

    /// Current content of `label`.
    pub fn get(&self, label: &str) -> Result<String> {
        let g = self.read_gate()?;
        let id = id_hex(label, g.core.header.algorithm);
        match self.locate_live(&g.core, &id, label)? {
            Some(loc) => {
                let rec = record::decode_data(&loc.data_line, loc.data_offset)?;
                Ok(rec.content)
            }
            None => Err(Error::NotFound),
        }
    }

    /// Whether `label` currently exists.
    pub fn exists(&self, label: &str) -> Result<bool> {
        let g = self.read_gate()?;
        let id = id_hex(label, g.core.header.algorithm);
        self.label_present(&g.core, &id, label)
    }

    /// Retire the current version of `label`.  History stays
    /// retrievable.
    pub fn delete(&self, label: &str) -> Result<()> {
        let compact_due = {
            let mut g = self.write_gate()?;
            let core = &mut *g.core;
            let id = id_hex(label, core.header.algorithm);
            let loc = self.locate_live(core, &id, label)?.ok_or(Error::NotFound)?;
            self.retire(core, &loc)?;
            core.header.live_count = core.header.live_count.saturating_sub(1);
            core.header.writes_since_compaction += 1;
            compaction_due(&core.header)
        };

        if compact_due {
            info!("auto-compaction threshold reached");
            self.compact()?;
        }
        Ok(())
    }

    /// Move the current content of `old` to `new` under one gate hold.
    ///
    /// History written under `old` stays under `old` — it is not
    /// rewritten and is unreachable through `new`.
    pub fn rename(&self, old: &str, new: &str) -> Result<()> {
        validate_label(new)?;
        let compact_due = {
            let mut g = self.write_gate()?;
            let core = &mut *g.core;

            let old_id = id_hex(old, core.header.algorithm);
            let prev = self
                .locate_live(core, &old_id, old)?
                .ok_or(Error::NotFound)?;
            let new_id = id_hex(new, core.header.algorithm);
            if self.label_present(core, &new_id, new)? {
                return Err(Error::Exists);
            }

            let rec = record::decode_data(&prev.data_line, prev.data_offset)?;
            self.append_pair(core, &new_id, new, &rec.content, None)?;
            self.retire(core, &prev)?;
            core.header.writes_since_compaction += 1;
            compaction_due(&core.header)
        };

        if compact_due {
            info!("auto-compaction threshold reached");
            self.compact()?;
        }
        Ok(())
    }

    // ── Sequences ────────────────────────────────────────────────────────────

    /// Hand every live label to `f` exactly once.  Result order is
    /// unspecified but deterministic within a pass; `f` returning
    /// `false` stops immediately.
    pub fn list<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&str) -> bool,
    {
        let g = self.read_gate()?;
        let core = &g.core;
        let mut seen = HashSet::new();
        sparse_each(
            &core.read,
            &self.limits,
            None,
            HEADER_SIZE as u64,
            core.tail,
            &[RecordType::Index],
            |h| {
                if let Ok(idx) = record::decode_index(&h.line, h.offset) {
                    if seen.insert(idx.label.clone()) {
                        return f(&idx.label);
                    }
                }
                true
            },
        )
    }

    /// Hand every version of `label` to `f` in chronological order
    /// (oldest first), as `(content, timestamp_ms)`.
    ///
    /// Order is by source byte offset — byte offsets are the ground
    /// truth for write order; timestamps can collide within one
    /// millisecond.
    pub fn history<F>(&self, label: &str, mut f: F) -> Result<()>
    where
        F: FnMut(String, u64) -> bool,
    {
        let g = self.read_gate()?;
        let core = &g.core;
        let id = id_hex(label, core.header.algorithm);
        let mut failure = None;
        sparse_each(
            &core.read,
            &self.limits,
            Some(&id),
            HEADER_SIZE as u64,
            core.tail,
            &[RecordType::Data, RecordType::History],
            |h| {
                let rec = match record::decode_data(&h.line, h.offset) {
                    Ok(r) => r,
                    Err(_) => return true, // damaged line: skip, keep walking
                };
                if rec.label != label {
                    return true; // ID collision
                }
                let content = match codec::decompress(&rec.snapshot)
                    .and_then(|b| String::from_utf8(b).map_err(|e| Error::Decompress(e.to_string())))
                {
                    Ok(c) => c,
                    Err(e) => {
                        failure = Some(e);
                        return false;
                    }
                };
                f(content, rec.ts)
            },
        )?;
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Hand every live `(label, content)` pair to `f`.  Content comes
    /// from byte-scanning the `_d` span, not a full JSON parse.
    pub fn all<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&str, &str) -> bool,
    {
        let g = self.read_gate()?;
        let core = &g.core;
        let mut seen = HashSet::new();
        sparse_each(
            &core.read,
            &self.limits,
            None,
            HEADER_SIZE as u64,
            core.tail,
            &[RecordType::Data],
            |h| {
                let label = match record::line_label(&h.line) {
                    Some(l) => l,
                    None => return true,
                };
                if !seen.insert(label.clone()) {
                    return true;
                }
                let content = record::content_bounds(&h.line)
                    .and_then(|(s, e)| record::unescape_content(&h.line[s..e]));
                match content {
                    Some(c) => f(&label, &c),
                    None => true,
                }
            },
        )
    }

    // ── Gate acquisition ─────────────────────────────────────────────────────

    pub(crate) fn read_gate(&self) -> Result<ReadGuard<'_>> {
        self.admission.admit_read()?;
        let flock = self.flock.lock_shared()?;
        Ok(ReadGuard {
            core: self.core.read(),
            _flock: flock,
        })
    }

    pub(crate) fn write_gate(&self) -> Result<WriteGuard<'_>> {
        self.admission.admit_write()?;
        let flock = self.flock.lock_exclusive()?;
        let mut core = self.core.write();
        // Another process may have appended while it held the lock;
        // never write over its tail.
        let len = core.write.metadata()?.len();
        if len > core.tail {
            debug!("tail advanced externally ({} -> {len})", core.tail);
            core.tail = len;
        }
        Ok(WriteGuard {
            core,
            _flock: flock,
        })
    }

    /// Gate layers 2+3 only — for the rebuild pipeline, which installs
    /// its admission restriction separately.
    pub(crate) fn read_hold(&self) -> Result<ReadGuard<'_>> {
        let flock = self.flock.lock_shared()?;
        Ok(ReadGuard {
            core: self.core.read(),
            _flock: flock,
        })
    }

    pub(crate) fn write_hold(&self) -> Result<WriteGuard<'_>> {
        let flock = self.flock.lock_exclusive()?;
        Ok(WriteGuard {
            core: self.core.write(),
            _flock: flock,
        })
    }

    // ── Locate ───────────────────────────────────────────────────────────────

    /// Find the live (index, data) pair for `id`/`label`: sorted index
    /// first, then — unless the bloom filter rules the ID out — the
    /// sparse region newest-first.  Every ID match is confirmed
    /// against the label; entries whose data record is no longer
    /// current (a crashed retire) are passed over.
    pub(crate) fn locate_live(
        &self,
        core: &Core,
        id: &str,
        label: &str,
    ) -> Result<Option<Located>> {
        for (offset, len, idx) in self.sorted_matches(core, id, label)? {
            if let Some(loc) = self.follow(core, offset, len, idx)? {
                return Ok(Some(loc));
            }
            debug!("sorted index for {label:?} points at a retired record; checking sparse");
        }

        if let Some(bloom) = &core.bloom {
            if !bloom.may_contain(id) {
                return Ok(None);
            }
        }

        for (offset, len, idx) in self.sparse_matches(core, id, label)? {
            if let Some(loc) = self.follow(core, offset, len, idx)? {
                return Ok(Some(loc));
            }
        }
        Ok(None)
    }

    /// Exists-style check: true on the first label-matching index
    /// record, live or not.
    pub(crate) fn label_present(&self, core: &Core, id: &str, label: &str) -> Result<bool> {
        if !self.sorted_matches(core, id, label)?.is_empty() {
            return Ok(true);
        }
        if let Some(bloom) = &core.bloom {
            if !bloom.may_contain(id) {
                return Ok(false);
            }
        }
        Ok(!self.sparse_matches(core, id, label)?.is_empty())
    }

    /// Label-confirmed index records for `id` in the sorted section.
    ///
    /// Binary search returns an arbitrary member of an ID tie group;
    /// neighbours with the same ID are walked in both directions so a
    /// hash collision cannot hide the right label.  Unparseable index
    /// lines here surface `CorruptIndex` — the sorted entry is the
    /// only candidate at its position and cannot be skipped safely.
    fn sorted_matches(
        &self,
        core: &Core,
        id: &str,
        label: &str,
    ) -> Result<Vec<(u64, usize, IndexRecord)>> {
        let h = &core.header;
        if h.heap_end == 0 || h.index_end <= h.heap_end {
            return Ok(Vec::new());
        }
        let hit = match scan(
            &core.read,
            &self.limits,
            id,
            h.heap_end,
            h.index_end,
            RecordType::Index,
        )? {
            Some(hit) => hit,
            None => return Ok(Vec::new()),
        };

        let mut out = Vec::new();
        let mut push = |offset: u64, bytes: &[u8]| -> Result<()> {
            let idx = record::decode_index(bytes, offset)?;
            if idx.label == label {
                out.push((offset, bytes.len(), idx));
            }
            Ok(())
        };
        push(hit.offset, &hit.line)?;

        // Forward neighbours with the same ID.
        let mut pos = hit.offset + hit.len() as u64 + 1;
        while pos < h.index_end {
            let bytes = line(&core.read, pos, &self.limits)?;
            let len = bytes.len() as u64;
            match record::line_id(&bytes) {
                Some(other) if other == id => push(pos, &bytes)?,
                Some(_) => break,
                None if record::is_blank(&bytes) => {} // erased entry, keep going
                None => break,
            }
            pos = pos + len + 1;
        }

        // Backward neighbours.
        let mut end = hit.offset;
        while end > h.heap_end {
            let start = match crate::io::read::align_back(
                &core.read,
                end.saturating_sub(1),
                h.heap_end,
                &self.limits,
            )? {
                Some(nl) => nl + 1,
                None => h.heap_end,
            };
            let bytes = line(&core.read, start, &self.limits)?;
            match record::line_id(&bytes) {
                Some(other) if other == id => push(start, &bytes)?,
                Some(_) => break,
                None if record::is_blank(&bytes) => {}
                None => break,
            }
            if start == h.heap_end {
                break;
            }
            end = start;
        }

        Ok(out)
    }

    /// Label-confirmed index records for `id` in the sparse region, in
    /// reverse offset order (newest first).  Parse failures here are
    /// skipped silently — sparse damage must not hide later records.
    fn sparse_matches(
        &self,
        core: &Core,
        id: &str,
        label: &str,
    ) -> Result<Vec<(u64, usize, IndexRecord)>> {
        let hits = sparse(
            &core.read,
            &self.limits,
            Some(id),
            core.header.sparse_start(),
            core.tail,
            &[RecordType::Index],
        )?;
        let mut out = Vec::new();
        for h in hits.into_iter().rev() {
            match record::decode_index(&h.line, h.offset) {
                Ok(idx) if idx.label == label => out.push((h.offset, h.line.len(), idx)),
                _ => {}
            }
        }
        Ok(out)
    }

    /// Follow an index record to its data record; `None` when the
    /// target is out of range or no longer a current data record.
    fn follow(
        &self,
        core: &Core,
        index_offset: u64,
        index_len: usize,
        idx: IndexRecord,
    ) -> Result<Option<Located>> {
        let target = idx.target;
        if target < HEADER_SIZE as u64 || target >= core.tail {
            return Ok(None);
        }
        let data_line = line(&core.read, target, &self.limits)?;
        if record::line_type(&data_line) != Some(RecordType::Data) {
            return Ok(None);
        }
        Ok(Some(Located {
            index_offset,
            index_len,
            index: idx,
            data_offset: target,
            data_line,
        }))
    }

    // ── Write helpers ────────────────────────────────────────────────────────

    /// Append the data record and its index as one write.  The new
    /// records reach disk before any previous version is retired, so a
    /// crash in between leaves both present; lookups and the rebuild
    /// resolve to the newest.
    fn append_pair(
        &self,
        core: &mut Core,
        id: &str,
        label: &str,
        content: &str,
        prev: Option<&Located>,
    ) -> Result<u64> {
        // Per-label timestamps are monotone non-decreasing even if the
        // clock steps backwards.
        let prev_ts = prev
            .and_then(|p| record::line_ts(&p.data_line))
            .unwrap_or(0);
        let ts = now_ms().max(prev_ts);

        let snapshot = codec::compress(content.as_bytes())?;
        let data_line = record::encode_data(id, ts, label, content, &snapshot);
        let index_line = record::encode_index(id, ts, core.tail, label);

        let mut buf = Vec::with_capacity(data_line.len() + index_line.len() + 1);
        buf.extend_from_slice(data_line.as_bytes());
        buf.push(b'\n');
        buf.extend_from_slice(index_line.as_bytes());
        let offset = core.raw(&buf, self.sync_writes)?;

        if let Some(bloom) = core.bloom.as_mut() {
            bloom.insert(id);
        }
        debug!("appended {label:?} at {offset}");
        Ok(offset)
    }

    /// Retire a previous version: type digit 2 -> 3, content blanked
    /// in place, index line erased.  Each step leaves the file
    /// consistent on its own; a crash part-way is resolved by lookup
    /// label checks and eliminated by the next rebuild.
    pub(crate) fn retire(&self, core: &mut Core, loc: &Located) -> Result<()> {
        write::patch(
            &core.write,
            loc.data_offset + TYPE_POS as u64,
            &[RecordType::History.digit()],
            self.sync_writes,
        )?;
        if let Some((s, e)) = record::content_bounds(&loc.data_line) {
            write::blank(&core.write, loc.data_offset + s as u64, e - s, self.sync_writes)?;
        } else {
            warn!(
                "data record at {} has no content bracket; leaving body in place",
                loc.data_offset
            );
        }
        write::blank(&core.write, loc.index_offset, loc.index_len, self.sync_writes)?;
        debug!("retired {:?} at {}", loc.index.label, loc.data_offset);
        Ok(())
    }

    /// Build the sparse-region bloom filter by scanning index records
    /// after the sorted sections.
    pub(crate) fn build_bloom(&self, core: &Core) -> Result<Bloom> {
        let hits = sparse(
            &core.read,
            &self.limits,
            None,
            core.header.sparse_start(),
            core.tail,
            &[RecordType::Index],
        )?;
        let mut bloom = Bloom::new(hits.len() + core.header.live_count as usize);
        for h in &hits {
            if let Some(id) = record::line_id(&h.line) {
                bloom.insert(id);
            }
        }
        Ok(bloom)
    }
}

impl Drop for Folio {
    fn drop(&mut self) {
        if self.admission.current() != GateState::Closed {
            if let Err(e) = self.close() {
                warn!("close on drop failed: {e}");
            }
        }
    }
}

// ── Free helpers ─────────────────────────────────────────────────────────────

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before the epoch")
        .as_millis() as u64
}

fn compaction_due(header: &Header) -> bool {
    header.auto_compact_modulus != 0
        && header.writes_since_compaction >= header.auto_compact_modulus
}

fn validate_label(label: &str) -> Result<()> {
    if label.is_empty() {
        return Err(Error::InvalidLabel("empty label".into()));
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(Error::LabelTooLong);
    }
    if label.bytes().any(|b| b == b'"' || b < 0x20) {
        return Err(Error::InvalidLabel(
            "label contains a quote or control character".into(),
        ));
    }
    Ok(())
}
