//! Rebuild pipeline — Compact, Purge, crash recovery, and Rehash.
//!
//! # Two phases
//!
//! **Phase 1** (readers still admitted for Compact/Purge; nobody for
//! recovery) minimally scans the whole file, partitions entries into
//! heap candidates and index entries, sorts, and writes a fresh file
//! next to the original with a `.tmp` suffix.  Any error here aborts
//! and leaves the original untouched; a leftover `.tmp` is unlinked by
//! the next open.
//!
//! **Phase 2** (exclusive hold) renames the temp file over the
//! original, reopens the descriptors, re-binds the file lock, and
//! installs the fresh header.  On-disk state is always either the old
//! file or the new file, never a mix; if the descriptor rotation
//! itself fails the handle is closed rather than left half-bound.
//!
//! # What survives
//!
//! Per label, the index entry with the greatest source offset wins
//! (byte offset is the ground truth for write order).  A data record
//! nothing points at is a retire a crash interrupted: Compact finishes
//! the job in the copy (type patched to history, content blanked);
//! Purge drops it along with every history record.
//!
//! # Salvage
//!
//! Crash recovery must not refuse to open the store because one line
//! is torn: in salvage mode unreadable records are skipped with a
//! warning.  An explicit Compact/Purge surfaces the same errors
//! instead — silently dropping data the caller asked to keep is worse
//! than failing.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::time::Instant;

use log::{error, info, warn};

use crate::error::{Error, Result};
use crate::gate::GateState;
use crate::hasher::{id_hex, HashAlg};
use crate::header::{Header, FORMAT_VERSION, HEADER_SIZE};
use crate::io::read::line;
use crate::io::write;
use crate::record::{self, RecordType, ID_POS, TYPE_POS};
use crate::scan::{scanm, MinimalEntry};
use crate::store::{now_ms, Core, Folio};

/// Everything phase 2 needs from phase 1, plus the source state the
/// scan saw so a straggling writer can be detected.
struct RebuildPlan {
    header: Header,
    source_tail: u64,
    source_writes: u64,
}

impl Folio {
    // ── Public entry points ──────────────────────────────────────────────────

    /// Rebuild the file: sort the heap, regenerate the index section,
    /// drop blanked lines.  History is preserved.
    pub fn compact(&self) -> Result<()> {
        self.rebuild(false)
    }

    /// [`Folio::compact`] with history discarded: afterwards each live
    /// label has exactly one record.
    pub fn purge(&self) -> Result<()> {
        self.rebuild(true)
    }

    /// Re-key every record under `new_alg` by patching the 16-byte ID
    /// span in place, then rebuild (the in-place patch leaves the
    /// sorted regions unsorted under the new IDs).
    ///
    /// The dirty flag stays raised for the whole patch walk; a crash
    /// mid-rehash is caught by ordinary recovery on the next open.
    pub fn rehash(&self, new_alg: HashAlg) -> Result<()> {
        self.admission.begin_restriction(GateState::Barred)?;
        let started = Instant::now();
        let outcome = (|| {
            let mut g = self.write_hold()?;
            let core = &mut *g.core;

            write::set_dirty(&core.write, true, self.sync_writes)?;
            core.header.dirty = true;

            let mut pos = HEADER_SIZE as u64;
            let mut patched = 0u64;
            while pos < core.tail {
                let bytes = line(&core.read, pos, &self.limits)?;
                let len = bytes.len() as u64;
                if record::line_type(&bytes).is_some() {
                    match record::line_label(&bytes) {
                        Some(label) => {
                            let new_id = id_hex(&label, new_alg);
                            write::patch(
                                &core.write,
                                pos + ID_POS as u64,
                                new_id.as_bytes(),
                                false,
                            )?;
                            patched += 1;
                        }
                        None => warn!("record at {pos} has no readable label; ID left as-is"),
                    }
                }
                pos += len + 1;
            }

            core.header.algorithm = new_alg;
            core.header.timestamp_ms = now_ms();
            let buf = core.header.encode()?;
            write::patch(&core.write, 0, &buf, false)?;
            core.write.sync_data()?;
            info!("re-keyed {patched} records to {}", new_alg.name());

            let plan = self.build_tmp(core, false, false)?;
            self.swap(core, plan)
        })();
        self.finish_restriction(GateState::Barred, started, "rehash", outcome)
    }

    /// Crash recovery: exclusive from the start, leftover temp file
    /// unlinked, unreadable records salvaged around.
    pub(crate) fn recover(&self) -> Result<()> {
        self.admission.begin_restriction(GateState::Barred)?;
        let started = Instant::now();
        let outcome = (|| {
            let mut g = self.write_hold()?;
            if self.tmp_path.exists() {
                warn!("removing leftover temp file {}", self.tmp_path.display());
                fs::remove_file(&self.tmp_path)?;
            }
            let core = &mut *g.core;
            let plan = self.build_tmp(core, false, true)?;
            self.swap(core, plan)
        })();
        self.finish_restriction(GateState::Barred, started, "recovery", outcome)
    }

    // ── Orchestration ────────────────────────────────────────────────────────

    fn rebuild(&self, purge: bool) -> Result<()> {
        self.admission.begin_restriction(GateState::ReadsOnly)?;
        let started = Instant::now();
        let what = if purge { "purge" } else { "compaction" };
        info!("{what} starts");

        let outcome = (|| {
            // Phase 1 under a read hold: readers keep running.
            let plan = {
                let g = self.read_hold()?;
                self.build_tmp(&g.core, purge, false)?
            };

            // Phase 2 under a write hold.  A writer admitted before
            // the restriction may have slipped between the phases;
            // rescan if the write counter or the tail moved.
            let mut g = self.write_hold()?;
            let core = &mut *g.core;
            let plan = if core.tail != plan.source_tail
                || core.header.writes_since_compaction != plan.source_writes
            {
                warn!("writes landed during the rebuild scan; rescanning");
                self.build_tmp(core, purge, false)?
            } else {
                plan
            };
            self.swap(core, plan)
        })();
        self.finish_restriction(GateState::ReadsOnly, started, what, outcome)
    }

    /// Common restriction epilogue: restore admission (unless the swap
    /// failed hard and closed the store), clean the temp file on
    /// error, log the duration.
    fn finish_restriction(
        &self,
        from: GateState,
        started: Instant,
        what: &str,
        outcome: Result<()>,
    ) -> Result<()> {
        match outcome {
            Ok(()) => {
                self.admission.restore(from);
                info!("{what} finished in {:?}", started.elapsed());
                Ok(())
            }
            Err(e) => {
                let _ = fs::remove_file(&self.tmp_path);
                self.admission.restore(from);
                error!("{what} failed: {e}");
                Err(e)
            }
        }
    }

    // ── Phase 1: build the temp file ─────────────────────────────────────────

    fn build_tmp(&self, core: &Core, purge: bool, salvage: bool) -> Result<RebuildPlan> {
        let entries = scanm(&core.read, &self.limits, HEADER_SIZE as u64, core.tail)?;

        // Newest index entry per label; heap candidates aside.
        let mut heap: Vec<&MinimalEntry> = Vec::new();
        let mut chosen: HashMap<&str, &MinimalEntry> = HashMap::new();
        for e in &entries {
            match e.rtype {
                RecordType::Data => heap.push(e),
                RecordType::History => {
                    if !purge {
                        heap.push(e);
                    }
                }
                RecordType::Index => match (&e.label, e.target) {
                    (Some(label), Some(_)) => {
                        // Offset order: the later entry wins.
                        chosen.insert(label.as_str(), e);
                    }
                    _ if salvage => {
                        warn!("index at {} is unreadable; dropping it", e.offset)
                    }
                    _ => {
                        return Err(Error::CorruptIndex {
                            offset: e.offset,
                            reason: "label or target not extractable".into(),
                        })
                    }
                },
            }
        }
        let live_targets: HashMap<u64, ()> = chosen
            .values()
            .filter_map(|e| e.target.map(|t| (t, ())))
            .collect();

        heap.sort_by(|a, b| {
            (a.id.as_str(), a.ts, a.offset).cmp(&(b.id.as_str(), b.ts, b.offset))
        });

        let tmp = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.tmp_path)?;
        let mut out = BufWriter::new(tmp);
        out.write_all(&[b' '; HEADER_SIZE - 1])?;
        out.write_all(b"\n")?;

        // Heap region: source bytes verbatim, sorted by (ID, ts).
        let mut pos = HEADER_SIZE as u64;
        let mut moved: HashMap<u64, u64> = HashMap::new();
        for e in heap {
            let mut bytes = match line(&core.read, e.offset, &self.limits) {
                Ok(b) => b,
                Err(err) if salvage => {
                    warn!("skipping unreadable record at {}: {err}", e.offset);
                    continue;
                }
                Err(err) => return Err(err),
            };
            if record::line_type(&bytes) != Some(e.rtype) {
                if salvage {
                    warn!("record at {} changed shape mid-scan; skipping", e.offset);
                    continue;
                }
                return Err(Error::CorruptRecord {
                    offset: e.offset,
                    reason: "record changed shape between scans".into(),
                });
            }

            if e.rtype == RecordType::Data {
                if live_targets.contains_key(&e.offset) {
                    moved.insert(e.offset, pos);
                } else if purge {
                    continue;
                } else {
                    // An orphan from an interrupted retire: finish the
                    // retire in the copy.
                    bytes[TYPE_POS] = RecordType::History.digit();
                    if let Some((s, end)) = record::content_bounds(&bytes) {
                        bytes[s..end].fill(b' ');
                    }
                }
            }

            out.write_all(&bytes)?;
            out.write_all(b"\n")?;
            pos += bytes.len() as u64 + 1;
        }
        let heap_end = pos;

        // Index section: freshly serialised, sorted by (ID, label).
        let mut survivors: Vec<(&str, &MinimalEntry)> =
            chosen.iter().map(|(l, e)| (*l, *e)).collect();
        survivors.sort_by(|a, b| (a.1.id.as_str(), a.0).cmp(&(b.1.id.as_str(), b.0)));

        let now = now_ms();
        let mut live_count = 0u64;
        for (label, e) in survivors {
            let target = e.target.expect("chosen entries carry a target");
            let new_target = match moved.get(&target) {
                Some(t) => *t,
                None => continue, // label was deleted or its record dropped
            };
            let idx_line = record::encode_index(&e.id, now, new_target, label);
            out.write_all(idx_line.as_bytes())?;
            out.write_all(b"\n")?;
            pos += idx_line.len() as u64 + 1;
            live_count += 1;
        }
        let index_end = pos;

        let header = Header {
            version: FORMAT_VERSION,
            dirty: false,
            algorithm: core.header.algorithm,
            timestamp_ms: now,
            heap_end,
            index_end,
            reserved: 0,
            live_count,
            writes_since_compaction: 0,
            auto_compact_modulus: core.header.auto_compact_modulus,
        };

        out.flush()?;
        let tmp = out
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;
        write::patch(&tmp, 0, &header.encode()?, false)?;
        tmp.sync_all()?;

        Ok(RebuildPlan {
            header,
            source_tail: core.tail,
            source_writes: core.header.writes_since_compaction,
        })
    }

    // ── Phase 2: swap ────────────────────────────────────────────────────────

    /// Rename the temp file over the original and rotate descriptors.
    /// A failure after the rename leaves the handle unusable; the
    /// on-disk file is whichever side of the rename we reached.
    fn swap(&self, core: &mut Core, plan: RebuildPlan) -> Result<()> {
        let rotated = (|| -> Result<()> {
            fs::rename(&self.tmp_path, &self.path)?;
            let read = File::open(&self.path)?;
            let write_f = OpenOptions::new().read(true).write(true).open(&self.path)?;
            let lock_f = OpenOptions::new().read(true).write(true).open(&self.path)?;
            self.flock.rebind(lock_f)?;
            core.read = read;
            core.write = write_f;
            Ok(())
        })();
        if let Err(e) = rotated {
            error!("descriptor rotation failed; closing the store: {e}");
            self.admission.set(GateState::Closed);
            return Err(e);
        }

        core.tail = plan.header.index_end;
        core.header = plan.header;
        if let Some(bloom) = core.bloom.as_mut() {
            bloom.clear(); // the sparse region is empty again
        }
        Ok(())
    }
}
