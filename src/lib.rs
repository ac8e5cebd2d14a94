//! # folio — single-file versioned document store
//!
//! Format guarantees (frozen in v1):
//! - One file, newline-delimited JSON, UTF-8; readable by generic text
//!   tools without this crate
//! - The header is exactly 128 bytes with the dirty digit at byte 13;
//!   it is patched, never re-serialised, on the hot write path
//! - Record field order is frozen so the type digit, ID span, and
//!   timestamp span sit at fixed byte positions in every shape
//! - Every update appends before it retires: the crash window of a Set
//!   is the trailing newline, never a torn record pair
//! - Erased records are overwritten with spaces in place — offsets of
//!   everything else never move between rebuilds
//! - History snapshots are zstd + base85 with a JSON-safe alphabet;
//!   `_h` embeds with no escaping
//! - IDs are 64-bit label hashes and MAY collide; every positive ID
//!   match is confirmed against the label field
//! - A leftover `.tmp` sibling or a raised dirty flag triggers a full
//!   rebuild on open; rebuilds swap in a fresh file atomically

pub mod bloom;
pub mod codec;
pub mod error;
pub mod gate;
pub mod hasher;
pub mod header;
pub mod io;
pub mod record;
mod repair;
pub mod scan;
pub mod search;
pub mod store;

// Flat re-exports for the most common types.
pub use error::{Error, Result};
pub use gate::GateState;
pub use hasher::HashAlg;
pub use header::{Header, HEADER_SIZE};
pub use record::{DataRecord, IndexRecord, RecordType};
pub use search::SearchOptions;
pub use store::{Folio, Options, StoreInfo};
