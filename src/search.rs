//! Regex search — a thin layer over the sequence walks.
//!
//! `search` tests document content, `match_labels` tests labels.  Both
//! compile the pattern up front (an uncompilable pattern is
//! [`Error::InvalidPattern`]) and stream matches through the caller's
//! callback with the same early-break contract as the walks they ride
//! on.

use regex::RegexBuilder;

use crate::error::{Error, Result};
use crate::store::Folio;

/// Options for [`Folio::search`] and [`Folio::match_labels`].
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub case_insensitive: bool,
}

impl Folio {
    /// Hand every live document whose content matches `pattern` to
    /// `f` as a `(label, content)` pair.
    pub fn search<F>(&self, pattern: &str, opts: &SearchOptions, mut f: F) -> Result<()>
    where
        F: FnMut(&str, &str) -> bool,
    {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(opts.case_insensitive)
            .build()
            .map_err(|e| Error::InvalidPattern(e.to_string()))?;
        self.all(|label, content| {
            if re.is_match(content) {
                f(label, content)
            } else {
                true
            }
        })
    }

    /// Hand every live label matching `pattern` to `f`.
    pub fn match_labels<F>(&self, pattern: &str, opts: &SearchOptions, mut f: F) -> Result<()>
    where
        F: FnMut(&str) -> bool,
    {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(opts.case_insensitive)
            .build()
            .map_err(|e| Error::InvalidPattern(e.to_string()))?;
        self.list(|label| if re.is_match(label) { f(label) } else { true })
    }
}
