//! Canonical page identifiers (C1).
//!
//! Normalization lowercases, collapses runs of non-alphanumeric characters
//! into a single `_`, and trims leading/trailing `_`. The result is stable
//! across platforms and idempotent under re-normalization.

use std::fmt;

use crate::error::Error;

/// A normalized, canonical page identifier.
///
/// Two raw strings that normalize equally are the same page. Construct via
/// [`Identifier::normalize`]; there is no public constructor that skips
/// normalization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Normalize `raw` into a canonical identifier.
    ///
    /// Fails with [`Error::InvalidIdentifier`] when `raw` contains no
    /// identifier characters, or when the first alphanumeric character is a
    /// digit.
    pub fn normalize(raw: &str) -> Result<Self, Error> {
        let mut out = String::with_capacity(raw.len());
        let mut last_was_sep = true; // seed true so a leading run of seps is dropped
        for c in raw.trim().chars() {
            let mut lowered = c.to_lowercase();
            // `to_lowercase` can yield >1 char (rare); fold each independently.
            while let Some(lc) = lowered.next() {
                if lc.is_alphanumeric() {
                    out.push(lc);
                    last_was_sep = false;
                } else if !last_was_sep {
                    out.push('_');
                    last_was_sep = true;
                }
            }
        }
        while out.ends_with('_') {
            out.pop();
        }

        if out.is_empty() {
            return Err(Error::InvalidIdentifier(format!(
                "{raw:?} contains no identifier characters"
            )));
        }
        if out.chars().next().map(|c| c.is_numeric()).unwrap_or(false) {
            return Err(Error::InvalidIdentifier(format!(
                "{raw:?} normalizes to {out:?}, which begins with a digit"
            )));
        }

        Ok(Self(out))
    }

    /// Predicate form of [`Identifier::normalize`] that allocates nothing.
    pub fn validate(raw: &str) -> bool {
        let mut seen_alnum = false;
        let mut first_is_digit = None;
        for c in raw.trim().chars() {
            for lc in c.to_lowercase() {
                if lc.is_alphanumeric() {
                    seen_alnum = true;
                    if first_is_digit.is_none() {
                        first_is_digit = Some(lc.is_numeric());
                    }
                }
            }
        }
        seen_alnum && first_is_digit != Some(true)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
