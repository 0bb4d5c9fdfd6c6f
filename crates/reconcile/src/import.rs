//! Import identifiers.
//!
//! An import id is a slash-delimited composite key whose segment count and
//! order are fixed per kind. Parsing never guesses: a wrong count or an empty
//! segment is rejected before any remote call.

use crate::error::{Error, Result};
use crate::types::Kind;

/// Segment names of one kind's import id, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportFormat {
    segments: &'static [&'static str],
}

impl ImportFormat {
    pub const fn new(segments: &'static [&'static str]) -> Self {
        Self { segments }
    }

    /// Number of segments expected.
    pub const fn len(&self) -> usize {
        self.segments.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Human-readable form, e.g. `cluster/topic`.
    pub fn describe(&self) -> String {
        self.segments.join("/")
    }

    /// Split `raw` into exactly [`len`](Self::len) non-empty segments.
    pub fn parse<'a>(&self, kind: Kind, raw: &'a str) -> Result<Vec<&'a str>> {
        let parts: Vec<&str> = raw.split('/').collect();
        if parts.len() != self.segments.len() {
            return Err(Error::InvalidImportId {
                kind,
                id: raw.to_string(),
                format: self.describe(),
                expected: self.segments.len(),
                found: parts.len(),
            });
        }
        if let Some((segment, _)) = self
            .segments
            .iter()
            .zip(&parts)
            .find(|(_, part)| part.trim().is_empty())
        {
            return Err(Error::EmptyImportSegment {
                kind,
                id: raw.to_string(),
                segment,
            });
        }
        Ok(parts)
    }
}
