//! Patterns matched against console output.

use nosboot_shared::{NosbootError, NosbootResult};
use regex::bytes::Regex;
use std::ops::Range;

#[derive(Debug, Clone)]
enum Matcher {
    Literal(Vec<u8>),
    Regex(Regex),
}

/// Byte-level pattern searched for in the console buffer.
#[derive(Debug, Clone)]
pub struct Pattern {
    matcher: Matcher,
    source: String,
}

impl Pattern {
    /// Match `text` exactly.
    pub fn literal(text: &str) -> Self {
        Self {
            matcher: Matcher::Literal(text.as_bytes().to_vec()),
            source: text.to_string(),
        }
    }

    /// Match a regular expression.
    pub fn regex(expr: &str) -> NosbootResult<Self> {
        let regex = Regex::new(expr)
            .map_err(|e| NosbootError::Config(format!("invalid console pattern {expr:?}: {e}")))?;
        Ok(Self {
            matcher: Matcher::Regex(regex),
            source: expr.to_string(),
        })
    }

    /// Byte range of the first match in `haystack`.
    pub fn find(&self, haystack: &[u8]) -> Option<Range<usize>> {
        match &self.matcher {
            Matcher::Literal(needle) if needle.is_empty() => Some(0..0),
            Matcher::Literal(needle) => haystack
                .windows(needle.len())
                .position(|window| window == needle.as_slice())
                .map(|start| start..start + needle.len()),
            Matcher::Regex(regex) => regex.find(haystack).map(|m| m.range()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.source)
    }
}
