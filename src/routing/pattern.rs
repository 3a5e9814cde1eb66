//! Compiled path patterns.
//!
//! # Syntax
//! - `/static/app.js`: literal segments, matched exactly (case-sensitive)
//! - `/api/:id`: `:name` captures one non-empty segment
//! - `/files/*rest`: `*name` captures the remaining path, only as the last segment
//!
//! # Design Decisions
//! - Patterns match the whole path; `/api/:id` does not match `/api/1/2` or `/api/1/`
//! - Matching is a single left-to-right pass, no backtracking
//! - Captured values are returned verbatim (no percent-decoding)

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::http::Params;

/// Errors raised while compiling a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern {0:?} must start with '/'")]
    MissingLeadingSlash(String),

    #[error("pattern {0:?} has an unnamed capture")]
    EmptyCapture(String),

    #[error("pattern {pattern:?} captures {name:?} more than once")]
    DuplicateCapture { pattern: String, name: String },

    #[error("pattern {0:?} has a rest capture before its last segment")]
    RestNotLast(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(String),
    Rest(String),
}

/// A path pattern compiled into segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        let body = source
            .strip_prefix('/')
            .ok_or_else(|| PatternError::MissingLeadingSlash(source.to_string()))?;

        let raw: Vec<&str> = body.split('/').collect();
        let mut segments = Vec::with_capacity(raw.len());
        let mut names: Vec<&str> = Vec::new();

        for (i, part) in raw.iter().copied().enumerate() {
            let segment = if let Some(name) = part.strip_prefix(':') {
                Segment::Capture(name.to_string())
            } else if let Some(name) = part.strip_prefix('*') {
                if i + 1 != raw.len() {
                    return Err(PatternError::RestNotLast(source.to_string()));
                }
                Segment::Rest(name.to_string())
            } else {
                Segment::Literal(part.to_string())
            };

            if let Segment::Capture(name) | Segment::Rest(name) = &segment {
                if name.is_empty() {
                    return Err(PatternError::EmptyCapture(source.to_string()));
                }
                if names.contains(&name.as_str()) {
                    return Err(PatternError::DuplicateCapture {
                        pattern: source.to_string(),
                        name: name.clone(),
                    });
                }
                names.push(&part[1..]);
            }
            segments.push(segment);
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names captured by this pattern, in order.
    pub fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Capture(name) | Segment::Rest(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match `path`, returning the captures on success.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let body = path.strip_prefix('/')?;
        let mut parts = body.split('/');
        let mut params = Params::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => {
                    if parts.next()? != lit.as_str() {
                        return None;
                    }
                }
                Segment::Capture(name) => {
                    let value = parts.next()?;
                    if value.is_empty() {
                        return None;
                    }
                    params.append(name.as_str(), value);
                }
                Segment::Rest(name) => {
                    let rest: Vec<&str> = parts.by_ref().collect();
                    params.append(name.as_str(), rest.join("/"));
                    return Some(params);
                }
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
