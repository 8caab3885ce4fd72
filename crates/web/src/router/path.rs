//! Route patterns.
//!
//! A pattern is a `/` separated list of segments. A segment is a literal, a
//! named parameter `:name` capturing one non-empty segment, or a wildcard
//! `*name` that may only come last and captures everything left, at least one
//! segment. Literals compare ASCII case-insensitively and one trailing `/` on
//! the request path is ignored.

use crate::error::RouteError;

/// Whether a pattern must consume the whole path or only a leading run of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    Prefix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard(String),
}

#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
    keys: Vec<String>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, RouteError> {
        let Some(rest) = pattern.strip_prefix('/') else {
            return Err(RouteError::MissingLeadingSlash { pattern: pattern.to_string() });
        };

        let mut segments: Vec<Segment> = Vec::new();
        let mut keys: Vec<String> = Vec::new();

        for raw in split_segments(rest) {
            if segments.last().is_some_and(|segment| matches!(segment, Segment::Wildcard(_))) {
                return Err(RouteError::WildcardNotLast { pattern: pattern.to_string() });
            }

            let name = match raw.chars().next() {
                Some(':' | '*') => param_name(pattern, &raw[1..])?,
                _ => {
                    segments.push(Segment::Literal(raw.to_string()));
                    continue;
                }
            };

            if keys.contains(&name) {
                return Err(RouteError::DuplicateParam { pattern: pattern.to_string(), name });
            }
            keys.push(name.clone());
            segments.push(if raw.starts_with('*') { Segment::Wildcard(name) } else { Segment::Param(name) });
        }

        Ok(Self { source: pattern.to_string(), segments, keys })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parameter names in the order they appear.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Matches `path`, returning the captured `(name, value)` pairs in key order.
    pub fn matches(&self, path: &str, mode: MatchMode) -> Option<Vec<(String, String)>> {
        let rest = path.strip_prefix('/')?;
        let parts: Vec<&str> = split_segments(rest).collect();

        let mut captures = Vec::with_capacity(self.keys.len());
        let mut index = 0;

        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => {
                    let part = parts.get(index)?;
                    if !part.eq_ignore_ascii_case(literal) {
                        return None;
                    }
                    index += 1;
                }
                Segment::Param(name) => {
                    let part = parts.get(index).filter(|part| !part.is_empty())?;
                    captures.push((name.clone(), (*part).to_string()));
                    index += 1;
                }
                Segment::Wildcard(name) => {
                    let remaining = &parts[index.min(parts.len())..];
                    if remaining.is_empty() || remaining.iter().all(|part| part.is_empty()) {
                        return None;
                    }
                    captures.push((name.clone(), remaining.join("/")));
                    index = parts.len();
                }
            }
        }

        match mode {
            MatchMode::Exact if index != parts.len() => None,
            _ => Some(captures),
        }
    }
}

/// Splits on `/`, ignoring one trailing slash. An empty input has no segments.
fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    let path = path.strip_suffix('/').unwrap_or(path);
    path.split('/').filter(move |_| !path.is_empty())
}

fn param_name(pattern: &str, name: &str) -> Result<String, RouteError> {
    if name.is_empty() {
        return Err(RouteError::EmptyParamName { pattern: pattern.to_string() });
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(RouteError::InvalidParamName { pattern: pattern.to_string(), name: name.to_string() });
    }
    Ok(name.to_string())
}
