//! Resource path parsing and construction.
//!
//! # Responsibility
//! - Parse `content://<authority>/<segments>[?query]` strings into typed paths.
//! - Build canonical path strings with percent-encoded segments.
//!
//! # Invariants
//! - Segments are stored decoded; encoding happens only at the string boundary.
//! - Empty segments (`a//b`, trailing `/`) are ignored.
//! - Query parameters never take part in hierarchy comparisons.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use url::form_urlencoded;
use url::Url;

/// Scheme used by every resource path in this crate.
pub const CONTENT_SCHEME: &str = "content";

/// Errors raised while parsing a resource path string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    Malformed { input: String, message: String },
    UnsupportedScheme(String),
    MissingAuthority(String),
}

impl Display for PathError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed { input, message } => {
                write!(f, "malformed resource path `{input}`: {message}")
            }
            Self::UnsupportedScheme(scheme) => {
                write!(f, "unsupported scheme `{scheme}`; expected `{CONTENT_SCHEME}`")
            }
            Self::MissingAuthority(input) => {
                write!(f, "resource path `{input}` has no authority")
            }
        }
    }
}

impl Error for PathError {}

/// Hierarchical identifier for a table, a filtered subset, or a single row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourcePath {
    authority: String,
    segments: Vec<String>,
    query: Vec<(String, String)>,
}

impl ResourcePath {
    /// Creates a root path (no segments) for `authority`.
    pub fn new(authority: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            segments: Vec::new(),
            query: Vec::new(),
        }
    }

    /// Parses a `content://` path string.
    ///
    /// # Errors
    /// - `Malformed` when the string is not a URL or a segment is not valid UTF-8
    ///   after percent-decoding.
    /// - `UnsupportedScheme` for any scheme other than `content`.
    /// - `MissingAuthority` when the authority part is empty.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let url = Url::parse(input.trim()).map_err(|err| PathError::Malformed {
            input: input.to_string(),
            message: err.to_string(),
        })?;

        if url.scheme() != CONTENT_SCHEME {
            return Err(PathError::UnsupportedScheme(url.scheme().to_string()));
        }

        let authority = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| PathError::MissingAuthority(input.to_string()))?
            .to_string();

        let mut segments = Vec::new();
        if let Some(raw_segments) = url.path_segments() {
            for raw in raw_segments.filter(|segment| !segment.is_empty()) {
                let decoded = urlencoding::decode(raw).map_err(|err| PathError::Malformed {
                    input: input.to_string(),
                    message: format!("segment `{raw}` is not valid UTF-8: {err}"),
                })?;
                segments.push(decoded.into_owned());
            }
        }

        let query = url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        Ok(Self {
            authority,
            segments,
            query,
        })
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Decoded path segments, in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    /// Returns the first value of query parameter `key`.
    pub fn query_parameter(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Appends one decoded segment.
    pub fn append_segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Appends a numeric row id segment.
    pub fn append_id(self, id: i64) -> Self {
        self.append_segment(id.to_string())
    }

    /// Appends a query parameter, keeping earlier ones.
    pub fn with_query_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Returns the same path with all query parameters dropped.
    pub fn without_query(&self) -> Self {
        Self {
            authority: self.authority.clone(),
            segments: self.segments.clone(),
            query: Vec::new(),
        }
    }

    /// Returns whether `self` equals `other` or is one of its ancestors.
    ///
    /// Only authority and segments are compared.
    pub fn is_ancestor_or_self(&self, other: &ResourcePath) -> bool {
        self.authority == other.authority && other.segments.starts_with(&self.segments)
    }
}

impl Display for ResourcePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{CONTENT_SCHEME}://{}", self.authority)?;
        for segment in &self.segments {
            write!(f, "/{}", urlencoding::encode(segment))?;
        }
        if !self.query.is_empty() {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            for (key, value) in &self.query {
                serializer.append_pair(key, value);
            }
            write!(f, "?{}", serializer.finish())?;
        }
        Ok(())
    }
}

impl FromStr for ResourcePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
