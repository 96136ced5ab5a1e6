//! Route table types
//!
//! This module defines the data produced by the route table builder and
//! consumed by the matcher:
//! - `RouteKind`: exact, dynamic (`[param]`) or catch-all (`[...param]`)
//! - `RouteDescriptor`: one routable page file and its canonical pattern
//! - `RouteTable`: ordered mapping from scan-time route key to descriptor
//! - `MatchResult`: the outcome of matching a request URL

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Kind of a route pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    /// No parameters, e.g. `/about`
    Exact,
    /// One or more single-segment parameters, e.g. `/blog/[slug]`
    Dynamic,
    /// A rest parameter capturing the remaining segments, e.g. `/docs/[...slug]`
    CatchAll,
}

impl RouteKind {
    /// Classify a route pattern. A rest segment anywhere wins over a plain
    /// parameter segment.
    pub fn classify(pattern: &str) -> Self {
        let mut kind = RouteKind::Exact;
        for segment in pattern.split('/') {
            match SegmentParam::parse(segment) {
                Some(SegmentParam::Rest(_)) => return RouteKind::CatchAll,
                Some(SegmentParam::Single(_)) => kind = RouteKind::Dynamic,
                None => {}
            }
        }
        kind
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Exact => "exact",
            RouteKind::Dynamic => "dynamic",
            RouteKind::CatchAll => "catch_all",
        }
    }
}

impl std::fmt::Display for RouteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parameter declared by a single pattern segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentParam<'a> {
    /// `[name]`
    Single(&'a str),
    /// `[...name]`
    Rest(&'a str),
}

impl<'a> SegmentParam<'a> {
    /// Parse a pattern segment. Returns None for literal segments.
    pub fn parse(segment: &'a str) -> Option<Self> {
        let inner = segment.strip_prefix('[')?.strip_suffix(']')?;
        if let Some(name) = inner.strip_prefix("...") {
            if name.is_empty() {
                return None;
            }
            return Some(SegmentParam::Rest(name));
        }
        if inner.is_empty() {
            return None;
        }
        Some(SegmentParam::Single(inner))
    }
}

/// Value bound to a route parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Single(String),
    Many(Vec<String>),
}

impl ParamValue {
    /// Render the value as it appears in a pathname
    pub fn to_path_segment(&self) -> String {
        match self {
            ParamValue::Single(value) => value.clone(),
            ParamValue::Many(values) => values.join("/"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        ParamValue::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// Route parameters keyed by name
pub type Params = BTreeMap<String, ParamValue>;

/// Query string values keyed by name
pub type Query = BTreeMap<String, String>;

/// One routable page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub kind: RouteKind,
    /// Page file the route renders
    pub file_path: PathBuf,
    /// Canonical route pattern, e.g. `/blog/[slug]`, or a concrete pathname
    /// for routes pre-resolved from a static-path enumerator
    pub pathname: String,
    /// Parameters of a pre-resolved dynamic route
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_params: Option<Params>,
}

impl RouteDescriptor {
    pub fn new(kind: RouteKind, file_path: impl Into<PathBuf>, pathname: impl Into<String>) -> Self {
        Self {
            kind,
            file_path: file_path.into(),
            pathname: pathname.into(),
            static_params: None,
        }
    }

    /// Create a dynamic route pinned to one concrete pathname
    pub fn pre_resolved(file_path: impl Into<PathBuf>, pathname: impl Into<String>, params: Params) -> Self {
        Self {
            kind: RouteKind::Dynamic,
            file_path: file_path.into(),
            pathname: pathname.into(),
            static_params: Some(params),
        }
    }

    /// True for routes registered from a static-path enumerator
    pub fn is_pre_resolved(&self) -> bool {
        self.static_params.is_some()
    }
}

/// Ordered mapping from route key (origin + pathname) to descriptor
///
/// Iteration order is insertion order. The matcher relies on it for its
/// first-match-wins passes, so the builder inserts in a deterministic order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<(String, RouteDescriptor)>,
    index: HashMap<String, usize>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a route. Re-inserting an existing key replaces the descriptor
    /// in place and returns the previous one.
    pub fn insert(&mut self, key: impl Into<String>, descriptor: RouteDescriptor) -> Option<RouteDescriptor> {
        let key = key.into();
        if let Some(&position) = self.index.get(&key) {
            return Some(std::mem::replace(&mut self.entries[position].1, descriptor));
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, descriptor));
        None
    }

    pub fn get(&self, key: &str) -> Option<&RouteDescriptor> {
        self.index.get(key).map(|&position| &self.entries[position].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(key, descriptor)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RouteDescriptor)> {
        self.entries.iter().map(|(key, descriptor)| (key.as_str(), descriptor))
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.entries.iter().map(|(_, descriptor)| descriptor)
    }
}

impl FromIterator<(String, RouteDescriptor)> for RouteTable {
    fn from_iter<I: IntoIterator<Item = (String, RouteDescriptor)>>(iter: I) -> Self {
        let mut table = RouteTable::new();
        for (key, descriptor) in iter {
            table.insert(key, descriptor);
        }
        table
    }
}

/// Result of matching a request URL against the route table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub file_path: PathBuf,
    pub kind: RouteKind,
    /// Pattern of the matched route
    pub pathname: String,
    pub query: Query,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
}
