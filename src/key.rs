//! Cache key construction.
//!
//! Keys are ordered segment lists whose first segment is always the
//! [`EntityKind`]:
//!
//! ```text
//! [kind]                          all(kind)
//! [kind, params]                  list(kind, params)
//! [kind, "detail", id]            detail(kind, id)
//! [kind, "slug", slug]            slug(kind, slug)
//! [kind, "infinite", params]      infinite(kind, params)
//! ```
//!
//! `all(kind)` is a segment-wise prefix of every other key of that kind,
//! which is what bulk invalidation matches on.

use crate::entity::EntityKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

const DETAIL: &str = "detail";
const SLUG: &str = "slug";
const INFINITE: &str = "infinite";

/// Scalar value of a list filter or pagination field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

/// Fields sent as integers whatever form the caller gave them in.
const INTEGER_FIELDS: [&str; 2] = ["page", "limit"];

/// Turn integer text in a pagination field into an integer, so `"2"` and
/// `2` build the same key.
fn normalise(field: &str, value: ParamValue) -> ParamValue {
    match value {
        ParamValue::Text(text) if INTEGER_FIELDS.contains(&field) => {
            match text.trim().parse::<i64>() {
                Ok(n) => ParamValue::Int(n),
                Err(_) => ParamValue::Text(text),
            }
        }
        other => other,
    }
}

/// Filter and pagination fields of a list request.
///
/// Backed by a `BTreeMap`, so field insertion order never affects equality,
/// hashing or the canonical form. Absent and `None` fields are the same thing:
/// setting a field to `None` removes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ListParams(BTreeMap<String, ParamValue>);

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear a field.
    pub fn set(mut self, field: impl Into<String>, value: Option<ParamValue>) -> Self {
        let field = field.into();
        match value {
            Some(value) => {
                let value = normalise(&field, value);
                self.0.insert(field, value);
            }
            None => {
                self.0.remove(&field);
            }
        }
        self
    }

    /// Set a kind-specific filter such as `category` or `severity`.
    pub fn filter(self, field: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(field, Some(value.into()))
    }

    pub fn page(self, page: u32) -> Self {
        self.filter("page", page)
    }

    pub fn limit(self, limit: u32) -> Self {
        self.filter("limit", limit)
    }

    /// Free-text search. A blank query is the same as no query.
    pub fn query(self, q: impl Into<String>) -> Self {
        let q = q.into();
        let trimmed = q.trim();
        if trimmed.is_empty() {
            self.set("q", None)
        } else {
            self.set("q", Some(ParamValue::Text(trimmed.to_string())))
        }
    }

    pub fn get(&self, field: &str) -> Option<&ParamValue> {
        self.0.get(field)
    }

    /// Integer field, if set to an integer.
    pub fn get_int(&self, field: &str) -> Option<i64> {
        match self.0.get(field) {
            Some(ParamValue::Int(v)) => Some(*v),
            Some(ParamValue::Text(v)) => v.parse().ok(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Query-string pairs in field order.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }

    /// Sorted-field JSON, e.g. `{"limit":20,"page":1,"q":"tom"}`.
    pub fn canonical(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_default()
    }
}

impl<K, V> FromIterator<(K, V)> for ListParams
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ListParams::new(), |params, (k, v)| params.filter(k, v))
    }
}

/// One segment after the kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeySegment {
    Params(ListParams),
    Tag(&'static str),
    Id(String),
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySegment::Params(params) => f.write_str(&params.canonical()),
            KeySegment::Tag(tag) => f.write_str(tag),
            KeySegment::Id(id) => f.write_str(id),
        }
    }
}

/// Hierarchical cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: EntityKind,
    tail: Vec<KeySegment>,
}

impl CacheKey {
    /// `[kind]`, the prefix of every key of that kind.
    pub fn all(kind: EntityKind) -> Self {
        CacheKey {
            kind,
            tail: Vec::new(),
        }
    }

    /// `[kind, params]`.
    pub fn list(kind: EntityKind, params: &ListParams) -> Self {
        CacheKey {
            kind,
            tail: vec![KeySegment::Params(params.clone())],
        }
    }

    /// `[kind, "detail", id]`. Callers gate on a non-empty id before fetching.
    pub fn detail(kind: EntityKind, id: impl Into<String>) -> Self {
        CacheKey {
            kind,
            tail: vec![KeySegment::Tag(DETAIL), KeySegment::Id(id.into())],
        }
    }

    /// `[kind, "slug", slug]`, the cached slug → id lookup.
    pub fn slug(kind: EntityKind, slug: impl Into<String>) -> Self {
        CacheKey {
            kind,
            tail: vec![KeySegment::Tag(SLUG), KeySegment::Id(slug.into())],
        }
    }

    /// `[kind, "infinite", params]`, the accumulated pages of a cursor list.
    pub fn infinite(kind: EntityKind, params: &ListParams) -> Self {
        CacheKey {
            kind,
            tail: vec![KeySegment::Tag(INFINITE), KeySegment::Params(params.clone())],
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Number of segments, kind included.
    pub fn len(&self) -> usize {
        1 + self.tail.len()
    }

    /// Segments after the kind.
    pub fn tail(&self) -> &[KeySegment] {
        &self.tail
    }

    /// Segment-wise prefix test; every key starts with itself.
    pub fn starts_with(&self, prefix: &CacheKey) -> bool {
        self.kind == prefix.kind && self.tail.starts_with(&prefix.tail)
    }

    /// Identifier of a detail key.
    pub fn detail_id(&self) -> Option<&str> {
        match self.tail.as_slice() {
            [KeySegment::Tag(DETAIL), KeySegment::Id(id)] => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for segment in &self.tail {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}
