// ── Query keys ──
//
// A key is an ordered list of JSON segments: resource namespace, operation
// name, then filter parameters. Identity is the canonical serialization
// (object keys sorted), so two filter maps built in different orders address
// the same entry.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use serde_json::Value;

/// Cache address for one query.
#[derive(Clone)]
pub struct QueryKey {
    segments: Vec<Value>,
    canonical: String,
}

impl QueryKey {
    /// Key with a single namespace segment. Also the prefix matching every
    /// key in that namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self::from_segments(vec![Value::String(namespace.into())])
    }

    pub fn from_segments(segments: Vec<Value>) -> Self {
        let canonical = canonical_string(&segments);
        Self {
            segments,
            canonical,
        }
    }

    /// Append a string segment (usually the operation name or an id).
    pub fn with(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(Value::String(segment.into()));
        self.canonical = canonical_string(&self.segments);
        self
    }

    /// Append a filter-parameter segment.
    ///
    /// Parameters that fail to serialize become `null` rather than erroring:
    /// every serde-derived filter type serializes infallibly.
    pub fn with_params<P: Serialize + ?Sized>(mut self, params: &P) -> Self {
        let value = serde_json::to_value(params).unwrap_or(Value::Null);
        self.segments.push(value);
        self.canonical = canonical_string(&self.segments);
        self
    }

    pub fn segments(&self) -> &[Value] {
        &self.segments
    }

    /// First segment, when it is a string.
    pub fn namespace(&self) -> Option<&str> {
        self.segments.first().and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Canonical serialized form, used for identity.
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Whether `prefix` addresses this key.
    ///
    /// Segment-wise: scalars and arrays must be equal; an object segment in
    /// the prefix matches when each of its entries is present (recursively)
    /// in the corresponding object of this key.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        prefix.segments.len() <= self.segments.len()
            && prefix
                .segments
                .iter()
                .zip(&self.segments)
                .all(|(p, k)| segment_matches(p, k))
    }
}

impl PartialEq for QueryKey {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for QueryKey {}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Debug for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryKey({})", self.canonical)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl From<&str> for QueryKey {
    fn from(namespace: &str) -> Self {
        Self::new(namespace)
    }
}

// ── Matching and canonical form ──────────────────────────────────────

fn segment_matches(prefix: &Value, key: &Value) -> bool {
    match (prefix, key) {
        (Value::Object(p), Value::Object(k)) => p
            .iter()
            .all(|(name, pv)| k.get(name).is_some_and(|kv| segment_matches(pv, kv))),
        _ => prefix == key,
    }
}

fn canonical_string(segments: &[Value]) -> String {
    let mut out = String::from("[");
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_canonical(segment, &mut out);
    }
    out.push(']');
    out
}

/// JSON with object keys sorted, independent of serde_json's map ordering.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (name, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, v) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(v, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
