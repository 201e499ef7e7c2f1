//! Canonical form encoding.
//!
//! Gateway parameters travel as a flat `application/x-www-form-urlencoded`
//! map whose keys are dotted paths into the original nested value:
//!
//! ```text
//! {"shop": {"items": [{"sku": "a"}, {"sku": "b"}]}}
//!
//! shop.items.1.sku = a
//! shop.items.2.sku = b
//! ```
//!
//! Object fields append `.<name>`, array elements append `.<index>` where the
//! index is 1-based. [`flatten`] produces a [`FormMap`] from a nested value and
//! [`unflatten`] rebuilds the nested value.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use serde_json::{Map, Number, Value};
use tracing::warn;

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '.';

/// A leaf value of a [`FormMap`].
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Number(Number),
    Bool(bool),
}

impl Scalar {
    /// Converts a JSON leaf into a scalar. Returns `None` for null, arrays
    /// and objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Returns the string value if this scalar is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Renders the scalar the way it appears on the wire: strings verbatim,
/// numbers in their JSON form, booleans as `true`/`false`.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{}", n),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::String(s) => Value::String(s),
            Scalar::Number(n) => Value::Number(n),
            Scalar::Bool(b) => Value::Bool(b),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<Number> for Scalar {
    fn from(value: Number) -> Self {
        Self::Number(value)
    }
}

/// Flat mapping from dotted-path keys to scalar values.
///
/// Keys are kept in byte order, which is also the order the signer needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormMap {
    entries: BTreeMap<String, Scalar>,
}

impl FormMap {
    /// Creates an empty form map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` body.
    ///
    /// Every value comes back as a string scalar; the signature is computed
    /// over the textual form, so this does not affect verification.
    pub fn from_urlencoded(body: &str) -> Self {
        url::form_urlencoded::parse(body.as_bytes())
            .map(|(k, v)| (k.into_owned(), Scalar::String(v.into_owned())))
            .collect()
    }

    /// Serializes the map as an `application/x-www-form-urlencoded` body.
    pub fn to_urlencoded(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.entries.iter().map(|(k, v)| (k.as_str(), v.to_string())))
            .finish()
    }

    /// Inserts a value, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Option<Scalar> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Scalar> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in ascending key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Scalar> {
        self.entries.iter()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, String, Scalar> {
        self.entries.keys()
    }
}

impl<K: Into<String>, V: Into<Scalar>> FromIterator<(K, V)> for FormMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Scalar>> Extend<(K, V)> for FormMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl IntoIterator for FormMap {
    type Item = (String, Scalar);
    type IntoIter = btree_map::IntoIter<String, Scalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a FormMap {
    type Item = (&'a String, &'a Scalar);
    type IntoIter = btree_map::Iter<'a, String, Scalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Flattens a nested value into dotted-path form parameters.
///
/// Null values are skipped. A scalar at the root is stored under the empty
/// key.
pub fn flatten(value: &Value) -> FormMap {
    let mut form = FormMap::new();
    flatten_into(&mut form, String::new(), value);
    form
}

fn flatten_into(form: &mut FormMap, path: String, value: &Value) {
    match value {
        Value::Null => {}
        Value::Object(fields) => {
            for (name, child) in fields {
                flatten_into(form, format!("{}{}{}", path, PATH_SEPARATOR, name), child);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(
                    form,
                    format!("{}{}{}", path, PATH_SEPARATOR, index + 1),
                    child,
                );
            }
        }
        leaf => {
            if let Some(scalar) = Scalar::from_value(leaf) {
                let key = path.strip_prefix(PATH_SEPARATOR).unwrap_or(&path);
                form.insert(key, scalar);
            }
        }
    }
}

/// Largest 1-based array index [`unflatten`] will materialize.
///
/// Keys addressing a higher index are dropped; array gaps are filled, so the
/// index bounds the allocation made for a single key.
pub const MAX_ARRAY_INDEX: usize = 100_000;

/// How [`unflatten`] reads one path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    /// Object field name.
    Field,
    /// Array element, as a 0-based slot.
    Index(usize),
    /// Canonical index above [`MAX_ARRAY_INDEX`], including ones that
    /// overflow `usize`.
    OutOfRange,
}

impl Segment {
    /// Only canonical positive decimals (`1`, `2`, ... with no sign and no
    /// leading zero) are indices. `0`, `01` and `+1` are field names.
    fn parse(segment: &str) -> Self {
        let canonical = !segment.is_empty()
            && !segment.starts_with('0')
            && segment.bytes().all(|b| b.is_ascii_digit());
        if !canonical {
            return Self::Field;
        }
        match segment.parse::<usize>() {
            Ok(index) if index <= MAX_ARRAY_INDEX => Self::Index(index - 1),
            _ => Self::OutOfRange,
        }
    }
}

/// Intermediate tree built while unflattening.
///
/// A container's kind is fixed by the first key that reaches it.
#[derive(Debug)]
enum PathNode {
    Vacant,
    Leaf(Scalar),
    Sequence(Vec<PathNode>),
    Mapping(BTreeMap<String, PathNode>),
}

impl PathNode {
    /// Container to create below a node whose next segment is `segment`.
    fn container_for(segment: &str) -> Self {
        if matches!(Segment::parse(segment), Segment::Index(_)) {
            Self::Sequence(Vec::new())
        } else {
            Self::Mapping(BTreeMap::new())
        }
    }

    /// Returns the child slot addressed by `segment`, creating it if needed.
    ///
    /// Returns `None` when the segment cannot address this node: a field name
    /// on a sequence, or any segment on a leaf.
    fn child_mut(&mut self, segment: &str) -> Option<&mut PathNode> {
        match self {
            Self::Mapping(fields) => Some(
                fields
                    .entry(segment.to_string())
                    .or_insert(PathNode::Vacant),
            ),
            Self::Sequence(items) => {
                let Segment::Index(slot) = Segment::parse(segment) else {
                    return None;
                };
                if items.len() <= slot {
                    items.resize_with(slot + 1, || PathNode::Vacant);
                }
                items.get_mut(slot)
            }
            Self::Vacant | Self::Leaf(_) => None,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Self::Vacant => Value::Null,
            Self::Leaf(scalar) => scalar.into(),
            Self::Sequence(items) => {
                Value::Array(items.into_iter().map(PathNode::into_value).collect())
            }
            Self::Mapping(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, v.into_value()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

/// Rebuilds a nested value from dotted-path form parameters.
///
/// The root is always an object. Array gaps are filled with `null`. Keys
/// that contradict the shape established by an earlier key (a field name
/// under an array, or a path running through a scalar) are dropped, as are
/// keys with an index above [`MAX_ARRAY_INDEX`].
pub fn unflatten(form: &FormMap) -> Value {
    let mut root = PathNode::Mapping(BTreeMap::new());

    'keys: for (key, value) in form {
        let segments: Vec<&str> = key.split(PATH_SEPARATOR).collect();
        if segments
            .iter()
            .any(|segment| Segment::parse(segment) == Segment::OutOfRange)
        {
            warn!(key = %key, max = MAX_ARRAY_INDEX, "form key array index out of range, dropping");
            continue;
        }
        let mut node = &mut root;

        for (depth, segment) in segments.iter().enumerate() {
            let Some(slot) = node.child_mut(segment) else {
                warn!(key = %key, segment = %segment, "form key conflicts with existing shape, dropping");
                continue 'keys;
            };

            match segments.get(depth + 1) {
                None => *slot = PathNode::Leaf(value.clone()),
                Some(next) => {
                    if matches!(slot, PathNode::Vacant) {
                        *slot = PathNode::container_for(next);
                    }
                }
            }
            node = slot;
        }
    }

    root.into_value()
}
