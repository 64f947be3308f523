//! The fact — the single working-memory record the deliberation cycle
//! reasons over.
//!
//! Attributes are addressed either by an explicit name or by an implicit
//! positional index. Values are plain JSON values.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Key of a fact attribute.
///
/// Ordering puts every named key before every positional key, so
/// enumeration of a [`Fact`] is deterministic.
///
/// Text of the form `#N` always means a positional key, whether it comes
/// from [`FactKey::name`], a `From` conversion or deserialization, so a name
/// never collides with an index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum FactKey {
    /// An explicit attribute name, e.g. `state`.
    Name(String),
    /// An implicit positional index, rendered as `#N`.
    Index(u64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawKey {
    Index(u64),
    Text(String),
}

impl<'de> Deserialize<'de> for FactKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawKey::deserialize(deserializer)? {
            RawKey::Index(idx) => FactKey::Index(idx),
            RawKey::Text(text) => FactKey::from(text),
        })
    }
}

impl FactKey {
    /// Key from text. `#N` yields [`FactKey::Index`].
    pub fn name(name: impl Into<String>) -> Self {
        FactKey::from(name.into())
    }

    /// Parse the textual form used in configuration: `#N` is positional,
    /// anything else is a name.
    pub fn parse(s: &str) -> Self {
        match positional(s) {
            Some(idx) => FactKey::Index(idx),
            None => FactKey::Name(s.to_string()),
        }
    }

    pub fn as_index(&self) -> Option<u64> {
        match self {
            FactKey::Index(i) => Some(*i),
            FactKey::Name(_) => None,
        }
    }
}

impl fmt::Display for FactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactKey::Name(name) => f.write_str(name),
            FactKey::Index(idx) => write!(f, "#{idx}"),
        }
    }
}

fn positional(s: &str) -> Option<u64> {
    s.strip_prefix('#').and_then(|n| n.parse::<u64>().ok())
}

impl From<&str> for FactKey {
    fn from(s: &str) -> Self {
        FactKey::parse(s)
    }
}

impl From<String> for FactKey {
    fn from(s: String) -> Self {
        match positional(&s) {
            Some(idx) => FactKey::Index(idx),
            None => FactKey::Name(s),
        }
    }
}

impl From<u64> for FactKey {
    fn from(idx: u64) -> Self {
        FactKey::Index(idx)
    }
}

/// A mutable record of named and positional attributes.
///
/// A `Fact` on its own is plain data. The one tracked by the engine lives
/// inside [`WorkingMemory`](crate::memory::WorkingMemory), which is the only
/// way to mutate it and keeps the rule matcher in sync.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fact {
    attributes: BTreeMap<FactKey, Value>,
}

impl Fact {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for constructing fixtures.
    pub fn with(mut self, key: impl Into<FactKey>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &FactKey) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Look up an attribute by its textual key (`state`, `#0`).
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        self.attributes.get(&FactKey::parse(name))
    }

    pub fn contains(&self, key: &FactKey) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FactKey, &Value)> {
        self.attributes.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &FactKey> {
        self.attributes.keys()
    }

    /// Largest positional index currently present.
    pub fn max_index(&self) -> Option<u64> {
        self.attributes.keys().filter_map(FactKey::as_index).max()
    }

    /// The index a keyless insert lands on: one past the largest positional
    /// index present, or `0` when there is none.
    ///
    /// This is not a counter. Removing the highest index makes it available
    /// again.
    pub fn next_index(&self) -> u64 {
        self.max_index().map_or(0, |max| max + 1)
    }

    /// Insert or overwrite an attribute, returning the previous value.
    pub fn insert(&mut self, key: FactKey, value: Value) -> Option<Value> {
        self.attributes.insert(key, value)
    }

    /// Remove an attribute, returning its value if present.
    pub fn remove(&mut self, key: &FactKey) -> Option<Value> {
        self.attributes.remove(key)
    }

    /// Render as a JSON object. Positional keys appear as `"#N"`.
    pub fn to_json(&self) -> Value {
        let map = self
            .attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<serde_json::Map<_, _>>();
        Value::Object(map)
    }
}

impl<K: Into<FactKey>, V: Into<Value>> FromIterator<(K, V)> for Fact {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            attributes: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
