use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Ordered set of structured fields attached to a record or bound to a
/// [`Logger`](crate::logger::Logger).
///
/// Insertion order is preserved. Re-inserting an existing key replaces
/// its value but keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Fields(Map<String, Value>);

impl Fields {
    pub fn new() -> Self {
        Fields(Map::new())
    }

    /// Builder form of [`Fields::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Store a timestamp as Unix seconds.
    pub fn with_timestamp(self, key: impl Into<String>, at: DateTime<Utc>) -> Self {
        self.with(key, at.timestamp())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overlay `other` on top of `self`: keys from `other` win, keys already
    /// present keep their position.
    pub fn merge(&mut self, other: &Fields) {
        for (key, value) in other.0.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Copy of `self` overlaid with `other`.
    pub fn merged(&self, other: &Fields) -> Fields {
        let mut out = self.clone();
        out.merge(other);
        out
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Fields
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

impl From<Map<String, Value>> for Fields {
    fn from(map: Map<String, Value>) -> Self {
        Fields(map)
    }
}

impl From<()> for Fields {
    fn from(_: ()) -> Self {
        Fields::new()
    }
}

/// Build [`Fields`] from `key => value` pairs of mixed value types.
///
/// ```
/// let f = strucdbg::fields! { "step" => 2, "ev" => "processing" };
/// assert_eq!(f.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::fields::Fields::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::fields::Fields::new()$(.with($key, $value))+
    };
}
