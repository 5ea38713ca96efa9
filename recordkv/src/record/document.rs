use im::OrdMap;

use crate::common::{Value, CREATED_AT_FIELD, FIELD_SEPARATOR, ID_FIELD, UPDATED_AT_FIELD};
use crate::errors::{ErrorKind, RecordError, RecordResult};
use itertools::Itertools;
use std::fmt::{Debug, Display};

/// A record: an ordered mapping from field name to [Value].
///
/// The same type carries user input, validated candidates, query filters,
/// patches and the fully materialized record persisted under every index key.
///
/// ## Lock-Free Design
///
/// Backed by `im::OrdMap` (a persistent ordered map):
/// - O(1) cloning via internal Arc sharing, so staging one copy per index is cheap
/// - Mutations create new maps via structural sharing
/// - Each mutated document is completely independent
#[derive(Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Document {
    data: OrdMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            data: OrdMap::new(),
        }
    }

    /// Checks if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Associates the specified [Value] with the specified top level key.
    ///
    /// # Errors
    ///
    /// Returns [ErrorKind::InvalidFieldName] if the key is empty.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let mut doc = Document::new();
    /// doc.put("email", "a@b.com")?;
    /// doc.put("age", 30)?;
    /// assert_eq!(doc.size(), 2);
    /// ```
    pub fn put<T: Into<Value>>(&mut self, key: impl Into<String>, value: T) -> RecordResult<()> {
        let key = key.into();
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(RecordError::new(
                "Document does not support empty key",
                ErrorKind::InvalidFieldName,
            ));
        }
        self.data.insert(key, value.into());
        Ok(())
    }

    /// Returns the value of a top level key, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Returns the value at a dot separated path such as `address.zip`.
    ///
    /// Each intermediate segment must hold a nested document; arrays are not
    /// traversed.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split(FIELD_SEPARATOR);
        let first = segments.next()?;
        let mut current = self.data.get(first)?;
        for segment in segments {
            current = current.as_document()?.data.get(segment)?;
        }
        Some(current)
    }

    /// Removes a top level key, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Checks if a top level key exists in the document.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Top level field names in key order.
    pub fn keys(&self) -> impl Iterator<Item = &String> + '_ {
        self.data.keys()
    }

    /// Top level entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> + '_ {
        self.data.iter()
    }

    /// Returns the number of top level entries.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// The record identity, when the document carries one.
    pub fn id(&self) -> Option<&str> {
        self.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Creation timestamp in epoch milliseconds.
    pub fn created_at(&self) -> Option<i64> {
        self.get(CREATED_AT_FIELD).and_then(Value::as_i64).copied()
    }

    /// Last write timestamp in epoch milliseconds.
    pub fn updated_at(&self) -> Option<i64> {
        self.get(UPDATED_AT_FIELD).and_then(Value::as_i64).copied()
    }

    /// Returns a new document with `patch` deep-merged onto this one.
    ///
    /// Patch fields overwrite existing ones. When both sides hold a nested
    /// document the two are merged key-wise, recursively. Arrays and every
    /// other value replace the existing value wholesale.
    ///
    /// ```ignore
    /// let base = doc!{ "name": "Alice", "address": { "city": "Paris", "zip": 75001 } };
    /// let patch = doc!{ "address": { "zip": 75002 } };
    /// let merged = base.merge(&patch);
    /// assert_eq!(merged.get_path("address.city"), Some(&Value::from("Paris")));
    /// assert_eq!(merged.get_path("address.zip"), Some(&Value::from(75002)));
    /// ```
    pub fn merge(&self, patch: &Document) -> Document {
        let mut merged = self.clone();
        for (key, value) in patch.data.iter() {
            let next = match (merged.data.get(key), value) {
                (Some(Value::Document(existing)), Value::Document(nested)) => {
                    Value::Document(existing.merge(nested))
                }
                _ => value.clone(),
            };
            merged.data.insert(key.clone(), next);
        }
        merged
    }

    pub(crate) fn to_json(&self) -> String {
        Value::Document(self.clone()).to_json()
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.data
                .iter()
                .map(|(key, value)| format!("{:?}: {:?}", key, value))
                .join(", ")
        )
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Document {
            data: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .filter(|(key, _)| !key.is_empty())
                .collect(),
        }
    }
}

pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a [Document] with JSON-like syntax.
///
/// # Examples
///
/// ```rust
/// use recordkv::doc;
///
/// let empty = doc!{};
///
/// let user = doc!{
///     email: "a@b.com",
///     "username": "a",
///     address: { city: "Paris" },
///     tags: ["x", "y"]
/// };
/// assert_eq!(user.size(), 4);
/// ```
#[macro_export]
macro_rules! doc {
    // match an empty document (with braces for backward compat)
    ({}) => {
        $crate::record::Document::new()
    };

    // match an empty document
    () => {
        $crate::record::Document::new()
    };

    // match a document with outer braces
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::doc!($($key : $value),*)
    };

    // match a document with key value pairs
    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut doc = $crate::record::Document::new();
            $(
                doc.put($crate::record::normalize(stringify!($key)), $crate::doc_value!($value))
                .expect(&format!("Failed to put value {} in document", stringify!($value)));
            )*
            doc
        }
    };
}

/// Helper macro to convert values for the doc! macro.
#[macro_export]
macro_rules! doc_value {
    // match a nested document
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        {
            $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
        }
    };

    // match an array of values
    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    // match an expression
    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
