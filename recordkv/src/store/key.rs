use crate::record::Document;
use std::fmt::{Display, Formatter};

/// A physical key of the sorted key-value store.
///
/// Keys are two-part composites ordered by `namespace` first and `value`
/// second, the way a tuple key `[namespace, value]` sorts.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct KvKey {
    namespace: String,
    value: String,
}

impl KvKey {
    pub fn new(namespace: impl Into<String>, value: impl Into<String>) -> Self {
        KvKey {
            namespace: namespace.into(),
            value: value.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Display for KvKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}, {:?}]", self.namespace, self.value)
    }
}

/// One result of [`get_many`](crate::store::KvStoreProvider::get_many).
///
/// An absent key yields an entry with neither value nor versionstamp.
#[derive(Clone, Debug, PartialEq)]
pub struct KvEntry {
    key: KvKey,
    value: Option<Document>,
    versionstamp: Option<u64>,
}

impl KvEntry {
    pub fn present(key: KvKey, value: Document, versionstamp: u64) -> Self {
        KvEntry {
            key,
            value: Some(value),
            versionstamp: Some(versionstamp),
        }
    }

    pub fn absent(key: KvKey) -> Self {
        KvEntry {
            key,
            value: None,
            versionstamp: None,
        }
    }

    pub fn key(&self) -> &KvKey {
        &self.key
    }

    pub fn value(&self) -> Option<&Document> {
        self.value.as_ref()
    }

    /// Version of the commit that last wrote this key.
    pub fn versionstamp(&self) -> Option<u64> {
        self.versionstamp
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    pub fn into_value(self) -> Option<Document> {
        self.value
    }
}
