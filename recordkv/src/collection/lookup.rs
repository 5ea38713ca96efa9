use crate::collection::derive_key;
use crate::errors::RecordResult;
use crate::record::Document;
use crate::store::{KvKey, KvStore};

/// A record found by [LookupResolver::resolve], with the key it was read
/// from and the versionstamp of that entry.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedRecord {
    document: Document,
    key: KvKey,
    versionstamp: u64,
}

impl ResolvedRecord {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn key(&self) -> &KvKey {
        &self.key
    }

    pub fn versionstamp(&self) -> u64 {
        self.versionstamp
    }

    pub fn into_document(self) -> Document {
        self.document
    }
}

/// Finds a record of one collection from an index query.
///
/// Each `field: value` pair of the query maps to one index key; all keys are
/// fetched in a single multi-get and the first present entry wins. Query
/// documents keep their fields sorted by name, so when two fields point at
/// different records the one whose field name sorts first wins, whatever
/// order the caller wrote them in.
#[derive(Clone)]
pub struct LookupResolver {
    store: KvStore,
    collection: String,
}

impl LookupResolver {
    pub fn new(store: KvStore, collection: &str) -> Self {
        LookupResolver {
            store,
            collection: collection.to_string(),
        }
    }

    /// Resolves `query` to at most one record.
    ///
    /// A query with no non-null field resolves to `None` without touching the
    /// store. Callers are expected to have dropped fields that are not
    /// indexed. When fields disagree, the entry for the field name that sorts
    /// first is returned and the disagreement is logged.
    pub fn resolve(&self, query: &Document) -> RecordResult<Option<ResolvedRecord>> {
        let keys: Vec<KvKey> = query
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(field, value)| derive_key(&self.collection, field, value))
            .collect();

        if keys.is_empty() {
            log::debug!("Empty query on {}, nothing to resolve", self.collection);
            return Ok(None);
        }

        let entries = self.store.get_many(&keys)?;
        let mut present = entries.into_iter().filter(|entry| entry.is_present());

        let first = match present.next() {
            Some(entry) => entry,
            None => return Ok(None),
        };

        let first_id = first.value().and_then(|doc| doc.id().map(str::to_string));
        for other in present {
            let other_id = other.value().and_then(|doc| doc.id());
            if other_id != first_id.as_deref() {
                log::warn!(
                    "Query on {} matched different records: {} resolves to {:?}, {} resolves to {:?}",
                    self.collection,
                    first.key(),
                    first_id,
                    other.key(),
                    other_id
                );
            }
        }

        let key = first.key().clone();
        let versionstamp = first.versionstamp().unwrap_or_default();
        Ok(first.into_value().map(|document| ResolvedRecord {
            document,
            key,
            versionstamp,
        }))
    }
}
