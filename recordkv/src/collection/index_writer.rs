use crate::collection::derive_key;
use crate::common::ID_FIELD;
use crate::errors::RecordResult;
use crate::record::Document;
use crate::store::{AtomicOperation, Check, CommitResult, KvKey, KvStore};
use smallvec::SmallVec;
use std::sync::Arc;

/// Index keys of one record; most collections declare only a few indexes.
pub type IndexKeys = SmallVec<[KvKey; 4]>;

/// What to stage for every index copy of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexOp {
    /// Store the record under each of its index keys.
    Write,
    /// Remove each of its index keys.
    Erase,
}

/// Stages the full set of index copies of a record into one atomic commit.
///
/// A record lives under one key per declared index field whose value is
/// present, the identity index included. Every write path of a collection
/// goes through this writer, so the copies of a record are always written or
/// erased together.
#[derive(Clone)]
pub struct IndexWriter {
    /// Arc-wrapped internal implementation
    inner: Arc<IndexWriterInner>,
}

impl IndexWriter {
    /// Creates a writer for `collection` with the given index fields.
    pub fn new(store: KvStore, collection: &str, indexes: Vec<String>) -> Self {
        IndexWriter {
            inner: Arc::new(IndexWriterInner {
                store,
                collection: collection.to_string(),
                indexes,
            }),
        }
    }

    pub fn indexes(&self) -> &[String] {
        &self.inner.indexes
    }

    /// Key of the record in the identity index, if it has an id.
    pub fn identity_key(&self, record: &Document) -> Option<KvKey> {
        self.inner.key_for(record, ID_FIELD)
    }

    /// Index keys under which `record` is stored, in index declaration order.
    ///
    /// Index fields that are absent or null in the record have no key.
    pub fn index_keys(&self, record: &Document) -> IndexKeys {
        self.inner
            .indexes
            .iter()
            .filter_map(|field| self.inner.key_for(record, field))
            .collect()
    }

    /// Writes or erases every index copy of `record` in one commit.
    ///
    /// # Arguments
    /// * `record` - The fully materialized record
    /// * `op` - Whether to set or delete the copies
    /// * `guard` - Optional precondition staged before the mutations
    ///
    /// # Returns
    /// The commit result; `ok == false` means the guard failed and nothing
    /// was applied.
    pub fn apply_across_indexes(
        &self,
        record: &Document,
        op: IndexOp,
        guard: Option<Check>,
    ) -> RecordResult<CommitResult> {
        self.inner.apply_across_indexes(record, op, guard)
    }

    /// Replaces `previous` with `next` in one commit.
    ///
    /// Every index copy of `next` is set. An index key of `previous` that
    /// `next` no longer has is deleted in the same commit, so a changed index
    /// value does not leave the old copy behind.
    pub fn rewrite_across_indexes(
        &self,
        previous: &Document,
        next: &Document,
        guard: Option<Check>,
    ) -> RecordResult<CommitResult> {
        self.inner.rewrite_across_indexes(previous, next, guard)
    }
}

struct IndexWriterInner {
    store: KvStore,
    collection: String,
    indexes: Vec<String>,
}

impl IndexWriterInner {
    fn key_for(&self, record: &Document, field: &str) -> Option<KvKey> {
        match record.get(field) {
            Some(value) if !value.is_null() => Some(derive_key(&self.collection, field, value)),
            _ => None,
        }
    }

    fn begin(&self, guard: Option<Check>) -> AtomicOperation {
        let operation = self.store.atomic();
        match guard {
            Some(check) => operation.check(check.key, check.versionstamp),
            None => operation,
        }
    }

    fn apply_across_indexes(
        &self,
        record: &Document,
        op: IndexOp,
        guard: Option<Check>,
    ) -> RecordResult<CommitResult> {
        let mut operation = self.begin(guard);
        for field in &self.indexes {
            match self.key_for(record, field) {
                Some(key) => {
                    operation = match op {
                        IndexOp::Write => operation.set(key, record.clone()),
                        IndexOp::Erase => operation.delete(key),
                    };
                }
                None => {
                    log::debug!(
                        "Record of {} has no value for index field {}, skipping",
                        self.collection,
                        field
                    );
                }
            }
        }
        operation.commit()
    }

    fn rewrite_across_indexes(
        &self,
        previous: &Document,
        next: &Document,
        guard: Option<Check>,
    ) -> RecordResult<CommitResult> {
        let mut operation = self.begin(guard);
        for field in &self.indexes {
            let old_key = self.key_for(previous, field);
            let new_key = self.key_for(next, field);

            if let Some(old_key) = old_key {
                if new_key.as_ref() != Some(&old_key) {
                    log::debug!("Removing stale index entry {}", old_key);
                    operation = operation.delete(old_key);
                }
            }
            if let Some(new_key) = new_key {
                operation = operation.set(new_key, next.clone());
            }
        }
        operation.commit()
    }
}
