use crate::errors::{ErrorKind, RecordError, RecordResult};
use crate::record::Document;
use crate::store::{Check, CommitResult, KvEntry, KvKey, KvStoreProvider, Mutation};
use crossbeam_skiplist::SkipMap;
use parking_lot::RwLock;
use std::ops::Bound::{Included, Unbounded};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Clone)]
struct VersionedValue {
    document: Document,
    versionstamp: u64,
}

/// In-memory implementation of the sorted key-value store.
///
/// # Purpose
/// `InMemoryKvStore` keeps every entry in a concurrent skip list ordered by
/// [KvKey]. It is the store used by tests and by embedders that do not need
/// persistence.
///
/// # Characteristics
/// - **Ordered**: entries sort by namespace, then value
/// - **Atomic commits**: a commit holds the exclusive side of a store-wide
///   lock while it checks and applies its batch; `get_many` holds the shared
///   side, so a half-applied batch is never observed
/// - **Versioned**: a global, monotonically increasing versionstamp is assigned
///   to each commit and stored with every key it wrote
/// - **No Persistence**: all data is lost when the store is dropped or closed
///
/// # Usage
/// ```text
/// let memory = InMemoryKvStore::new();
/// let store = KvStore::new(memory.clone());
/// // ... use the store ...
/// assert_eq!(memory.namespace_len("users_by_id"), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryKvStore {
    inner: Arc<InMemoryKvStoreInner>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        InMemoryKvStore {
            inner: Arc::new(InMemoryKvStoreInner::default()),
        }
    }

    /// Total number of entries across all namespaces.
    pub fn len(&self) -> usize {
        self.inner.backing_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.backing_map.is_empty()
    }

    /// Number of entries under one key namespace.
    pub fn namespace_len(&self, namespace: &str) -> usize {
        self.inner.entries_in(namespace).len()
    }

    /// Entries under one key namespace, in key order.
    pub fn entries_in(&self, namespace: &str) -> Vec<(KvKey, Document)> {
        self.inner.entries_in(namespace)
    }

    /// The latest versionstamp handed out by a commit.
    pub fn current_versionstamp(&self) -> u64 {
        self.inner.versionstamp.load(Ordering::SeqCst)
    }
}

impl KvStoreProvider for InMemoryKvStore {
    fn get_many(&self, keys: &[KvKey]) -> RecordResult<Vec<KvEntry>> {
        self.inner.get_many(keys)
    }

    fn commit(&self, checks: Vec<Check>, mutations: Vec<Mutation>) -> RecordResult<CommitResult> {
        self.inner.commit(checks, mutations)
    }

    fn close(&self) -> RecordResult<()> {
        self.inner.close()
    }

    fn is_closed(&self) -> RecordResult<bool> {
        Ok(self.inner.closed.load(Ordering::Relaxed))
    }
}

#[derive(Default)]
struct InMemoryKvStoreInner {
    backing_map: SkipMap<KvKey, VersionedValue>,
    commit_lock: RwLock<()>,
    versionstamp: AtomicU64,
    closed: AtomicBool,
}

impl InMemoryKvStoreInner {
    fn check_opened(&self) -> RecordResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            log::error!("In-memory store is closed");
            return Err(RecordError::new(
                "In-memory store is closed",
                ErrorKind::StoreAlreadyClosed,
            ));
        }
        Ok(())
    }

    fn get_many(&self, keys: &[KvKey]) -> RecordResult<Vec<KvEntry>> {
        self.check_opened()?;
        let _read_guard = self.commit_lock.read();

        Ok(keys
            .iter()
            .map(|key| match self.backing_map.get(key) {
                Some(entry) => {
                    let stored = entry.value();
                    KvEntry::present(key.clone(), stored.document.clone(), stored.versionstamp)
                }
                None => KvEntry::absent(key.clone()),
            })
            .collect())
    }

    fn commit(&self, checks: Vec<Check>, mutations: Vec<Mutation>) -> RecordResult<CommitResult> {
        self.check_opened()?;
        let _write_guard = self.commit_lock.write();

        for check in &checks {
            let current = self
                .backing_map
                .get(&check.key)
                .map(|entry| entry.value().versionstamp);
            if current != check.versionstamp {
                log::debug!(
                    "Check failed on {}: expected {:?}, found {:?}",
                    check.key,
                    check.versionstamp,
                    current
                );
                return Ok(CommitResult::conflict());
            }
        }

        let versionstamp = self.versionstamp.fetch_add(1, Ordering::SeqCst) + 1;
        for mutation in mutations {
            match mutation {
                Mutation::Set(key, document) => {
                    self.backing_map.insert(
                        key,
                        VersionedValue {
                            document,
                            versionstamp,
                        },
                    );
                }
                Mutation::Delete(key) => {
                    self.backing_map.remove(&key);
                }
            }
        }

        Ok(CommitResult::committed(versionstamp))
    }

    fn entries_in(&self, namespace: &str) -> Vec<(KvKey, Document)> {
        let _read_guard = self.commit_lock.read();
        let start = KvKey::new(namespace, "");
        self.backing_map
            .range((Included(start), Unbounded))
            .take_while(|entry| entry.key().namespace() == namespace)
            .map(|entry| (entry.key().clone(), entry.value().document.clone()))
            .collect()
    }

    fn close(&self) -> RecordResult<()> {
        let _write_guard = self.commit_lock.write();
        self.backing_map.clear();
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}
