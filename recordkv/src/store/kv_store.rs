use crate::common::{atomic, Atomic, ReadExecutor, WriteExecutor};
use crate::errors::{ErrorKind, RecordError, RecordResult};
use crate::store::{AtomicOperation, Check, CommitResult, KvEntry, KvKey, Mutation};
use std::collections::HashMap;
use std::sync::Arc;

/// Low-level interface of the sorted key-value substrate.
///
/// # Purpose
/// Defines the only two capabilities the record store consumes: a batched
/// multi-get and an all-or-nothing multi-key commit. Everything else about the
/// backend (durability, replication, transport) stays behind this trait.
///
/// # Contract
/// - `get_many` returns exactly one [KvEntry] per requested key, in request order.
/// - `commit` first evaluates every [Check]; if any fails it returns
///   [CommitResult::conflict] and applies nothing. Otherwise it applies every
///   [Mutation] in order under one new versionstamp, and no reader may observe
///   a state where only part of the batch is applied.
///
/// # Implementations
/// - [`InMemoryKvStore`](crate::store::memory::InMemoryKvStore): ordered skip list
///
/// # Thread Safety
/// Implementers must be `Send + Sync` for safe use in concurrent contexts.
pub trait KvStoreProvider: Send + Sync {
    /// Fetches the current value and versionstamp of each key.
    fn get_many(&self, keys: &[KvKey]) -> RecordResult<Vec<KvEntry>>;

    /// Applies a batch atomically.
    fn commit(&self, checks: Vec<Check>, mutations: Vec<Mutation>) -> RecordResult<CommitResult>;

    /// Closes the store; later calls fail with [ErrorKind::StoreAlreadyClosed].
    fn close(&self) -> RecordResult<()>;

    fn is_closed(&self) -> RecordResult<bool>;
}

/// Shared handle to a key-value store.
///
/// Cloning is cheap: all clones share the provider and the registry of
/// collection layouts opened through this handle. Collections never close the
/// store; its owner does.
///
/// # Usage
/// ```text
/// let store = KvStore::new(InMemoryKvStore::new());
/// let users = CollectionBuilder::new(store.clone(), "users")
///     .shape(shape)
///     .index("email")
///     .build()?;
/// ```
#[derive(Clone)]
pub struct KvStore {
    inner: Arc<KvStoreInner>,
}

struct KvStoreInner {
    provider: Arc<dyn KvStoreProvider>,
    collections: Atomic<HashMap<String, Vec<String>>>,
}

impl KvStore {
    /// Creates a new handle wrapping a provider implementation.
    pub fn new<T: KvStoreProvider + 'static>(provider: T) -> Self {
        Self::from_provider(Arc::new(provider))
    }

    /// Creates a new handle over an already shared provider.
    pub fn from_provider(provider: Arc<dyn KvStoreProvider>) -> Self {
        KvStore {
            inner: Arc::new(KvStoreInner {
                provider,
                collections: atomic(HashMap::new()),
            }),
        }
    }

    pub fn provider(&self) -> &Arc<dyn KvStoreProvider> {
        &self.inner.provider
    }

    /// Fetches all `keys` in a single round trip.
    pub fn get_many(&self, keys: &[KvKey]) -> RecordResult<Vec<KvEntry>> {
        let entries = self.inner.provider.get_many(keys)?;
        if entries.len() != keys.len() {
            log::error!(
                "Store returned {} entries for {} keys",
                entries.len(),
                keys.len()
            );
            return Err(RecordError::new(
                "Store returned a mismatched number of entries",
                ErrorKind::BackendError,
            ));
        }
        Ok(entries)
    }

    /// Starts a new atomic batch against this store.
    pub fn atomic(&self) -> AtomicOperation {
        AtomicOperation::new(self.clone())
    }

    pub fn close(&self) -> RecordResult<()> {
        self.inner.provider.close()
    }

    pub fn is_closed(&self) -> RecordResult<bool> {
        self.inner.provider.is_closed()
    }

    /// Records that a collection `name` with the given index layout is in use.
    ///
    /// Opening the same name again with the same indexes is allowed; a
    /// different layout under an existing name is rejected, since both would
    /// share the same physical key namespaces.
    pub fn register_collection(&self, name: &str, indexes: &[String]) -> RecordResult<()> {
        self.inner.collections.write_with(|collections| {
            match collections.get(name) {
                Some(existing) if existing.as_slice() == indexes => Ok(()),
                Some(existing) => {
                    log::error!(
                        "A collection with name {} already exists with indexes {:?}",
                        name,
                        existing
                    );
                    Err(RecordError::new(
                        &format!("A collection named {} already exists with other indexes", name),
                        ErrorKind::CollectionAlreadyExists,
                    ))
                }
                None => {
                    collections.insert(name.to_string(), indexes.to_vec());
                    Ok(())
                }
            }
        })
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.inner
            .collections
            .read_with(|collections| collections.contains_key(name))
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.inner.collections.read_with(|collections| {
            let mut names: Vec<String> = collections.keys().cloned().collect();
            names.sort();
            names
        })
    }
}
