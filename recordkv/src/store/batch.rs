use crate::errors::RecordResult;
use crate::record::Document;
use crate::store::{KvKey, KvStore};

/// A precondition of an atomic commit: `key` must still carry
/// `versionstamp` (`None` meaning the key must be absent).
#[derive(Clone, Debug, PartialEq)]
pub struct Check {
    pub key: KvKey,
    pub versionstamp: Option<u64>,
}

/// A staged write of an atomic commit.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    Set(KvKey, Document),
    Delete(KvKey),
}

impl Mutation {
    pub fn key(&self) -> &KvKey {
        match self {
            Mutation::Set(key, _) | Mutation::Delete(key) => key,
        }
    }
}

/// Outcome of an atomic commit.
///
/// A refused commit (`ok == false`) is an ordinary result, not an error:
/// none of the staged mutations were applied and the caller may retry the
/// whole read-modify-write sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitResult {
    pub ok: bool,
    /// Version assigned to every key written by the commit.
    pub versionstamp: Option<u64>,
}

impl CommitResult {
    pub fn committed(versionstamp: u64) -> Self {
        CommitResult {
            ok: true,
            versionstamp: Some(versionstamp),
        }
    }

    pub fn conflict() -> Self {
        CommitResult {
            ok: false,
            versionstamp: None,
        }
    }
}

/// Builder of one atomic multi-key commit.
///
/// Operations are staged in order and sent to the store in a single
/// [`commit`](AtomicOperation::commit) that applies all of them or none.
///
/// # Usage
/// ```text
/// let result = store
///     .atomic()
///     .check(KvKey::new("users_by_id", id), Some(seen))
///     .set(KvKey::new("users_by_id", id), record.clone())
///     .delete(KvKey::new("users_by_email", old_email))
///     .commit()?;
/// ```
pub struct AtomicOperation {
    store: KvStore,
    checks: Vec<Check>,
    mutations: Vec<Mutation>,
}

impl AtomicOperation {
    pub(crate) fn new(store: KvStore) -> Self {
        AtomicOperation {
            store,
            checks: Vec::new(),
            mutations: Vec::new(),
        }
    }

    pub fn check(mut self, key: KvKey, versionstamp: Option<u64>) -> Self {
        self.checks.push(Check { key, versionstamp });
        self
    }

    pub fn set(mut self, key: KvKey, value: Document) -> Self {
        self.mutations.push(Mutation::Set(key, value));
        self
    }

    pub fn delete(mut self, key: KvKey) -> Self {
        self.mutations.push(Mutation::Delete(key));
        self
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Number of staged mutations.
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Sends every staged check and mutation to the store in one round trip.
    pub fn commit(self) -> RecordResult<CommitResult> {
        log::debug!(
            "Committing {} mutation(s) with {} check(s)",
            self.mutations.len(),
            self.checks.len()
        );
        let result = self.store.provider().commit(self.checks, self.mutations)?;
        if !result.ok {
            log::warn!("Atomic commit refused by the store");
        }
        Ok(result)
    }
}
