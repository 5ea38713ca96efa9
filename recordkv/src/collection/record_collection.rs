use crate::collection::{
    materialize_new, materialize_update, CollectionOptions, IndexOp, IndexWriter, LookupResolver,
};
use crate::common::{current_time_millis, CREATED_AT_FIELD, ID_FIELD, SYSTEM_FIELDS, UPDATED_AT_FIELD};
use crate::errors::{ErrorKind, RecordError, RecordResult};
use crate::record::Document;
use crate::schema::{FieldDescriptor, Shape};
use crate::store::{Check, CommitResult, KvKey, KvStore};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A named set of schema-validated records reachable through several indexes.
///
/// # Purpose
/// Every record is stored once per indexed field, under the key derived from
/// that field's value, and all copies are written or erased in one atomic
/// commit. Any indexed field can then locate the whole record with a single
/// point read.
///
/// # Characteristics
/// - **Validated**: inputs, patches and queries are checked against the shape
///   before the store is touched
/// - **Atomic**: each write is one commit; a refused commit changes nothing
/// - **Absence is a value**: a query that matches nothing yields `Ok(None)`
/// - **Thread-safe**: cloning is cheap and clones share the same state
///
/// # Usage
/// ```rust
/// use recordkv::collection::CollectionBuilder;
/// use recordkv::doc;
/// use recordkv::schema::{FieldDescriptor, Shape};
/// use recordkv::store::{memory::InMemoryKvStore, KvStore};
///
/// let store = KvStore::new(InMemoryKvStore::new());
/// let users = CollectionBuilder::new(store, "users")
///     .shape(Shape::new(vec![
///         FieldDescriptor::string("email").email(),
///         FieldDescriptor::string("username"),
///     ]))
///     .indexes(&["email", "username"])
///     .build()
///     .unwrap();
///
/// let result = users.create(&doc! { email: "a@b.com", username: "a" }).unwrap();
/// assert!(result.ok);
///
/// let found = users.find_one(&doc! { username: "a" }).unwrap().unwrap();
/// assert_eq!(users.find_by_id(found.id().unwrap()).unwrap(), Some(found));
/// ```
#[derive(Clone)]
pub struct RecordCollection {
    /// Arc-wrapped internal implementation
    inner: Arc<RecordCollectionInner>,
}

impl RecordCollection {
    pub(crate) fn new(store: KvStore, shape: Shape, options: CollectionOptions) -> Self {
        RecordCollection {
            inner: Arc::new(RecordCollectionInner::new(store, shape, options)),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.options.name()
    }

    /// Indexed fields in declaration order, `id` last unless declared.
    pub fn indexes(&self) -> &[String] {
        self.inner.options.indexes()
    }

    /// Shape of the caller-provided part of a record.
    pub fn shape(&self) -> &Shape {
        &self.inner.input_shape
    }

    /// Shape of a persisted record: the input shape plus the system fields.
    pub fn record_shape(&self) -> &Shape {
        &self.inner.record_shape
    }

    pub fn options(&self) -> &CollectionOptions {
        &self.inner.options
    }

    pub fn store(&self) -> &KvStore {
        &self.inner.store
    }

    /// Validates `input`, assigns identity and timestamps, and writes the
    /// record under every index in one commit.
    ///
    /// # Errors
    /// Validation errors, raised before the store is touched, and store
    /// failures.
    pub fn create(&self, input: &Document) -> RecordResult<CommitResult> {
        self.inner.create(input)
    }

    /// Finds the record matched by any of the query's indexed fields.
    ///
    /// Fields that are not indexed are ignored, so a query without any
    /// indexed field finds nothing. When indexed fields point at different
    /// records, the field whose name sorts first wins; the order the caller
    /// wrote the fields in does not matter.
    ///
    /// # Errors
    /// A validation error if an indexed query value does not fit its field.
    pub fn find_one(&self, query: &Document) -> RecordResult<Option<Document>> {
        self.inner.find_one(query)
    }

    pub fn find_by_id(&self, id: &str) -> RecordResult<Option<Document>> {
        self.inner.find_one(&id_query(id)?)
    }

    /// Deep-merges `patch` into the record matched by `query`.
    ///
    /// Returns `Ok(None)` when no record matches. `id`, `createdAt` and
    /// `updatedAt` cannot be patched.
    pub fn update_one(&self, query: &Document, patch: &Document) -> RecordResult<Option<CommitResult>> {
        self.inner.update_one(query, patch)
    }

    pub fn update_by_id(&self, id: &str, patch: &Document) -> RecordResult<Option<CommitResult>> {
        self.inner.update_one(&id_query(id)?, patch)
    }

    /// Erases every index copy of the record matched by `query`.
    ///
    /// Returns `Ok(None)` when no record matches.
    pub fn delete_one(&self, query: &Document) -> RecordResult<Option<CommitResult>> {
        self.inner.delete_one(query)
    }

    pub fn delete_by_id(&self, id: &str) -> RecordResult<Option<CommitResult>> {
        self.inner.delete_one(&id_query(id)?)
    }
}

impl Debug for RecordCollection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCollection")
            .field("name", &self.name())
            .field("indexes", &self.indexes())
            .finish()
    }
}

fn id_query(id: &str) -> RecordResult<Document> {
    let mut query = Document::new();
    query.put(ID_FIELD, id)?;
    Ok(query)
}

struct RecordCollectionInner {
    store: KvStore,
    options: CollectionOptions,
    input_shape: Shape,
    patch_shape: Shape,
    query_shape: Shape,
    record_shape: Shape,
    writer: IndexWriter,
    resolver: LookupResolver,
}

impl RecordCollectionInner {
    fn new(store: KvStore, shape: Shape, options: CollectionOptions) -> Self {
        let id_field = FieldDescriptor::string(ID_FIELD).uuid();
        let record_shape = shape.extend([
            id_field.clone(),
            FieldDescriptor::integer(CREATED_AT_FIELD),
            FieldDescriptor::integer(UPDATED_AT_FIELD),
        ]);

        RecordCollectionInner {
            writer: IndexWriter::new(store.clone(), options.name(), options.indexes().to_vec()),
            resolver: LookupResolver::new(store.clone(), options.name()),
            patch_shape: shape.partial(),
            query_shape: shape.extend([id_field]).partial(),
            input_shape: shape,
            record_shape,
            options,
            store,
        }
    }

    fn create(&self, input: &Document) -> RecordResult<CommitResult> {
        let validated = self.input_shape.parse(input)?;
        let record = materialize_new(&validated, current_time_millis())?;

        let guard = if self.options.optimistic_concurrency() {
            self.writer.identity_key(&record).map(|key| Check {
                key,
                versionstamp: None,
            })
        } else {
            None
        };

        log::debug!("Creating record {:?} in {}", record.id(), self.options.name());
        self.writer.apply_across_indexes(&record, IndexOp::Write, guard)
    }

    fn find_one(&self, query: &Document) -> RecordResult<Option<Document>> {
        let query = self.validate_query(query)?;
        let resolved = self.resolver.resolve(&query)?;
        Ok(resolved.map(|record| record.into_document()))
    }

    fn update_one(&self, query: &Document, patch: &Document) -> RecordResult<Option<CommitResult>> {
        if let Some(field) = SYSTEM_FIELDS.iter().find(|f| patch.contains_key(f)) {
            log::error!("Attempt to patch system field {} in {}", field, self.options.name());
            return Err(RecordError::field_error(
                field,
                "is maintained by the collection and cannot be updated",
                ErrorKind::InvalidOperation,
            ));
        }
        let patch = self.patch_shape.parse(patch)?;
        let query = self.validate_query(query)?;

        let resolved = match self.resolver.resolve(&query)? {
            Some(resolved) => resolved,
            None => {
                log::debug!("No record of {} matches {}", self.options.name(), query);
                return Ok(None);
            }
        };

        let next = materialize_update(resolved.document(), &patch, current_time_millis())?;
        let next = self.record_shape.parse(&next)?;
        let guard = self.guard_for(resolved.key(), resolved.versionstamp());

        log::debug!("Updating record {:?} in {}", next.id(), self.options.name());
        let result = if self.options.cleanup_stale_indexes() {
            self.writer
                .rewrite_across_indexes(resolved.document(), &next, guard)?
        } else {
            self.writer
                .apply_across_indexes(&next, IndexOp::Write, guard)?
        };
        Ok(Some(result))
    }

    fn delete_one(&self, query: &Document) -> RecordResult<Option<CommitResult>> {
        let query = self.validate_query(query)?;
        let resolved = match self.resolver.resolve(&query)? {
            Some(resolved) => resolved,
            None => {
                log::debug!("No record of {} matches {}", self.options.name(), query);
                return Ok(None);
            }
        };

        let guard = self.guard_for(resolved.key(), resolved.versionstamp());
        log::debug!(
            "Deleting record {:?} from {}",
            resolved.document().id(),
            self.options.name()
        );
        let result = self
            .writer
            .apply_across_indexes(resolved.document(), IndexOp::Erase, guard)?;
        Ok(Some(result))
    }

    // fields without an index cannot locate a record and are left out
    fn validate_query(&self, query: &Document) -> RecordResult<Document> {
        let indexes = self.options.indexes();
        let mut indexed = Document::new();
        for (field, value) in query.iter() {
            if indexes.contains(field) {
                indexed.put(field.as_str(), value.clone())?;
            } else {
                log::debug!(
                    "Ignoring unindexed field {} in query on {}",
                    field,
                    self.options.name()
                );
            }
        }
        self.query_shape.parse(&indexed)
    }

    fn guard_for(&self, key: &KvKey, versionstamp: u64) -> Option<Check> {
        if self.options.optimistic_concurrency() {
            Some(Check {
                key: key.clone(),
                versionstamp: Some(versionstamp),
            })
        } else {
            None
        }
    }
}
