use crate::collection::RecordCollection;
use crate::common::{ID_FIELD, INDEX_SEPARATOR, SYSTEM_FIELDS};
use crate::errors::{ErrorKind, RecordError, RecordResult};
use crate::schema::Shape;
use crate::store::KvStore;
use itertools::Itertools;

/// Resolved configuration of a [RecordCollection].
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionOptions {
    name: String,
    indexes: Vec<String>,
    cleanup_stale_indexes: bool,
    optimistic_concurrency: bool,
}

impl CollectionOptions {
    /// Collection name; also the prefix of every key namespace it owns.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Indexed fields in declaration order, `id` included.
    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }

    /// Whether updates delete index entries whose value changed.
    pub fn cleanup_stale_indexes(&self) -> bool {
        self.cleanup_stale_indexes
    }

    /// Whether writes are guarded by the versionstamp read before them.
    pub fn optimistic_concurrency(&self) -> bool {
        self.optimistic_concurrency
    }
}

/// Builder for opening a [RecordCollection] over a [KvStore].
///
/// `CollectionBuilder` follows the builder pattern and captures the first
/// configuration error, which is returned by [`build`](Self::build).
///
/// # Examples
///
/// ```rust
/// use recordkv::collection::CollectionBuilder;
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
/// assert_eq!(users.indexes(), &["email", "username", "id"]);
/// ```
pub struct CollectionBuilder {
    store: KvStore,
    name: String,
    shape: Shape,
    indexes: Vec<String>,
    cleanup_stale_indexes: bool,
    optimistic_concurrency: bool,
    error: Option<RecordError>,
}

impl CollectionBuilder {
    /// Starts configuring the collection `name` over `store`.
    ///
    /// Defaults: an empty shape, only the `id` index, stale index cleanup on
    /// and optimistic concurrency off.
    pub fn new(store: KvStore, name: &str) -> Self {
        CollectionBuilder {
            store,
            name: name.to_string(),
            shape: Shape::default(),
            indexes: Vec::new(),
            cleanup_stale_indexes: true,
            optimistic_concurrency: false,
            error: None,
        }
    }

    /// Sets the shape of the caller-provided part of every record.
    pub fn shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    /// Declares one indexed field.
    ///
    /// # Errors
    ///
    /// An empty field name is captured and returned by `build()`.
    pub fn index(mut self, field: &str) -> Self {
        if self.error.is_none() && field.is_empty() {
            log::error!("Index field name cannot be empty");
            self.error = Some(RecordError::new(
                "Index field name cannot be empty",
                ErrorKind::InvalidFieldName,
            ));
        }
        self.indexes.push(field.to_string());
        self
    }

    /// Declares several indexed fields, in order.
    pub fn indexes<S: AsRef<str>>(self, fields: &[S]) -> Self {
        fields
            .iter()
            .fold(self, |builder, field| builder.index(field.as_ref()))
    }

    /// Enables or disables deleting index entries whose value changed on
    /// update. Enabled by default.
    ///
    /// With cleanup disabled, an update that changes an indexed value leaves
    /// the old entry holding the previous version of the record.
    pub fn cleanup_stale_indexes(mut self, enabled: bool) -> Self {
        self.cleanup_stale_indexes = enabled;
        self
    }

    /// Enables or disables optimistic concurrency. Disabled by default.
    ///
    /// When enabled, an update or delete only commits if the entry it read is
    /// unchanged, and a create only commits if its identity key is free. A
    /// lost race yields a commit result with `ok == false`.
    pub fn optimistic_concurrency(mut self, enabled: bool) -> Self {
        self.optimistic_concurrency = enabled;
        self
    }

    /// Validates the configuration and opens the collection.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if the name is empty or contains `_by_`, or if
    ///   the shape declares a system field
    /// - `UnknownIndex` if an index field is neither `id` nor a shape field
    /// - `CollectionAlreadyExists` if the store already has this collection
    ///   open with different indexes
    pub fn build(self) -> RecordResult<RecordCollection> {
        if let Some(error) = self.error {
            return Err(error);
        }

        if self.name.is_empty() || self.name.contains(INDEX_SEPARATOR) {
            log::error!("Invalid collection name {:?}", self.name);
            return Err(RecordError::new(
                &format!(
                    "Collection name must be non-empty and must not contain {}",
                    INDEX_SEPARATOR
                ),
                ErrorKind::InvalidOperation,
            ));
        }

        if let Some(field) = SYSTEM_FIELDS.iter().find(|f| self.shape.contains(f)) {
            log::error!("Shape of {} declares system field {}", self.name, field);
            return Err(RecordError::field_error(
                field,
                "is maintained by the collection and cannot be declared",
                ErrorKind::InvalidOperation,
            ));
        }

        if let Some(field) = self
            .indexes
            .iter()
            .find(|f| f.as_str() != ID_FIELD && !self.shape.contains(f))
        {
            log::error!("Index field {} is not part of the shape of {}", field, self.name);
            return Err(RecordError::field_error(
                field,
                "is not a field of the collection",
                ErrorKind::UnknownIndex,
            ));
        }

        let indexes: Vec<String> = self
            .indexes
            .into_iter()
            .chain(std::iter::once(ID_FIELD.to_string()))
            .unique()
            .collect();

        self.store.register_collection(&self.name, &indexes)?;
        log::debug!("Opened collection {} with indexes {:?}", self.name, indexes);

        let options = CollectionOptions {
            name: self.name,
            indexes,
            cleanup_stale_indexes: self.cleanup_stale_indexes,
            optimistic_concurrency: self.optimistic_concurrency,
        };
        Ok(RecordCollection::new(self.store, self.shape, options))
    }
}
