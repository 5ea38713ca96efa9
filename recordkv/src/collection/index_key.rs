use crate::common::{Value, INDEX_SEPARATOR};
use crate::store::KvKey;

/// Namespace holding the copies of a collection's records keyed by `field`.
#[inline]
pub fn index_namespace(collection: &str, field: &str) -> String {
    format!("{}{}{}", collection, INDEX_SEPARATOR, field)
}

/// Physical key of the copy of a record whose `field` holds `value`.
///
/// The value part is [`Value::to_key_string`], so values of one field kind
/// never collide and the derivation is deterministic.
pub fn derive_key(collection: &str, field: &str, value: &Value) -> KvKey {
    KvKey::new(index_namespace(collection, field), value.to_key_string())
}
