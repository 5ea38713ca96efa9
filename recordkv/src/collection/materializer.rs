use crate::common::{Value, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};
use crate::errors::{ErrorKind, RecordError, RecordResult};
use crate::record::Document;
use uuid::Uuid;

/// Builds the full record persisted by a write.
///
/// - `existing == None` (creation): a fresh UUID v4 `id`, the input fields,
///   and `createdAt = updatedAt = now`.
/// - `existing == Some(record)` (update): `patch` deep-merged onto `record`,
///   with `id` and `createdAt` restored from `record` and `updatedAt` set to
///   `now`, or to one millisecond past the previous `updatedAt` if the clock
///   has not moved past it.
///
/// Nothing is written; every index copy is staged from the returned record.
pub fn materialize(existing: Option<&Document>, patch: &Document, now: i64) -> RecordResult<Document> {
    match existing {
        None => materialize_new(patch, now),
        Some(existing) => materialize_update(existing, patch, now),
    }
}

pub fn materialize_new(input: &Document, now: i64) -> RecordResult<Document> {
    let mut record = input.clone();
    record.put(ID_FIELD, Uuid::new_v4().to_string())?;
    record.put(CREATED_AT_FIELD, now)?;
    record.put(UPDATED_AT_FIELD, now)?;
    Ok(record)
}

pub fn materialize_update(existing: &Document, patch: &Document, now: i64) -> RecordResult<Document> {
    let id = existing.get(ID_FIELD).cloned().ok_or_else(|| {
        log::error!("Stored record has no {} field", ID_FIELD);
        RecordError::new("Stored record has no identity", ErrorKind::InternalError)
    })?;
    let created_at = existing
        .get(CREATED_AT_FIELD)
        .cloned()
        .unwrap_or(Value::Int(now));
    let updated_at = match existing.updated_at() {
        Some(previous) if previous >= now => previous + 1,
        _ => now,
    };

    let mut record = existing.merge(patch);
    record.put(ID_FIELD, id)?;
    record.put(CREATED_AT_FIELD, created_at)?;
    record.put(UPDATED_AT_FIELD, updated_at)?;
    Ok(record)
}
