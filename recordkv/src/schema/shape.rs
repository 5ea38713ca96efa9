use crate::common::{Value, FIELD_SEPARATOR};
use crate::errors::{ErrorKind, RecordError, RecordResult};
use crate::record::Document;
use crate::schema::{rules, FieldDescriptor};

/// The declared shape of a collection's records: an ordered list of
/// [FieldDescriptor]s.
///
/// # Purpose
/// `Shape` is the validator consumed by a collection. [Shape::parse] turns a
/// candidate document into a validated one or fails with a validation error
/// naming the offending field; [Shape::partial] derives the shape used for
/// patches and queries.
///
/// # Parsing rules
/// - Fields not declared in the shape are stripped.
/// - A missing field receives its default if one is declared, is omitted if
///   optional, and otherwise fails with [ErrorKind::MissingRequiredField].
/// - `Null` counts as missing for optional fields and is rejected otherwise.
/// - Present values must match the field kind and every constraint.
///
/// # Usage
/// ```text
/// let users = Shape::new(vec![
///     FieldDescriptor::string("email").email(),
///     FieldDescriptor::string("username"),
///     FieldDescriptor::string("password").min(8).max(32),
///     FieldDescriptor::string("firstname").optional(),
///     FieldDescriptor::boolean("activated").default(false),
/// ]);
/// let valid = users.parse(&candidate)?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct Shape {
    fields: Vec<FieldDescriptor>,
}

impl Shape {
    /// Creates a shape from descriptors; a later descriptor replaces an
    /// earlier one with the same name.
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Shape::default().extend(fields)
    }

    /// Returns a copy with the descriptors added, replacing same-named ones
    /// in place.
    pub fn extend(&self, fields: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        let mut extended = self.fields.clone();
        for field in fields {
            match extended.iter_mut().find(|f| f.name() == field.name()) {
                Some(existing) => *existing = field,
                None => extended.push(field),
            }
        }
        Shape { fields: extended }
    }

    /// Returns a copy where every field is optional and has no default.
    pub fn partial(&self) -> Self {
        Shape {
            fields: self.fields.iter().map(FieldDescriptor::as_partial).collect(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validates `candidate` and returns the normalized document.
    pub fn parse(&self, candidate: &Document) -> RecordResult<Document> {
        self.parse_at(candidate, "")
    }

    pub(crate) fn parse_at(&self, candidate: &Document, prefix: &str) -> RecordResult<Document> {
        let mut validated = Document::new();

        for field in &self.fields {
            let path = if prefix.is_empty() {
                field.name().to_string()
            } else {
                format!("{}{}{}", prefix, FIELD_SEPARATOR, field.name())
            };

            match candidate.get(field.name()) {
                Some(Value::Null) if field.is_optional() => {}
                Some(value) => {
                    let value = rules::apply(field, value, &path)?;
                    validated.put(field.name(), value)?;
                }
                None => {
                    if let Some(default) = field.default_value() {
                        let value = rules::apply(field, default, &path)?;
                        validated.put(field.name(), value)?;
                    } else if !field.is_optional() {
                        log::error!("Missing required field {}", path);
                        return Err(RecordError::field_error(
                            &path,
                            "required",
                            ErrorKind::MissingRequiredField,
                        ));
                    }
                }
            }
        }

        for key in candidate.keys().filter(|key| !self.contains(key)) {
            log::debug!("Stripping undeclared field {}{}", prefix, key);
        }

        Ok(validated)
    }
}
