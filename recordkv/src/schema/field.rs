use crate::common::Value;
use crate::errors::RecordResult;
use crate::schema::Shape;
use regex::Regex;

/// The kind of value a field accepts.
#[derive(Clone, Debug)]
pub enum FieldKind {
    /// UTF-8 string
    String,
    /// Any number, integral or not
    Number,
    /// A number without a fractional part
    Integer,
    /// Boolean
    Boolean,
    /// Binary data
    Bytes,
    /// Homogeneous array with the given element kind
    Array(Box<FieldKind>),
    /// Fixed-length array, one kind per position
    Tuple(Vec<FieldKind>),
    /// Point in time, as epoch milliseconds or RFC 3339 text
    Date,
    /// Nested object validated by its own shape
    Object(Shape),
    /// One of a fixed set of strings
    Enum(Vec<String>),
    /// Any non-null value
    Any,
}

impl FieldKind {
    /// Returns the kind name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::Bytes => "bytes",
            FieldKind::Array(_) => "array",
            FieldKind::Tuple(_) => "tuple",
            FieldKind::Date => "date",
            FieldKind::Object(_) => "object",
            FieldKind::Enum(_) => "enum",
            FieldKind::Any => "any",
        }
    }

    /// True for kinds whose `min`/`max` bound a length rather than a value.
    pub fn is_sized(&self) -> bool {
        matches!(self, FieldKind::String | FieldKind::Bytes | FieldKind::Array(_))
    }
}

/// A refinement checked after the kind matched.
#[derive(Clone, Debug)]
pub enum Constraint {
    /// Minimum length of a string (in characters), byte array or array
    MinLength(usize),
    /// Maximum length of a string (in characters), byte array or array
    MaxLength(usize),
    /// String must look like an email address
    Email,
    /// String must be a hyphenated UUID
    Uuid,
    /// String must match the pattern
    Pattern(Regex),
    /// Inclusive lower bound of a number
    Min(f64),
    /// Inclusive upper bound of a number
    Max(f64),
}

/// Declares one field of a [Shape]: its name, kind, constraints, whether it
/// may be omitted, and the value used when it is.
///
/// # Examples
///
/// ```rust,ignore
/// let email = FieldDescriptor::string("email").email();
/// let password = FieldDescriptor::string("password").min(8).max(32);
/// let activated = FieldDescriptor::boolean("activated").default(false);
/// let firstname = FieldDescriptor::string("firstname").optional();
/// ```
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
    constraints: Vec<Constraint>,
    optional: bool,
    default: Option<Value>,
}

impl FieldDescriptor {
    /// Creates a required field of the given kind.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldDescriptor {
            name: name.into(),
            kind,
            constraints: Vec::new(),
            optional: false,
            default: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn bytes(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bytes)
    }

    pub fn array(name: impl Into<String>, element: FieldKind) -> Self {
        Self::new(name, FieldKind::Array(Box::new(element)))
    }

    pub fn tuple(name: impl Into<String>, elements: Vec<FieldKind>) -> Self {
        Self::new(name, FieldKind::Tuple(elements))
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub fn object(name: impl Into<String>, shape: Shape) -> Self {
        Self::new(name, FieldKind::Object(shape))
    }

    pub fn enumeration<S: AsRef<str>>(name: impl Into<String>, variants: &[S]) -> Self {
        let variants = variants.iter().map(|v| v.as_ref().to_string()).collect();
        Self::new(name, FieldKind::Enum(variants))
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Any)
    }

    /// Lower bound: a length for strings, bytes and arrays, a value for numbers.
    pub fn min(mut self, bound: impl Into<f64>) -> Self {
        let bound = bound.into();
        let constraint = if self.kind.is_sized() {
            Constraint::MinLength(bound.max(0.0) as usize)
        } else {
            Constraint::Min(bound)
        };
        self.constraints.push(constraint);
        self
    }

    /// Upper bound: a length for strings, bytes and arrays, a value for numbers.
    pub fn max(mut self, bound: impl Into<f64>) -> Self {
        let bound = bound.into();
        let constraint = if self.kind.is_sized() {
            Constraint::MaxLength(bound.max(0.0) as usize)
        } else {
            Constraint::Max(bound)
        };
        self.constraints.push(constraint);
        self
    }

    pub fn email(mut self) -> Self {
        self.constraints.push(Constraint::Email);
        self
    }

    pub fn uuid(mut self) -> Self {
        self.constraints.push(Constraint::Uuid);
        self
    }

    /// Requires string values to match `pattern`.
    ///
    /// # Errors
    ///
    /// Fails with [ErrorKind::InvalidOperation](crate::errors::ErrorKind::InvalidOperation)
    /// when the pattern does not compile.
    pub fn pattern(mut self, pattern: &str) -> RecordResult<Self> {
        self.constraints.push(Constraint::Pattern(Regex::new(pattern)?));
        Ok(self)
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Value used when the field is omitted from the input.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// The same field with every omission allowed and no default.
    /// Optional copy without default. Nested objects become partial too,
    /// since patches are deep-merged.
    pub(crate) fn as_partial(&self) -> Self {
        let kind = match &self.kind {
            FieldKind::Object(shape) => FieldKind::Object(shape.partial()),
            other => other.clone(),
        };
        FieldDescriptor {
            kind,
            optional: true,
            default: None,
            ..self.clone()
        }
    }
}
