// record constants
pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";
pub const SYSTEM_FIELDS: [&str; 3] = [ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];

// index constants
pub const INDEX_SEPARATOR: &str = "_by_";

// document constants
pub const FIELD_SEPARATOR: &str = ".";
