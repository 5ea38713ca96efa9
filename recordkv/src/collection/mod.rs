//! Collections of schema-validated records kept under several index keys.
//!
//! A record of collection `users` indexed by `email` and `id` lives under
//! `users_by_email/<email>` and `users_by_id/<id>`, each key holding the
//! complete record. Writes stage every copy into one atomic commit.

mod index_key;
mod index_writer;
mod lookup;
mod materializer;
mod options;
mod record_collection;

pub use index_key::*;
pub use index_writer::*;
pub use lookup::*;
pub use materializer::*;
pub use options::*;
pub use record_collection::*;
