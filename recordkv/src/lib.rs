//! # RecordKV - Indexed Record Store over a Sorted Key-Value Store
//!
//! RecordKV stores schema-validated records in a key-value store that only
//! offers point reads and atomic multi-key commits. Each record is written
//! once per indexed field, so any index resolves the whole record with one
//! read, and every copy is written or erased in the same commit.
//!
//! ## Quick Start
//!
//! ```rust
//! use recordkv::collection::CollectionBuilder;
//! use recordkv::doc;
//! use recordkv::schema::{FieldDescriptor, Shape};
//! use recordkv::store::{memory::InMemoryKvStore, KvStore};
//!
//! let store = KvStore::new(InMemoryKvStore::new());
//! let users = CollectionBuilder::new(store, "users")
//!     .shape(Shape::new(vec![
//!         FieldDescriptor::string("email").email(),
//!         FieldDescriptor::string("username"),
//!         FieldDescriptor::boolean("activated").default(false),
//!     ]))
//!     .indexes(&["email", "username"])
//!     .build()
//!     .unwrap();
//!
//! users.create(&doc! { email: "a@b.com", username: "a" }).unwrap();
//!
//! let by_email = users.find_one(&doc! { email: "a@b.com" }).unwrap();
//! let by_username = users.find_one(&doc! { username: "a" }).unwrap();
//! assert_eq!(by_email, by_username);
//!
//! users.update_one(&doc! { username: "a" }, &doc! { activated: true }).unwrap();
//! users.delete_one(&doc! { email: "a@b.com" }).unwrap();
//! assert!(users.find_one(&doc! { username: "a" }).unwrap().is_none());
//! ```
//!
//! ## Design Pattern
//!
//! Handles such as [`store::KvStore`] and [`collection::RecordCollection`]
//! follow the PIMPL pattern: cloning is cheap and all clones share the same
//! state through an `Arc`.
//!
//! ## Module Organization
//!
//! - [`collection`] - Record collections, index writing and lookup
//! - [`common`] - Values, constants and small utilities
//! - [`errors`] - Error types and result definitions
//! - [`record`] - The `Document` record type and the `doc!` macro
//! - [`schema`] - Field descriptors and shapes used for validation
//! - [`store`] - The key-value store abstraction and its in-memory backend

pub mod collection;
pub mod common;
pub mod errors;
pub mod record;
pub mod schema;
pub mod store;
