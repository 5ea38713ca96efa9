//! The sorted key-value substrate consumed by collections.

mod batch;
mod key;
mod kv_store;
pub mod memory;

pub use batch::*;
pub use key::*;
pub use kv_store::*;
