//! Field-descriptor validation of records.
//!
//! A collection's shape is data, not a type: a list of [FieldDescriptor]s
//! checked by a small rule engine. The record store only relies on
//! [Shape::parse] and [Shape::partial].

mod field;
mod rules;
mod shape;

pub use field::*;
pub use shape::*;
