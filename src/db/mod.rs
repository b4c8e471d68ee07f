//! Data-access layer.
//!
//! [`BigQueryDatabase`] wraps a [`crate::warehouse::Warehouse`] and implements
//! the operations exposed as tools.

pub mod database;

pub use database::BigQueryDatabase;
