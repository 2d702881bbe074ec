//! Storage backend abstraction
//!
//! The harness drives every backend through the same five YCSB-style
//! operations. Backends implement [`Db`]; the metrics decorators
//! ([`TrackedDb`](crate::stats::TrackedDb) and
//! [`OperationTracker`](crate::stats::OperationTracker)) implement it too, so
//! they stack in front of any backend without the workload driver noticing.
//!
//! # Error Handling
//!
//! Each backend picks its own error type. Decorators return the backend's
//! error unchanged and never inspect or retry it.
//!
//! # Thread Safety
//!
//! Backends must be `Send + Sync`: one instance is shared by all worker
//! threads of a run.

pub mod memory;

use std::collections::HashMap;

/// A record: field name to raw value
pub type FieldMap = HashMap<String, Vec<u8>>;

/// Storage operation interface for all backends
pub trait Db: Send + Sync {
    /// Backend error, passed through untouched by decorators
    type Error;

    /// Read `fields` of one record (all fields when `fields` is empty)
    fn read(&self, table: &str, key: &str, fields: &[String]) -> Result<FieldMap, Self::Error>;

    /// Read up to `count` records starting at `start_key`
    fn scan(
        &self,
        table: &str,
        start_key: &str,
        count: usize,
        fields: &[String],
    ) -> Result<Vec<FieldMap>, Self::Error>;

    /// Overwrite the given fields of an existing record
    fn update(&self, table: &str, key: &str, values: &FieldMap) -> Result<(), Self::Error>;

    /// Insert a new record
    fn insert(&self, table: &str, key: &str, values: &FieldMap) -> Result<(), Self::Error>;

    /// Remove a record
    fn delete(&self, table: &str, key: &str) -> Result<(), Self::Error>;

    /// Read one record and report how many physical reads it took
    ///
    /// Backends that cannot tell return 0, which collectors treat as
    /// "not reported".
    fn read_with_amplification(
        &self,
        table: &str,
        key: &str,
        fields: &[String],
    ) -> Result<(FieldMap, u32), Self::Error> {
        self.read(table, key, fields).map(|record| (record, 0))
    }

    /// Backend-specific metrics as printable text, if the backend exposes any
    fn textual_metrics(&self) -> Option<String> {
        None
    }
}
