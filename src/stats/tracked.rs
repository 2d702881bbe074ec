//! Collector-feeding storage decorator
//!
//! [`TrackedDb`] times every call into the wrapped backend and records the
//! latency into a shared [`Collector`]. The backend's result, including its
//! error, is returned unchanged.

use super::Collector;
use crate::db::{Db, FieldMap};
use std::sync::Arc;
use std::time::Instant;

/// Wraps a [`Db`] and tracks operation metrics in a [`Collector`]
#[derive(Debug)]
pub struct TrackedDb<D> {
    db: D,
    collector: Arc<Collector>,
}

impl<D> TrackedDb<D> {
    pub fn new(db: D, collector: Arc<Collector>) -> Self {
        Self { db, collector }
    }

    /// The collector receiving this wrapper's measurements
    pub fn collector(&self) -> &Arc<Collector> {
        &self.collector
    }

    /// The unwrapped backend (for backend-specific metrics)
    pub fn inner(&self) -> &D {
        &self.db
    }

    pub fn into_inner(self) -> D {
        self.db
    }
}

impl<D: Db> Db for TrackedDb<D> {
    type Error = D::Error;

    fn read(&self, table: &str, key: &str, fields: &[String]) -> Result<FieldMap, Self::Error> {
        self.read_with_amplification(table, key, fields)
            .map(|(record, _)| record)
    }

    fn read_with_amplification(
        &self,
        table: &str,
        key: &str,
        fields: &[String],
    ) -> Result<(FieldMap, u32), Self::Error> {
        let start = Instant::now();
        let result = self.db.read_with_amplification(table, key, fields);
        let elapsed = start.elapsed();
        let amplification = result.as_ref().map_or(0, |(_, amp)| i64::from(*amp));
        self.collector
            .record_read_with_amplification(elapsed, amplification);
        result
    }

    fn scan(
        &self,
        table: &str,
        start_key: &str,
        count: usize,
        fields: &[String],
    ) -> Result<Vec<FieldMap>, Self::Error> {
        let start = Instant::now();
        let result = self.db.scan(table, start_key, count, fields);
        self.collector.record_scan(start.elapsed());
        result
    }

    fn update(&self, table: &str, key: &str, values: &FieldMap) -> Result<(), Self::Error> {
        let start = Instant::now();
        let result = self.db.update(table, key, values);
        self.collector.record_update(start.elapsed());
        result
    }

    fn insert(&self, table: &str, key: &str, values: &FieldMap) -> Result<(), Self::Error> {
        let start = Instant::now();
        let result = self.db.insert(table, key, values);
        self.collector.record_insert(start.elapsed());
        result
    }

    fn delete(&self, table: &str, key: &str) -> Result<(), Self::Error> {
        let start = Instant::now();
        let result = self.db.delete(table, key);
        self.collector.record_delete(start.elapsed());
        result
    }

    fn textual_metrics(&self) -> Option<String> {
        self.db.textual_metrics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{MemoryDb, MemoryDbError};
    use crate::stats::OperationKind;

    fn values() -> FieldMap {
        let mut values = FieldMap::new();
        values.insert("field".to_string(), b"value".to_vec());
        values
    }

    #[test]
    fn test_tracked_db_records_every_call() {
        let collector = Arc::new(Collector::new());
        let tracked = TrackedDb::new(MemoryDb::new(), Arc::clone(&collector));

        tracked.insert("table", "key", &values()).unwrap();
        tracked.read("table", "key", &["field".to_string()]).unwrap();
        tracked.update("table", "key", &values()).unwrap();
        tracked.scan("table", "a", 10, &[]).unwrap();
        tracked.delete("table", "key").unwrap();

        for kind in OperationKind::ALL {
            assert_eq!(collector.count(kind), 1, "{}", kind);
            assert_eq!(collector.histogram(kind).total_count(), 1);
        }
        assert_eq!(collector.read_amp_count(), 1);
        assert_eq!(collector.read_amp_sum(), 2);
    }

    #[test]
    fn test_errors_pass_through_and_are_timed() {
        let collector = Arc::new(Collector::new());
        let tracked = TrackedDb::new(MemoryDb::new(), Arc::clone(&collector));

        let err = tracked.read("table", "missing", &[]).unwrap_err();
        assert!(matches!(err, MemoryDbError::NotFound { .. }));
        assert!(tracked.delete("table", "missing").is_err());

        assert_eq!(collector.count(OperationKind::Read), 1);
        assert_eq!(collector.count(OperationKind::Delete), 1);
        // Failed reads report no amplification
        assert_eq!(collector.read_amp_count(), 0);
    }

    #[test]
    fn test_forwards_textual_metrics() {
        let collector = Arc::new(Collector::new());
        let tracked = TrackedDb::new(MemoryDb::new(), collector);
        tracked.insert("table", "key", &values()).unwrap();

        let metrics = tracked.textual_metrics().unwrap();
        assert!(metrics.contains("table table: 1 records"));
        assert_eq!(tracked.inner().len("table"), 1);
    }
}
