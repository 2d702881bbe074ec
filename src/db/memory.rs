//! In-memory storage backend
//!
//! An ordered map per table behind a single `RwLock`. Used by the smoke-run
//! binary and by tests; it performs no IO, so latencies reflect only lock
//! contention and copying.
//!
//! # Example
//!
//! ```
//! use kvpulse::db::{Db, FieldMap};
//! use kvpulse::db::memory::MemoryDb;
//!
//! let db = MemoryDb::new();
//! let mut values = FieldMap::new();
//! values.insert("field0".to_string(), b"value".to_vec());
//!
//! db.insert("usertable", "user1", &values).unwrap();
//! let record = db.read("usertable", "user1", &[]).unwrap();
//! assert_eq!(record["field0"], b"value");
//! ```

use super::{Db, FieldMap};
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Errors returned by [`MemoryDb`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryDbError {
    #[error("key '{key}' not found in table '{table}'")]
    NotFound { table: String, key: String },

    #[error("key '{key}' already exists in table '{table}'")]
    AlreadyExists { table: String, key: String },
}

impl MemoryDbError {
    fn not_found(table: &str, key: &str) -> Self {
        Self::NotFound {
            table: table.to_owned(),
            key: key.to_owned(),
        }
    }
}

type Table = BTreeMap<String, FieldMap>;

/// Thread-safe in-memory key-value store
#[derive(Debug, Default)]
pub struct MemoryDb {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> RwLockReadGuard<'_, HashMap<String, Table>> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn tables_mut(&self) -> RwLockWriteGuard<'_, HashMap<String, Table>> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of records in `table`
    pub fn len(&self, table: &str) -> usize {
        self.tables().get(table).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.tables().values().all(BTreeMap::is_empty)
    }
}

fn project(record: &FieldMap, fields: &[String]) -> FieldMap {
    if fields.is_empty() {
        return record.clone();
    }
    fields
        .iter()
        .filter_map(|field| record.get(field).map(|value| (field.clone(), value.clone())))
        .collect()
}

impl Db for MemoryDb {
    type Error = MemoryDbError;

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
        let tables = self.tables();
        let record = tables
            .get(table)
            .and_then(|t| t.get(key))
            .ok_or_else(|| MemoryDbError::not_found(table, key))?;
        // One table lookup plus one record lookup
        Ok((project(record, fields), 2))
    }

    fn scan(
        &self,
        table: &str,
        start_key: &str,
        count: usize,
        fields: &[String],
    ) -> Result<Vec<FieldMap>, Self::Error> {
        let tables = self.tables();
        let Some(t) = tables.get(table) else {
            return Ok(Vec::new());
        };
        Ok(t.range(start_key.to_owned()..)
            .take(count)
            .map(|(_, record)| project(record, fields))
            .collect())
    }

    fn update(&self, table: &str, key: &str, values: &FieldMap) -> Result<(), Self::Error> {
        let mut tables = self.tables_mut();
        let record = tables
            .get_mut(table)
            .and_then(|t| t.get_mut(key))
            .ok_or_else(|| MemoryDbError::not_found(table, key))?;
        for (field, value) in values {
            record.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    fn insert(&self, table: &str, key: &str, values: &FieldMap) -> Result<(), Self::Error> {
        let mut tables = self.tables_mut();
        let t = tables.entry(table.to_owned()).or_default();
        if t.contains_key(key) {
            return Err(MemoryDbError::AlreadyExists {
                table: table.to_owned(),
                key: key.to_owned(),
            });
        }
        t.insert(key.to_owned(), values.clone());
        Ok(())
    }

    fn delete(&self, table: &str, key: &str) -> Result<(), Self::Error> {
        self.tables_mut()
            .get_mut(table)
            .and_then(|t| t.remove(key))
            .map(|_| ())
            .ok_or_else(|| MemoryDbError::not_found(table, key))
    }

    fn textual_metrics(&self) -> Option<String> {
        let tables = self.tables();
        let mut names: Vec<&String> = tables.keys().collect();
        names.sort();
        let lines: Vec<String> = names
            .into_iter()
            .map(|name| format!("  table {}: {} records", name, tables[name].len()))
            .collect();
        Some(lines.join("\n"))
    }
}
