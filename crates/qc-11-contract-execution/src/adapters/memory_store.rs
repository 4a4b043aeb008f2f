//! # In-Memory Storage (reference adapter)
//!
//! Implements `ContractStore`, `StorageProvider` and `StorageTransaction`
//! over plain maps. A transaction works on a private copy of the database;
//! savepoints are snapshots of that copy. `commit` publishes the copy.
//!
//! Key records live as rows of the `{ecosystem}_keys` table so that fee
//! settlement can debit them with ordinary row updates.

use crate::domain::entities::{ContractRecord, KeyRecord, ParameterRecord, TableRecord};
use crate::domain::services::keys_table;
use crate::domain::value_objects::Value;
use crate::errors::StorageError;
use crate::ports::outbound::{
    ContractStore, Row, StorageProvider, StorageSession, StorageTransaction,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct Database {
    contracts: BTreeMap<i64, ContractRecord>,
    rows: BTreeMap<String, BTreeMap<i64, Row>>,
    tables: BTreeMap<(String, String), TableRecord>,
    parameters: BTreeMap<(i64, String), ParameterRecord>,
    delayed: BTreeSet<String>,
}

impl Database {
    fn key(&self, ecosystem_id: i64, key_id: i64) -> Result<Option<KeyRecord>, StorageError> {
        let table = keys_table(ecosystem_id);
        let Some(row) = self.rows.get(&table).and_then(|rows| rows.get(&key_id)) else {
            return Ok(None);
        };
        let corrupted = |column: &str| StorageError::Corrupted {
            table: table.clone(),
            reason: format!("key {key_id}: bad {column}"),
        };
        let public_key = match row.get("pub") {
            Some(Value::Bytes(bytes)) => bytes.clone(),
            None | Some(Value::Null) => Vec::new(),
            Some(_) => return Err(corrupted("pub")),
        };
        Ok(Some(KeyRecord {
            id: key_id,
            ecosystem_id,
            account: row
                .get("account")
                .map(ToString::to_string)
                .unwrap_or_default(),
            public_key,
            amount: row
                .get("amount")
                .map_or(Some(0), Value::as_int)
                .ok_or_else(|| corrupted("amount"))?,
            disabled: row.get("disabled").is_some_and(Value::is_truthy),
        }))
    }
}

fn key_row(key: &KeyRecord) -> Row {
    let mut row = Row::new();
    row.insert("pub".into(), Value::Bytes(key.public_key.clone()));
    row.insert("account".into(), Value::Str(key.account.clone()));
    row.insert("amount".into(), Value::Int(key.amount));
    row.insert("disabled".into(), Value::Bool(key.disabled));
    row
}

// =============================================================================
// STORAGE
// =============================================================================

/// Shared in-memory database.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    db: Arc<RwLock<Database>>,
}

impl InMemoryStorage {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a contract record.
    pub fn put_contract(&self, record: ContractRecord) {
        self.db.write().contracts.insert(record.id, record);
    }

    /// Stores a key record.
    pub fn put_key(&self, key: &KeyRecord) {
        self.db
            .write()
            .rows
            .entry(keys_table(key.ecosystem_id))
            .or_default()
            .insert(key.id, key_row(key));
    }

    /// Stores a table permissions record under an ecosystem prefix.
    pub fn put_table(&self, prefix: &str, table: TableRecord) {
        self.db
            .write()
            .tables
            .insert((prefix.to_string(), table.name.to_lowercase()), table);
    }

    /// Stores an ecosystem parameter.
    pub fn put_parameter(&self, ecosystem_id: i64, parameter: ParameterRecord) {
        self.db
            .write()
            .parameters
            .insert((ecosystem_id, parameter.name.clone()), parameter);
    }

    /// Adds a contract to the delayed-contracts allow-list.
    pub fn put_delayed_contract(&self, name: &str) {
        self.db.write().delayed.insert(name.to_string());
    }

    /// Stores a row with an explicit id.
    pub fn put_row(&self, table: &str, id: i64, row: Row) {
        self.db
            .write()
            .rows
            .entry(table.to_string())
            .or_default()
            .insert(id, row);
    }

    /// Committed row.
    #[must_use]
    pub fn row(&self, table: &str, id: i64) -> Option<Row> {
        self.db.read().rows.get(table)?.get(&id).cloned()
    }

    /// Committed rows of a table.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<(i64, Row)> {
        self.db
            .read()
            .rows
            .get(table)
            .map(|rows| rows.iter().map(|(id, row)| (*id, row.clone())).collect())
            .unwrap_or_default()
    }

    /// Committed key record.
    ///
    /// # Errors
    ///
    /// `Corrupted` when the stored row cannot be decoded.
    pub fn key(&self, ecosystem_id: i64, key_id: i64) -> Result<Option<KeyRecord>, StorageError> {
        self.db.read().key(ecosystem_id, key_id)
    }

    /// Starts a transaction on a private copy of the database.
    #[must_use]
    pub fn begin_transaction(&self) -> InMemoryTransaction {
        InMemoryTransaction {
            shared: Arc::clone(&self.db),
            working: self.db.read().clone(),
            savepoints: Vec::new(),
            statement_log: Vec::new(),
        }
    }
}

impl ContractStore for InMemoryStorage {
    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.db.read().contracts.len())
    }

    fn paged_list(&self, offset: usize, limit: usize) -> Result<Vec<ContractRecord>, StorageError> {
        Ok(self
            .db
            .read()
            .contracts
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn list_by_ecosystem(&self, ecosystem_id: i64) -> Result<Vec<ContractRecord>, StorageError> {
        Ok(self
            .db
            .read()
            .contracts
            .values()
            .filter(|record| record.ecosystem_id == ecosystem_id)
            .cloned()
            .collect())
    }
}

impl StorageProvider for InMemoryStorage {
    fn begin(&self) -> Result<Box<dyn StorageSession>, StorageError> {
        Ok(Box::new(self.begin_transaction()))
    }
}

// =============================================================================
// TRANSACTION
// =============================================================================

/// A transaction over `InMemoryStorage`.
#[derive(Debug)]
pub struct InMemoryTransaction {
    shared: Arc<RwLock<Database>>,
    working: Database,
    savepoints: Vec<(String, Database)>,
    statement_log: Vec<String>,
}

impl InMemoryTransaction {
    /// Publishes the transaction's changes.
    pub fn commit(self) {
        *self.shared.write() = self.working;
    }

    /// Statements logged since the transaction began or the log was cleared.
    #[must_use]
    pub fn statement_log(&self) -> &[String] {
        &self.statement_log
    }

    /// Names of open savepoints, oldest first.
    #[must_use]
    pub fn savepoints(&self) -> Vec<&str> {
        self.savepoints.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn savepoint_index(&self, name: &str) -> Result<usize, StorageError> {
        self.savepoints
            .iter()
            .rposition(|(sp, _)| sp == name)
            .ok_or_else(|| StorageError::SavepointNotFound(name.to_string()))
    }
}

impl StorageTransaction for InMemoryTransaction {
    fn key(&self, ecosystem_id: i64, key_id: i64) -> Result<Option<KeyRecord>, StorageError> {
        self.working.key(ecosystem_id, key_id)
    }

    fn table(&self, prefix: &str, name: &str) -> Result<Option<TableRecord>, StorageError> {
        Ok(self
            .working
            .tables
            .get(&(prefix.to_string(), name.to_lowercase()))
            .cloned())
    }

    fn parameter(
        &self,
        ecosystem_id: i64,
        name: &str,
    ) -> Result<Option<ParameterRecord>, StorageError> {
        Ok(self
            .working
            .parameters
            .get(&(ecosystem_id, name.to_string()))
            .cloned())
    }

    fn is_delayed_contract(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.working.delayed.contains(name))
    }

    fn insert_row(&mut self, table: &str, values: Row) -> Result<i64, StorageError> {
        let rows = self.working.rows.entry(table.to_string()).or_default();
        let id = rows.keys().next_back().map_or(1, |last| last + 1);
        rows.insert(id, values);
        self.statement_log.push(format!("INSERT {table} {id}"));
        Ok(id)
    }

    fn update_row(&mut self, table: &str, id: i64, values: &Row) -> Result<Row, StorageError> {
        let row = self
            .working
            .rows
            .get_mut(table)
            .and_then(|rows| rows.get_mut(&id))
            .ok_or_else(|| StorageError::RowNotFound {
                table: table.to_string(),
                id,
            })?;
        let previous = row.clone();
        row.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.statement_log.push(format!("UPDATE {table} {id}"));
        Ok(previous)
    }

    fn select_row(&self, table: &str, id: i64) -> Result<Option<Row>, StorageError> {
        Ok(self
            .working
            .rows
            .get(table)
            .and_then(|rows| rows.get(&id))
            .cloned())
    }

    fn create_savepoint(&mut self, name: &str) -> Result<(), StorageError> {
        debug!(savepoint = name, "create savepoint");
        self.savepoints.push((name.to_string(), self.working.clone()));
        Ok(())
    }

    fn rollback_to(&mut self, name: &str) -> Result<(), StorageError> {
        let index = self.savepoint_index(name)?;
        debug!(savepoint = name, "rollback to savepoint");
        self.savepoints.truncate(index + 1);
        self.working = self.savepoints[index].1.clone();
        Ok(())
    }

    fn release(&mut self, name: &str) -> Result<(), StorageError> {
        let index = self.savepoint_index(name)?;
        self.savepoints.truncate(index);
        Ok(())
    }

    fn clear_statement_log(&mut self) {
        self.statement_log.clear();
    }
}

impl StorageSession for InMemoryTransaction {
    fn transaction(&mut self) -> &mut dyn StorageTransaction {
        self
    }

    fn commit(self: Box<Self>) -> Result<(), StorageError> {
        InMemoryTransaction::commit(*self);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
