//! # Driven Ports (SPI - Outbound)
//!
//! Interfaces the execution pipeline depends on:
//! - the contract interpreter/compiler
//! - relational storage with savepoints
//! - key cryptography (address derivation, signature verification)
//! - the payment/fee hooks
//!
//! Interpreter and storage calls are synchronous and may block; the async
//! service moves whole executions onto the blocking pool.

use crate::domain::context::ExecutionContext;
use crate::domain::entities::{
    CompiledUnit, ContractRecord, KeyRecord, OwnerInfo, ParameterRecord, ProgramHandle,
    TableRecord,
};
use crate::domain::environment::Environment;
use crate::domain::value_objects::{Hash, Value};
use crate::errors::{CompileError, CryptoError, EvalError, PaymentError, RuntimeError, StorageError};
use std::collections::{BTreeMap, BTreeSet};

/// A table row: column name to value.
pub type Row = BTreeMap<String, Value>;

// =============================================================================
// INTERPRETER
// =============================================================================

/// Contract compiler and interpreter.
///
/// Assumed deterministic: the same source, environment and storage always
/// produce the same effects and the same fuel charges.
pub trait Interpreter: Send + Sync {
    /// Source of the built-in system functions.
    fn system_functions(&self) -> &str;

    /// Qualified names of the contracts declared in `source`.
    ///
    /// # Errors
    ///
    /// `CompileError` when the declarations cannot be read.
    fn contract_names(&self, source: &str, ecosystem_id: i64) -> Result<Vec<String>, CompileError>;

    /// Compiles `source` for `owner`.
    ///
    /// Calls to names in `ignore` are accepted without a definition in the
    /// same source.
    ///
    /// # Errors
    ///
    /// `CompileError` on malformed source or unresolved references.
    fn compile(
        &self,
        source: &str,
        owner: &OwnerInfo,
        ignore: &BTreeSet<String>,
    ) -> Result<Vec<CompiledUnit>, CompileError>;

    /// Runs the named methods of a compiled block, in order. Methods the block
    /// does not declare are skipped.
    ///
    /// # Errors
    ///
    /// Any `RuntimeError` raised by contract code or by a host function.
    fn run(
        &self,
        host: &mut dyn ContractHost,
        program: &ProgramHandle,
        methods: &[&str],
    ) -> Result<(), RuntimeError>;

    /// Evaluates a boolean expression in an ecosystem's scope.
    ///
    /// # Errors
    ///
    /// `EvalError` when the expression is malformed or refers to unknown names.
    fn eval_boolean(&self, expr: &str, ecosystem_id: i64, env: &Environment)
        -> Result<bool, EvalError>;
}

/// Host functions available to running contract code.
pub trait ContractHost {
    /// Environment of the running execution.
    fn env(&self) -> &Environment;

    /// Mutable environment.
    fn env_mut(&mut self) -> &mut Environment;

    /// Deducts fuel.
    ///
    /// # Errors
    ///
    /// `ResourceExhausted` once the remaining fuel drops below zero.
    fn charge(&mut self, fuel: i64) -> Result<(), RuntimeError>;

    /// Calls another contract with the given fields.
    ///
    /// # Errors
    ///
    /// `ContractLoop` for re-entrant calls, `UnknownContract`, or whatever the
    /// callee raises.
    fn call_contract(&mut self, name: &str, fields: Row) -> Result<Value, RuntimeError>;

    /// Inserts a row after checking table and column permissions.
    ///
    /// # Errors
    ///
    /// Access or storage errors.
    fn db_insert(&mut self, table: &str, values: Row) -> Result<i64, RuntimeError>;

    /// Updates a row after checking table and column permissions.
    ///
    /// # Errors
    ///
    /// Access or storage errors.
    fn db_update(&mut self, table: &str, id: i64, values: Row) -> Result<(), RuntimeError>;

    /// Reads the permitted columns of a row.
    ///
    /// # Errors
    ///
    /// Access or storage errors.
    fn db_select(&mut self, table: &str, id: i64, columns: &[String]) -> Result<Row, RuntimeError>;

    /// Evaluates an ecosystem parameter's value (or its conditions).
    ///
    /// # Errors
    ///
    /// `AccessDenied` when false, `MissingCondition` when empty.
    fn check_condition(&mut self, param: &str, use_conditions: bool) -> Result<(), RuntimeError>;

    /// Toggles a contract's active flag in the registry.
    ///
    /// # Errors
    ///
    /// `UnknownContract` when no such contract is registered.
    fn activate_contract(&mut self, table_id: i64, ecosystem_id: i64, active: bool)
        -> Result<(), RuntimeError>;

    /// Reassigns a contract's wallet in the registry.
    ///
    /// # Errors
    ///
    /// `UnknownContract` when no such contract is registered.
    fn set_contract_wallet(&mut self, table_id: i64, ecosystem_id: i64, wallet_id: i64)
        -> Result<(), RuntimeError>;

    /// Queues a notification for a key.
    fn notify(&mut self, key_id: i64, payload: String);
}

// =============================================================================
// STORAGE
// =============================================================================

/// The storage transaction backing one execution.
///
/// Exclusively owned by that execution for its whole duration.
pub trait StorageTransaction {
    /// Key record of `key_id` in an ecosystem.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn key(&self, ecosystem_id: i64, key_id: i64) -> Result<Option<KeyRecord>, StorageError>;

    /// Permissions record of table `name` under ecosystem `prefix`.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn table(&self, prefix: &str, name: &str) -> Result<Option<TableRecord>, StorageError>;

    /// Ecosystem parameter.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn parameter(&self, ecosystem_id: i64, name: &str)
        -> Result<Option<ParameterRecord>, StorageError>;

    /// Returns true if `name` is in the delayed-contracts allow-list.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn is_delayed_contract(&self, name: &str) -> Result<bool, StorageError>;

    /// Inserts a row and returns its id.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn insert_row(&mut self, table: &str, values: Row) -> Result<i64, StorageError>;

    /// Merges `values` into an existing row and returns the previous row.
    ///
    /// # Errors
    ///
    /// `RowNotFound` when the row is missing.
    fn update_row(&mut self, table: &str, id: i64, values: &Row) -> Result<Row, StorageError>;

    /// Reads a row.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn select_row(&self, table: &str, id: i64) -> Result<Option<Row>, StorageError>;

    /// Marks a savepoint.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn create_savepoint(&mut self, name: &str) -> Result<(), StorageError>;

    /// Reverts every change made since the savepoint.
    ///
    /// # Errors
    ///
    /// `SavepointNotFound` when the savepoint does not exist.
    fn rollback_to(&mut self, name: &str) -> Result<(), StorageError>;

    /// Forgets a savepoint, keeping its changes.
    ///
    /// # Errors
    ///
    /// `SavepointNotFound` when the savepoint does not exist.
    fn release(&mut self, name: &str) -> Result<(), StorageError>;

    /// Drops statements logged for replication since the transaction began.
    fn clear_statement_log(&mut self);
}

/// Read access to persisted contract records.
pub trait ContractStore: Send + Sync {
    /// Number of contract records.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn count(&self) -> Result<usize, StorageError>;

    /// Contract records ordered by id.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn paged_list(&self, offset: usize, limit: usize) -> Result<Vec<ContractRecord>, StorageError>;

    /// Contract records of one ecosystem, ordered by id.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn list_by_ecosystem(&self, ecosystem_id: i64) -> Result<Vec<ContractRecord>, StorageError>;
}

/// A storage transaction that can be committed.
pub trait StorageSession: StorageTransaction + Send {
    /// The session as a plain transaction.
    fn transaction(&mut self) -> &mut dyn StorageTransaction;

    /// Makes the transaction's changes durable.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn commit(self: Box<Self>) -> Result<(), StorageError>;
}

/// Storage backend the async service opens transactions on.
pub trait StorageProvider: ContractStore {
    /// Begins a transaction.
    ///
    /// # Errors
    ///
    /// `Unavailable` when the backend cannot be reached.
    fn begin(&self) -> Result<Box<dyn StorageSession>, StorageError>;
}

// =============================================================================
// KEY CRYPTOGRAPHY
// =============================================================================

/// Address derivation and signature verification.
pub trait KeyCrypto: Send + Sync {
    /// Key id derived from a public key.
    ///
    /// # Errors
    ///
    /// `InvalidPublicKey` for bytes that are not a curve point.
    fn address(&self, public_key: &[u8]) -> Result<i64, CryptoError>;

    /// Verifies `signature` over `hash`.
    ///
    /// # Errors
    ///
    /// Malformed key or signature bytes.
    fn verify(&self, public_key: &[u8], hash: &Hash, signature: &[u8]) -> Result<bool, CryptoError>;
}

// =============================================================================
// PAYMENT
// =============================================================================

/// Which settlement is being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMode {
    /// Contract succeeded.
    Success,
    /// Contract failed; only the fee is kept.
    Failure,
}

/// Fee hooks called by the coordinator.
pub trait PaymentGateway: Send + Sync {
    /// Returns true if this execution must be paid for.
    fn needs_payment(&self, ctx: &ExecutionContext) -> bool;

    /// Checks that the payer can be charged. Must not write.
    ///
    /// # Errors
    ///
    /// `PayerNotFound` or `InsufficientFunds`.
    fn prepare(&self, ctx: &ExecutionContext, storage: &dyn StorageTransaction)
        -> Result<(), PaymentError>;

    /// Charges the fee for the fuel recorded in `ctx`.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` or storage failures.
    fn settle(
        &self,
        ctx: &ExecutionContext,
        storage: &mut dyn StorageTransaction,
        mode: PaymentMode,
    ) -> Result<(), PaymentError>;
}
