//! # Core Domain Entities
//!
//! Main business entities for contract execution: compiled contracts and
//! their persisted records, transaction and block inputs, key and permission
//! records read from storage, and the records an execution produces.

use crate::domain::value_objects::{Hash, Value};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// COMPILED OBJECTS
// =============================================================================

/// Ownership data handed to the compiler with each contract source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OwnerInfo {
    /// Owning ecosystem.
    pub ecosystem_id: i64,
    /// Id of the persisted contract record.
    pub table_id: i64,
    /// Wallet credited with the contract's fees.
    pub wallet_id: i64,
    /// Token the contract is paid in.
    pub token_id: i64,
    /// Whether the contract is activated.
    pub active: bool,
}

/// A typed input field declared by a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractField {
    /// Field name.
    pub name: String,
    /// Declared type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Whether the transaction may omit the field.
    pub optional: bool,
}

/// Opaque handle to an interpreter's compiled block.
///
/// Only the interpreter that produced it knows the concrete type.
#[derive(Clone)]
pub struct ProgramHandle(Arc<dyn Any + Send + Sync>);

impl ProgramHandle {
    /// Wraps an interpreter-specific compiled block.
    pub fn new<T: Any + Send + Sync>(block: T) -> Self {
        Self(Arc::new(block))
    }

    /// Recovers the concrete compiled block.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for ProgramHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProgramHandle(..)")
    }
}

/// Kind of object produced by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Callable contract.
    Contract,
    /// Free function (system functions).
    Function,
}

/// One object produced by `Interpreter::compile`.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    /// Unqualified name as written in the source.
    pub name: String,
    /// Contract or function.
    pub kind: UnitKind,
    /// Declared methods (`conditions`, `action`, ...).
    pub methods: Vec<String>,
    /// Declared input fields.
    pub fields: Vec<ContractField>,
    /// Qualified names of contracts this unit calls.
    pub used: BTreeSet<String>,
    /// Compiled block.
    pub program: ProgramHandle,
}

/// A contract registered in the registry.
///
/// Identity (`id`, `name`, ecosystem, table id) never changes after
/// registration; only the active flag and wallet are mutated.
#[derive(Debug, Clone)]
pub struct CompiledContract {
    /// Registry-assigned arena index.
    pub id: usize,
    /// Ecosystem-qualified name (`@1Name`).
    pub name: String,
    /// Ownership data.
    pub owner: OwnerInfo,
    /// Declared methods.
    pub methods: Vec<String>,
    /// Declared input fields.
    pub fields: Vec<ContractField>,
    /// Qualified names of contracts called from this one.
    pub used: BTreeSet<String>,
    /// Compiled block.
    pub program: ProgramHandle,
}

impl CompiledContract {
    /// Owning ecosystem.
    #[must_use]
    pub fn ecosystem_id(&self) -> i64 {
        self.owner.ecosystem_id
    }

    /// Persisted record id.
    #[must_use]
    pub fn table_id(&self) -> i64 {
        self.owner.table_id
    }

    /// Returns the declared method with this name.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&str> {
        self.methods
            .iter()
            .find(|m| m.as_str() == name)
            .map(String::as_str)
    }

    /// Returns true if the contract declares `name`.
    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.method(name).is_some()
    }
}

// =============================================================================
// PERSISTED RECORDS
// =============================================================================

/// A row of the contracts table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
    /// Record id (table id).
    pub id: i64,
    /// Owning ecosystem.
    pub ecosystem_id: i64,
    /// Contract source.
    pub value: String,
    /// Wallet credited with fees.
    pub wallet_id: i64,
    /// Payment token.
    pub token_id: i64,
    /// Activation flag.
    pub active: bool,
    /// Change conditions.
    pub conditions: String,
    /// Owning application.
    pub app_id: i64,
}

impl ContractRecord {
    /// Ownership data for the compiler.
    #[must_use]
    pub fn owner(&self) -> OwnerInfo {
        OwnerInfo {
            ecosystem_id: self.ecosystem_id,
            table_id: self.id,
            wallet_id: self.wallet_id,
            token_id: self.token_id,
            active: self.active,
        }
    }
}

/// Per-(ecosystem, address) authentication record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Key id (derived address).
    pub id: i64,
    /// Ecosystem the record belongs to.
    pub ecosystem_id: i64,
    /// Dashed account string.
    pub account: String,
    /// Registered public key; empty when not yet bound.
    #[serde(with = "hex::serde")]
    pub public_key: Vec<u8>,
    /// Balance.
    pub amount: i64,
    /// Disabled keys cannot sign.
    pub disabled: bool,
}

/// Action a table permission governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableAction {
    /// Row insert.
    Insert,
    /// Row update.
    Update,
    /// Row read.
    Read,
    /// Column creation.
    NewColumn,
}

impl TableAction {
    /// Key in the permissions map.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Read => "read",
            Self::NewColumn => "new_column",
        }
    }

    /// Returns true for actions that modify the table.
    #[must_use]
    pub const fn is_write(self) -> bool {
        !matches!(self, Self::Read)
    }
}

impl fmt::Display for TableAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permissions record of a custom table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRecord {
    /// Unprefixed table name.
    pub name: String,
    /// Action name to permission expression.
    pub permissions: BTreeMap<String, String>,
    /// Column name to access rule: a bare update expression or a
    /// `{"read": .., "update": ..}` JSON pair.
    pub columns: BTreeMap<String, String>,
}

impl TableRecord {
    /// Permission expression for an action (empty when unset).
    #[must_use]
    pub fn permission(&self, action: TableAction) -> &str {
        self.permissions
            .get(action.as_str())
            .map_or("", String::as_str)
    }
}

/// An ecosystem parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRecord {
    /// Parameter name.
    pub name: String,
    /// Parameter value.
    pub value: String,
    /// Expression guarding changes to the parameter.
    pub conditions: String,
}

// =============================================================================
// TRANSACTION / BLOCK INPUTS
// =============================================================================

/// Transaction to execute. Read-only to the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionDescriptor {
    /// Id of the contract being called (display or internal form).
    pub contract_id: i64,
    /// Ecosystem the transaction runs in.
    pub ecosystem_id: i64,
    /// Signer key id.
    pub key_id: i64,
    /// Delegated signer, if any.
    pub signed_by: Option<i64>,
    /// Public key supplied with the transaction.
    #[serde(with = "hex::serde")]
    pub public_key: Vec<u8>,
    /// Signature over `hash`.
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,
    /// Declared spending cap as text.
    pub max_sum: Option<String>,
    /// Transaction hash.
    pub hash: Hash,
    /// Transaction timestamp.
    pub time: i64,
    /// Serialized size in bytes.
    pub size: i64,
    /// Named fields consumed by the contract.
    pub fields: BTreeMap<String, Value>,
}

/// Block header data exposed to contracts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block number.
    pub block_id: i64,
    /// Producer key id.
    pub key_id: i64,
    /// Block timestamp.
    pub timestamp: i64,
    /// Producer position in the node list.
    pub node_position: i64,
    /// Block hash.
    pub hash: Hash,
}

/// Execution mode flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFlags {
    /// Skip every permission check.
    pub full_access: bool,
    /// Dry run on a single node.
    pub local_simulation: bool,
    /// Running while producing a block.
    pub block_generation: bool,
}

// =============================================================================
// EXECUTION RECORDS
// =============================================================================

/// Registry change recorded during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushChange {
    /// Active flag toggled; holds the previous value.
    Active {
        /// Value before the change.
        previous: bool,
    },
    /// Wallet reassigned; holds the previous wallet.
    Wallet {
        /// Value before the change.
        previous: i64,
    },
}

/// Compensating record for a registry mutation made inside a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushInfo {
    /// Contract record id.
    pub table_id: i64,
    /// Contract ecosystem.
    pub ecosystem_id: i64,
    /// What changed.
    pub change: FlushChange,
}

/// Row-level undo record produced by contract writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackRecord {
    /// Qualified table name.
    pub table: String,
    /// Row id.
    pub row_id: i64,
    /// Previous row as JSON (empty for inserts).
    pub data: String,
}

/// Notification queued by contract code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Ecosystem.
    pub ecosystem_id: i64,
    /// Recipient key id.
    pub key_id: i64,
    /// Payload text.
    pub payload: String,
}

/// Terminal state of a transaction that was not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Contract writes and fee committed.
    Committed,
    /// Contract failed; only the fee was charged.
    FeeCharged,
}

/// Result of an executed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Committed or fee-only.
    pub status: ExecutionStatus,
    /// Result text on commit; client error text when fee-charged.
    pub result: String,
    /// Fuel consumed.
    pub fuel_used: i64,
    /// Undo records of committed writes.
    pub rollback: Vec<RollbackRecord>,
    /// Notifications to deliver.
    pub notifications: Vec<Notification>,
}

impl ExecutionOutcome {
    /// Returns true when contract writes were kept.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.status == ExecutionStatus::Committed
    }
}

// =============================================================================
// SYSTEM PARAMETERS
// =============================================================================

/// A consensus node allowed to sign delayed transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HonorNode {
    /// Node public key.
    #[serde(with = "hex::serde")]
    pub public_key: Vec<u8>,
}

/// Network-wide configuration consumed by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemParameters {
    /// Default fuel limit when a transaction declares none (default: 10,000,000).
    pub max_cost: i64,
    /// Fuel charged per KiB of transaction payload (default: 100).
    pub size_fuel: i64,
    /// Private chains enforce read permissions.
    pub private_chain: bool,
    /// Consensus nodes.
    pub honor_nodes: Vec<HonorNode>,
    /// This node's public key.
    #[serde(with = "hex::serde")]
    pub node_public_key: Vec<u8>,
    /// Candidate-node deployments accept any delegated signer.
    pub candidate_node_mode: bool,
    /// Interpreter hard time limit in milliseconds (default: 5000).
    pub time_limit_ms: u64,
}

impl Default for SystemParameters {
    fn default() -> Self {
        Self {
            max_cost: 10_000_000,
            size_fuel: 100,
            private_chain: false,
            honor_nodes: Vec::new(),
            node_public_key: Vec::new(),
            candidate_node_mode: false,
            time_limit_ms: 5_000,
        }
    }
}

impl SystemParameters {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_cost <= 0 {
            return Err(ConfigError::OutOfRange {
                name: "max_cost",
                expected: "positive",
                actual: self.max_cost,
            });
        }
        if self.size_fuel < 0 {
            return Err(ConfigError::OutOfRange {
                name: "size_fuel",
                expected: "non-negative",
                actual: self.size_fuel,
            });
        }
        if self.time_limit_ms == 0 {
            return Err(ConfigError::OutOfRange {
                name: "time_limit_ms",
                expected: "positive",
                actual: 0,
            });
        }
        if let Some(index) = self
            .honor_nodes
            .iter()
            .position(|node| node.public_key.is_empty())
        {
            return Err(ConfigError::EmptyNodeKey(index));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_record_owner() {
        let record = ContractRecord {
            id: 7,
            ecosystem_id: 2,
            value: String::new(),
            wallet_id: 11,
            token_id: 1,
            active: true,
            conditions: String::new(),
            app_id: 0,
        };
        let owner = record.owner();
        assert_eq!(owner.table_id, 7);
        assert_eq!(owner.ecosystem_id, 2);
        assert_eq!(owner.wallet_id, 11);
        assert!(owner.active);
    }

    #[test]
    fn test_program_handle_downcast() {
        let handle = ProgramHandle::new(42u32);
        assert_eq!(handle.downcast_ref::<u32>(), Some(&42));
        assert!(handle.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_table_permission_lookup() {
        let mut table = TableRecord::default();
        table
            .permissions
            .insert("insert".into(), "$key_id == 1".into());
        assert_eq!(table.permission(TableAction::Insert), "$key_id == 1");
        assert_eq!(table.permission(TableAction::Update), "");
        assert!(TableAction::NewColumn.is_write());
        assert!(!TableAction::Read.is_write());
    }

    #[test]
    fn test_system_parameters_default_is_valid() {
        assert!(SystemParameters::default().validate().is_ok());
    }

    #[test]
    fn test_system_parameters_validate() {
        let params = SystemParameters {
            max_cost: 0,
            ..SystemParameters::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::OutOfRange { name: "max_cost", .. })
        ));

        let params = SystemParameters {
            honor_nodes: vec![HonorNode { public_key: vec![] }],
            ..SystemParameters::default()
        };
        assert_eq!(params.validate(), Err(ConfigError::EmptyNodeKey(0)));
    }

    #[test]
    fn test_system_parameters_from_json() {
        let params: SystemParameters =
            serde_json::from_str(r#"{"max_cost": 500, "private_chain": true}"#).unwrap();
        assert_eq!(params.max_cost, 500);
        assert!(params.private_chain);
        assert_eq!(params.size_fuel, 100);
    }
}
