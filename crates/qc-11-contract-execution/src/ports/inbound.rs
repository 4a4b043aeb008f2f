//! # Driving Ports (API - Inbound)
//!
//! Interfaces exposed by the contract execution subsystem. Block processing
//! calls these to run transactions and to (re)load the contract registry.

use crate::domain::entities::{
    BlockHeader, ExecutionFlags, ExecutionOutcome, TransactionDescriptor,
};
use crate::errors::{ExecutionError, RegistryError, ServiceError};
use crate::events::{ExecuteTransactionRequestPayload, ExecuteTransactionResponsePayload};
use crate::ports::outbound::{ContractStore, StorageTransaction};
use async_trait::async_trait;
use uuid::Uuid;

// =============================================================================
// EXECUTION REQUEST
// =============================================================================

/// One transaction to execute inside a caller-owned storage transaction.
#[derive(Debug, Clone, Default)]
pub struct ExecutionRequest {
    /// Transaction.
    pub tx: TransactionDescriptor,
    /// Current block.
    pub block: BlockHeader,
    /// Previous block.
    pub prev_block: BlockHeader,
    /// Savepoint name wrapping the transaction's writes.
    pub savepoint: String,
    /// Mode flags.
    pub flags: ExecutionFlags,
}

impl ExecutionRequest {
    /// Request with a savepoint named after the transaction hash.
    #[must_use]
    pub fn new(tx: TransactionDescriptor, block: BlockHeader, prev_block: BlockHeader) -> Self {
        let savepoint = format!("tx_{}", tx.hash.to_hex());
        Self {
            tx,
            block,
            prev_block,
            savepoint,
            flags: ExecutionFlags::default(),
        }
    }

    /// Sets the mode flags.
    #[must_use]
    pub fn with_flags(mut self, flags: ExecutionFlags) -> Self {
        self.flags = flags;
        self
    }
}

// =============================================================================
// SYNCHRONOUS API
// =============================================================================

/// Primary API: run one transaction end to end.
pub trait ContractExecutionApi {
    /// Executes a transaction.
    ///
    /// `Ok` means the transaction belongs in the block: either committed or
    /// fee-charged. `Err` means it is rejected and nothing it did survives.
    ///
    /// # Errors
    ///
    /// `ExecutionError` for rejected transactions.
    fn execute(
        &self,
        storage: &mut dyn StorageTransaction,
        request: ExecutionRequest,
    ) -> Result<ExecutionOutcome, ExecutionError>;
}

/// Registry loading API.
pub trait RegistryLoader {
    /// Loads every persisted contract. Returns the number registered.
    ///
    /// # Errors
    ///
    /// The first contract that fails to compile; nothing from the failing
    /// page is registered.
    fn load_all(&self, store: &dyn ContractStore) -> Result<usize, RegistryError>;

    /// Loads the contracts of one ecosystem. Returns the number registered.
    ///
    /// # Errors
    ///
    /// As for `load_all`, all-or-nothing for the ecosystem.
    fn load_ecosystem(&self, store: &dyn ContractStore, ecosystem_id: i64)
        -> Result<usize, RegistryError>;
}

// =============================================================================
// ASYNC SERVICE API
// =============================================================================

/// Async facade used by the node's message handlers.
#[async_trait]
pub trait ContractExecutionServiceApi: Send + Sync {
    /// Executes a transaction in its own storage transaction and commits it
    /// unless the transaction was rejected.
    async fn handle_execute_transaction(
        &self,
        correlation_id: Uuid,
        payload: ExecuteTransactionRequestPayload,
    ) -> Result<ExecuteTransactionResponsePayload, ServiceError>;

    /// Loads every persisted contract into the registry.
    async fn load_contracts(&self) -> Result<usize, ServiceError>;
}

// =============================================================================
// TESTS
// =============================================================================
