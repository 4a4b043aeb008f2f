//! # QC-11 Contract Execution - Transaction Execution Core
//!
//! **Subsystem ID:** 11
//!
//! ## Purpose
//!
//! Runs one signed transaction against one compiled contract inside a
//! caller-owned storage transaction. The transaction either commits its
//! writes, keeps only the fee for its failure, or is rejected with nothing
//! surviving.
//!
//! ## Execution Pipeline
//!
//! ```text
//! Received -> Authenticated -> PaymentReserved -> Running
//!          -> Committed | FeeCharged | Rejected
//! ```
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Registry | `registry.rs` | Compiled contracts by name and id |
//! | Authenticator | `auth.rs` | Signer resolution, signature check |
//! | Access Evaluator | `access.rs` | Table, column and condition permissions |
//! | Fuel Accountant | `domain/fuel.rs` | Spend limit, base charge, settlement |
//! | Recursion Guard | `domain/call_stack.rs` | Contract call stack |
//! | Execution Coordinator | `coordinator.rs` | State machine, savepoints, undo |
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Fuel never exceeds the spend limit | `domain/fuel.rs` - `FuelLedger::record()` |
//! | Results are at most 255 characters | `coordinator.rs` - `truncate_result()` |
//! | Registry mutations are undone on failure | `coordinator.rs` - rollback path |
//! | No contract appears twice on the call stack | `domain/call_stack.rs` - `CallStack::push()` |
//!
//! ## Outbound Dependencies
//!
//! | Collaborator | Trait | Purpose |
//! |--------------|-------|---------|
//! | Compiler / VM | `Interpreter` | Compile and run contract code |
//! | Database | `StorageTransaction` | Rows, keys, savepoints |
//! | Key crypto | `KeyCrypto` | Key ids and signature verification |
//! | Fees | `PaymentGateway` | Fee reservation and settlement |
//!
//! ## Usage Example
//!
//! ```ignore
//! use qc_11_contract_execution::prelude::*;
//!
//! let service = create_test_service();
//! service.load_contracts().await?;
//!
//! let response = service
//!     .handle_execute_transaction(correlation_id, payload)
//!     .await?;
//! if response.is_committed() {
//!     println!("Fuel used: {}", response.fuel_used);
//! }
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod access;
pub mod adapters;
pub mod auth;
pub mod coordinator;
pub mod domain;
pub mod errors;
pub mod events;
pub mod ports;
pub mod registry;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        BlockHeader, CompiledContract, ContractRecord, ExecutionFlags, ExecutionOutcome,
        ExecutionStatus, FlushChange, FlushInfo, HonorNode, KeyRecord, Notification,
        ParameterRecord, RollbackRecord, SystemParameters, TableAction, TableRecord,
        TransactionDescriptor,
    };

    // Value objects
    pub use crate::domain::value_objects::{address_to_string, Hash, Value};

    // Execution state
    pub use crate::domain::call_stack::CallStack;
    pub use crate::domain::context::{ExecutionContext, ExecutionState};
    pub use crate::domain::environment::{EnvKey, Environment};
    pub use crate::domain::fuel::FuelLedger;

    // Invariants
    pub use crate::domain::invariants::{check_all_invariants, InvariantCheckResult};

    // Components
    pub use crate::access::AccessEvaluator;
    pub use crate::auth::Authenticator;
    pub use crate::coordinator::ExecutionCoordinator;
    pub use crate::registry::{ContractInfo, Registry};

    // Ports
    pub use crate::ports::inbound::{
        ContractExecutionApi, ContractExecutionServiceApi, ExecutionRequest, RegistryLoader,
    };
    pub use crate::ports::outbound::{
        ContractHost, ContractStore, Interpreter, KeyCrypto, PaymentGateway, PaymentMode, Row,
        StorageProvider, StorageSession, StorageTransaction,
    };

    // Events
    pub use crate::events::{ExecuteTransactionRequestPayload, ExecuteTransactionResponsePayload};

    // Errors
    pub use crate::errors::{
        AccessError, AuthError, ExecutionError, PaymentError, RegistryError, RuntimeError,
        ServiceError, StorageError,
    };

    // Adapters
    pub use crate::adapters::{FlatFeePayment, InMemoryStorage, ScriptInterpreter, Secp256k1Crypto};

    // Service
    pub use crate::service::{
        create_test_service, ContractExecutionService, ServiceConfig, ServiceStats,
    };
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Subsystem ID.
pub const SUBSYSTEM_ID: u8 = 11;

/// Subsystem name.
pub const SUBSYSTEM_NAME: &str = "Contract Execution";

// =============================================================================
// TESTS
// =============================================================================
