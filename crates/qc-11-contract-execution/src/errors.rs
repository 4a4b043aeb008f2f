//! # Error Types
//!
//! All error types for the contract execution pipeline.
//!
//! | Error | Raised by | Effect on the transaction |
//! |-------|-----------|---------------------------|
//! | `AuthError` | Authenticator | rejected, nothing mutated |
//! | `AccessError` | Access Evaluator | fails the call, then the failure-settlement path |
//! | `RuntimeError` | Interpreter / host functions | failure-settlement path |
//! | `PaymentError` | Payment gateway | rejected when the fee cannot be charged |
//! | `RegistryError` | Registry loading | surfaced at node startup |

use thiserror::Error;

// =============================================================================
// STORAGE ERRORS
// =============================================================================

/// Errors from the relational storage layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Savepoint was never created (or already released).
    #[error("savepoint not found: {0}")]
    SavepointNotFound(String),

    /// Row does not exist.
    #[error("row {id} not found in {table}")]
    RowNotFound { table: String, id: i64 },

    /// Stored value could not be decoded.
    #[error("corrupted record in {table}: {reason}")]
    Corrupted { table: String, reason: String },

    /// Storage backend is not reachable.
    #[error("storage unavailable")]
    Unavailable,

    /// Other storage error.
    #[error("storage error: {0}")]
    Other(String),
}

// =============================================================================
// CRYPTO ERRORS
// =============================================================================

/// Errors from key decoding and signature verification primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Public key bytes are not a valid curve point.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Signature bytes could not be decoded.
    #[error("invalid signature encoding")]
    InvalidSignature,
}

// =============================================================================
// COMPILE / EVAL ERRORS (interpreter collaborator)
// =============================================================================

/// Errors reported by the compiler when turning source into objects.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Malformed source.
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// Reference to an object that is neither compiled nor ignorable.
    #[error("unknown identifier {0}")]
    UnknownObject(String),

    /// Two objects with the same name in one source.
    #[error("{0} is already defined")]
    Duplicate(String),
}

/// Error from evaluating a boolean expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EvalError(pub String);

// =============================================================================
// REGISTRY ERRORS
// =============================================================================

/// Errors raised while loading contracts into the registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A contract record failed to compile; nothing from the call was registered.
    #[error("load contract {table_id} ({names}): {source}")]
    Compile {
        table_id: i64,
        names: String,
        #[source]
        source: CompileError,
    },

    /// The built-in system functions failed to compile.
    #[error("system functions: {0}")]
    SystemFunctions(#[source] CompileError),

    /// `(ecosystem, name)` is already registered.
    #[error("contract {0} is already registered")]
    Duplicate(String),

    /// Contract records could not be read.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// =============================================================================
// AUTHENTICATION ERRORS
// =============================================================================

/// Errors from signer resolution and signature verification.
///
/// Always fatal to the transaction; raised before anything is written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Supplied public key does not derive to the transaction's key id.
    #[error("public key and key id are different")]
    DifferentKeys,

    /// Delegated signer used for a contract outside the delayed allow-list.
    #[error("delayed contract {0} is not allowed")]
    DelayedContractNotAllowed(String),

    /// Delegated signer is not an honor node.
    #[error("incorrect delayed contract signer")]
    DelayedContract,

    /// No key record in the ecosystem.
    #[error("key {key} is not found in ecosystem {ecosystem}")]
    EcosystemKeyNotFound { key: String, ecosystem: i64 },

    /// Key record is disabled.
    #[error("key {key} is disabled in ecosystem {ecosystem}")]
    EcosystemKeyDisabled { key: String, ecosystem: i64 },

    /// Neither the key record nor the transaction carries a public key.
    #[error("empty public key")]
    EmptyPublicKey,

    /// Signature does not verify against the resolved public key.
    #[error("incorrect signature")]
    IncorrectSignature,

    /// Key or signature bytes are malformed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Key lookup failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// =============================================================================
// ACCESS ERRORS
// =============================================================================

/// Which check refused access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    /// Table permission.
    Table,
    /// Column permission.
    Column,
    /// Ecosystem parameter condition.
    Condition,
    /// Privileged system table.
    System,
}

impl std::fmt::Display for AccessScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Table => "table",
            Self::Column => "column",
            Self::Condition => "condition",
            Self::System => "system",
        };
        f.write_str(name)
    }
}

/// Errors from table, column and condition permission checks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// Permission expression evaluated to false.
    #[error("{0}: access denied")]
    AccessDenied(AccessScope),

    /// Write to a table that has no permissions record.
    #[error("{0} is not a custom table")]
    NotCustomTable(String),

    /// Column update on a table that does not exist.
    #[error("table {0} has not been found")]
    TableNotFound(String),

    /// Ecosystem parameter has no expression to evaluate.
    #[error("there is not {0} condition")]
    MissingCondition(String),

    /// Column permission is neither a bare expression nor a `{read, update}` pair.
    #[error("invalid column permissions for {column}: {reason}")]
    InvalidPermissions { column: String, reason: String },

    /// Permission expression failed to evaluate.
    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvalError),

    /// Permission lookup failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AccessError {
    /// Returns true if the caller was refused (as opposed to a lookup failure).
    #[must_use]
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::AccessDenied(_) | Self::NotCustomTable(_))
    }
}

// =============================================================================
// PAYMENT ERRORS
// =============================================================================

/// Errors from the payment preparation and settlement hooks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// Payer cannot cover the fee.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    /// Payer has no key record.
    #[error("payer {0} is not found")]
    PayerNotFound(String),

    /// Fee could not be written.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// =============================================================================
// RUNTIME ERRORS
// =============================================================================

/// Errors raised while a contract runs: by the interpreter itself or by the
/// host functions it calls back into.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Error raised by contract code.
    #[error("{0}")]
    Domain(String),

    /// Fuel budget exhausted.
    #[error("paid cost limit exceeded: {spent} > {limit}")]
    ResourceExhausted { spent: i64, limit: i64 },

    /// Interpreter hard time limit hit.
    #[error("time limit exceeded: {elapsed_ms}ms > {max_ms}ms")]
    Timeout { elapsed_ms: u64, max_ms: u64 },

    /// Contract is already on the call stack.
    #[error("there is loop in {0} contract")]
    ContractLoop(String),

    /// Called contract is not registered.
    #[error("unknown contract {0}")]
    UnknownContract(String),

    /// Result slot holds bytes that are not UTF-8 text.
    #[error("result is not a valid utf-8 string")]
    NotValidUtf8,

    /// Permission check inside a host function.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Expression evaluation inside contract code.
    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvalError),

    /// Success-mode payment settlement failed.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Storage failure inside a host function.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl RuntimeError {
    /// Returns true for the interpreter's hard time limit.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns true when the fuel budget ran out.
    #[must_use]
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, Self::ResourceExhausted { .. })
    }

    /// Text handed back to clients.
    ///
    /// Errors that are already structured (JSON objects) and timeouts pass
    /// through; everything else is wrapped as a `panic` object.
    #[must_use]
    pub fn client_message(&self) -> String {
        let text = self.to_string();
        if text.starts_with('{') || self.is_timeout() {
            return text;
        }
        serde_json::json!({ "type": "panic", "error": text }).to_string()
    }
}

// =============================================================================
// EXECUTION ERRORS (top level)
// =============================================================================

/// Outcome of a rejected transaction.
///
/// Every variant means the transaction is excluded: none of its writes and no
/// fee survive.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Signature or signer check failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Payment could not be reserved.
    #[error("prepare payment: {0}")]
    PaymentPreparation(#[source] PaymentError),

    /// Target contract is not registered.
    #[error("contract {0} is not found")]
    ContractNotFound(String),

    /// Contract failed and no payment was reserved.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Contract failed and the failure fee could not be charged either.
    #[error("{primary}: {settlement}")]
    Settlement {
        primary: RuntimeError,
        settlement: PaymentError,
    },

    /// Savepoint bookkeeping failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ExecutionError {
    /// Returns true if the interpreter timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Runtime(err) | Self::Settlement { primary: err, .. } if err.is_timeout())
    }

    /// Returns true if the transaction can never be included and should be
    /// dropped from the queue. Timeouts and storage failures are node-side and
    /// leave the transaction eligible for a later block.
    #[must_use]
    pub fn excludes_transaction(&self) -> bool {
        !matches!(self, Self::Storage(_)) && !self.is_timeout()
    }

    /// Text handed back to clients.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Runtime(err) => err.client_message(),
            other => other.to_string(),
        }
    }
}

// =============================================================================
// CONFIG ERRORS
// =============================================================================

/// Invalid system parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A numeric parameter is out of range.
    #[error("{name} must be {expected}, got {actual}")]
    OutOfRange {
        name: &'static str,
        expected: &'static str,
        actual: i64,
    },

    /// A configured node public key is empty.
    #[error("honor node {0} has an empty public key")]
    EmptyNodeKey(usize),
}

// =============================================================================
// SERVICE ERRORS
// =============================================================================

/// Errors from the async service facade.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Blocking execution task panicked or was cancelled.
    #[error("execution task failed: {0}")]
    TaskFailed(String),

    /// Registry load failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

// =============================================================================
// TESTS
// =============================================================================
