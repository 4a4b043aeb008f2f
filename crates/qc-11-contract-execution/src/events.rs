//! # Request / Response Payloads
//!
//! Serializable messages exchanged with block processing. The service wraps
//! each request in its own storage transaction.

use crate::domain::entities::{
    BlockHeader, ExecutionFlags, ExecutionOutcome, ExecutionStatus, Notification, RollbackRecord,
    TransactionDescriptor,
};
use crate::domain::value_objects::Hash;
use crate::errors::ExecutionError;
use crate::ports::inbound::ExecutionRequest;
use serde::{Deserialize, Serialize};

// =============================================================================
// INBOUND
// =============================================================================

/// Request to execute one transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecuteTransactionRequestPayload {
    /// Transaction to execute.
    pub tx: TransactionDescriptor,
    /// Block the transaction is executed in.
    pub block: BlockHeader,
    /// Previous block.
    pub prev_block: BlockHeader,
    /// Mode flags.
    #[serde(default)]
    pub flags: ExecutionFlags,
    /// Savepoint name; derived from the transaction hash when absent.
    #[serde(default)]
    pub savepoint: Option<String>,
}

impl From<ExecuteTransactionRequestPayload> for ExecutionRequest {
    fn from(payload: ExecuteTransactionRequestPayload) -> Self {
        let mut request = ExecutionRequest::new(payload.tx, payload.block, payload.prev_block)
            .with_flags(payload.flags);
        if let Some(savepoint) = payload.savepoint {
            request.savepoint = savepoint;
        }
        request
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Result of an execution request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteTransactionResponsePayload {
    /// Hash of the executed transaction.
    pub tx_hash: Hash,
    /// Terminal status; `None` when the transaction was rejected.
    pub status: Option<ExecutionStatus>,
    /// Result text, or the client error text of a fee-charged failure.
    pub result: String,
    /// Fuel consumed.
    pub fuel_used: i64,
    /// Rejection reason.
    pub error: Option<String>,
    /// Whether the rejected transaction should be dropped for good.
    pub excluded: bool,
    /// Undo records of committed writes.
    pub rollback: Vec<RollbackRecord>,
    /// Notifications to deliver.
    pub notifications: Vec<Notification>,
}

impl ExecuteTransactionResponsePayload {
    /// Response for a transaction that belongs in the block.
    #[must_use]
    pub fn from_outcome(tx_hash: Hash, outcome: ExecutionOutcome) -> Self {
        Self {
            tx_hash,
            status: Some(outcome.status),
            result: outcome.result,
            fuel_used: outcome.fuel_used,
            error: None,
            excluded: false,
            rollback: outcome.rollback,
            notifications: outcome.notifications,
        }
    }

    /// Response for a rejected transaction.
    #[must_use]
    pub fn rejected(tx_hash: Hash, err: &ExecutionError) -> Self {
        Self {
            tx_hash,
            status: None,
            result: String::new(),
            fuel_used: 0,
            error: Some(err.client_message()),
            excluded: err.excludes_transaction(),
            rollback: Vec::new(),
            notifications: Vec::new(),
        }
    }

    /// Returns true if contract writes were kept.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.status == Some(ExecutionStatus::Committed)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AuthError, RuntimeError};

    #[test]
    fn test_request_defaults_from_json() {
        let json = r#"{
            "tx": {
                "contract_id": 5001, "ecosystem_id": 1, "key_id": 42, "signed_by": null,
                "public_key": "", "signature": "", "max_sum": null,
                "hash": [0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0],
                "time": 0, "size": 0, "fields": {"amount": 5}
            },
            "block": {"block_id": 1, "key_id": 0, "timestamp": 0, "node_position": 0,
                      "hash": [0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0]},
            "prev_block": {"block_id": 0, "key_id": 0, "timestamp": 0, "node_position": 0,
                      "hash": [0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0]}
        }"#;
        let payload: ExecuteTransactionRequestPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.flags, ExecutionFlags::default());
        assert!(payload.savepoint.is_none());

        let request = ExecutionRequest::from(payload);
        assert_eq!(request.tx.key_id, 42);
        assert_eq!(request.savepoint, format!("tx_{}", "00".repeat(32)));
    }

    #[test]
    fn test_explicit_savepoint_kept() {
        let payload = ExecuteTransactionRequestPayload {
            tx: TransactionDescriptor::default(),
            block: BlockHeader::default(),
            prev_block: BlockHeader::default(),
            flags: ExecutionFlags::default(),
            savepoint: Some("sp_7".into()),
        };
        assert_eq!(ExecutionRequest::from(payload).savepoint, "sp_7");
    }

    #[test]
    fn test_response_from_outcome() {
        let outcome = ExecutionOutcome {
            status: ExecutionStatus::FeeCharged,
            result: "boom".into(),
            fuel_used: 12,
            rollback: vec![],
            notifications: vec![],
        };
        let response = ExecuteTransactionResponsePayload::from_outcome(Hash::ZERO, outcome);
        assert!(!response.is_committed());
        assert_eq!(response.fuel_used, 12);
        assert!(response.error.is_none());
    }

    #[test]
    fn test_rejected_response() {
        let err = ExecutionError::Auth(AuthError::IncorrectSignature);
        let response = ExecuteTransactionResponsePayload::rejected(Hash::ZERO, &err);
        assert_eq!(response.status, None);
        assert_eq!(response.error.as_deref(), Some("incorrect signature"));
        assert!(response.excluded);

        let err = ExecutionError::Runtime(RuntimeError::Timeout {
            elapsed_ms: 6,
            max_ms: 5,
        });
        assert!(!ExecuteTransactionResponsePayload::rejected(Hash::ZERO, &err).excluded);
    }
}
