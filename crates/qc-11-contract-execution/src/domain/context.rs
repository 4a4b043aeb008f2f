//! # Execution Context
//!
//! Everything one transaction carries through the pipeline. Created fresh per
//! transaction and dropped when processing returns; never shared.

use super::call_stack::CallStack;
use super::entities::{
    BlockHeader, CompiledContract, ExecutionFlags, FlushInfo, KeyRecord, Notification,
    RollbackRecord, TransactionDescriptor,
};
use super::environment::Environment;
use super::fuel::FuelLedger;
use std::fmt;
use std::sync::Arc;

/// Pipeline state of one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Nothing checked yet.
    Start,
    /// Signer resolved and signature verified.
    Authenticated,
    /// Payment prepared (or not required).
    PaymentReserved,
    /// Target contract entered on the call stack.
    StackPushed,
    /// Interpreter ran.
    Invoked,
    /// Writes and fee committed.
    Committed,
    /// Writes rolled back, fee charged.
    FeeCharged,
    /// Everything rolled back.
    RolledBack,
}

impl ExecutionState {
    /// Returns true for terminal states.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::FeeCharged | Self::RolledBack)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Authenticated => "authenticated",
            Self::PaymentReserved => "payment_reserved",
            Self::StackPushed => "stack_pushed",
            Self::Invoked => "invoked",
            Self::Committed => "committed",
            Self::FeeCharged => "fee_charged",
            Self::RolledBack => "rolled_back",
        };
        f.write_str(name)
    }
}

/// Per-transaction execution context.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Transaction being executed.
    pub tx: TransactionDescriptor,
    /// Target contract.
    pub contract: Arc<CompiledContract>,
    /// Current block.
    pub block: BlockHeader,
    /// Previous block.
    pub prev_block: BlockHeader,
    /// Resolved signer id.
    pub signer_id: i64,
    /// Signer key record, once authenticated.
    pub key: Option<KeyRecord>,
    /// Fuel ledger.
    pub fuel: FuelLedger,
    /// Mode flags.
    pub flags: ExecutionFlags,
    /// Environment visible to contract code.
    pub env: Environment,
    /// Recursion guard.
    pub call_stack: CallStack,
    /// Undo records of writes made so far.
    pub rollback: Vec<RollbackRecord>,
    /// Notifications queued so far.
    pub notifications: Vec<Notification>,
    /// Registry changes to undo on failure.
    pub flush: Vec<FlushInfo>,
    /// Whether a payment was prepared.
    pub payment_reserved: bool,
    /// Pipeline state.
    pub state: ExecutionState,
}

impl ExecutionContext {
    /// Creates a context in the `Start` state.
    #[must_use]
    pub fn new(
        tx: TransactionDescriptor,
        contract: Arc<CompiledContract>,
        block: BlockHeader,
        prev_block: BlockHeader,
        flags: ExecutionFlags,
    ) -> Self {
        let signer_id = tx.key_id;
        Self {
            tx,
            contract,
            block,
            prev_block,
            signer_id,
            key: None,
            fuel: FuelLedger::default(),
            flags,
            env: Environment::new(),
            call_stack: CallStack::new(),
            rollback: Vec::new(),
            notifications: Vec::new(),
            flush: Vec::new(),
            payment_reserved: false,
            state: ExecutionState::Start,
        }
    }

    /// Ecosystem the transaction runs in.
    #[must_use]
    pub fn ecosystem_id(&self) -> i64 {
        self.tx.ecosystem_id
    }

    /// Advances the pipeline state.
    pub fn advance(&mut self, state: ExecutionState) {
        tracing::trace!(from = %self.state, to = %state, "execution state");
        self.state = state;
    }

    /// Drops pending rollback and notification records.
    pub fn discard_records(&mut self) {
        self.rollback.clear();
        self.notifications.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{OwnerInfo, ProgramHandle};
    use std::collections::BTreeSet;

    fn test_contract() -> Arc<CompiledContract> {
        Arc::new(CompiledContract {
            id: 1,
            name: "@1Test".into(),
            owner: OwnerInfo::default(),
            methods: vec!["action".into()],
            fields: vec![],
            used: BTreeSet::new(),
            program: ProgramHandle::new(()),
        })
    }

    #[test]
    fn test_new_context_starts_at_start() {
        let tx = TransactionDescriptor {
            key_id: 9,
            ecosystem_id: 2,
            ..Default::default()
        };
        let ctx = ExecutionContext::new(
            tx,
            test_contract(),
            BlockHeader::default(),
            BlockHeader::default(),
            ExecutionFlags::default(),
        );
        assert_eq!(ctx.state, ExecutionState::Start);
        assert_eq!(ctx.signer_id, 9);
        assert_eq!(ctx.ecosystem_id(), 2);
        assert!(!ctx.state.is_terminal());
    }

    #[test]
    fn test_discard_records() {
        let mut ctx = ExecutionContext::new(
            TransactionDescriptor::default(),
            test_contract(),
            BlockHeader::default(),
            BlockHeader::default(),
            ExecutionFlags::default(),
        );
        ctx.rollback.push(RollbackRecord {
            table: "1_t".into(),
            row_id: 1,
            data: String::new(),
        });
        ctx.notifications.push(Notification {
            ecosystem_id: 1,
            key_id: 1,
            payload: "x".into(),
        });
        ctx.discard_records();
        assert!(ctx.rollback.is_empty());
        assert!(ctx.notifications.is_empty());
        assert!(ExecutionState::FeeCharged.is_terminal());
    }
}
