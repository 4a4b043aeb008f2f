//! # Domain Invariants
//!
//! Conditions that must hold when an execution reaches a terminal state.
//! The coordinator checks them after every transaction and logs violations.
//!
//! | Invariant | Check |
//! |-----------|-------|
//! | Fuel settlement never negative, never above the limit | `check_fuel_invariant()` |
//! | Result text at most 255 characters plus `...` | `check_result_length_invariant()` |
//! | Failed executions leave no registry changes behind | `check_flush_undone_invariant()` |
//! | Failed executions keep no rollback or notification records | `check_records_discarded_invariant()` |

use crate::domain::context::{ExecutionContext, ExecutionState};

/// Maximum result length in characters before truncation.
pub const MAX_RESULT_CHARS: usize = 255;

/// Suffix appended to truncated results.
pub const TRUNCATION_SUFFIX: &str = "...";

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// Consumed fuel is within `0..=limit`.
#[must_use]
pub fn check_fuel_invariant(ctx: &ExecutionContext) -> bool {
    ctx.fuel.consumed >= 0 && ctx.fuel.consumed <= ctx.fuel.limit.max(0)
}

/// Result text fits the truncation bound.
#[must_use]
pub fn check_result_length_invariant(result: &str) -> bool {
    result.chars().count() <= MAX_RESULT_CHARS + TRUNCATION_SUFFIX.len()
}

/// After a failure every `FlushInfo` has been undone.
#[must_use]
pub fn check_flush_undone_invariant(ctx: &ExecutionContext) -> bool {
    ctx.state == ExecutionState::Committed || ctx.flush.is_empty()
}

/// After a failure no rollback or notification record survives.
#[must_use]
pub fn check_records_discarded_invariant(ctx: &ExecutionContext) -> bool {
    ctx.state == ExecutionState::Committed
        || (ctx.rollback.is_empty() && ctx.notifications.is_empty())
}

// =============================================================================
// COMPOSITE CHECK
// =============================================================================

/// Result of checking all invariants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvariantCheckResult {
    /// Names of the violated invariants.
    pub violations: Vec<&'static str>,
}

impl InvariantCheckResult {
    /// Returns true if nothing was violated.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Checks every invariant against a finished execution.
#[must_use]
pub fn check_all_invariants(ctx: &ExecutionContext, result: &str) -> InvariantCheckResult {
    let mut violations = Vec::new();
    if !check_fuel_invariant(ctx) {
        violations.push("fuel_settlement");
    }
    if !check_result_length_invariant(result) {
        violations.push("result_length");
    }
    if !check_flush_undone_invariant(ctx) {
        violations.push("flush_undone");
    }
    if !check_records_discarded_invariant(ctx) {
        violations.push("records_discarded");
    }
    InvariantCheckResult { violations }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{
        BlockHeader, CompiledContract, ExecutionFlags, FlushChange, FlushInfo, OwnerInfo,
        ProgramHandle, TransactionDescriptor,
    };
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn ctx() -> ExecutionContext {
        let contract = Arc::new(CompiledContract {
            id: 1,
            name: "@1Test".into(),
            owner: OwnerInfo::default(),
            methods: vec![],
            fields: vec![],
            used: BTreeSet::new(),
            program: ProgramHandle::new(()),
        });
        ExecutionContext::new(
            TransactionDescriptor::default(),
            contract,
            BlockHeader::default(),
            BlockHeader::default(),
            ExecutionFlags::default(),
        )
    }

    #[test]
    fn test_fuel_invariant() {
        let mut ctx = ctx();
        ctx.fuel.limit = 100;
        ctx.fuel.consumed = 100;
        assert!(check_fuel_invariant(&ctx));
        ctx.fuel.consumed = 101;
        assert!(!check_fuel_invariant(&ctx));
    }

    #[test]
    fn test_result_length_invariant() {
        assert!(check_result_length_invariant(&"x".repeat(258)));
        assert!(!check_result_length_invariant(&"x".repeat(259)));
    }

    #[test]
    fn test_flush_must_be_undone_after_failure() {
        let mut ctx = ctx();
        ctx.flush.push(FlushInfo {
            table_id: 1,
            ecosystem_id: 1,
            change: FlushChange::Active { previous: false },
        });
        ctx.state = ExecutionState::FeeCharged;
        let result = check_all_invariants(&ctx, "");
        assert_eq!(result.violations, vec!["flush_undone"]);

        ctx.state = ExecutionState::Committed;
        assert!(check_all_invariants(&ctx, "").is_ok());
    }
}
