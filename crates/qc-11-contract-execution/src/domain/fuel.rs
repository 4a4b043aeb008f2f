//! # Fuel Accounting
//!
//! Spending limits and consumption for one transaction.

use super::entities::TransactionDescriptor;
use tracing::warn;

/// Fuel ledger of one execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuelLedger {
    /// Spending limit at the start of the execution.
    pub limit: i64,
    /// Fuel consumed so far.
    pub consumed: i64,
}

impl FuelLedger {
    /// Creates a ledger with nothing consumed.
    #[must_use]
    pub const fn new(limit: i64) -> Self {
        Self { limit, consumed: 0 }
    }

    /// Records the settlement of a run that started with `before` and left
    /// `remaining`.
    pub fn record(&mut self, before: i64, remaining: i64) -> i64 {
        let used = settle(before, remaining);
        self.consumed = self.consumed.saturating_add(used);
        used
    }
}

/// Spending limit: the declared cap when present, parseable and not negative,
/// else `max_cost`. A declared cap of zero is honored.
#[must_use]
pub fn spend_limit(tx: &TransactionDescriptor, max_cost: i64) -> i64 {
    tx.max_sum
        .as_deref()
        .and_then(|sum| sum.trim().parse::<i64>().ok())
        .filter(|sum| *sum >= 0)
        .unwrap_or(max_cost)
}

/// Fuel charged for the payload size: `size_fuel * size / 1024`.
#[must_use]
pub fn base_fuel(size_fuel: i64, size: i64) -> i64 {
    size_fuel.saturating_mul(size) / 1024
}

/// Fuel consumed between `before` and `remaining`.
///
/// A negative `remaining` means the interpreter overspent; consumption is
/// clamped to `before`.
#[must_use]
pub fn settle(before: i64, remaining: i64) -> i64 {
    if remaining < 0 {
        warn!(before, remaining, "fuel overspent, clamping to limit");
        return before.max(0);
    }
    before.saturating_sub(remaining).max(0)
}

// =============================================================================
// TESTS
// =============================================================================
