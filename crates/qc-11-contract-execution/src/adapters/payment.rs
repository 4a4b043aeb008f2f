//! # Flat-Rate Payment (reference adapter)
//!
//! `PaymentGateway` charging `min_fee + fuel_used * fuel_price` from the
//! transaction's key to the contract wallet (or the block producer when the
//! contract has no wallet). Every settlement writes a history row.

use crate::domain::context::ExecutionContext;
use crate::domain::services::{history_table, keys_table};
use crate::domain::value_objects::{address_to_string, Value};
use crate::errors::PaymentError;
use crate::ports::outbound::{PaymentGateway, PaymentMode, Row, StorageTransaction};
use tracing::debug;

/// Fee schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatFeePayment {
    /// Fee charged regardless of fuel (default: 10).
    pub min_fee: i64,
    /// Fee per unit of fuel (default: 1).
    pub fuel_price: i64,
    /// Private chains do not charge fees.
    pub private_chain: bool,
}

impl Default for FlatFeePayment {
    fn default() -> Self {
        Self {
            min_fee: 10,
            fuel_price: 1,
            private_chain: false,
        }
    }
}

impl FlatFeePayment {
    /// Creates a schedule.
    #[must_use]
    pub fn new(min_fee: i64, fuel_price: i64) -> Self {
        Self {
            min_fee,
            fuel_price,
            private_chain: false,
        }
    }

    /// Disables fees on private chains.
    #[must_use]
    pub fn with_private_chain(mut self, private_chain: bool) -> Self {
        self.private_chain = private_chain;
        self
    }

    /// Fee for `fuel_used`.
    #[must_use]
    pub fn fee(&self, fuel_used: i64) -> i64 {
        self.min_fee
            .saturating_add(fuel_used.max(0).saturating_mul(self.fuel_price))
    }

    fn payer_balance(
        ctx: &ExecutionContext,
        storage: &dyn StorageTransaction,
    ) -> Result<i64, PaymentError> {
        let payer = ctx.tx.key_id;
        storage
            .key(ctx.ecosystem_id(), payer)?
            .map(|key| key.amount)
            .ok_or_else(|| PaymentError::PayerNotFound(address_to_string(payer)))
    }
}

impl PaymentGateway for FlatFeePayment {
    fn needs_payment(&self, ctx: &ExecutionContext) -> bool {
        !self.private_chain && !ctx.flags.local_simulation && !ctx.flags.full_access
    }

    fn prepare(
        &self,
        ctx: &ExecutionContext,
        storage: &dyn StorageTransaction,
    ) -> Result<(), PaymentError> {
        let available = Self::payer_balance(ctx, storage)?;
        if available < self.min_fee {
            return Err(PaymentError::InsufficientFunds {
                required: self.min_fee,
                available,
            });
        }
        Ok(())
    }

    fn settle(
        &self,
        ctx: &ExecutionContext,
        storage: &mut dyn StorageTransaction,
        mode: PaymentMode,
    ) -> Result<(), PaymentError> {
        let ecosystem = ctx.ecosystem_id();
        let payer = ctx.tx.key_id;
        let fee = self.fee(ctx.fuel.consumed);
        let available = Self::payer_balance(ctx, &*storage)?;
        if available < fee {
            return Err(PaymentError::InsufficientFunds {
                required: fee,
                available,
            });
        }

        let keys = keys_table(ecosystem);
        let debit = Row::from([("amount".to_string(), Value::Int(available - fee))]);
        storage.update_row(&keys, payer, &debit)?;

        let recipient = match ctx.contract.owner.wallet_id {
            0 => ctx.block.key_id,
            wallet => wallet,
        };
        if recipient != payer {
            if let Some(key) = storage.key(ecosystem, recipient)? {
                let credit = Row::from([(
                    "amount".to_string(),
                    Value::Int(key.amount.saturating_add(fee)),
                )]);
                storage.update_row(&keys, recipient, &credit)?;
            }
        }

        let comment = match mode {
            PaymentMode::Success => "fee",
            PaymentMode::Failure => "fee (failed)",
        };
        let history = Row::from([
            ("sender_id".to_string(), Value::Int(payer)),
            ("recipient_id".to_string(), Value::Int(recipient)),
            ("amount".to_string(), Value::Int(fee)),
            ("comment".to_string(), Value::from(comment)),
            ("block_id".to_string(), Value::Int(ctx.block.block_id)),
            ("txhash".to_string(), Value::from(ctx.tx.hash.to_hex())),
        ]);
        storage.insert_row(&history_table(ecosystem), history)?;

        debug!(payer, recipient, fee, ?mode, "fee settled");
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
