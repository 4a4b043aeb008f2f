//! # Execution Coordinator
//!
//! Runs one transaction through the pipeline:
//!
//! ```text
//! Start → Authenticated → PaymentReserved → StackPushed → Invoked
//!       → Committed | FeeCharged | RolledBack
//! ```
//!
//! Authentication and payment preparation only read. Everything the contract
//! writes happens after the savepoint is created and is undone by rolling back
//! to it. Registry mutations are outside the storage transaction and are
//! undone from their `FlushInfo` records.

use crate::access::AccessEvaluator;
use crate::auth::Authenticator;
use crate::domain::context::{ExecutionContext, ExecutionState};
use crate::domain::entities::{
    ExecutionOutcome, ExecutionStatus, FlushChange, FlushInfo, Notification, RollbackRecord,
    SystemParameters, TableAction,
};
use crate::domain::environment::{EnvKey, Environment};
use crate::domain::fuel::{base_fuel, spend_limit, FuelLedger};
use crate::domain::invariants::{check_all_invariants, MAX_RESULT_CHARS, TRUNCATION_SUFFIX};
use crate::domain::services::{qualify_table, sanitize_column, state_name};
use crate::domain::value_objects::{address_to_string, Value};
use crate::errors::{ExecutionError, RuntimeError, StorageError};
use crate::ports::inbound::{ContractExecutionApi, ExecutionRequest};
use crate::ports::outbound::{
    ContractHost, Interpreter, KeyCrypto, PaymentGateway, PaymentMode, Row, StorageTransaction,
};
use crate::registry::Registry;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Methods run for every contract call, in order.
pub const ENTRY_METHODS: [&str; 2] = ["conditions", "action"];

/// Truncates a result to `MAX_RESULT_CHARS` characters plus `...`.
#[must_use]
pub fn truncate_result(result: String) -> String {
    if result.chars().count() <= MAX_RESULT_CHARS {
        return result;
    }
    let mut truncated: String = result.chars().take(MAX_RESULT_CHARS).collect();
    truncated.push_str(TRUNCATION_SUFFIX);
    truncated
}

fn check_invariants(ctx: &ExecutionContext, result: &str) {
    let check = check_all_invariants(ctx, result);
    if !check.is_ok() {
        error!(violations = ?check.violations, state = %ctx.state, "execution invariant violated");
    }
}

fn sync_stack(ctx: &mut ExecutionContext) {
    let names = ctx
        .call_stack
        .names()
        .iter()
        .map(|name| Value::from(name.as_str()))
        .collect();
    ctx.env.set(EnvKey::Stack, Value::Array(names));
}

// =============================================================================
// COORDINATOR
// =============================================================================

/// Drives transactions through authentication, payment, invocation and
/// settlement.
pub struct ExecutionCoordinator {
    registry: Arc<Registry>,
    interpreter: Arc<dyn Interpreter>,
    payment: Arc<dyn PaymentGateway>,
    params: Arc<SystemParameters>,
    authenticator: Authenticator,
    access: AccessEvaluator,
}

impl ExecutionCoordinator {
    /// Creates a coordinator over a shared registry.
    #[must_use]
    pub fn new(
        registry: Arc<Registry>,
        interpreter: Arc<dyn Interpreter>,
        crypto: Arc<dyn KeyCrypto>,
        payment: Arc<dyn PaymentGateway>,
        params: SystemParameters,
    ) -> Self {
        let params = Arc::new(params);
        Self {
            authenticator: Authenticator::new(crypto, Arc::clone(&params)),
            access: AccessEvaluator::new(Arc::clone(&interpreter), Arc::clone(&params)),
            registry,
            interpreter,
            payment,
            params,
        }
    }

    /// The shared registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The access evaluator.
    #[must_use]
    pub fn access(&self) -> &AccessEvaluator {
        &self.access
    }

    /// System parameters.
    #[must_use]
    pub fn params(&self) -> &SystemParameters {
        &self.params
    }

    fn build_environment(&self, ctx: &mut ExecutionContext, limit: i64) {
        let tx = &ctx.tx;
        let env = &mut ctx.env;
        env.set(EnvKey::Type, tx.contract_id);
        env.set(EnvKey::Time, tx.time);
        env.set(EnvKey::EcosystemId, tx.ecosystem_id);
        env.set(EnvKey::NodePosition, ctx.block.node_position);
        env.set(EnvKey::Block, ctx.block.block_id);
        let account = ctx.key.as_ref().map_or_else(
            || address_to_string(ctx.signer_id),
            |key| key.account.clone(),
        );
        env.set(EnvKey::KeyId, ctx.signer_id);
        env.set(EnvKey::AccountId, account);
        env.set(EnvKey::BlockKeyId, ctx.block.key_id);
        env.set(EnvKey::ParentContract, "");
        env.set(EnvKey::TxCost, limit);
        env.set(EnvKey::TxHash, tx.hash.to_hex());
        env.set(EnvKey::Contract, ctx.contract.name.as_str());
        env.set(EnvKey::BlockTime, ctx.block.timestamp);
        env.set(EnvKey::OriginalContract, ctx.contract.name.as_str());
        env.set(EnvKey::ThisContract, ctx.contract.name.as_str());
        env.set(EnvKey::PreBlockDataHash, ctx.prev_block.hash.to_hex());
        env.set(EnvKey::GenBlock, ctx.flags.block_generation);
        env.set(
            EnvKey::TimeLimit,
            i64::try_from(self.params.time_limit_ms).unwrap_or(i64::MAX),
        );
        env.set_well_known_accounts();

        let shadowed = env.extend_fields(&tx.fields);
        if !shadowed.is_empty() {
            warn!(fields = ?shadowed, "transaction fields shadowing environment keys ignored");
        }
    }

    fn invoke(
        &self,
        ctx: &mut ExecutionContext,
        storage: &mut dyn StorageTransaction,
    ) -> Result<String, RuntimeError> {
        let name = ctx.contract.name.clone();
        let program = ctx.contract.program.clone();
        ctx.call_stack.push(&name)?;
        sync_stack(ctx);
        ctx.advance(ExecutionState::StackPushed);

        let base = base_fuel(self.params.size_fuel, ctx.tx.size);
        let mut runtime = Runtime {
            coordinator: self,
            ctx,
            storage,
        };
        let run = runtime
            .charge(base)
            .and_then(|()| self.interpreter.run(&mut runtime, &program, &ENTRY_METHODS));

        let ctx = runtime.ctx;
        ctx.call_stack.pop(&name);
        sync_stack(ctx);
        ctx.advance(ExecutionState::Invoked);

        run?;
        ctx.env.result().render()
    }

    /// Restores registry entries changed by the contract, newest first.
    fn undo_flush(&self, ctx: &mut ExecutionContext) {
        while let Some(flush) = ctx.flush.pop() {
            let restored = match flush.change {
                FlushChange::Active { previous } => self
                    .registry
                    .set_active(flush.table_id, flush.ecosystem_id, previous)
                    .is_some(),
                FlushChange::Wallet { previous } => self
                    .registry
                    .reassign_wallet(flush.table_id, flush.ecosystem_id, previous)
                    .is_some(),
            };
            if !restored {
                error!(table_id = flush.table_id, ecosystem = flush.ecosystem_id, "cannot undo registry change");
            }
        }
    }

    /// Reverts everything the contract did: records, registry changes,
    /// statement log and storage writes. The registry is restored even when
    /// the storage rollback fails.
    fn roll_back(
        &self,
        ctx: &mut ExecutionContext,
        storage: &mut dyn StorageTransaction,
        savepoint: &str,
    ) -> Result<(), StorageError> {
        ctx.discard_records();
        self.undo_flush(ctx);
        storage.clear_statement_log();
        storage.rollback_to(savepoint)
    }

    /// Gives up on a transaction whose savepoint could not be released.
    fn abort(
        &self,
        ctx: &mut ExecutionContext,
        storage: &mut dyn StorageTransaction,
        savepoint: &str,
        err: StorageError,
    ) -> ExecutionError {
        error!(error = %err, "savepoint release failed, rolling back");
        if let Err(rollback) = self.roll_back(ctx, storage, savepoint) {
            error!(error = %rollback, "rollback after failed release also failed");
        }
        ctx.advance(ExecutionState::RolledBack);
        ExecutionError::Storage(err)
    }

    fn commit(
        &self,
        ctx: &mut ExecutionContext,
        storage: &mut dyn StorageTransaction,
        savepoint: &str,
        result: String,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let result = truncate_result(result);
        if ctx.payment_reserved {
            if let Err(err) = self.payment.settle(ctx, storage, PaymentMode::Success) {
                return self.fail(ctx, storage, savepoint, RuntimeError::Payment(err));
            }
        }
        if let Err(err) = storage.release(savepoint) {
            return Err(self.abort(ctx, storage, savepoint, err));
        }
        ctx.advance(ExecutionState::Committed);
        check_invariants(ctx, &result);
        info!(fuel_used = ctx.fuel.consumed, "transaction committed");

        Ok(ExecutionOutcome {
            status: ExecutionStatus::Committed,
            result,
            fuel_used: ctx.fuel.consumed,
            rollback: std::mem::take(&mut ctx.rollback),
            notifications: std::mem::take(&mut ctx.notifications),
        })
    }

    fn fail(
        &self,
        ctx: &mut ExecutionContext,
        storage: &mut dyn StorageTransaction,
        savepoint: &str,
        err: RuntimeError,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        warn!(error = %err, "contract execution failed");
        self.roll_back(ctx, storage, savepoint)?;

        if !ctx.payment_reserved {
            storage.release(savepoint)?;
            ctx.advance(ExecutionState::RolledBack);
            check_invariants(ctx, "");
            return Err(ExecutionError::Runtime(err));
        }

        match self.payment.settle(ctx, storage, PaymentMode::Failure) {
            Ok(()) => {
                storage.release(savepoint)?;
                ctx.advance(ExecutionState::FeeCharged);
                let result = err.client_message();
                check_invariants(ctx, "");
                info!(fuel_used = ctx.fuel.consumed, "transaction failed, fee charged");
                Ok(ExecutionOutcome {
                    status: ExecutionStatus::FeeCharged,
                    result,
                    fuel_used: ctx.fuel.consumed,
                    rollback: Vec::new(),
                    notifications: Vec::new(),
                })
            }
            Err(settlement) => {
                error!(error = %settlement, "failure fee could not be charged");
                self.roll_back(ctx, storage, savepoint)?;
                storage.release(savepoint)?;
                ctx.advance(ExecutionState::RolledBack);
                check_invariants(ctx, "");
                Err(ExecutionError::Settlement {
                    primary: err,
                    settlement,
                })
            }
        }
    }
}

impl ContractExecutionApi for ExecutionCoordinator {
    #[instrument(
        skip_all,
        fields(
            tx_hash = %request.tx.hash,
            ecosystem = request.tx.ecosystem_id,
            contract_id = request.tx.contract_id,
        )
    )]
    fn execute(
        &self,
        storage: &mut dyn StorageTransaction,
        request: ExecutionRequest,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let ExecutionRequest {
            tx,
            block,
            prev_block,
            savepoint,
            flags,
        } = request;

        let contract = self
            .registry
            .lookup_by_id(tx.contract_id)
            .ok_or_else(|| ExecutionError::ContractNotFound(tx.contract_id.to_string()))?;
        let mut ctx = ExecutionContext::new(tx, contract, block, prev_block, flags);

        // Authenticate
        let signer = self
            .authenticator
            .resolve_signer(&ctx.tx, &ctx.contract.name, &*storage)?;
        ctx.key = Some(
            self.authenticator
                .verify_signature(&ctx.tx, signer, &*storage)?,
        );
        ctx.signer_id = signer;
        ctx.advance(ExecutionState::Authenticated);

        // Reserve payment
        if self.payment.needs_payment(&ctx) {
            self.payment
                .prepare(&ctx, &*storage)
                .map_err(ExecutionError::PaymentPreparation)?;
            ctx.payment_reserved = true;
        }
        ctx.advance(ExecutionState::PaymentReserved);

        storage.create_savepoint(&savepoint)?;
        let limit = spend_limit(&ctx.tx, self.params.max_cost);
        ctx.fuel = FuelLedger::new(limit);
        self.build_environment(&mut ctx, limit);
        debug!(contract = %ctx.contract.name, signer, limit, "invoking contract");

        let run = self.invoke(&mut ctx, storage);
        ctx.fuel.record(limit, ctx.env.fuel());

        match run {
            Ok(result) => self.commit(&mut ctx, storage, &savepoint, result),
            Err(err) => self.fail(&mut ctx, storage, &savepoint, err),
        }
    }
}

// =============================================================================
// HOST FUNCTIONS
// =============================================================================

/// Host side of a running contract: the context and storage of one execution.
struct Runtime<'a> {
    coordinator: &'a ExecutionCoordinator,
    ctx: &'a mut ExecutionContext,
    storage: &'a mut dyn StorageTransaction,
}

impl Runtime<'_> {
    fn check_write(
        &self,
        table: &str,
        action: TableAction,
        values: &Row,
    ) -> Result<(), RuntimeError> {
        let access = &self.coordinator.access;
        access.check_table_access(&*self.ctx, &*self.storage, table, action)?;
        let columns: Vec<String> = values.keys().cloned().collect();
        access.check_column_access(&*self.ctx, &*self.storage, table, &columns, true)?;
        Ok(())
    }

    fn log_storage(table: &str, action: TableAction) -> impl Fn(StorageError) -> StorageError + '_ {
        move |err| {
            error!(table, %action, error = %err, "storage operation failed");
            err
        }
    }
}

impl ContractHost for Runtime<'_> {
    fn env(&self) -> &Environment {
        &self.ctx.env
    }

    fn env_mut(&mut self) -> &mut Environment {
        &mut self.ctx.env
    }

    fn charge(&mut self, fuel: i64) -> Result<(), RuntimeError> {
        let left = self.ctx.env.charge(fuel);
        if left < 0 {
            let limit = self.ctx.fuel.limit;
            return Err(RuntimeError::ResourceExhausted {
                spent: limit.saturating_sub(left),
                limit,
            });
        }
        Ok(())
    }

    fn call_contract(&mut self, name: &str, fields: Row) -> Result<Value, RuntimeError> {
        let ecosystem = self.ctx.ecosystem_id();
        let qualified = state_name(ecosystem, name);
        let callee = self
            .coordinator
            .registry
            .lookup_by_name(&qualified, ecosystem)
            .ok_or(RuntimeError::UnknownContract(qualified))?;

        self.ctx.call_stack.push(&callee.name)?;
        sync_stack(self.ctx);
        debug!(callee = %callee.name, depth = self.ctx.call_stack.depth(), "nested contract call");

        let caller = self.ctx.env.clone();
        let this = caller
            .get(&EnvKey::ThisContract)
            .cloned()
            .unwrap_or_default();
        self.ctx.env.set(EnvKey::ParentContract, this);
        self.ctx.env.set(EnvKey::ThisContract, callee.name.as_str());
        self.ctx.env.remove(&EnvKey::Result);
        let shadowed = self.ctx.env.extend_fields(&fields);
        if !shadowed.is_empty() {
            warn!(callee = %callee.name, fields = ?shadowed, "call fields shadowing environment keys ignored");
        }

        let coordinator = self.coordinator;
        let run = coordinator
            .interpreter
            .run(self, &callee.program, &ENTRY_METHODS);

        let result = self.ctx.env.result();
        let fuel = self.ctx.env.fuel();
        self.ctx.env = caller;
        self.ctx.env.set_fuel(fuel);
        self.ctx.call_stack.pop(&callee.name);
        sync_stack(self.ctx);

        run.map(|()| result)
    }

    fn db_insert(&mut self, table: &str, values: Row) -> Result<i64, RuntimeError> {
        let table = qualify_table(table, self.ctx.ecosystem_id());
        self.check_write(&table, TableAction::Insert, &values)?;
        let id = self
            .storage
            .insert_row(&table, values)
            .map_err(Self::log_storage(&table, TableAction::Insert))?;
        self.ctx.rollback.push(RollbackRecord {
            table,
            row_id: id,
            data: String::new(),
        });
        Ok(id)
    }

    fn db_update(&mut self, table: &str, id: i64, values: Row) -> Result<(), RuntimeError> {
        let table = qualify_table(table, self.ctx.ecosystem_id());
        self.check_write(&table, TableAction::Update, &values)?;
        let previous = self
            .storage
            .update_row(&table, id, &values)
            .map_err(Self::log_storage(&table, TableAction::Update))?;
        let data = serde_json::to_string(&previous)
            .map_err(|err| StorageError::Other(err.to_string()))?;
        self.ctx.rollback.push(RollbackRecord {
            table,
            row_id: id,
            data,
        });
        Ok(())
    }

    fn db_select(&mut self, table: &str, id: i64, columns: &[String]) -> Result<Row, RuntimeError> {
        let read = self.coordinator.access.check_read_access(
            &*self.ctx,
            &*self.storage,
            table,
            &columns.join(","),
            self.ctx.ecosystem_id(),
        )?;
        let row = self
            .storage
            .select_row(&read.table, id)
            .map_err(Self::log_storage(&read.table, TableAction::Read))?
            .unwrap_or_default();
        if read.columns.iter().any(|column| column == "*") {
            return Ok(row);
        }
        let wanted: Vec<String> = read.columns.iter().map(|c| sanitize_column(c)).collect();
        Ok(row
            .into_iter()
            .filter(|(column, _)| wanted.contains(column))
            .collect())
    }

    fn check_condition(&mut self, param: &str, use_conditions: bool) -> Result<(), RuntimeError> {
        self.coordinator
            .access
            .check_condition(&*self.ctx, &*self.storage, param, use_conditions)?;
        Ok(())
    }

    fn activate_contract(
        &mut self,
        table_id: i64,
        ecosystem_id: i64,
        active: bool,
    ) -> Result<(), RuntimeError> {
        let previous = self
            .coordinator
            .registry
            .set_active(table_id, ecosystem_id, active)
            .ok_or_else(|| RuntimeError::UnknownContract(format!("{ecosystem_id}:{table_id}")))?;
        self.ctx.flush.push(FlushInfo {
            table_id,
            ecosystem_id,
            change: FlushChange::Active { previous },
        });
        Ok(())
    }

    fn set_contract_wallet(
        &mut self,
        table_id: i64,
        ecosystem_id: i64,
        wallet_id: i64,
    ) -> Result<(), RuntimeError> {
        let previous = self
            .coordinator
            .registry
            .reassign_wallet(table_id, ecosystem_id, wallet_id)
            .ok_or_else(|| RuntimeError::UnknownContract(format!("{ecosystem_id}:{table_id}")))?;
        self.ctx.flush.push(FlushInfo {
            table_id,
            ecosystem_id,
            change: FlushChange::Wallet { previous },
        });
        Ok(())
    }

    fn notify(&mut self, key_id: i64, payload: String) {
        self.ctx.notifications.push(Notification {
            ecosystem_id: self.ctx.ecosystem_id(),
            key_id,
            payload,
        });
    }
}

// =============================================================================
// TESTS
// =============================================================================
