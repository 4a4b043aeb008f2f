//! # Access Evaluator
//!
//! Answers table, column and condition permission questions by evaluating
//! stored boolean expressions through the interpreter.
//!
//! - Evaluation runs on a copy of the environment with the fuel slot set to
//!   the configured maximum; permission checks never cost the transaction fuel.
//! - `1_parameters` and `1_app_params` are privileged: anyone may read, only
//!   the ecosystem's `founder_account` may write.
//! - The context's full-access flag bypasses every check.

use crate::domain::context::ExecutionContext;
use crate::domain::entities::{SystemParameters, TableAction};
use crate::domain::services::{parse_columns, prefix_name, qualify_table, sanitize_column};
use crate::errors::{AccessError, AccessScope};
use crate::ports::outbound::{Interpreter, StorageTransaction};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::error;

/// Ecosystem parameter naming the account allowed to write privileged tables.
pub const FOUNDER_ACCOUNT: &str = "founder_account";

/// Tables only the founder may write.
pub const PRIVILEGED_TABLES: [&str; 2] = ["1_parameters", "1_app_params"];

/// Column rule in `{read, update}` form.
#[derive(Debug, Deserialize)]
struct ColumnRule {
    #[serde(default)]
    read: String,
    #[serde(default)]
    update: String,
}

impl ColumnRule {
    fn parse(column: &str, rule: &str) -> Result<Self, AccessError> {
        if rule.starts_with('{') {
            serde_json::from_str(rule).map_err(|err| AccessError::InvalidPermissions {
                column: column.to_string(),
                reason: err.to_string(),
            })
        } else {
            Ok(Self {
                read: String::new(),
                update: rule.to_string(),
            })
        }
    }
}

/// Result of `check_read_access`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadAccess {
    /// Ecosystem-qualified table name.
    pub table: String,
    /// Table permissions (empty unless checked on a private chain).
    pub permissions: BTreeMap<String, String>,
    /// Columns the caller may read.
    pub columns: Vec<String>,
}

/// Permission checks for one node.
pub struct AccessEvaluator {
    interpreter: Arc<dyn Interpreter>,
    params: Arc<SystemParameters>,
}

impl AccessEvaluator {
    /// Creates an evaluator.
    #[must_use]
    pub fn new(interpreter: Arc<dyn Interpreter>, params: Arc<SystemParameters>) -> Self {
        Self {
            interpreter,
            params,
        }
    }

    /// Evaluates `expr` in the transaction's ecosystem.
    ///
    /// # Errors
    ///
    /// `Evaluation` when the interpreter rejects the expression.
    pub fn eval_boolean(&self, expr: &str, ctx: &ExecutionContext) -> Result<bool, AccessError> {
        let mut env = ctx.env.clone();
        env.set_fuel(self.params.max_cost);
        Ok(self
            .interpreter
            .eval_boolean(expr, ctx.ecosystem_id(), &env)?)
    }

    fn is_privileged(ctx: &ExecutionContext, table: &str) -> bool {
        let qualified = qualify_table(table, ctx.ecosystem_id());
        PRIVILEGED_TABLES.contains(&qualified.as_str())
    }

    fn is_founder(
        ctx: &ExecutionContext,
        storage: &dyn StorageTransaction,
    ) -> Result<bool, AccessError> {
        let founder = storage
            .parameter(ctx.ecosystem_id(), FOUNDER_ACCOUNT)?
            .and_then(|param| param.value.trim().parse::<i64>().ok());
        Ok(founder == Some(ctx.tx.key_id))
    }

    fn table_permissions(
        &self,
        ctx: &ExecutionContext,
        storage: &dyn StorageTransaction,
        table: &str,
        action: TableAction,
    ) -> Result<BTreeMap<String, String>, AccessError> {
        if Self::is_privileged(ctx, table) {
            if !action.is_write() || Self::is_founder(ctx, storage)? {
                return Ok(BTreeMap::new());
            }
            error!(table, key_id = ctx.tx.key_id, "access denied to privileged table");
            return Err(AccessError::AccessDenied(AccessScope::System));
        }

        let record = match prefix_name(table) {
            (Some(prefix), name) => storage.table(prefix, &name).map_err(|err| {
                error!(table, error = %err, "checking custom table");
                err
            })?,
            (None, _) => None,
        };
        let Some(record) = record else {
            if action.is_write() {
                return Err(AccessError::NotCustomTable(table.to_string()));
            }
            return Ok(BTreeMap::new());
        };

        let condition = record.permission(action);
        if !condition.is_empty() {
            let allowed = self.eval_boolean(condition, ctx).map_err(|err| {
                error!(table, %action, condition, error = %err, "evaluating table permissions");
                err
            })?;
            if !allowed {
                error!(table, %action, condition, "access denied");
                return Err(AccessError::AccessDenied(AccessScope::Table));
            }
        }
        Ok(record.permissions)
    }

    /// Checks `action` on `table` (qualified or bare).
    ///
    /// # Errors
    ///
    /// `AccessDenied`, `NotCustomTable`, or evaluation and storage errors.
    pub fn check_table_access(
        &self,
        ctx: &ExecutionContext,
        storage: &dyn StorageTransaction,
        table: &str,
        action: TableAction,
    ) -> Result<(), AccessError> {
        if ctx.flags.full_access {
            return Ok(());
        }
        self.table_permissions(ctx, storage, table, action).map(|_| ())
    }

    /// Checks column permissions and returns the columns the caller may use.
    ///
    /// Reads drop denied columns, failing only if none remain; updates fail on
    /// the first denied column. `*` expands to every declared column.
    ///
    /// # Errors
    ///
    /// `AccessDenied`, `TableNotFound` on updates of unknown tables, or
    /// evaluation and storage errors.
    pub fn check_column_access(
        &self,
        ctx: &ExecutionContext,
        storage: &dyn StorageTransaction,
        table: &str,
        columns: &[String],
        update: bool,
    ) -> Result<Vec<String>, AccessError> {
        if ctx.flags.full_access {
            return Ok(columns.to_vec());
        }
        if Self::is_privileged(ctx, table) {
            if !update || Self::is_founder(ctx, storage)? {
                return Ok(columns.to_vec());
            }
            error!(table, key_id = ctx.tx.key_id, "access denied to privileged columns");
            return Err(AccessError::AccessDenied(AccessScope::System));
        }

        let record = match prefix_name(table) {
            (Some(prefix), name) => storage.table(prefix, &name)?,
            (None, _) => None,
        };
        let Some(record) = record else {
            if update {
                return Err(AccessError::TableNotFound(table.to_string()));
            }
            return Ok(columns.to_vec());
        };

        let mut requested = Vec::with_capacity(columns.len());
        for column in columns {
            if column == "*" {
                requested.extend(record.columns.keys().cloned());
            } else {
                requested.push(column.clone());
            }
        }

        let mut checked: HashMap<String, bool> = HashMap::new();
        let mut allowed = Vec::with_capacity(requested.len());
        for column in requested {
            let name = sanitize_column(&column);
            let permitted = match checked.get(&name) {
                Some(status) => *status,
                None => {
                    let status = self.column_allowed(ctx, table, &name, &record.columns, update)?;
                    checked.insert(name, status);
                    status
                }
            };
            if permitted {
                allowed.push(column);
            } else if update {
                return Err(AccessError::AccessDenied(AccessScope::Column));
            }
        }

        if allowed.is_empty() && !checked.is_empty() {
            return Err(AccessError::AccessDenied(AccessScope::Column));
        }
        Ok(allowed)
    }

    fn column_allowed(
        &self,
        ctx: &ExecutionContext,
        table: &str,
        column: &str,
        rules: &BTreeMap<String, String>,
        update: bool,
    ) -> Result<bool, AccessError> {
        let Some(rule) = rules.get(column).filter(|rule| !rule.is_empty()) else {
            return Ok(true);
        };
        let rule = ColumnRule::parse(column, rule).map_err(|err| {
            error!(table, column, error = %err, "getting access columns");
            err
        })?;
        let condition = if update { rule.update } else { rule.read };
        if condition.is_empty() {
            return Ok(true);
        }
        let allowed = self.eval_boolean(&condition, ctx).map_err(|err| {
            error!(table, column, condition = %condition, error = %err, "evaluating column condition");
            err
        })?;
        if !allowed {
            error!(table, column, condition = %condition, update, "column access denied");
        }
        Ok(allowed)
    }

    /// Evaluates an ecosystem parameter's value (or its `conditions` field).
    ///
    /// # Errors
    ///
    /// `MissingCondition` when the expression is empty, `AccessDenied` when
    /// it is false.
    pub fn check_condition(
        &self,
        ctx: &ExecutionContext,
        storage: &dyn StorageTransaction,
        param: &str,
        use_conditions: bool,
    ) -> Result<(), AccessError> {
        if ctx.flags.full_access {
            return Ok(());
        }
        let record = storage
            .parameter(ctx.ecosystem_id(), param)?
            .unwrap_or_default();
        let condition = if use_conditions {
            record.conditions
        } else {
            record.value
        };
        if condition.is_empty() {
            return Err(AccessError::MissingCondition(param.to_string()));
        }
        if !self.eval_boolean(&condition, ctx)? {
            error!(param, condition = %condition, "condition access denied");
            return Err(AccessError::AccessDenied(AccessScope::Condition));
        }
        Ok(())
    }

    /// Prepares a read: qualifies the table, splits the column list and, on
    /// private chains, checks table and column read permissions.
    ///
    /// # Errors
    ///
    /// As for `check_table_access` and `check_column_access`.
    pub fn check_read_access(
        &self,
        ctx: &ExecutionContext,
        storage: &dyn StorageTransaction,
        table: &str,
        columns: &str,
        ecosystem_id: i64,
    ) -> Result<ReadAccess, AccessError> {
        let table = qualify_table(table, ecosystem_id);
        let columns = parse_columns(columns);
        if !self.params.private_chain || ctx.flags.full_access {
            return Ok(ReadAccess {
                table,
                permissions: BTreeMap::new(),
                columns,
            });
        }
        let permissions = self.table_permissions(ctx, storage, &table, TableAction::Read)?;
        let columns = self.check_column_access(ctx, storage, &table, &columns, false)?;
        Ok(ReadAccess {
            table,
            permissions,
            columns,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
