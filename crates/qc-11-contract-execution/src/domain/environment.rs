//! # Execution Environment
//!
//! The per-transaction map of named values visible to contract code.
//!
//! Keys are a closed set of well-known names (block metadata, signer ids,
//! fuel, call stack, result) plus an escape hatch for transaction fields.

use super::value_objects::{address_to_string, Value};
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// WELL-KNOWN HOLE / GUEST ADDRESSES
// =============================================================================

/// Key id of the guest account.
pub const GUEST_KEY: i64 = 4_544_233_900_443_112_470;

/// Key id of the burn ("black hole") account.
pub const BLACK_HOLE_KEY: i64 = 0;

/// Key id of the mint ("white hole") account.
pub const WHITE_HOLE_KEY: i64 = 5_555_555_555_555_555_555;

// =============================================================================
// ENV KEY
// =============================================================================

/// Name of an environment slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnvKey {
    /// Transaction type (contract id being called).
    Type,
    /// Transaction timestamp.
    Time,
    /// Ecosystem the transaction runs in.
    EcosystemId,
    /// Block producer position.
    NodePosition,
    /// Current block number.
    Block,
    /// Signer key id.
    KeyId,
    /// Signer account string.
    AccountId,
    /// Block producer key id.
    BlockKeyId,
    /// Name of the calling contract (empty at top level).
    ParentContract,
    /// Remaining fuel.
    TxCost,
    /// Transaction hash.
    TxHash,
    /// Qualified name of the target contract.
    Contract,
    /// Current block timestamp.
    BlockTime,
    /// Top-level contract name.
    OriginalContract,
    /// Currently executing contract name.
    ThisContract,
    /// Guest key id.
    GuestKey,
    /// Guest account string.
    GuestAccount,
    /// Burn key id.
    BlackHoleKey,
    /// Burn account string.
    BlackHoleAccount,
    /// Mint key id.
    WhiteHoleKey,
    /// Mint account string.
    WhiteHoleAccount,
    /// Hash of the previous block.
    PreBlockDataHash,
    /// True while producing a block.
    GenBlock,
    /// Interpreter time limit in milliseconds.
    TimeLimit,
    /// Active contract call stack.
    Stack,
    /// Result slot.
    Result,
    /// Transaction field or anything else set by contract code.
    Field(String),
}

impl EnvKey {
    /// All well-known keys, in declaration order.
    pub const WELL_KNOWN: [EnvKey; 26] = [
        Self::Type,
        Self::Time,
        Self::EcosystemId,
        Self::NodePosition,
        Self::Block,
        Self::KeyId,
        Self::AccountId,
        Self::BlockKeyId,
        Self::ParentContract,
        Self::TxCost,
        Self::TxHash,
        Self::Contract,
        Self::BlockTime,
        Self::OriginalContract,
        Self::ThisContract,
        Self::GuestKey,
        Self::GuestAccount,
        Self::BlackHoleKey,
        Self::BlackHoleAccount,
        Self::WhiteHoleKey,
        Self::WhiteHoleAccount,
        Self::PreBlockDataHash,
        Self::GenBlock,
        Self::TimeLimit,
        Self::Stack,
        Self::Result,
    ];

    /// Name as seen by contract code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Type => "type",
            Self::Time => "time",
            Self::EcosystemId => "ecosystem_id",
            Self::NodePosition => "node_position",
            Self::Block => "block",
            Self::KeyId => "key_id",
            Self::AccountId => "account_id",
            Self::BlockKeyId => "block_key_id",
            Self::ParentContract => "parent_contract",
            Self::TxCost => "txcost",
            Self::TxHash => "txhash",
            Self::Contract => "contract",
            Self::BlockTime => "block_time",
            Self::OriginalContract => "original_contract",
            Self::ThisContract => "this_contract",
            Self::GuestKey => "guest_key",
            Self::GuestAccount => "guest_account",
            Self::BlackHoleKey => "black_hole_key",
            Self::BlackHoleAccount => "black_hole_account",
            Self::WhiteHoleKey => "white_hole_key",
            Self::WhiteHoleAccount => "white_hole_account",
            Self::PreBlockDataHash => "pre_block_data_hash",
            Self::GenBlock => "gen_block",
            Self::TimeLimit => "time_limit",
            Self::Stack => "stack",
            Self::Result => "result",
            Self::Field(name) => name,
        }
    }

    /// Resolves a name to a well-known key, falling back to `Field`.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        Self::WELL_KNOWN
            .iter()
            .find(|key| key.as_str() == name)
            .cloned()
            .unwrap_or_else(|| Self::Field(name.to_string()))
    }

    /// Returns true for the closed set of well-known names.
    #[must_use]
    pub fn is_well_known(&self) -> bool {
        !matches!(self, Self::Field(_))
    }
}

impl fmt::Display for EnvKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Per-execution environment map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    values: HashMap<EnvKey, Value>,
}

impl Environment {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for a key.
    #[must_use]
    pub fn get(&self, key: &EnvKey) -> Option<&Value> {
        self.values.get(key)
    }

    /// Looks a key up by its contract-visible name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.values.get(&EnvKey::parse(name))
    }

    /// Sets a value, replacing any previous one.
    pub fn set(&mut self, key: EnvKey, value: impl Into<Value>) {
        self.values.insert(key, value.into());
    }

    /// Removes a value.
    pub fn remove(&mut self, key: &EnvKey) -> Option<Value> {
        self.values.remove(key)
    }

    /// Copies transaction fields in.
    ///
    /// A field whose name collides with a well-known key is skipped; the
    /// names of skipped fields are returned.
    pub fn extend_fields<'a>(
        &mut self,
        fields: impl IntoIterator<Item = (&'a String, &'a Value)>,
    ) -> Vec<String> {
        let mut shadowed = Vec::new();
        for (name, value) in fields {
            let key = EnvKey::parse(name);
            if key.is_well_known() {
                shadowed.push(name.clone());
                continue;
            }
            self.values.insert(key, value.clone());
        }
        shadowed
    }

    /// Remaining fuel.
    #[must_use]
    pub fn fuel(&self) -> i64 {
        self.get(&EnvKey::TxCost)
            .and_then(Value::as_int)
            .unwrap_or_default()
    }

    /// Overwrites the remaining fuel.
    pub fn set_fuel(&mut self, fuel: i64) {
        self.set(EnvKey::TxCost, fuel);
    }

    /// Deducts `amount` from the remaining fuel and returns what is left.
    ///
    /// The balance may go negative; callers decide whether that is fatal.
    pub fn charge(&mut self, amount: i64) -> i64 {
        let left = self.fuel().saturating_sub(amount);
        self.set_fuel(left);
        left
    }

    /// Result slot.
    #[must_use]
    pub fn result(&self) -> Value {
        self.get(&EnvKey::Result).cloned().unwrap_or_default()
    }

    /// Names currently in the `stack` slot.
    #[must_use]
    pub fn stack(&self) -> Vec<String> {
        match self.get(&EnvKey::Stack) {
            Some(Value::Array(items)) => items.iter().map(ToString::to_string).collect(),
            _ => Vec::new(),
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no slot is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fills the hole and guest address slots.
    pub fn set_well_known_accounts(&mut self) {
        self.set(EnvKey::GuestKey, GUEST_KEY);
        self.set(EnvKey::GuestAccount, address_to_string(GUEST_KEY));
        self.set(EnvKey::BlackHoleKey, BLACK_HOLE_KEY);
        self.set(EnvKey::BlackHoleAccount, address_to_string(BLACK_HOLE_KEY));
        self.set(EnvKey::WhiteHoleKey, WHITE_HOLE_KEY);
        self.set(EnvKey::WhiteHoleAccount, address_to_string(WHITE_HOLE_KEY));
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_well_known_names() {
        for key in EnvKey::WELL_KNOWN {
            assert_eq!(EnvKey::parse(key.as_str()), key);
        }
        assert_eq!(EnvKey::parse("amount"), EnvKey::Field("amount".into()));
    }

    #[test]
    fn test_fields_never_shadow_well_known_keys() {
        let mut env = Environment::new();
        env.set_fuel(100);

        let fields: Vec<(String, Value)> = vec![
            ("txcost".into(), Value::Int(999_999)),
            ("amount".into(), Value::Int(5)),
        ];
        let skipped = env.extend_fields(fields.iter().map(|(k, v)| (k, v)));

        assert_eq!(skipped, vec!["txcost".to_string()]);
        assert_eq!(env.fuel(), 100);
        assert_eq!(env.get_by_name("amount"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_charge_can_go_negative() {
        let mut env = Environment::new();
        env.set_fuel(10);
        assert_eq!(env.charge(4), 6);
        assert_eq!(env.charge(10), -4);
        assert_eq!(env.fuel(), -4);
    }

    #[test]
    fn test_well_known_accounts() {
        let mut env = Environment::new();
        env.set_well_known_accounts();
        assert_eq!(
            env.get(&EnvKey::BlackHoleAccount),
            Some(&Value::from("0000-0000-0000-0000-0000"))
        );
        assert_eq!(env.get(&EnvKey::WhiteHoleKey), Some(&Value::Int(WHITE_HOLE_KEY)));
    }
}
