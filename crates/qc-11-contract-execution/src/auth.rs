//! # Authenticator
//!
//! Decides who must have signed a transaction and verifies the signature.
//! Nothing here writes; every failure leaves state untouched.

use crate::domain::entities::{KeyRecord, SystemParameters, TransactionDescriptor};
use crate::domain::value_objects::address_to_string;
use crate::errors::AuthError;
use crate::ports::outbound::{KeyCrypto, StorageTransaction};
use std::sync::Arc;
use tracing::{debug, warn};

/// Built-in system contracts that may always be signed by a delegated signer.
pub const DELAYED_SYSTEM_CONTRACTS: [&str; 3] =
    ["@1CallDelayedContract", "@1NewUser", "@1NewBadBlock"];

/// Built-in contract exempt from the node-membership check.
pub const NEW_USER_CONTRACT: &str = "@1NewUser";

/// Transaction-supplied public key treated as absent.
const NULL_PUBLIC_KEY: &[u8] = b"null";

fn has_public_key(public_key: &[u8]) -> bool {
    !public_key.is_empty() && public_key != NULL_PUBLIC_KEY
}

/// Signer resolution and signature verification.
pub struct Authenticator {
    crypto: Arc<dyn KeyCrypto>,
    params: Arc<SystemParameters>,
}

impl Authenticator {
    /// Creates an authenticator.
    #[must_use]
    pub fn new(crypto: Arc<dyn KeyCrypto>, params: Arc<SystemParameters>) -> Self {
        Self { crypto, params }
    }

    /// Key id that must have signed `tx`, which calls `contract`.
    ///
    /// # Errors
    ///
    /// `DifferentKeys`, `DelayedContractNotAllowed` or `DelayedContract`.
    pub fn resolve_signer(
        &self,
        tx: &TransactionDescriptor,
        contract: &str,
        storage: &dyn StorageTransaction,
    ) -> Result<i64, AuthError> {
        let Some(signer) = tx.signed_by.filter(|id| *id != 0) else {
            if has_public_key(&tx.public_key) && self.crypto.address(&tx.public_key)? != tx.key_id {
                return Err(AuthError::DifferentKeys);
            }
            return Ok(tx.key_id);
        };

        if self.params.candidate_node_mode {
            return Ok(signer);
        }
        if !DELAYED_SYSTEM_CONTRACTS.contains(&contract) && !storage.is_delayed_contract(contract)? {
            warn!(contract, signer, "delegated signer for contract outside the allow-list");
            return Err(AuthError::DelayedContractNotAllowed(contract.to_string()));
        }
        if contract != NEW_USER_CONTRACT && !self.is_node_signer(signer)? {
            warn!(contract, signer, "delegated signer is not a consensus node");
            return Err(AuthError::DelayedContract);
        }
        Ok(signer)
    }

    fn is_node_signer(&self, signer: i64) -> Result<bool, AuthError> {
        if self.params.honor_nodes.is_empty() {
            return Ok(self.crypto.address(&self.params.node_public_key)? == signer);
        }
        for node in &self.params.honor_nodes {
            if self.crypto.address(&node.public_key)? == signer {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Verifies the signature of `tx` for `signer` and returns the key record.
    ///
    /// The key record's public key wins over the transaction's.
    ///
    /// # Errors
    ///
    /// `EcosystemKeyNotFound`, `EcosystemKeyDisabled`, `EmptyPublicKey` or
    /// `IncorrectSignature`.
    pub fn verify_signature(
        &self,
        tx: &TransactionDescriptor,
        signer: i64,
        storage: &dyn StorageTransaction,
    ) -> Result<KeyRecord, AuthError> {
        let key = storage
            .key(tx.ecosystem_id, signer)?
            .ok_or_else(|| AuthError::EcosystemKeyNotFound {
                key: address_to_string(signer),
                ecosystem: tx.ecosystem_id,
            })?;
        if key.disabled {
            return Err(AuthError::EcosystemKeyDisabled {
                key: address_to_string(signer),
                ecosystem: tx.ecosystem_id,
            });
        }

        let public_key = if !key.public_key.is_empty() {
            key.public_key.as_slice()
        } else if has_public_key(&tx.public_key) {
            tx.public_key.as_slice()
        } else {
            return Err(AuthError::EmptyPublicKey);
        };

        if !self.crypto.verify(public_key, &tx.hash, &tx.signature)? {
            return Err(AuthError::IncorrectSignature);
        }
        debug!(signer, ecosystem = tx.ecosystem_id, "signature verified");
        Ok(key)
    }
}

// =============================================================================
// TESTS
// =============================================================================
