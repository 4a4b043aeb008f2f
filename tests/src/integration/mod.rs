//! # Integration Harness
//!
//! A service over seeded in-memory storage: one ecosystem, one signing key
//! with a balance, a `members` table and a single contract record holding
//! every test contract.

pub mod flows;

use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey};
use qc_11_contract_execution::adapters::crypto::keccak256;
use qc_11_contract_execution::prelude::*;
use qc_11_contract_execution::service::create_test_service_with;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Ecosystem every fixture lives in.
pub const ECOSYSTEM: i64 = 1;

/// Record id of the contract source below.
pub const CONTRACT_TABLE_ID: i64 = 7;

/// Starting balance of the signing key.
pub const START_BALANCE: i64 = 10_000;

/// Contracts registered by the harness.
pub const SOURCE: &str = r"
contract Register {
    action {
        insert members name=carol
        notify 7 welcome
        result $last_id
    }
}

contract Rename {
    action {
        update members 1 name=dave
        result renamed
    }
}

contract Peek {
    action {
        select members 1 name,salary
        result $row
    }
}

contract Crash {
    action {
        insert members name=mallory
        fail boom
    }
}

contract Recurse {
    action {
        call Recurse
    }
}

contract PingA {
    action {
        call PingB
    }
}

contract PingB {
    action {
        call PingA
    }
}

contract Burn {
    action {
        charge 1000000
    }
}

contract Slow {
    action {
        spin 200
    }
}

contract Secret {
    action {
        insert vault note=hidden
    }
}

contract Deactivate {
    action {
        activate 7 1 false
        fail after deactivation
    }
}

contract Payout {
    action {
        result paid
    }
}
";

/// Installs a test subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Seeded storage plus a service with its registry loaded.
pub struct Harness {
    /// Shared storage (clones see the same tables).
    pub storage: InMemoryStorage,
    /// Service under test.
    pub service: ContractExecutionService<InMemoryStorage>,
    /// Key signing every payload.
    pub signer: SigningKey,
    /// Key id of `signer`.
    pub key_id: i64,
}

impl Harness {
    /// Harness charging fees.
    pub async fn paid() -> Self {
        Self::with_params(SystemParameters::default()).await
    }

    /// Harness on a private chain: no fees, read permissions enforced.
    pub async fn private() -> Self {
        Self::with_params(SystemParameters {
            private_chain: true,
            ..SystemParameters::default()
        })
        .await
    }

    /// Harness with custom parameters.
    pub async fn with_params(params: SystemParameters) -> Self {
        init_tracing();
        let storage = InMemoryStorage::new();
        storage.put_contract(ContractRecord {
            id: CONTRACT_TABLE_ID,
            ecosystem_id: ECOSYSTEM,
            value: SOURCE.to_string(),
            wallet_id: 0,
            token_id: 1,
            active: true,
            conditions: "true".into(),
            app_id: 1,
        });
        storage.put_table(
            "1",
            TableRecord {
                name: "members".into(),
                permissions: BTreeMap::new(),
                columns: BTreeMap::from([(
                    "salary".to_string(),
                    r#"{"read": "false", "update": "false"}"#.to_string(),
                )]),
            },
        );
        storage.put_table(
            "1",
            TableRecord {
                name: "vault".into(),
                permissions: BTreeMap::from([("insert".to_string(), "false".to_string())]),
                columns: BTreeMap::new(),
            },
        );
        storage.put_row(
            "1_members",
            1,
            Row::from([
                ("name".to_string(), Value::from("alice")),
                ("salary".to_string(), Value::Int(100)),
            ]),
        );

        let signer = SigningKey::from_slice(&[42; 32]).expect("valid scalar");
        let public_key = signer
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec();
        let key_id = Secp256k1Crypto.address(&public_key).expect("valid key");
        storage.put_key(&KeyRecord {
            id: key_id,
            ecosystem_id: ECOSYSTEM,
            account: address_to_string(key_id),
            public_key,
            amount: START_BALANCE,
            disabled: false,
        });

        let config = ServiceConfig {
            params,
            ..ServiceConfig::default()
        };
        let service = create_test_service_with(storage.clone(), config);
        service.load_contracts().await.expect("contracts compile");

        Self {
            storage,
            service,
            signer,
            key_id,
        }
    }

    /// Signed request for `contract`, addressed by its arena id.
    pub fn payload(&self, contract: &str) -> ExecuteTransactionRequestPayload {
        let id = self
            .service
            .registry()
            .lookup_by_name(contract, ECOSYSTEM)
            .map_or(0, |contract| i64::try_from(contract.id).unwrap_or_default());
        self.payload_for_id(id, contract.as_bytes())
    }

    /// Signed request for a raw contract id.
    pub fn payload_for_id(&self, contract_id: i64, seed: &[u8]) -> ExecuteTransactionRequestPayload {
        let hash = Hash::new(keccak256(seed));
        let signature: Signature = self.signer.sign_prehash(hash.as_bytes()).expect("signable");
        ExecuteTransactionRequestPayload {
            tx: TransactionDescriptor {
                contract_id,
                ecosystem_id: ECOSYSTEM,
                key_id: self.key_id,
                signature: signature.to_bytes().to_vec(),
                hash,
                ..Default::default()
            },
            block: BlockHeader {
                block_id: 1,
                key_id: self.key_id,
                ..Default::default()
            },
            prev_block: BlockHeader::default(),
            flags: ExecutionFlags::default(),
            savepoint: None,
        }
    }

    /// Executes `contract` through the service.
    pub async fn execute(&self, contract: &str) -> ExecuteTransactionResponsePayload {
        self.submit(self.payload(contract)).await
    }

    /// Executes a prepared payload through the service.
    pub async fn submit(
        &self,
        payload: ExecuteTransactionRequestPayload,
    ) -> ExecuteTransactionResponsePayload {
        self.service
            .handle_execute_transaction(Uuid::new_v4(), payload)
            .await
            .expect("service task completes")
    }

    /// Current balance of the signing key.
    pub fn balance(&self) -> i64 {
        self.storage
            .key(ECOSYSTEM, self.key_id)
            .ok()
            .flatten()
            .map_or(0, |key| key.amount)
    }
}
