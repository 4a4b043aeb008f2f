//! # Contract Execution Service
//!
//! Async facade over the blocking pipeline. Each request gets its own storage
//! transaction on the blocking pool; the transaction is committed unless the
//! execution was rejected.
//!
//! - One storage transaction per request, never shared
//! - Registry shared with every execution through the coordinator
//! - Correlation ids on every request span

use crate::adapters::crypto::Secp256k1Crypto;
use crate::adapters::memory_store::InMemoryStorage;
use crate::adapters::payment::FlatFeePayment;
use crate::adapters::script_vm::ScriptInterpreter;
use crate::coordinator::ExecutionCoordinator;
use crate::domain::entities::{ExecutionOutcome, ExecutionStatus, SystemParameters};
use crate::errors::{ConfigError, ExecutionError, ServiceError};
use crate::events::{ExecuteTransactionRequestPayload, ExecuteTransactionResponsePayload};
use crate::ports::inbound::{
    ContractExecutionApi, ContractExecutionServiceApi, ExecutionRequest, RegistryLoader,
};
use crate::ports::outbound::{Interpreter, KeyCrypto, PaymentGateway, StorageProvider};
use crate::registry::{Registry, DEFAULT_PAGE_SIZE};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Contract Execution Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Network parameters.
    pub params: SystemParameters,
    /// Contract records read per page while loading (default: 200).
    pub page_size: usize,
    /// Track execution statistics.
    pub collect_stats: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            params: SystemParameters::default(),
            page_size: DEFAULT_PAGE_SIZE,
            collect_stats: true,
        }
    }
}

impl ServiceConfig {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::OutOfRange {
                name: "page_size",
                expected: "positive",
                actual: 0,
            });
        }
        self.params.validate()
    }
}

/// Statistics for the Contract Execution Service.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    /// Total transactions processed.
    pub transactions_executed: u64,
    /// Transactions committed with their writes.
    pub committed: u64,
    /// Failed transactions that paid the fee.
    pub fee_charged: u64,
    /// Rejected transactions.
    pub rejected: u64,
    /// Total fuel consumed.
    pub total_fuel_used: u64,
    /// Average execution time in microseconds.
    pub avg_execution_time_us: u64,
}

impl ServiceStats {
    fn record(&mut self, result: &Result<ExecutionOutcome, ExecutionError>, elapsed_us: u64) {
        self.transactions_executed += 1;
        match result {
            Ok(outcome) => {
                match outcome.status {
                    ExecutionStatus::Committed => self.committed += 1,
                    ExecutionStatus::FeeCharged => self.fee_charged += 1,
                }
                self.total_fuel_used = self
                    .total_fuel_used
                    .saturating_add(u64::try_from(outcome.fuel_used).unwrap_or(0));
            }
            Err(_) => self.rejected += 1,
        }
        let total = u128::from(self.transactions_executed);
        let sum = u128::from(self.avg_execution_time_us) * (total - 1) + u128::from(elapsed_us);
        self.avg_execution_time_us = u64::try_from(sum / total).unwrap_or(u64::MAX);
    }
}

/// The main Contract Execution Service.
pub struct ContractExecutionService<P: StorageProvider> {
    config: ServiceConfig,
    storage: Arc<P>,
    coordinator: Arc<ExecutionCoordinator>,
    stats: Arc<RwLock<ServiceStats>>,
}

impl<P: StorageProvider + 'static> ContractExecutionService<P> {
    /// Creates a service with an empty registry.
    pub fn new(
        storage: P,
        interpreter: Arc<dyn Interpreter>,
        crypto: Arc<dyn KeyCrypto>,
        payment: Arc<dyn PaymentGateway>,
        config: ServiceConfig,
    ) -> Self {
        let registry =
            Arc::new(Registry::new(Arc::clone(&interpreter)).with_page_size(config.page_size));
        let coordinator = ExecutionCoordinator::new(
            registry,
            interpreter,
            crypto,
            payment,
            config.params.clone(),
        );
        Self {
            config,
            storage: Arc::new(storage),
            coordinator: Arc::new(coordinator),
            stats: Arc::new(RwLock::new(ServiceStats::default())),
        }
    }

    /// The pipeline this service drives.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<ExecutionCoordinator> {
        &self.coordinator
    }

    /// The shared contract registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        self.coordinator.registry()
    }

    /// Get current service statistics.
    pub async fn stats(&self) -> ServiceStats {
        self.stats.read().await.clone()
    }

    /// Loads the contracts of one ecosystem into the registry.
    ///
    /// # Errors
    ///
    /// `Registry` when a contract fails to compile, `TaskFailed` when the
    /// loading task dies.
    #[instrument(skip(self))]
    pub async fn load_ecosystem(&self, ecosystem_id: i64) -> Result<usize, ServiceError> {
        let storage = Arc::clone(&self.storage);
        let coordinator = Arc::clone(&self.coordinator);
        let loaded = tokio::task::spawn_blocking(move || {
            coordinator
                .registry()
                .load_ecosystem(&*storage, ecosystem_id)
        })
        .await
        .map_err(|err| ServiceError::TaskFailed(err.to_string()))??;
        info!(loaded, "ecosystem contracts loaded");
        Ok(loaded)
    }

    async fn execute_blocking(
        &self,
        request: ExecutionRequest,
    ) -> Result<Result<ExecutionOutcome, ExecutionError>, ServiceError> {
        let storage = Arc::clone(&self.storage);
        let coordinator = Arc::clone(&self.coordinator);
        tokio::task::spawn_blocking(move || -> Result<ExecutionOutcome, ExecutionError> {
            let mut session = storage.begin()?;
            let outcome = coordinator.execute(session.transaction(), request)?;
            session.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(|err| ServiceError::TaskFailed(err.to_string()))
    }
}

/// Create a default service with in-memory adapters (for testing).
#[must_use]
pub fn create_test_service() -> ContractExecutionService<InMemoryStorage> {
    create_test_service_with(InMemoryStorage::new(), ServiceConfig::default())
}

/// Create a service with in-memory adapters over `storage`.
#[must_use]
pub fn create_test_service_with(
    storage: InMemoryStorage,
    config: ServiceConfig,
) -> ContractExecutionService<InMemoryStorage> {
    let payment = FlatFeePayment::default().with_private_chain(config.params.private_chain);
    ContractExecutionService::new(
        storage,
        Arc::new(ScriptInterpreter::new()),
        Arc::new(Secp256k1Crypto),
        Arc::new(payment),
        config,
    )
}

// =============================================================================
// ContractExecutionServiceApi Implementation
// =============================================================================

#[async_trait]
impl<P: StorageProvider + 'static> ContractExecutionServiceApi for ContractExecutionService<P> {
    #[instrument(skip(self, payload), fields(correlation_id = %correlation_id))]
    async fn handle_execute_transaction(
        &self,
        correlation_id: Uuid,
        payload: ExecuteTransactionRequestPayload,
    ) -> Result<ExecuteTransactionResponsePayload, ServiceError> {
        let tx_hash = payload.tx.hash;
        info!(
            tx_hash = %tx_hash,
            contract_id = payload.tx.contract_id,
            "Processing transaction execution request"
        );

        let start = Instant::now();
        let result = self.execute_blocking(payload.into()).await?;
        let elapsed_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

        if self.config.collect_stats {
            self.stats.write().await.record(&result, elapsed_us);
        }

        match result {
            Ok(outcome) => {
                debug!(
                    status = ?outcome.status,
                    fuel_used = outcome.fuel_used,
                    "Transaction execution completed"
                );
                Ok(ExecuteTransactionResponsePayload::from_outcome(
                    tx_hash, outcome,
                ))
            }
            Err(err) => {
                warn!(error = %err, excluded = err.excludes_transaction(), "Transaction rejected");
                Ok(ExecuteTransactionResponsePayload::rejected(tx_hash, &err))
            }
        }
    }

    #[instrument(skip(self))]
    async fn load_contracts(&self) -> Result<usize, ServiceError> {
        let storage = Arc::clone(&self.storage);
        let coordinator = Arc::clone(&self.coordinator);
        let loaded = tokio::task::spawn_blocking(move || {
            coordinator.registry().load_all(&*storage)
        })
        .await
        .map_err(|err| ServiceError::TaskFailed(err.to_string()))??;
        info!(loaded, "contracts loaded");
        Ok(loaded)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::crypto::keccak256;
    use crate::domain::entities::{
        BlockHeader, ContractRecord, ExecutionFlags, KeyRecord, TableRecord,
        TransactionDescriptor,
    };
    use crate::domain::value_objects::{address_to_string, Hash};
    use crate::registry::DISPLAY_ID_OFFSET;
    use k256::ecdsa::signature::hazmat::PrehashSigner;
    use k256::ecdsa::{Signature, SigningKey};

    const SOURCE: &str = "contract Register {\n action {\n insert members name=carol\n result ok\n }\n}";

    fn seeded_storage(signer: &SigningKey) -> (InMemoryStorage, i64) {
        let storage = InMemoryStorage::new();
        storage.put_contract(ContractRecord {
            id: 3,
            ecosystem_id: 1,
            value: SOURCE.into(),
            wallet_id: 0,
            token_id: 1,
            active: true,
            conditions: String::new(),
            app_id: 1,
        });
        storage.put_table(
            "1",
            TableRecord {
                name: "members".into(),
                ..Default::default()
            },
        );
        let public_key = signer
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec();
        let key_id = Secp256k1Crypto.address(&public_key).unwrap();
        storage.put_key(&KeyRecord {
            id: key_id,
            ecosystem_id: 1,
            account: address_to_string(key_id),
            public_key,
            amount: 100,
            disabled: false,
        });
        (storage, key_id)
    }

    fn payload(
        signer: &SigningKey,
        key_id: i64,
        contract_id: i64,
    ) -> ExecuteTransactionRequestPayload {
        let hash = Hash::new(keccak256(b"register"));
        let signature: Signature = signer.sign_prehash(hash.as_bytes()).unwrap();
        ExecuteTransactionRequestPayload {
            tx: TransactionDescriptor {
                contract_id,
                ecosystem_id: 1,
                key_id,
                signature: signature.to_bytes().to_vec(),
                hash,
                ..Default::default()
            },
            block: BlockHeader {
                block_id: 1,
                key_id,
                ..Default::default()
            },
            prev_block: BlockHeader::default(),
            flags: ExecutionFlags::default(),
            savepoint: None,
        }
    }

    #[tokio::test]
    async fn test_create_service() {
        let service = create_test_service();
        let stats = service.stats().await;
        assert_eq!(stats, ServiceStats::default());
        assert!(service.registry().is_empty());
    }

    #[tokio::test]
    async fn test_load_contracts() {
        let signer = SigningKey::from_slice(&[3; 32]).unwrap();
        let (storage, _) = seeded_storage(&signer);
        let service = create_test_service_with(storage, ServiceConfig::default());

        assert_eq!(service.load_contracts().await.unwrap(), 1);
        assert_eq!(service.load_contracts().await.unwrap(), 0);
        assert_eq!(service.load_ecosystem(1).await.unwrap(), 0);
        assert!(service.registry().lookup_by_name("Register", 1).is_some());
    }

    #[tokio::test]
    async fn test_execute_commits_session() {
        let signer = SigningKey::from_slice(&[3; 32]).unwrap();
        let (storage, key_id) = seeded_storage(&signer);
        let service = create_test_service_with(storage.clone(), ServiceConfig::default());
        service.load_contracts().await.unwrap();

        let response = service
            .handle_execute_transaction(
                Uuid::new_v4(),
                payload(&signer, key_id, 3 + DISPLAY_ID_OFFSET),
            )
            .await
            .unwrap();

        assert!(response.is_committed());
        assert_eq!(response.result, "ok");
        assert_eq!(storage.rows("1_members").len(), 1);
        let balance = storage.key(1, key_id).unwrap().unwrap().amount;
        assert_eq!(balance, 100 - 10 - response.fuel_used);

        let stats = service.stats().await;
        assert_eq!(stats.transactions_executed, 1);
        assert_eq!(stats.committed, 1);
        assert_eq!(stats.total_fuel_used, u64::try_from(response.fuel_used).unwrap());
    }

    #[tokio::test]
    async fn test_rejected_request_discards_session() {
        let signer = SigningKey::from_slice(&[3; 32]).unwrap();
        let (storage, key_id) = seeded_storage(&signer);
        let service = create_test_service_with(storage.clone(), ServiceConfig::default());
        service.load_contracts().await.unwrap();

        let response = service
            .handle_execute_transaction(Uuid::new_v4(), payload(&signer, key_id, 999_999))
            .await
            .unwrap();

        assert_eq!(response.status, None);
        assert!(response.excluded);
        assert!(storage.rows("1_members").is_empty());
        assert_eq!(service.stats().await.rejected, 1);
    }

    #[tokio::test]
    async fn test_stats_disabled() {
        let config = ServiceConfig {
            collect_stats: false,
            ..ServiceConfig::default()
        };
        let service = create_test_service_with(InMemoryStorage::new(), config);
        let signer = SigningKey::from_slice(&[3; 32]).unwrap();
        service
            .handle_execute_transaction(Uuid::new_v4(), payload(&signer, 1, 1))
            .await
            .unwrap();
        assert_eq!(service.stats().await.transactions_executed, 0);
    }

    #[test]
    fn test_config_validate() {
        assert!(ServiceConfig::default().validate().is_ok());
        let config = ServiceConfig {
            page_size: 0,
            ..ServiceConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { name: "page_size", .. })
        ));
    }

    #[test]
    fn test_stats_record() {
        let mut stats = ServiceStats::default();
        let outcome = ExecutionOutcome {
            status: ExecutionStatus::FeeCharged,
            result: String::new(),
            fuel_used: 7,
            rollback: vec![],
            notifications: vec![],
        };
        stats.record(&Ok(outcome), 10);
        stats.record(&Err(ExecutionError::ContractNotFound("1".into())), 20);
        assert_eq!(stats.fee_charged, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.total_fuel_used, 7);
        assert_eq!(stats.avg_execution_time_us, 15);
    }

    #[test]
    fn test_stats_average_of_large_durations() {
        let mut stats = ServiceStats::default();
        let err = || Err(ExecutionError::ContractNotFound("1".into()));
        stats.record(&err(), u64::MAX);
        stats.record(&err(), u64::MAX);
        assert_eq!(stats.avg_execution_time_us, u64::MAX);
        stats.record(&err(), 0);
        assert_eq!(stats.avg_execution_time_us, u64::MAX / 3 * 2);
    }
}
