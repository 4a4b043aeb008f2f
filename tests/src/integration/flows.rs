//! # Integration Test Flows
//!
//! Drives whole transactions through `ContractExecutionService` and checks
//! what survives in storage and in the registry afterwards.
//!
//! ## Flows Tested:
//!
//! 1. **Commit**: contract writes, fee and history row all persist
//! 2. **Fee-charged failure**: only the fee survives
//! 3. **Rejection**: nothing survives, exclusion decided by the error kind
//! 4. **Limits**: fuel clamp, recursion guard, time limit
//! 5. **Permissions**: table denial and column filtering

#[cfg(test)]
mod tests {
    use crate::integration::{Harness, CONTRACT_TABLE_ID, ECOSYSTEM, START_BALANCE};
    use qc_11_contract_execution::prelude::*;
    use qc_11_contract_execution::registry::DISPLAY_ID_OFFSET;

    // =============================================================================
    // REGISTRY
    // =============================================================================

    #[tokio::test]
    async fn test_lookup_by_name_and_id_agree() {
        let harness = Harness::paid().await;
        let registry = harness.service.registry();

        for name in ["Register", "Rename", "Peek", "PingA", "PingB", "Payout"] {
            let by_name = registry.lookup_by_name(name, ECOSYSTEM).unwrap();
            let by_id = registry
                .lookup_by_id(i64::try_from(by_name.id).unwrap())
                .unwrap();
            assert_eq!(by_id.name, by_name.name);
            assert_eq!(by_id.name, format!("@{ECOSYSTEM}{name}"));
        }

        let displayed = registry
            .lookup_by_id(CONTRACT_TABLE_ID + DISPLAY_ID_OFFSET)
            .unwrap();
        assert_eq!(displayed.table_id(), CONTRACT_TABLE_ID);
    }

    #[tokio::test]
    async fn test_reload_registers_nothing_new() {
        let harness = Harness::paid().await;
        let before = harness.service.registry().len();
        assert_eq!(harness.service.load_contracts().await.unwrap(), 0);
        assert_eq!(harness.service.registry().len(), before);
    }

    // =============================================================================
    // COMMIT
    // =============================================================================

    #[tokio::test]
    async fn test_commit_persists_writes_and_fee() {
        let harness = Harness::paid().await;
        let response = harness.execute("Register").await;

        assert!(response.is_committed());
        assert_eq!(response.result, "2");
        assert_eq!(response.rollback.len(), 1);
        assert!(response.rollback[0].data.is_empty());
        assert_eq!(response.notifications.len(), 1);
        assert_eq!(response.notifications[0].payload, "welcome");

        assert_eq!(harness.storage.rows("1_members").len(), 2);
        assert_eq!(harness.storage.rows("1_history").len(), 1);
        assert_eq!(
            harness.balance(),
            START_BALANCE - 10 - response.fuel_used
        );
    }

    #[tokio::test]
    async fn test_update_records_previous_row() {
        let harness = Harness::private().await;
        let response = harness.execute("Rename").await;

        assert!(response.is_committed());
        let record = &response.rollback[0];
        assert_eq!(record.table, "1_members");
        assert_eq!(record.row_id, 1);
        let previous: serde_json::Value = serde_json::from_str(&record.data).unwrap();
        assert_eq!(previous["name"], "alice");

        let row = harness.storage.row("1_members", 1).unwrap();
        assert_eq!(row.get("name"), Some(&Value::from("dave")));
    }

    #[tokio::test]
    async fn test_private_chain_charges_nothing() {
        let harness = Harness::private().await;
        let response = harness.execute("Register").await;
        assert!(response.is_committed());
        assert_eq!(harness.balance(), START_BALANCE);
        assert!(harness.storage.rows("1_history").is_empty());
    }

    // =============================================================================
    // FEE-CHARGED FAILURES
    // =============================================================================

    #[tokio::test]
    async fn test_failure_keeps_only_the_fee() {
        let harness = Harness::paid().await;
        let response = harness.execute("Crash").await;

        assert_eq!(response.status, Some(ExecutionStatus::FeeCharged));
        assert!(response.result.contains("boom"));
        assert!(response.rollback.is_empty());
        assert_eq!(harness.storage.rows("1_members").len(), 1);

        let history = harness.storage.rows("1_history");
        assert_eq!(history.len(), 1);
        assert_eq!(
            history[0].1.get("comment"),
            Some(&Value::from("fee (failed)"))
        );
        assert_eq!(
            harness.balance(),
            START_BALANCE - 10 - response.fuel_used
        );
    }

    #[tokio::test]
    async fn test_repeated_failures_charge_each_time() {
        let harness = Harness::paid().await;
        let first = harness.execute("Crash").await;
        let second = harness.execute("Crash").await;

        assert_eq!(first.fuel_used, second.fuel_used);
        assert_eq!(harness.storage.rows("1_members").len(), 1);
        assert_eq!(harness.storage.rows("1_history").len(), 2);
        assert_eq!(
            harness.balance(),
            START_BALANCE - 2 * (10 + first.fuel_used)
        );
    }

    #[tokio::test]
    async fn test_registry_change_undone_with_failure() {
        let harness = Harness::paid().await;
        let response = harness.execute("Deactivate").await;
        assert_eq!(response.status, Some(ExecutionStatus::FeeCharged));

        let payout = harness
            .service
            .registry()
            .lookup_by_name("Payout", ECOSYSTEM)
            .unwrap();
        assert!(payout.owner.active);
    }

    // =============================================================================
    // LIMITS
    // =============================================================================

    #[tokio::test]
    async fn test_fuel_exhaustion_clamped_to_limit() {
        let harness = Harness::with_params(SystemParameters {
            max_cost: 500,
            ..SystemParameters::default()
        })
        .await;
        let response = harness.execute("Burn").await;

        assert_eq!(response.status, Some(ExecutionStatus::FeeCharged));
        assert_eq!(response.fuel_used, 500);
        assert!(response.result.contains("paid cost limit exceeded"));
        assert_eq!(harness.balance(), START_BALANCE - 510);
    }

    #[tokio::test]
    async fn test_fuel_exhaustion_without_payment_rejected() {
        let harness = Harness::with_params(SystemParameters {
            max_cost: 500,
            private_chain: true,
            ..SystemParameters::default()
        })
        .await;
        let response = harness.execute("Burn").await;

        assert_eq!(response.status, None);
        assert!(response.excluded);
        assert!(response
            .error
            .as_deref()
            .unwrap()
            .contains("paid cost limit exceeded"));
    }

    #[tokio::test]
    async fn test_self_call_detected_as_loop() {
        let harness = Harness::private().await;
        let response = harness.execute("Recurse").await;
        assert_eq!(response.status, None);
        assert!(response
            .error
            .as_deref()
            .unwrap()
            .contains("there is loop in @1Recurse contract"));
    }

    #[tokio::test]
    async fn test_mutual_recursion_detected_as_loop() {
        let harness = Harness::private().await;
        let response = harness.execute("PingA").await;
        assert!(response
            .error
            .as_deref()
            .unwrap()
            .contains("there is loop in @1PingA contract"));
    }

    #[tokio::test]
    async fn test_timeout_leaves_transaction_eligible() {
        let harness = Harness::with_params(SystemParameters {
            private_chain: true,
            time_limit_ms: 20,
            ..SystemParameters::default()
        })
        .await;
        let response = harness.execute("Slow").await;

        assert_eq!(response.status, None);
        assert!(!response.excluded);
        assert!(response.error.as_deref().unwrap().contains("time limit"));
    }

    // =============================================================================
    // PERMISSIONS
    // =============================================================================

    #[tokio::test]
    async fn test_table_permission_denied() {
        let harness = Harness::paid().await;
        let response = harness.execute("Secret").await;

        assert_eq!(response.status, Some(ExecutionStatus::FeeCharged));
        assert!(response.result.contains("access denied"));
        assert!(harness.storage.rows("1_vault").is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_column_filtered() {
        let harness = Harness::private().await;
        let response = harness.execute("Peek").await;

        assert!(response.is_committed());
        let row: serde_json::Value = serde_json::from_str(&response.result).unwrap();
        assert_eq!(row["name"], "alice");
        assert!(row.get("salary").is_none());
    }

    // =============================================================================
    // REJECTION
    // =============================================================================

    #[tokio::test]
    async fn test_unknown_contract_rejected() {
        let harness = Harness::paid().await;
        let response = harness
            .submit(harness.payload_for_id(999_999, b"missing"))
            .await;

        assert_eq!(response.status, None);
        assert!(response.excluded);
        assert_eq!(harness.balance(), START_BALANCE);
        assert_eq!(harness.service.stats().await.rejected, 1);
    }

    #[tokio::test]
    async fn test_delegated_signer_rejected_before_any_write() {
        let harness = Harness::paid().await;
        let mut payload = harness.payload("Payout");
        payload.tx.signed_by = Some(harness.key_id);

        let response = harness.submit(payload).await;

        assert_eq!(response.status, None);
        assert!(response.excluded);
        assert!(response
            .error
            .as_deref()
            .unwrap()
            .contains("delayed contract @1Payout is not allowed"));
        assert_eq!(harness.balance(), START_BALANCE);
        assert!(harness.storage.rows("1_history").is_empty());
    }

    #[tokio::test]
    async fn test_tampered_hash_rejected() {
        let harness = Harness::paid().await;
        let mut payload = harness.payload("Register");
        payload.tx.hash = Hash::new([5; 32]);

        let response = harness.submit(payload).await;

        assert_eq!(response.error.as_deref(), Some("incorrect signature"));
        assert_eq!(harness.storage.rows("1_members").len(), 1);
    }

    #[tokio::test]
    async fn test_stats_track_outcomes() {
        let harness = Harness::paid().await;
        harness.execute("Register").await;
        harness.execute("Crash").await;
        harness
            .submit(harness.payload_for_id(999_999, b"missing"))
            .await;

        let stats = harness.service.stats().await;
        assert_eq!(stats.transactions_executed, 3);
        assert_eq!(stats.committed, 1);
        assert_eq!(stats.fee_charged, 1);
        assert_eq!(stats.rejected, 1);
    }
}
