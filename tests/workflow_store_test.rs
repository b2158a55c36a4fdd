//! SQLite workflow store: active slot, history, archives and side records.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;

use nftmigrate::adapters::sqlite::{create_migrated_test_pool, SqliteWorkflowStore};
use nftmigrate::domain::models::{
    Phase, PhaseFailure, PhaseOutput, Workflow, WorkflowConfig, WorkflowStatus,
};
use nftmigrate::domain::ports::WorkflowStore;
use nftmigrate::services::WorkflowStateService;

fn config() -> WorkflowConfig {
    WorkflowConfig {
        nft_contract: "0xABC0000000000000000000000000000000000001".to_string(),
        start_token_id: 0,
        end_token_id: 4,
        validator_address: None,
        extra: BTreeMap::new(),
    }
}

fn migration_output() -> PhaseOutput {
    serde_json::from_value(json!({
        "phase": "migrate_to_storage",
        "data": {
            "summary": {"total": 1, "successful": 1, "failed": 0, "success_rate": 100.0},
            "results": [{"source_cid": "cid1", "destination_id": "piece1", "success": true}],
            "migrated_at": "2026-01-01T00:00:00Z"
        }
    }))
    .unwrap()
}

async fn setup() -> (SqlitePool, SqliteWorkflowStore) {
    let pool = create_migrated_test_pool().await.unwrap();
    let store = SqliteWorkflowStore::new(pool.clone());
    (pool, store)
}

#[tokio::test]
async fn test_save_and_load_active_roundtrip() {
    let (_pool, store) = setup().await;
    assert!(store.load_active().await.unwrap().is_none());

    let mut workflow = Workflow::new(config());
    workflow.push_user_action("execute_phase_1", "confirmed", "", Utc::now());
    store.save(&workflow).await.unwrap();

    let loaded = store.load_active().await.unwrap().unwrap();
    assert_eq!(loaded, workflow);
}

#[tokio::test]
async fn test_history_snapshots_do_not_change() {
    let (_pool, store) = setup().await;
    let mut workflow = Workflow::new(config());
    store.save(&workflow).await.unwrap();

    workflow.begin_phase(Phase::RegisterAgent, Utc::now());
    store.save(&workflow).await.unwrap();
    let first_two = store.history(&workflow.workflow_id).await.unwrap();

    workflow.fail_phase(Phase::RegisterAgent, PhaseFailure::new("boom"), Utc::now());
    store.save(&workflow).await.unwrap();

    let history = store.history(&workflow.workflow_id).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(&history[..2], &first_two[..]);
    assert_eq!(history[0].workflow.status, WorkflowStatus::Initialized);
    assert_eq!(history[2].workflow.errors.len(), 1);
    assert!(store.history("workflow-unknown").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_history_rows_reject_update_and_delete() {
    let (pool, store) = setup().await;
    let workflow = Workflow::new(config());
    store.save(&workflow).await.unwrap();

    let update = sqlx::query("UPDATE workflow_history SET workflow_json = '{}'")
        .execute(&pool)
        .await;
    assert!(update.unwrap_err().to_string().contains("append-only"));

    let delete = sqlx::query("DELETE FROM workflow_history").execute(&pool).await;
    assert!(delete.unwrap_err().to_string().contains("append-only"));

    assert_eq!(store.history(&workflow.workflow_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_archive_clears_slot_and_side_records() {
    let (_pool, store) = setup().await;
    let workflow = Workflow::new(config());
    store.save(&workflow).await.unwrap();
    store
        .save_phase_output(&workflow.workflow_id, Phase::MigrateToStorage, &migration_output())
        .await
        .unwrap();
    assert!(store
        .load_phase_output(Phase::MigrateToStorage)
        .await
        .unwrap()
        .is_some());

    let now = Utc::now();
    let archive_id = store.archive_active(now).await.unwrap().unwrap();
    assert_eq!(
        archive_id,
        format!("{}-archived-{}", workflow.workflow_id, now.timestamp_millis())
    );

    assert!(store.load_active().await.unwrap().is_none());
    assert!(store
        .load_phase_output(Phase::MigrateToStorage)
        .await
        .unwrap()
        .is_none());
    // History outlives the reset.
    assert_eq!(store.history(&workflow.workflow_id).await.unwrap().len(), 1);

    let archives = store.archives().await.unwrap();
    assert_eq!(archives.len(), 1);
    assert_eq!(archives[0].archive_id, archive_id);
    assert_eq!(archives[0].workflow, workflow);

    assert!(store.archive_active(Utc::now()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_phase_output_is_replaced_per_phase() {
    let (_pool, store) = setup().await;
    let output = migration_output();
    store
        .save_phase_output("workflow-a", Phase::MigrateToStorage, &output)
        .await
        .unwrap();
    store
        .save_phase_output("workflow-b", Phase::MigrateToStorage, &output)
        .await
        .unwrap();

    let stored = store
        .load_phase_output(Phase::MigrateToStorage)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.workflow_id, "workflow-b");
    assert_eq!(stored.phase, Phase::MigrateToStorage);
    assert_eq!(stored.output, output);
    assert!(store.load_phase_output(Phase::ScanNft).await.unwrap().is_none());
}

#[tokio::test]
async fn test_corrupt_active_record_reads_as_absent() {
    let (pool, store) = setup().await;
    sqlx::query(
        "INSERT INTO active_workflow (slot, workflow_id, status, current_phase, workflow_json, updated_at)
         VALUES (1, 'workflow-broken', 'initialized', 0, '{not json', '2026-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await
    .unwrap();

    assert!(store.load_active().await.is_err());

    let service = WorkflowStateService::new(Arc::new(store));
    assert!(service.load_active().await.is_none());

    // The broken record can still be archived out of the way.
    let reset = service.reset().await.unwrap();
    assert_eq!(reset.archived.as_deref().map(|id| id.starts_with("workflow-broken-archived-")), Some(true));
    // Unreadable archives are skipped rather than failing the listing.
    assert!(service.archives().await.unwrap().is_empty());
}
