use tokio_util::sync::CancellationToken;

use redis_migrator::migrator::{migrate, MigrationError};

use crate::test_utils::{TestEnv, TestValue};

#[tokio::test]
async fn test_migrate_copies_every_configured_database() {
    let env = TestEnv::new().await;
    env.source.seed(0, "greeting", TestValue::str("db0")).await;
    env.source.seed(1, "greeting", TestValue::str("db1")).await;
    env.source
        .seed(1, "tags", TestValue::set(&["x", "y"]))
        .await;

    let configuration = env.configuration(vec![0, 1]);
    migrate(&CancellationToken::new(), &configuration)
        .await
        .unwrap();

    assert_eq!(
        env.destination.snapshot(0).await.get("greeting"),
        Some(&TestValue::str("db0"))
    );
    let db1 = env.destination.snapshot(1).await;
    assert_eq!(db1.get("greeting"), Some(&TestValue::str("db1")));
    assert_eq!(db1.get("tags"), Some(&TestValue::set(&["x", "y"])));
}

#[tokio::test]
async fn test_migrate_fails_fast_across_databases() {
    let env = TestEnv::new().await;
    env.source.fail_keys_command(0).await;
    env.source.seed(1, "greeting", TestValue::str("db1")).await;

    let configuration = env.configuration(vec![0, 1]);
    let result = migrate(&CancellationToken::new(), &configuration).await;

    assert!(matches!(
        result.unwrap_err(),
        MigrationError::KeyListingFailed { db: 0, .. }
    ));
    // Database 1 was never attempted.
    assert!(env.destination.snapshot(1).await.is_empty());
}

#[tokio::test]
async fn test_migrate_with_zero_workers_still_runs() {
    let env = TestEnv::new().await;
    env.source.seed(0, "greeting", TestValue::str("v1")).await;

    let mut configuration = env.configuration(vec![0]);
    configuration.workers = 0;

    migrate(&CancellationToken::new(), &configuration)
        .await
        .unwrap();

    assert_eq!(
        env.destination.snapshot(0).await.get("greeting"),
        Some(&TestValue::str("v1"))
    );
}

#[tokio::test]
async fn test_migrate_propagates_key_failures_as_database_errors() {
    let env = TestEnv::new().await;
    env.source.seed(0, "events", TestValue::Stream).await;

    let configuration = env.configuration(vec![0]);
    let result = migrate(&CancellationToken::new(), &configuration).await;

    assert!(matches!(
        result.unwrap_err(),
        MigrationError::Database {
            db: 0,
            failed: 1,
            total: 1
        }
    ));
}

#[tokio::test]
async fn test_migrate_with_clear_produces_an_exact_copy() {
    let env = TestEnv::new().await;
    env.source.seed(0, "greeting", TestValue::str("v1")).await;
    env.destination
        .seed(0, "leftover", TestValue::str("stale"))
        .await;

    let mut configuration = env.configuration(vec![0]);
    configuration.clear_destination = true;

    migrate(&CancellationToken::new(), &configuration)
        .await
        .unwrap();

    let snapshot = env.destination.snapshot(0).await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.get("greeting"), Some(&TestValue::str("v1")));
}

#[tokio::test]
async fn test_cancelled_migration_reports_the_runner_error() {
    let env = TestEnv::new().await;
    env.source.seed(0, "greeting", TestValue::str("v1")).await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let configuration = env.configuration(vec![0]);
    let result = migrate(&cancel, &configuration).await;

    assert!(matches!(
        result.unwrap_err(),
        MigrationError::Runner { db: 0, .. }
    ));
}
