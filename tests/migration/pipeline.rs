use redis_migrator::migrator::{migrate_key, MigrationError};

use crate::test_utils::{TestEnv, TestValue};

#[tokio::test]
async fn test_migrate_string_key() {
    let env = TestEnv::new().await;
    env.source.seed(0, "greeting", TestValue::str("v1")).await;

    let (mut source, mut destination) = env.connect_pair(0).await;
    migrate_key(&mut source, &mut destination, "greeting")
        .await
        .unwrap();

    let snapshot = env.destination.snapshot(0).await;
    assert_eq!(snapshot.get("greeting"), Some(&TestValue::str("v1")));
}

#[tokio::test]
async fn test_migrate_string_key_overwrites_destination() {
    let env = TestEnv::new().await;
    env.source.seed(0, "greeting", TestValue::str("new")).await;
    env.destination
        .seed(0, "greeting", TestValue::str("stale"))
        .await;

    let (mut source, mut destination) = env.connect_pair(0).await;
    migrate_key(&mut source, &mut destination, "greeting")
        .await
        .unwrap();

    let snapshot = env.destination.snapshot(0).await;
    assert_eq!(snapshot.get("greeting"), Some(&TestValue::str("new")));
}

#[tokio::test]
async fn test_migrate_list_key_preserves_order() {
    let env = TestEnv::new().await;
    env.source
        .seed(0, "fruits", TestValue::list(&["a", "b", "c"]))
        .await;

    let (mut source, mut destination) = env.connect_pair(0).await;
    migrate_key(&mut source, &mut destination, "fruits")
        .await
        .unwrap();

    let snapshot = env.destination.snapshot(0).await;
    assert_eq!(
        snapshot.get("fruits"),
        Some(&TestValue::list(&["a", "b", "c"]))
    );
}

#[tokio::test]
async fn test_migrate_hash_key() {
    let env = TestEnv::new().await;
    env.source
        .seed(
            0,
            "session",
            TestValue::hash(&[("user", "luis"), ("ttl", "3600")]),
        )
        .await;

    let (mut source, mut destination) = env.connect_pair(0).await;
    migrate_key(&mut source, &mut destination, "session")
        .await
        .unwrap();

    let snapshot = env.destination.snapshot(0).await;
    assert_eq!(
        snapshot.get("session"),
        Some(&TestValue::hash(&[("user", "luis"), ("ttl", "3600")]))
    );
}

#[tokio::test]
async fn test_migrate_set_key() {
    let env = TestEnv::new().await;
    env.source.seed(0, "tags", TestValue::set(&["x", "y"])).await;

    let (mut source, mut destination) = env.connect_pair(0).await;
    migrate_key(&mut source, &mut destination, "tags")
        .await
        .unwrap();

    let snapshot = env.destination.snapshot(0).await;
    assert_eq!(snapshot.get("tags"), Some(&TestValue::set(&["x", "y"])));
}

#[tokio::test]
async fn test_migrate_sorted_set_key_preserves_scores_and_order() {
    let env = TestEnv::new().await;
    env.source
        .seed(
            0,
            "board",
            TestValue::sorted_set(&[("m2", 2.0), ("m1", 1.0), ("m3", 1.5)]),
        )
        .await;

    let (mut source, mut destination) = env.connect_pair(0).await;
    migrate_key(&mut source, &mut destination, "board")
        .await
        .unwrap();

    let snapshot = env.destination.snapshot(0).await;
    let Some(TestValue::SortedSet(pairs)) = snapshot.get("board") else {
        panic!("expected a sorted set on the destination");
    };

    let members: Vec<&str> = pairs.iter().map(|(member, _)| member.as_str()).collect();
    assert_eq!(members, vec!["m1", "m3", "m2"]);
    assert_eq!(
        pairs,
        &vec![
            ("m1".to_string(), 1.0),
            ("m3".to_string(), 1.5),
            ("m2".to_string(), 2.0),
        ]
    );
}

#[tokio::test]
async fn test_migrate_hash_emptied_after_type_lookup_is_a_no_op() {
    // A key can be emptied (or deleted) between the TYPE lookup and
    // the read; the pipeline treats the empty read as success and
    // writes nothing.
    let env = TestEnv::new().await;
    env.source.seed(0, "session", TestValue::hash(&[])).await;

    let (mut source, mut destination) = env.connect_pair(0).await;
    migrate_key(&mut source, &mut destination, "session")
        .await
        .unwrap();

    assert!(env.destination.snapshot(0).await.is_empty());
}

#[tokio::test]
async fn test_migrate_unsupported_type_is_a_hard_error() {
    let env = TestEnv::new().await;
    env.source.seed(0, "events", TestValue::Stream).await;

    let (mut source, mut destination) = env.connect_pair(0).await;
    let result = migrate_key(&mut source, &mut destination, "events").await;

    match result.unwrap_err() {
        MigrationError::UnsupportedType { key, key_type } => {
            assert_eq!(key, "events");
            assert_eq!(key_type, "stream");
        }
        other => panic!("expected UnsupportedType, got {:?}", other),
    }
    assert!(env.destination.snapshot(0).await.is_empty());
}

#[tokio::test]
async fn test_migrate_missing_key_reports_its_type_as_unsupported() {
    let env = TestEnv::new().await;

    let (mut source, mut destination) = env.connect_pair(0).await;
    let result = migrate_key(&mut source, &mut destination, "ghost").await;

    match result.unwrap_err() {
        MigrationError::UnsupportedType { key, key_type } => {
            assert_eq!(key, "ghost");
            assert_eq!(key_type, "none");
        }
        other => panic!("expected UnsupportedType, got {:?}", other),
    }
}

#[tokio::test]
async fn test_migrate_key_selects_the_right_database() {
    let env = TestEnv::new().await;
    env.source.seed(2, "greeting", TestValue::str("db2")).await;

    let (mut source, mut destination) = env.connect_pair(2).await;
    migrate_key(&mut source, &mut destination, "greeting")
        .await
        .unwrap();

    assert_eq!(
        env.destination.snapshot(2).await.get("greeting"),
        Some(&TestValue::str("db2"))
    );
    assert!(env.destination.snapshot(0).await.is_empty());
}

#[tokio::test]
async fn test_connect_with_password_authenticates() {
    let env = TestEnv::new().await;
    env.source.seed(0, "greeting", TestValue::str("v1")).await;

    let mut endpoint = env.source.endpoint();
    endpoint.password = Some("hunter2".to_string());

    let mut source = redis_migrator::connection::RedisConnection::connect(&endpoint, 0)
        .await
        .unwrap();
    let keys = source.keys("*").await.unwrap();

    assert_eq!(keys, vec!["greeting".to_string()]);
}
