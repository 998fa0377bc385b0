//! Rollout integration tests

use apimig_core::{ClientVariant, Preset};
use apimig_rollout::{
    BucketHasher, FactoryConfig, FileStore, HashAssigner, KeyValueStore, MemoryStore,
    MigrationClientFactory, RolloutConfig, RolloutController, StoreError, StoreResult,
    USER_HASH_KEY,
};
use apimig_test_utils::{all_presets, synthetic_tokens};
use mockall::mock;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;

mock! {
    Store {}
    impl KeyValueStore for Store {
        fn get(&self, key: &str) -> StoreResult<Option<String>>;
        fn set(&self, key: &str, value: &str) -> StoreResult<()>;
        fn remove(&self, key: &str) -> StoreResult<()>;
    }
}

fn controller(config: RolloutConfig) -> RolloutController {
    RolloutController::with_store(config, Arc::new(MemoryStore::new()))
}

fn controller_with_token(config: RolloutConfig, token: &str) -> RolloutController {
    let store = MemoryStore::new();
    store.set(USER_HASH_KEY, token).unwrap();
    RolloutController::with_store(config, Arc::new(store))
}

#[test]
fn buckets_are_fair() {
    let tokens = synthetic_tokens(10_000);
    for percentage in [0u8, 25, 50, 75, 100] {
        let selected = tokens
            .iter()
            .filter(|t| BucketHasher::Fnv1a.bucket(t) < percentage)
            .count();
        let share = selected as f64 / tokens.len() as f64 * 100.0;
        assert!(
            (share - f64::from(percentage)).abs() <= 3.0,
            "{percentage}% rollout selected {share:.2}%"
        );
    }
}

#[test]
fn decisions_match_bucket_fraction() {
    let tokens = synthetic_tokens(2_000);
    let config = RolloutConfig::new().with_enabled(true).with_percentage(50);
    let selected = tokens
        .iter()
        .filter(|t| controller_with_token(config.clone(), t).should_use_new(None))
        .count();
    let share = selected as f64 / tokens.len() as f64 * 100.0;
    assert!((share - 50.0).abs() <= 5.0, "selected {share:.2}%");
}

#[test]
fn disabled_only_overrides_win() {
    let c = controller(RolloutConfig::new().with_percentage(100).with_enabled_paths(["/admin"]));
    for path in ["/admin/x", "/billing", "/"] {
        assert!(!c.should_use_new(Some(path)));
    }
    c.set_override("/billing", true);
    assert!(c.should_use_new(Some("/billing")));
    assert!(!c.should_use_new(Some("/billing/sub")));
}

#[test]
fn allow_list_exclusivity() {
    for percentage in [0, 50, 100] {
        let c = controller(
            RolloutConfig::new()
                .with_enabled(true)
                .with_percentage(percentage)
                .with_enabled_paths(["/admin"]),
        );
        assert!(!c.should_use_new(Some("/billing")));
        assert!(c.should_use_new(Some("/admin/x")));
    }
}

#[test]
fn storage_failure_falls_back_to_session_token() {
    let mut store = MockStore::new();
    store
        .expect_get()
        .returning(|_| Err(StoreError::Unavailable("private browsing".into())));
    store.expect_set().never();

    let c = RolloutController::with_store(
        RolloutConfig::new().with_enabled(true).with_percentage(50),
        Arc::new(store),
    );
    let first = c.should_use_new(None);
    assert!(!c.assignment().persisted);
    assert_eq!(c.should_use_new(None), first);
}

#[test]
fn file_store_keeps_assignment_across_restarts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rollout.json");

    let first = HashAssigner::new(Arc::new(FileStore::new(&path))).assignment().clone();
    let second = HashAssigner::new(Arc::new(FileStore::new(&path))).assignment().clone();
    assert!(first.persisted);
    assert_eq!(first, second);

    FileStore::new(&path).remove(USER_HASH_KEY).unwrap();
    let third = HashAssigner::new(Arc::new(FileStore::new(&path))).assignment().clone();
    assert_ne!(third.token, first.token);
}

#[test]
fn toml_config_is_clamped() {
    let config: RolloutConfig = toml::from_str(
        r#"
        enabled = true
        rollout_percentage = 180
        disabled_paths = ["/legacy"]
        "#,
    )
    .unwrap();
    assert_eq!(config.rollout_percentage, 100);
    let c = controller(config);
    assert!(c.should_use_new(Some("/reports")));
    assert!(!c.should_use_new(Some("/legacy/export")));
}

#[test]
fn factory_serves_every_preset() {
    let c = Arc::new(controller(RolloutConfig::new().with_enabled(true).with_percentage(100)));
    let factory = MigrationClientFactory::new(c, FactoryConfig::default().with_api_version("v2"));
    for preset in all_presets() {
        let client = factory.get_client(preset, None).unwrap();
        assert_eq!(client.variant(), ClientVariant::Unified);
        assert_eq!(client.base_url(), "http://localhost:8080/api/v2");
        assert_eq!(client.settings(), &preset.settings());
    }
    assert_eq!(factory.cached_clients(), 5);
}

#[test]
fn live_config_changes_apply_to_next_call() {
    let c = Arc::new(controller(RolloutConfig::new().with_enabled(true)));
    let factory = MigrationClientFactory::new(Arc::clone(&c), FactoryConfig::default());
    assert_eq!(factory.get_client(Preset::Auth, None).unwrap().variant(), ClientVariant::Legacy);
    c.set_percentage(100);
    assert_eq!(factory.get_client(Preset::Auth, None).unwrap().variant(), ClientVariant::Unified);
}

proptest! {
    #[test]
    fn decision_is_deterministic(
        token in "[0-9a-f]{8}-[0-9a-f]{4}",
        percentage in 0i64..=100,
        path in "/[a-z]{1,8}",
    ) {
        let c = controller_with_token(
            RolloutConfig::new().with_enabled(true).with_percentage(percentage),
            &token,
        );
        let first = c.should_use_new(Some(&path));
        for _ in 0..3 {
            prop_assert_eq!(c.should_use_new(Some(&path)), first);
        }
    }
}
