#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use strata_core::{Document, StrataError, Value};
    use strata_format::{DocumentStore, MemoryStore};
    use strata_manager::{
        DocumentManager, DocumentOps, FlushPolicy, GroupConfig, Instrumented, LifecycleState,
        OpHook, load_group,
    };
    use strata_merge::StrategyRegistry;

    fn doc(json: serde_json::Value) -> Document {
        serde_json::from_value(json).expect("valid document")
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.insert(
            "mem://app.json",
            doc(serde_json::json!({"server": {"port": 8080}})),
        );
        store
    }

    // ── Lifecycle state tests ──────────────────────────────────

    #[test]
    fn test_initial_state_is_not_loaded() {
        let manager = DocumentManager::new(seeded_store(), "mem://app.json");
        assert_eq!(manager.state(), LifecycleState::NotLoaded);
        assert!(!manager.is_loaded());
        assert!(matches!(
            manager.get("server.port"),
            Err(StrataError::NotLoaded(_))
        ));
    }

    #[test]
    fn test_load_then_read() {
        let mut manager = DocumentManager::new(seeded_store(), "mem://app.json");
        manager.load().unwrap();
        assert_eq!(manager.state(), LifecycleState::Loaded);
        assert!(!manager.is_dirty());
        assert_eq!(
            manager.get("server.port").unwrap(),
            Some(&Value::Integer(8080))
        );
    }

    #[test]
    fn test_failed_load_leaves_not_loaded() {
        let store = seeded_store();
        let mut manager = DocumentManager::new(store, "mem://missing.json");
        assert!(manager.load().is_err());
        assert_eq!(manager.state(), LifecycleState::NotLoaded);
        assert!(manager.document().is_none());
    }

    #[test]
    fn test_mutation_flips_dirty_and_save_clears_it() {
        let mut manager = DocumentManager::new(seeded_store(), "mem://app.json");
        manager.load().unwrap();
        assert!(manager.set("server.host", Value::from("0.0.0.0"), true).unwrap());
        assert_eq!(manager.state(), LifecycleState::Dirty);
        manager.save().unwrap();
        assert_eq!(manager.state(), LifecycleState::Loaded);
        assert!(!manager.is_dirty());
    }

    #[test]
    fn test_no_op_mutations_do_not_dirty() {
        let mut manager = DocumentManager::new(seeded_store(), "mem://app.json");
        manager.load().unwrap();
        // Overwrite refusal and absent-path delete both leave state clean.
        assert!(!manager.set("server.port", Value::Integer(1), false).unwrap());
        assert!(!manager.delete("server.missing").unwrap());
        assert_eq!(manager.state(), LifecycleState::Loaded);
    }

    #[test]
    fn test_delete_dirties_only_on_removal() {
        let mut manager = DocumentManager::new(seeded_store(), "mem://app.json");
        manager.load().unwrap();
        assert!(manager.delete("server.port").unwrap());
        assert!(manager.is_dirty());
    }

    #[test]
    fn test_failed_save_stays_dirty_and_retry_is_idempotent() {
        let store = seeded_store();
        let mut manager = DocumentManager::new(store.clone(), "mem://app.json");
        manager.load().unwrap();
        manager.set("a", Value::Integer(1), true).unwrap();

        store.set_fail_saves(true);
        assert!(matches!(manager.save(), Err(StrataError::Write { .. })));
        assert_eq!(manager.state(), LifecycleState::Dirty);

        store.set_fail_saves(false);
        manager.save().unwrap();
        assert_eq!(manager.state(), LifecycleState::Loaded);
        assert_eq!(
            store.get("mem://app.json").unwrap().get("a").unwrap(),
            Some(&Value::Integer(1))
        );
    }

    #[test]
    fn test_save_if_dirty_is_noop_when_clean() {
        let store = seeded_store();
        let mut manager = DocumentManager::new(store.clone(), "mem://app.json");
        manager.load().unwrap();
        assert!(!manager.save_if_dirty().unwrap());
        assert_eq!(store.save_count(), 0);
        manager.set("k", Value::Null, true).unwrap();
        assert!(manager.save_if_dirty().unwrap());
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_unload_discards_unsaved_mutations() {
        let store = seeded_store();
        let mut manager = DocumentManager::new(store.clone(), "mem://app.json");
        manager.load().unwrap();
        manager.set("server.port", Value::Integer(9999), true).unwrap();
        manager.unload();
        assert_eq!(manager.state(), LifecycleState::NotLoaded);
        // The store never saw the mutation.
        assert_eq!(
            store.get("mem://app.json").unwrap().get("server.port").unwrap(),
            Some(&Value::Integer(8080))
        );
    }

    #[test]
    fn test_reload_reverts_to_stored_document() {
        let mut manager = DocumentManager::new(seeded_store(), "mem://app.json");
        manager.load().unwrap();
        manager.set("server.port", Value::Integer(1), true).unwrap();
        manager.reload().unwrap();
        assert_eq!(manager.state(), LifecycleState::Loaded);
        assert_eq!(
            manager.get("server.port").unwrap(),
            Some(&Value::Integer(8080))
        );
    }

    #[test]
    fn test_autoflush_persists_every_mutation() {
        let store = seeded_store();
        let mut manager =
            DocumentManager::new(store.clone(), "mem://app.json").autoflush(true);
        manager.load().unwrap();
        manager.set("a", Value::Integer(1), true).unwrap();
        manager.set("b", Value::Integer(2), true).unwrap();
        assert_eq!(store.save_count(), 2);
        assert!(!manager.is_dirty());
    }

    // ── Batch guard tests ──────────────────────────────────────

    #[test]
    fn test_batch_folds_mutations_into_one_save() {
        let store = seeded_store();
        let mut manager =
            DocumentManager::new(store.clone(), "mem://app.json").autoflush(true);
        manager.load().unwrap();
        {
            let mut batch = manager.batch(FlushPolicy::FlushOnExit);
            batch.set("a", Value::Integer(1), true).unwrap();
            batch.set("b", Value::Integer(2), true).unwrap();
            batch.delete("server.port").unwrap();
        }
        assert_eq!(store.save_count(), 1);
        assert!(!manager.is_dirty());
        // Autoflush behavior is restored after the scope.
        manager.set("c", Value::Integer(3), true).unwrap();
        assert_eq!(store.save_count(), 2);
    }

    #[test]
    fn test_batch_commit_flushes_exactly_once() {
        let store = seeded_store();
        let mut manager = DocumentManager::new(store.clone(), "mem://app.json");
        manager.load().unwrap();
        let mut batch = manager.batch(FlushPolicy::FlushOnExit);
        batch.set("x", Value::from("y"), true).unwrap();
        batch.commit().unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(manager.state(), LifecycleState::Loaded);
    }

    #[test]
    fn test_batch_discard_policy_skips_flush() {
        let store = seeded_store();
        let mut manager = DocumentManager::new(store.clone(), "mem://app.json");
        manager.load().unwrap();
        {
            let mut batch = manager.batch(FlushPolicy::Discard);
            batch.set("x", Value::Integer(1), true).unwrap();
        }
        assert_eq!(store.save_count(), 0);
        // Mutations are kept in memory, just not persisted.
        assert!(manager.is_dirty());
        assert_eq!(manager.get("x").unwrap(), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_batch_explicit_discard_overrides_flush_policy() {
        let store = seeded_store();
        let mut manager = DocumentManager::new(store.clone(), "mem://app.json");
        manager.load().unwrap();
        let mut batch = manager.batch(FlushPolicy::FlushOnExit);
        batch.set("x", Value::Integer(1), true).unwrap();
        batch.discard();
        assert_eq!(store.save_count(), 0);
        assert!(manager.is_dirty());
    }

    #[test]
    fn test_batch_drop_with_failing_store_stays_dirty() {
        let store = seeded_store();
        let mut manager = DocumentManager::new(store.clone(), "mem://app.json");
        manager.load().unwrap();
        store.set_fail_saves(true);
        {
            let mut batch = manager.batch(FlushPolicy::FlushOnExit);
            batch.set("x", Value::Integer(1), true).unwrap();
            // Drop path: the failed flush is logged, never panics.
        }
        assert!(manager.is_dirty());
        store.set_fail_saves(false);
        manager.save().unwrap();
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_batch_flush_survives_unwind() {
        let store = seeded_store();
        let manager = std::sync::Mutex::new(
            DocumentManager::new(store.clone(), "mem://app.json"),
        );
        manager.lock().unwrap().load().unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut guard = manager.lock().unwrap();
            let mut batch = guard.batch(FlushPolicy::FlushOnExit);
            batch.set("x", Value::Integer(1), true).unwrap();
            panic!("boom");
        }));
        assert!(result.is_err());
        // The guard flushed on the unwind path.
        assert_eq!(store.save_count(), 1);
        assert_eq!(
            store.get("mem://app.json").unwrap().get("x").unwrap(),
            Some(&Value::Integer(1))
        );
    }

    // ── Instrumentation tests ──────────────────────────────────

    #[derive(Default)]
    struct CountingHook {
        before: AtomicUsize,
        after: AtomicUsize,
        failures: AtomicUsize,
    }

    impl OpHook for CountingHook {
        fn before(&self, _op: &str, _key: Option<&str>) {
            self.before.fetch_add(1, Ordering::SeqCst);
        }

        fn after(&self, _op: &str, _key: Option<&str>, _elapsed: std::time::Duration, ok: bool) {
            self.after.fetch_add(1, Ordering::SeqCst);
            if !ok {
                self.failures.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_instrumented_forwards_results_unchanged() {
        let mut manager = DocumentManager::new(seeded_store(), "mem://app.json");
        manager.load().unwrap();
        let hook = Arc::new(CountingHook::default());
        let mut ops = Instrumented::new(manager).with_hook(hook.clone());

        assert_eq!(
            ops.get_value("server.port").unwrap(),
            Some(Value::Integer(8080))
        );
        assert!(ops.set("server.port", Value::Integer(9090), true).unwrap());
        assert!(ops.has("server.port").unwrap());
        assert!(ops.delete("server.port").unwrap());
        ops.save().unwrap();

        assert_eq!(hook.before.load(Ordering::SeqCst), 5);
        assert_eq!(hook.after.load(Ordering::SeqCst), 5);
        assert_eq!(hook.failures.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_instrumented_propagates_errors_unchanged() {
        // Never loaded, so every op fails; the wrapper must not mask that.
        let manager = DocumentManager::new(seeded_store(), "mem://app.json");
        let hook = Arc::new(CountingHook::default());
        let ops = Instrumented::new(manager).with_hook(hook.clone());

        assert!(matches!(
            ops.get_value("a.b"),
            Err(StrataError::NotLoaded(_))
        ));
        assert_eq!(hook.failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_instrumented_dirty_passthrough() {
        let mut manager = DocumentManager::new(seeded_store(), "mem://app.json");
        manager.load().unwrap();
        let mut ops = Instrumented::new(manager);
        assert!(!ops.is_dirty());
        ops.set("k", Value::Null, true).unwrap();
        assert!(ops.is_dirty());
        assert!(ops.into_inner().is_dirty());
    }

    // ── File group tests ───────────────────────────────────────

    fn group_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.insert(
            "defaults.toml",
            doc(serde_json::json!({
                "database": {"host": "localhost", "port": 5432},
                "logging": {"level": "INFO"}
            })),
        );
        store.insert(
            "prod.toml",
            doc(serde_json::json!({
                "database": {"host": "prod", "ssl": true}
            })),
        );
        store
    }

    #[test]
    fn test_group_config_from_toml() {
        let raw = r#"
[groups.app]
sources = ["defaults.toml", "prod.toml"]
strategy = "priority"

[groups.app.weights]
"defaults.toml" = 0
"prod.toml" = 10

[groups.tenants]
sources = ["a.cfg", "b.cfg"]
strategy = "namespace"
namespace_prefix = "tenant"
format = "yaml"
"#;
        let config = GroupConfig::from_toml(raw).unwrap();
        let app = &config.groups["app"];
        assert_eq!(app.sources, ["defaults.toml", "prod.toml"]);
        assert_eq!(app.strategy, "priority");
        assert_eq!(app.weights["prod.toml"], 10);
        let tenants = &config.groups["tenants"];
        assert_eq!(tenants.namespace_prefix.as_deref(), Some("tenant"));
        assert_eq!(tenants.format.as_deref(), Some("yaml"));
        assert_eq!(app.format, None);
    }

    #[test]
    fn test_group_config_defaults_to_deep() {
        let raw = "[groups.g]\nsources = [\"a.json\"]\n";
        let config = GroupConfig::from_toml(raw).unwrap();
        assert_eq!(config.groups["g"].strategy, "deep");
    }

    #[test]
    fn test_load_group_deep() {
        let store = group_store();
        let registry = StrategyRegistry::with_builtins();
        let config = GroupConfig::from_toml(
            "[groups.app]\nsources = [\"defaults.toml\", \"prod.toml\"]\nstrategy = \"deep\"\n",
        )
        .unwrap();
        let merged = load_group(store.as_ref(), &registry, &config.groups["app"]).unwrap();
        assert_eq!(
            merged,
            doc(serde_json::json!({
                "database": {"host": "prod", "port": 5432, "ssl": true},
                "logging": {"level": "INFO"}
            }))
        );
    }

    #[test]
    fn test_load_group_priority_weights_outrank_order() {
        let store = group_store();
        let registry = StrategyRegistry::with_builtins();
        let raw = r#"
[groups.app]
sources = ["prod.toml", "defaults.toml"]
strategy = "priority"

[groups.app.weights]
"prod.toml" = 10
"defaults.toml" = 0
"#;
        let config = GroupConfig::from_toml(raw).unwrap();
        let merged = load_group(store.as_ref(), &registry, &config.groups["app"]).unwrap();
        // prod.toml outweighs defaults.toml despite coming first.
        assert_eq!(
            merged.get("database.host").unwrap(),
            Some(&Value::String("prod".into()))
        );
        assert_eq!(
            merged.get("database.port").unwrap(),
            Some(&Value::Integer(5432))
        );
    }

    #[test]
    fn test_load_group_namespace_with_prefix() {
        let store = group_store();
        let registry = StrategyRegistry::with_builtins();
        let raw = r#"
[groups.spaces]
sources = ["defaults.toml", "prod.toml"]
strategy = "namespace"
namespace_prefix = "envs"
"#;
        let config = GroupConfig::from_toml(raw).unwrap();
        let merged = load_group(store.as_ref(), &registry, &config.groups["spaces"]).unwrap();
        assert_eq!(
            merged.get("envs.prod.database.host").unwrap(),
            Some(&Value::String("prod".into()))
        );
        assert_eq!(
            merged.get("envs.defaults.logging.level").unwrap(),
            Some(&Value::String("INFO".into()))
        );
    }

    #[test]
    fn test_load_group_format_override_forces_codec() {
        use strata_format::FileStore;

        // Extensionless locators are unreadable without the group's format.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defaults");
        std::fs::write(&path, r#"{"database": {"host": "localhost"}}"#).unwrap();
        let locator = path.to_string_lossy().to_string();

        let store = FileStore::new();
        let registry = StrategyRegistry::with_builtins();
        let raw = format!(
            "[groups.g]\nsources = [\"{locator}\"]\nformat = \"json\"\n"
        );
        let config = GroupConfig::from_toml(&raw).unwrap();
        let merged = load_group(&store, &registry, &config.groups["g"]).unwrap();
        assert_eq!(
            merged.get("database.host").unwrap(),
            Some(&Value::String("localhost".into()))
        );

        // Without the override the same group fails on format selection.
        let raw = format!("[groups.g]\nsources = [\"{locator}\"]\n");
        let config = GroupConfig::from_toml(&raw).unwrap();
        assert!(matches!(
            load_group(&store, &registry, &config.groups["g"]),
            Err(StrataError::Load { .. })
        ));
    }

    #[test]
    fn test_load_group_unrecognized_format_token() {
        let store = group_store();
        let registry = StrategyRegistry::with_builtins();
        let config = GroupConfig::from_toml(
            "[groups.g]\nsources = [\"defaults.toml\"]\nformat = \"ini\"\n",
        )
        .unwrap();
        assert!(matches!(
            load_group(store.as_ref(), &registry, &config.groups["g"]),
            Err(StrataError::Load { .. })
        ));
    }

    #[test]
    fn test_load_group_format_ignored_by_formatless_store() {
        // MemoryStore has no codecs; a group format must not break it.
        let store = group_store();
        let registry = StrategyRegistry::with_builtins();
        let config = GroupConfig::from_toml(
            "[groups.g]\nsources = [\"defaults.toml\"]\nformat = \"json\"\n",
        )
        .unwrap();
        let merged = load_group(store.as_ref(), &registry, &config.groups["g"]).unwrap();
        assert_eq!(
            merged.get("database.host").unwrap(),
            Some(&Value::String("localhost".into()))
        );
    }

    #[test]
    fn test_load_group_unknown_strategy() {
        let store = group_store();
        let registry = StrategyRegistry::with_builtins();
        let config = GroupConfig::from_toml(
            "[groups.g]\nsources = [\"defaults.toml\"]\nstrategy = \"bogus\"\n",
        )
        .unwrap();
        assert!(matches!(
            load_group(store.as_ref(), &registry, &config.groups["g"]),
            Err(StrataError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_load_group_missing_source_is_load_error() {
        let store = group_store();
        let registry = StrategyRegistry::with_builtins();
        let config = GroupConfig::from_toml(
            "[groups.g]\nsources = [\"defaults.toml\", \"absent.toml\"]\n",
        )
        .unwrap();
        assert!(matches!(
            load_group(store.as_ref(), &registry, &config.groups["g"]),
            Err(StrataError::Load { .. })
        ));
    }

    #[test]
    fn test_manager_over_merged_group() {
        let store = group_store();
        let registry = StrategyRegistry::with_builtins();
        let config = GroupConfig::from_toml(
            "[groups.app]\nsources = [\"defaults.toml\", \"prod.toml\"]\n",
        )
        .unwrap();
        let merged = load_group(store.as_ref(), &registry, &config.groups["app"]).unwrap();
        let mut manager =
            DocumentManager::with_document(store.clone(), "merged.toml", merged);
        assert_eq!(manager.state(), LifecycleState::Loaded);
        manager.set("database.pool", Value::Integer(10), true).unwrap();
        manager.save().unwrap();
        assert_eq!(
            store.get("merged.toml").unwrap().get("database.pool").unwrap(),
            Some(&Value::Integer(10))
        );
    }
}
