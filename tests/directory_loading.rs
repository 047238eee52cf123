//! Integration tests for the directory-loading feature.

#[cfg(feature = "directory-loading")]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use resource_registry::{
        Context, DataSource, Descriptor, DirectoryConfig, DirectoryLoader, EntryKind,
        Environment, ErrorKind, FactoryRegistry, Resource, Result,
    };
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    /// A registry with a `text` factory that echoes the `value` property
    /// and counts its invocations.
    fn text_factories(calls: Arc<AtomicUsize>) -> Arc<FactoryRegistry> {
        let factories = FactoryRegistry::with_defaults();
        factories.register(
            "text",
            Arc::new(move |_: &str, config: &Descriptor| -> Result<Resource> {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(config.get("value").unwrap_or_default().to_string()))
            }),
        );
        Arc::new(factories)
    }

    fn text(context: &Context, name: &str) -> String {
        context
            .lookup(name)
            .unwrap()
            .unwrap()
            .downcast_ref::<String>()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_directory_tree_is_mirrored() {
        let temp_dir = TempDir::new().unwrap();
        let dir_a = temp_dir.path().join("dirA");
        fs::create_dir(&dir_a).unwrap();
        fs::create_dir(temp_dir.path().join("dirB")).unwrap();
        write(&dir_a, "leaf1.json", r#"{"type": "text", "value": "one"}"#);

        let calls = Arc::new(AtomicUsize::new(0));
        let root = Context::new(Environment::new()).unwrap();
        let report = DirectoryLoader::new(text_factories(Arc::clone(&calls)))
            .load_directory(temp_dir.path(), &root)
            .unwrap();

        assert_eq!(report.contexts, ["dirA", "dirB"]);
        assert_eq!(report.bound, ["dirA/leaf1"]);
        assert!(!report.has_errors());
        assert_eq!(report.directories_processed.len(), 3);

        assert_eq!(root.kind_of("dirA").unwrap(), Some(EntryKind::Context));
        assert_eq!(root.kind_of("dirA/leaf1").unwrap(), Some(EntryKind::Lazy));
        assert!(root.list("dirB").unwrap().is_empty());
        let names: Vec<_> = root.list("").unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["dirA", "dirB"]);

        // Nothing is constructed until the first lookup
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(text(&root, "dirA/leaf1"), "one");
        assert_eq!(text(&root, "dirA/leaf1"), "one");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_bad_descriptors_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "broken.json", "{ not json");
        write(temp_dir.path(), "nested.json", r#"{"type": "text", "value": {"a": 1}}"#);
        write(temp_dir.path(), "unknown.json", r#"{"type": "mystery"}"#);
        write(temp_dir.path(), "untyped.json", r#"{"value": "x"}"#);
        write(temp_dir.path(), "good.json", r#"{"type": "text", "value": "ok"}"#);
        write(temp_dir.path(), "README.txt", "not a descriptor");

        let root = Context::new(Environment::new()).unwrap();
        let report = DirectoryLoader::new(text_factories(Default::default()))
            .load_directory(temp_dir.path(), &root)
            .unwrap();

        assert_eq!(report.bound, ["good"]);
        let mut kinds: Vec<_> = report
            .skipped
            .iter()
            .map(|(path, error)| {
                let name = path.file_name().unwrap().to_str().unwrap().to_string();
                (name, error.kind())
            })
            .collect();
        kinds.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            kinds,
            [
                ("broken.json".to_string(), ErrorKind::Descriptor),
                ("nested.json".to_string(), ErrorKind::Descriptor),
                ("unknown.json".to_string(), ErrorKind::Configuration),
                ("untyped.json".to_string(), ErrorKind::Configuration),
            ]
        );

        assert_eq!(text(&root, "good"), "ok");
        assert!(root.lookup("broken").unwrap().is_none());
        assert!(root.lookup("README").unwrap().is_none());
    }

    #[test]
    fn test_scalar_values_are_stringified() {
        let temp_dir = TempDir::new().unwrap();
        write(
            temp_dir.path(),
            "pool.json",
            r#"{"type": "text", "value": 10, "enabled": true, "comment": null}"#,
        );

        let root = Context::new(Environment::new()).unwrap();
        DirectoryLoader::new(text_factories(Default::default()))
            .load_directory(temp_dir.path(), &root)
            .unwrap();
        assert_eq!(text(&root, "pool"), "10");
    }

    #[test]
    fn test_search_paths_are_layered() {
        let base = TempDir::new().unwrap();
        let overlay = TempDir::new().unwrap();
        fs::create_dir(base.path().join("jdbc")).unwrap();
        fs::create_dir(overlay.path().join("jdbc")).unwrap();
        write(&base.path().join("jdbc"), "db1.json", r#"{"type": "text", "value": "base"}"#);
        write(&base.path().join("jdbc"), "db2.json", r#"{"type": "text", "value": "base"}"#);
        write(
            &overlay.path().join("jdbc"),
            "db2.json",
            r#"{"type": "text", "value": "overlay"}"#,
        );

        let config = DirectoryConfig::with_paths(vec![
            base.path().to_path_buf(),
            overlay.path().join("missing"),
            overlay.path().to_path_buf(),
        ]);
        let root = Context::new(Environment::new()).unwrap();
        let report = DirectoryLoader::new(text_factories(Default::default()))
            .load_from_config(&config, &root)
            .unwrap();

        assert_eq!(report.contexts, ["jdbc"]);
        assert_eq!(report.bound_count(), 3);
        assert_eq!(text(&root, "jdbc/db1"), "base");
        assert_eq!(text(&root, "jdbc/db2"), "overlay");
    }

    #[test]
    fn test_data_source_descriptor() {
        let temp_dir = TempDir::new().unwrap();
        let jdbc = temp_dir.path().join("jdbc");
        fs::create_dir(&jdbc).unwrap();
        write(
            &jdbc,
            "db1.json",
            r#"{
                "type": "data-source",
                "driverClassName": "org.h2.Driver",
                "url": "jdbc:h2:mem:test",
                "username": "sa",
                "password": "secret",
                "onConnectScript": "SET SCHEMA app; SET ROLE reader"
            }"#,
        );
        write(
            &jdbc,
            "broken.json",
            r#"{"type": "data-source", "url": "jdbc:h2:mem:test"}"#,
        );

        let root = Context::new(Environment::new()).unwrap();
        let report = DirectoryLoader::new(Arc::new(FactoryRegistry::with_defaults()))
            .load_directory(temp_dir.path(), &root)
            .unwrap();
        // A missing driver only surfaces when the resource is built
        assert_eq!(report.bound_count(), 2);

        let data_source = root
            .lookup("jdbc/db1")
            .unwrap()
            .unwrap()
            .downcast::<DataSource>()
            .unwrap();
        assert_eq!(data_source.config().resource_id, "jdbc/db1");
        assert_eq!(data_source.config().url, "jdbc:h2:mem:test");
        assert_eq!(data_source.config().user.as_deref(), Some("sa"));
        assert!(!data_source.is_pooled());
        assert_eq!(
            data_source.on_connect_statements(),
            ["SET SCHEMA app", "SET ROLE reader"]
        );

        let error = root.lookup("jdbc/broken").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
        assert!(error.to_string().contains("driverClassName"));
    }
}
