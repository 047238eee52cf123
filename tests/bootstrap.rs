//! Integration tests for one-time initialization of the root context.

#[cfg(feature = "directory-loading")]
mod tests {
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use resource_registry::{
        Bootstrap, DataSource, Descriptor, EntryKind, Environment, ErrorKind, FactoryRegistry,
        IGNORE_CASE_KEY, RESOURCES_DIRECTORY_KEY, Resource, Result,
    };
    use tempfile::TempDir;

    fn environment(dir: &TempDir) -> Environment {
        [(RESOURCES_DIRECTORY_KEY, dir.path().to_str().unwrap())]
            .into_iter()
            .collect()
    }

    fn resource_dir() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let jdbc = temp_dir.path().join("jdbc");
        fs::create_dir(&jdbc).unwrap();
        fs::write(
            jdbc.join("db1.json"),
            r#"{
                "type": "data-source",
                "driverClassName": "org.h2.Driver",
                "url": "jdbc:h2:mem:db1"
            }"#,
        )
        .unwrap();
        temp_dir
    }

    #[test]
    fn test_initial_context_is_created_once() {
        static BOOTSTRAP: Bootstrap = Bootstrap::new();
        let temp_dir = resource_dir();

        assert!(!BOOTSTRAP.is_initialized());
        let first = BOOTSTRAP.initial_context(environment(&temp_dir)).unwrap();
        assert!(BOOTSTRAP.is_initialized());

        // The second environment is ignored
        let second = BOOTSTRAP.initial_context(Environment::new()).unwrap();
        assert!(first.same_context(&second));
        assert!(BOOTSTRAP.get().unwrap().same_context(&first));

        let data_source = second
            .lookup("jdbc/db1")
            .unwrap()
            .unwrap()
            .downcast::<DataSource>()
            .unwrap();
        assert_eq!(data_source.config().url, "jdbc:h2:mem:db1");
    }

    #[test]
    fn test_defaults_are_applied() {
        let temp_dir = resource_dir();
        let root = Bootstrap::new()
            .initial_context(environment(&temp_dir))
            .unwrap();

        assert_eq!(root.environment().unwrap().get(IGNORE_CASE_KEY), Some("true"));
        assert_eq!(root.kind_of("JDBC/DB1").unwrap(), Some(EntryKind::Lazy));
    }

    #[test]
    fn test_explicit_case_sensitivity_is_kept() {
        let temp_dir = resource_dir();
        let mut env = environment(&temp_dir);
        env.insert(IGNORE_CASE_KEY, "false");
        let root = Bootstrap::new().initial_context(env).unwrap();

        let error = root.kind_of("JDBC/db1").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NameNotFound);
    }

    #[test]
    fn test_failed_initialization_can_be_retried() {
        let bootstrap = Bootstrap::new();
        let missing: Environment = [(RESOURCES_DIRECTORY_KEY, "/nonexistent/path/12345")]
            .into_iter()
            .collect();
        let error = bootstrap.initial_context(missing).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
        assert!(!bootstrap.is_initialized());

        let temp_dir = resource_dir();
        bootstrap.initial_context(environment(&temp_dir)).unwrap();
        assert!(bootstrap.is_initialized());
    }

    #[test]
    fn test_custom_factory_before_initialization() {
        let temp_dir = resource_dir();
        fs::write(
            temp_dir.path().join("greeting.json"),
            r#"{"type": "text", "value": "hello"}"#,
        )
        .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let factory = {
            let calls = Arc::clone(&calls);
            Arc::new(move |_: &str, config: &Descriptor| -> Result<Resource> {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(config.get("value").unwrap_or_default().to_string()))
            })
        };

        let bootstrap = Bootstrap::new();
        bootstrap.register_factory("text", factory.clone()).unwrap();
        let root = bootstrap.initial_context(environment(&temp_dir)).unwrap();

        let greeting = root.lookup("greeting").unwrap().unwrap();
        assert_eq!(greeting.downcast_ref::<String>().unwrap(), "hello");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The built-in factory is still registered
        assert_eq!(root.kind_of("jdbc/db1").unwrap(), Some(EntryKind::Lazy));

        let error = bootstrap.register_factory("late", factory).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
        let error = bootstrap
            .set_factories(Arc::new(FactoryRegistry::new()))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_registration_racing_initialization() {
        for _ in 0..20 {
            let temp_dir = resource_dir();
            fs::write(temp_dir.path().join("late.json"), r#"{"type": "late"}"#).unwrap();
            let factory = Arc::new(|_: &str, _: &Descriptor| -> Result<Resource> {
                Ok(Arc::new(()))
            });

            let bootstrap = Bootstrap::new();
            let (registered, root) = std::thread::scope(|scope| {
                let register = scope.spawn(|| bootstrap.register_factory("late", factory));
                let root = bootstrap.initial_context(environment(&temp_dir)).unwrap();
                (register.join().unwrap(), root)
            });

            // Either the factory took part in loading or it was refused
            match registered {
                Ok(()) => assert_eq!(root.kind_of("late").unwrap(), Some(EntryKind::Lazy)),
                Err(error) => {
                    assert_eq!(error.kind(), ErrorKind::Configuration);
                    assert_eq!(root.kind_of("late").unwrap(), None);
                }
            }
        }
    }
}
