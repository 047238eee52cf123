use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::{
    Context, DirectoryLoader, Environment, Error, FactoryRegistry, IGNORE_CASE_KEY,
    RESOURCES_DIRECTORY_KEY, ResourceFactory, Result, SEPARATOR_KEY,
};

/// Builds the root context of an application exactly once.
///
/// The root is created from the resource directory named by
/// [`RESOURCES_DIRECTORY_KEY`] on the first successful call to
/// [`initial_context`](Self::initial_context); later calls return a handle
/// to the same root. A failed initialization is not remembered, so it can
/// be retried with a corrected environment.
///
/// Factories must be registered before initialization.
///
/// # Examples
///
/// ```rust,ignore
/// use resource_registry::{Bootstrap, Environment, RESOURCES_DIRECTORY_KEY};
///
/// static BOOTSTRAP: Bootstrap = Bootstrap::new();
///
/// let env: Environment = [(RESOURCES_DIRECTORY_KEY, "/etc/resources")]
///     .into_iter()
///     .collect();
/// let root = BOOTSTRAP.initial_context(env)?;
/// let data_source = root.lookup("jdbc/db1")?;
/// ```
#[derive(Debug)]
pub struct Bootstrap {
    initialized: AtomicBool,
    root: Mutex<Option<Context>>,
    factories: Mutex<Option<Arc<FactoryRegistry>>>,
}

impl Bootstrap {
    /// Creates an uninitialized bootstrap.
    pub const fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            root: parking_lot::const_mutex(None),
            factories: parking_lot::const_mutex(None),
        }
    }

    /// Whether the root context has been created.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    // Callers hold the root lock so a registration cannot interleave with
    // a load in progress.
    fn ensure_not_initialized(root: &Option<Context>, what: &str) -> Result<()> {
        if root.is_some() {
            return Err(Error::configuration(
                what,
                "cannot be changed after the initial context has been created",
            ));
        }
        Ok(())
    }

    /// Replaces the factory registry used for loading.
    pub fn set_factories(&self, factories: Arc<FactoryRegistry>) -> Result<()> {
        let root = self.root.lock();
        Self::ensure_not_initialized(&root, "factories")?;
        *self.factories.lock() = Some(factories);
        Ok(())
    }

    /// Registers an additional factory on top of the built-in ones.
    pub fn register_factory(
        &self,
        type_tag: &str,
        factory: Arc<dyn ResourceFactory>,
    ) -> Result<()> {
        let root = self.root.lock();
        Self::ensure_not_initialized(&root, type_tag)?;
        self.factories
            .lock()
            .get_or_insert_with(|| Arc::new(FactoryRegistry::with_defaults()))
            .register(type_tag, factory);
        Ok(())
    }

    /// The root context, if it has been created.
    pub fn get(&self) -> Option<Context> {
        self.root.lock().clone()
    }

    /// Returns the root context, creating and loading it on first use.
    ///
    /// `environment` is only consulted by the call that performs the
    /// initialization. Defaults applied: case-insensitive names and `/` as
    /// the separator.
    pub fn initial_context(&self, environment: Environment) -> Result<Context> {
        let mut root = self.root.lock();
        if let Some(context) = root.as_ref() {
            return Ok(context.clone());
        }

        let mut environment = environment;
        environment.set_default(IGNORE_CASE_KEY, "true");
        environment.set_default(SEPARATOR_KEY, "/");
        let directory = Self::resources_directory(&environment)?;

        tracing::info!(path = ?directory, "Scanning directory for resources");
        let factories = self
            .factories
            .lock()
            .get_or_insert_with(|| Arc::new(FactoryRegistry::with_defaults()))
            .clone();
        let context = Context::new(environment)?;
        let report = DirectoryLoader::new(factories).load_directory(&directory, &context)?;
        tracing::info!(
            resources = report.bound_count(),
            contexts = report.contexts.len(),
            skipped = report.skipped.len(),
            "Initial context is ready"
        );

        *root = Some(context.clone());
        self.initialized.store(true, Ordering::Release);
        Ok(context)
    }

    fn resources_directory(environment: &Environment) -> Result<PathBuf> {
        let configured = environment.resources_directory().ok_or_else(|| {
            Error::configuration(
                RESOURCES_DIRECTORY_KEY,
                format!("missing property '{}'", RESOURCES_DIRECTORY_KEY),
            )
        })?;
        let directory = match configured.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(rest),
            None => PathBuf::from(configured),
        };
        if !directory.is_dir() {
            return Err(Error::configuration(
                RESOURCES_DIRECTORY_KEY,
                format!("the directory does not exist: '{}'", directory.display()),
            ));
        }
        Ok(directory)
    }
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self::new()
    }
}
