//! Directory-driven population of the naming tree.
//!
//! This module mirrors a configuration directory into a [`Context`]. It is
//! only available when the `directory-loading` feature is enabled (which
//! is the default).
//!
//! # Overview
//!
//! - Every subdirectory becomes a subcontext of the same name.
//! - Every `*.json` file is a resource descriptor, bound under its file
//!   stem as a [`LazyResourceProxy`]. The resource is constructed on first
//!   lookup by the factory registered for the descriptor's `type`.
//! - Other files are ignored.
//!
//! Entries are visited in file-name order.
//!
//! # Descriptor Format
//!
//! A descriptor is a flat JSON object whose values are scalars:
//!
//! ```json
//! {
//!   "type": "data-source",
//!   "driverClassName": "org.h2.Driver",
//!   "url": "jdbc:h2:mem:test",
//!   "username": "sa"
//! }
//! ```
//!
//! # Errors
//!
//! Problems with a single descriptor (malformed JSON, unknown type, a name
//! that cannot be replaced) are logged and recorded in the
//! [`LoadReport`]; loading continues. Structural problems (an unreadable
//! directory, a subcontext that cannot be created) abort the load.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    Context, Descriptor, EntryKind, Error, FactoryRegistry, LazyResourceProxy, Result,
};

const DESCRIPTOR_EXTENSION: &str = "json";

/// Summary of a load operation.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Full names of the resources bound, in load order.
    pub bound: Vec<String>,
    /// Full names of the subcontexts created.
    pub contexts: Vec<String>,
    /// Source directories that were walked.
    pub directories_processed: Vec<PathBuf>,
    /// Descriptors that were skipped, with the reason.
    pub skipped: Vec<(PathBuf, Error)>,
}

impl LoadReport {
    /// Returns the number of resources bound.
    pub fn bound_count(&self) -> usize {
        self.bound.len()
    }

    /// Returns true if any descriptor was skipped.
    pub fn has_errors(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Configuration for loading resources from directories.
///
/// Directories are processed in order. Subdirectories with the same name
/// are merged, and a descriptor in a later directory replaces a resource
/// of the same name from an earlier one.
///
/// # Examples
///
/// ```rust,ignore
/// use resource_registry::DirectoryConfig;
///
/// // Use only the default directory (~/.resource-registry/)
/// let config = DirectoryConfig::default_only();
///
/// // Use custom paths
/// let config = DirectoryConfig::with_paths(vec![
///     "/etc/resources".into(),
///     "/usr/share/resources".into(),
/// ]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DirectoryConfig {
    /// Search paths in priority order (later paths override earlier).
    paths: Vec<PathBuf>,
}

impl DirectoryConfig {
    /// Creates a new empty configuration with no search paths.
    pub fn new() -> Self {
        Self { paths: Vec::new() }
    }

    /// Creates configuration with only the default directory.
    pub fn default_only() -> Self {
        Self {
            paths: vec![Self::default_directory()],
        }
    }

    /// Creates configuration with custom paths (processed in order).
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Creates configuration with custom paths followed by the default
    /// directory, so the default directory takes precedence.
    pub fn with_paths_and_default(mut paths: Vec<PathBuf>) -> Self {
        paths.push(Self::default_directory());
        Self { paths }
    }

    /// Returns the default directory: `~/.resource-registry/`
    ///
    /// Falls back to `./.resource-registry/` if the home directory cannot
    /// be determined.
    pub fn default_directory() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".resource-registry")
    }

    /// Returns the configured search paths.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

/// Reads a descriptor file into a flat key-value map.
pub fn read_descriptor(path: &Path) -> Result<Descriptor> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| Error::Descriptor {
        file: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Mirrors configuration directories into a naming tree.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    factories: Arc<FactoryRegistry>,
}

impl DirectoryLoader {
    /// Creates a loader that builds resources with `factories`.
    pub fn new(factories: Arc<FactoryRegistry>) -> Self {
        Self { factories }
    }

    /// The factory registry used to resolve descriptor types.
    pub fn factories(&self) -> &Arc<FactoryRegistry> {
        &self.factories
    }

    /// Loads a single directory into `context`.
    ///
    /// Fails if `directory` is not a readable directory.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use std::sync::Arc;
    /// use resource_registry::{Context, DirectoryLoader, Environment, FactoryRegistry};
    ///
    /// let root = Context::new(Environment::new())?;
    /// let loader = DirectoryLoader::new(Arc::new(FactoryRegistry::with_defaults()));
    /// let report = loader.load_directory(Path::new("/etc/resources"), &root)?;
    /// for (path, error) in &report.skipped {
    ///     eprintln!("Skipped {}: {}", path.display(), error);
    /// }
    /// ```
    pub fn load_directory(&self, directory: &Path, context: &Context) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        self.load_into(directory, context, &mut report)?;
        Ok(report)
    }

    /// Loads every directory of `config` into `context`, in order.
    ///
    /// Search paths that do not exist are skipped.
    pub fn load_from_config(
        &self,
        config: &DirectoryConfig,
        context: &Context,
    ) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        for directory in config.paths() {
            if !directory.is_dir() {
                tracing::debug!(path = ?directory, "Skipping missing resource directory");
                continue;
            }
            self.load_into(directory, context, &mut report)?;
        }
        Ok(report)
    }

    fn load_into(
        &self,
        directory: &Path,
        context: &Context,
        report: &mut LoadReport,
    ) -> Result<()> {
        if !directory.is_dir() {
            return Err(Error::io(
                directory,
                io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
            ));
        }
        tracing::debug!(
            path = ?directory,
            context = %context.name_in_namespace(),
            "Scanning directory for resources"
        );

        let mut entries = fs::read_dir(directory)
            .and_then(|entries| {
                entries
                    .map(|entry| entry.map(|e| e.path()))
                    .collect::<io::Result<Vec<_>>>()
            })
            .map_err(|e| Error::io(directory, e))?;
        entries.sort();
        report.directories_processed.push(directory.to_path_buf());

        for path in entries {
            if path.is_dir() {
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    tracing::warn!(path = ?path, "Ignoring directory with a non UTF-8 name");
                    continue;
                };
                let subcontext = self.mirror_directory(context, name, report)?;
                self.load_into(&path, &subcontext, report)?;
            } else if path
                .extension()
                .is_some_and(|ext| ext == DESCRIPTOR_EXTENSION)
            {
                match self.load_descriptor(&path, context) {
                    Ok(name) => report.bound.push(name),
                    Err(e) => {
                        tracing::warn!(
                            path = ?path,
                            error = %e,
                            "Unable to bind resource from descriptor"
                        );
                        report.skipped.push((path, e));
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns the subcontext named `name`, creating it if needed.
    fn mirror_directory(
        &self,
        context: &Context,
        name: &str,
        report: &mut LoadReport,
    ) -> Result<Context> {
        if context.kind_of(name)? == Some(EntryKind::Context)
            && let Some(existing) = context.lookup(name)?.and_then(|o| o.into_context())
        {
            return Ok(existing);
        }
        let subcontext = context.create_subcontext(name)?;
        report.contexts.push(subcontext.name_in_namespace());
        Ok(subcontext)
    }

    /// Binds a proxy for one descriptor file, returning its full name.
    fn load_descriptor(&self, path: &Path, context: &Context) -> Result<String> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| Error::InvalidName {
                name: path.display().to_string(),
                reason: "descriptor file name is not valid UTF-8",
            })?;
        let descriptor = read_descriptor(path)?;
        let type_tag = descriptor.type_tag().map(str::to_string);
        let full_name = context.compose_name(name, &context.name_in_namespace())?;

        let Some(factory) = self.factories.factory(type_tag.as_deref()) else {
            return Err(Error::configuration(
                full_name,
                match type_tag {
                    Some(tag) => format!("no factory registered for type '{}'", tag),
                    None => "descriptor has no type".to_string(),
                },
            ));
        };

        tracing::debug!(
            name = %full_name,
            type_tag = ?type_tag,
            "Binding lazy resource"
        );
        let proxy = LazyResourceProxy::new(factory, full_name.clone(), descriptor);
        Self::bind_replacing(context, name, proxy)?;
        Ok(full_name)
    }

    /// Binds with replace semantics: an empty subcontext in the way is
    /// destroyed, an existing value is rebound.
    fn bind_replacing(context: &Context, name: &str, proxy: LazyResourceProxy) -> Result<()> {
        match context.kind_of(name)? {
            Some(EntryKind::Context) => {
                context.destroy_subcontext(name)?;
                context.bind(name, proxy)
            }
            None => context.bind(name, proxy),
            Some(_) => context.rebind(name, proxy),
        }
    }
}
