//! Resource Registry: a process-local hierarchical registry of named
//! resources.
//!
//! This crate provides a tree of named contexts in which each
//! `/`-separated path resolves to a bound value, a subcontext, or a
//! resource that is constructed on first access. Resources are usually
//! declared by a directory of descriptor files scanned at startup.
//!
//! # Basic Usage
//!
//! ```rust
//! use resource_registry::{Context, Environment, ErrorKind, Object};
//!
//! let root = Context::new(Environment::new()).unwrap();
//! let jdbc = root.create_subcontext("jdbc").unwrap();
//! jdbc.bind("timeout", Object::value(30u64)).unwrap();
//!
//! let timeout = root.lookup("jdbc/timeout").unwrap().unwrap();
//! assert_eq!(timeout.downcast_ref::<u64>(), Some(&30));
//!
//! // Binding an occupied name requires rebind
//! let error = root.bind("jdbc/timeout", Object::value(60u64)).unwrap_err();
//! assert_eq!(error.kind(), ErrorKind::NameAlreadyBound);
//! root.rebind("jdbc/timeout", Object::value(60u64)).unwrap();
//! ```
//!
//! # Lazy Resources
//!
//! A [`LazyResourceProxy`] wraps a [`ResourceFactory`] together with the
//! resource's name and configuration. The first lookup runs the factory;
//! concurrent lookups wait for it and share the result. Failures are not
//! cached, so the next lookup tries again.
//!
//! ```rust
//! use std::sync::Arc;
//! use resource_registry::{Context, Descriptor, Environment, LazyResourceProxy, Resource};
//!
//! let root = Context::new(Environment::new()).unwrap();
//! let factory = Arc::new(|id: &str, _: &Descriptor| -> resource_registry::Result<Resource> {
//!     Ok(Arc::new(format!("connection to {}", id)))
//! });
//! root.bind("db", LazyResourceProxy::new(factory, "db", Descriptor::new())).unwrap();
//!
//! let db = root.lookup("db").unwrap().unwrap();
//! assert_eq!(db.downcast_ref::<String>().unwrap(), "connection to db");
//! ```
//!
//! # Directory Loading Feature
//!
//! When the `directory-loading` feature is enabled (default), a
//! [`DirectoryLoader`] mirrors a directory tree into a context:
//! subdirectories become subcontexts and `*.json` descriptor files become
//! lazy resources built by the factory registered for their `type`.
//!
//! ```json
//! {
//!   "type": "data-source",
//!   "driverClassName": "org.h2.Driver",
//!   "url": "jdbc:h2:mem:test"
//! }
//! ```
//!
//! [`Bootstrap`] builds an application's root context from such a
//! directory exactly once.
//!
//! ## Disabling Directory Loading
//!
//! To disable at compile time:
//!
//! ```toml
//! [dependencies]
//! resource-registry = { version = "0.1", default-features = false }
//! ```

mod error;
pub use error::{Error, ErrorKind, Result};

mod environment;
pub use environment::{Environment, IGNORE_CASE_KEY, RESOURCES_DIRECTORY_KEY, SEPARATOR_KEY};

mod path_key;
pub use path_key::{NameParser, PathKey, SEPARATOR};

mod object;
pub use object::{Binding, EntryKind, NameClassPair, Object, Resource};

mod descriptor;
pub use descriptor::{Descriptor, TYPE_KEY};

mod resource_factory;
pub use resource_factory::{FallbackFactory, ResourceFactory};

mod data_source;
pub use data_source::*;

mod factory_registry;
pub use factory_registry::FactoryRegistry;

mod lazy_resource_proxy;
pub use lazy_resource_proxy::{LazyResourceProxy, ProxyState};

mod registry_node;

mod context;
pub use context::Context;

#[cfg(feature = "directory-loading")]
mod directory_loader;

#[cfg(feature = "directory-loading")]
pub use directory_loader::{DirectoryConfig, DirectoryLoader, LoadReport, read_descriptor};

#[cfg(feature = "directory-loading")]
mod bootstrap;

#[cfg(feature = "directory-loading")]
pub use bootstrap::Bootstrap;
