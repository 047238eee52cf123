//! The built-in `data-source` resource factory.
//!
//! A data-source descriptor names a database driver and URL plus optional
//! credentials:
//!
//! ```json
//! {
//!   "type": "data-source",
//!   "driverClassName": "org.h2.Driver",
//!   "url": "jdbc:h2:mem:test",
//!   "username": "sa",
//!   "password": "encrypt:BASE64...",
//!   "pool.maxActive": 10,
//!   "onConnectScript": "SET SCHEMA app; SET ROLE reader"
//! }
//! ```
//!
//! Connection pools are supplied by the application as an ordered list of
//! candidates. Each candidate receives the resolved connection settings
//! merged with the properties carrying its prefix. A candidate that fails
//! is never tried again; when no candidate produces a pool, an unpooled
//! [`DataSource`] is returned.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{Descriptor, Error, FallbackFactory, Resource, ResourceFactory, Result, TYPE_KEY};

/// The type tag of the built-in data-source factory.
pub const DATA_SOURCE_TYPE: &str = "data-source";

pub const DRIVER_KEY: &str = "driverClassName";
pub const URL_KEY: &str = "url";
pub const USERNAME_KEY: &str = "username";
pub const PASSWORD_KEY: &str = "password";
pub const ON_CONNECT_SCRIPT_KEY: &str = "onConnectScript";
pub const DISABLE_POOL_KEY: &str = "disablePool";

/// Marks a password that must be decrypted before use.
pub const ENCRYPT_PREFIX: &str = "encrypt:";

const RESERVED_KEYS: &[&str] = &[
    TYPE_KEY,
    DRIVER_KEY,
    URL_KEY,
    USERNAME_KEY,
    PASSWORD_KEY,
    ON_CONNECT_SCRIPT_KEY,
    DISABLE_POOL_KEY,
];

/// Decrypts `encrypt:`-prefixed passwords.
pub trait PasswordDecryptor: Send + Sync {
    fn decrypt(
        &self,
        resource_id: &str,
        encrypted: &str,
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// Resolved connection settings of a data source.
#[derive(Clone, PartialEq, Eq)]
pub struct DataSourceConfig {
    pub resource_id: String,
    pub driver: String,
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Descriptor entries that are neither reserved nor dotted.
    pub properties: Descriptor,
}

impl DataSourceConfig {
    /// Settings handed to a pool candidate: the plain properties, the
    /// candidate's prefixed properties, then the connection keys.
    fn pool_properties(&self, descriptor: &Descriptor, prefix: &str) -> Descriptor {
        let mut properties = self.properties.clone();
        for (key, value) in descriptor.strip_prefix(prefix).iter() {
            properties.insert(key, value);
        }
        properties.insert(DRIVER_KEY, self.driver.as_str());
        properties.insert(URL_KEY, self.url.as_str());
        if let Some(user) = &self.user {
            properties.insert(USERNAME_KEY, user.as_str());
        }
        if let Some(password) = &self.password {
            properties.insert(PASSWORD_KEY, password.as_str());
        }
        properties
    }
}

impl fmt::Debug for DataSourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceConfig")
            .field("resource_id", &self.resource_id)
            .field("driver", &self.driver)
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "*****"))
            .field("properties", &self.properties)
            .finish()
    }
}

/// The resource produced by [`DataSourceFactory`].
#[derive(Clone)]
pub struct DataSource {
    config: DataSourceConfig,
    pool: Option<(String, Resource)>,
    on_connect: Vec<String>,
}

impl DataSource {
    /// The connection settings this data source was built from.
    pub fn config(&self) -> &DataSourceConfig {
        &self.config
    }

    /// The name of the pool candidate that built this data source.
    pub fn pool_name(&self) -> Option<&str> {
        self.pool.as_ref().map(|(name, _)| name.as_str())
    }

    /// The pool object, when a pool candidate succeeded.
    pub fn pool(&self) -> Option<&Resource> {
        self.pool.as_ref().map(|(_, pool)| pool)
    }

    /// Whether connections come from a pool.
    pub fn is_pooled(&self) -> bool {
        self.pool.is_some()
    }

    /// Statements to run on every new connection.
    pub fn on_connect_statements(&self) -> &[String] {
        &self.on_connect
    }
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field("config", &self.config)
            .field("pool", &self.pool_name())
            .field("on_connect", &self.on_connect)
            .finish()
    }
}

/// Builds [`DataSource`] resources from data-source descriptors.
#[derive(Default)]
pub struct DataSourceFactory {
    pools: FallbackFactory,
    pool_prefixes: HashMap<String, String>,
    decryptor: Option<Arc<dyn PasswordDecryptor>>,
}

impl DataSourceFactory {
    /// Creates a factory without pool candidates or decryptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pool candidate. Properties starting with `prefix` are
    /// passed to it with the prefix stripped; `disablePool.<name>` skips
    /// it for a single descriptor.
    pub fn with_pool(
        mut self,
        name: impl Into<String>,
        prefix: impl Into<String>,
        factory: Arc<dyn ResourceFactory>,
    ) -> Self {
        let name = name.into();
        self.pool_prefixes.insert(name.clone(), prefix.into());
        self.pools = self.pools.with_candidate(name, factory);
        self
    }

    /// Sets the collaborator that decrypts `encrypt:` passwords.
    pub fn with_decryptor(mut self, decryptor: Arc<dyn PasswordDecryptor>) -> Self {
        self.decryptor = Some(decryptor);
        self
    }

    /// Whether the named pool candidate is still eligible.
    pub fn is_pool_available(&self, name: &str) -> bool {
        self.pools.is_available(name)
    }

    fn mandatory<'a>(
        resource_id: &str,
        descriptor: &'a Descriptor,
        key: &str,
    ) -> Result<&'a str> {
        descriptor
            .get(key)
            .ok_or_else(|| Error::configuration(resource_id, format!("missing property '{}'", key)))
    }

    fn password(&self, resource_id: &str, descriptor: &Descriptor) -> Result<Option<String>> {
        let Some(password) = descriptor.get(PASSWORD_KEY) else {
            return Ok(None);
        };
        let Some(encrypted) = password.strip_prefix(ENCRYPT_PREFIX) else {
            return Ok(Some(password.to_string()));
        };
        let decryptor = self.decryptor.as_ref().ok_or_else(|| Error::Security {
            resource: resource_id.to_string(),
            source: "encrypted password but no decryptor configured".into(),
        })?;
        decryptor
            .decrypt(resource_id, encrypted)
            .map(Some)
            .map_err(|source| Error::Security {
                resource: resource_id.to_string(),
                source,
            })
    }

    /// Resolves the connection settings of a descriptor.
    pub fn resolve_config(
        &self,
        resource_id: &str,
        descriptor: &Descriptor,
    ) -> Result<DataSourceConfig> {
        let driver = Self::mandatory(resource_id, descriptor, DRIVER_KEY)?;
        let url = Self::mandatory(resource_id, descriptor, URL_KEY)?;
        let password = self.password(resource_id, descriptor)?;
        let properties = descriptor
            .iter()
            .filter(|(key, _)| {
                !RESERVED_KEYS.iter().any(|reserved| reserved == key) && !key.contains('.')
            })
            .collect();
        Ok(DataSourceConfig {
            resource_id: resource_id.to_string(),
            driver: driver.to_string(),
            url: url.to_string(),
            user: descriptor.get(USERNAME_KEY).map(str::to_string),
            password,
            properties,
        })
    }

    fn create_pool(
        &self,
        config: &DataSourceConfig,
        descriptor: &Descriptor,
    ) -> Option<(String, Resource)> {
        if descriptor.flag(DISABLE_POOL_KEY) {
            tracing::info!(resource = %config.resource_id, "Connection pool disabled");
            return None;
        }
        let pool = self.pools.create_with(&config.resource_id, |name, factory| {
            if descriptor.flag(&format!("{}.{}", DISABLE_POOL_KEY, name)) {
                return None;
            }
            let prefix = self.pool_prefixes.get(name).map_or("", String::as_str);
            let properties = config.pool_properties(descriptor, prefix);
            tracing::debug!(
                resource = %config.resource_id,
                pool = %name,
                properties = ?properties,
                "Configuring connection pool"
            );
            Some(factory.create(&config.resource_id, &properties))
        });
        match pool {
            Ok(pool) => Some(pool),
            Err(e) => {
                tracing::debug!(
                    resource = %config.resource_id,
                    reason = %e,
                    "Using an unpooled data source"
                );
                None
            }
        }
    }
}

impl ResourceFactory for DataSourceFactory {
    fn create(&self, resource_id: &str, descriptor: &Descriptor) -> Result<Resource> {
        let config = self.resolve_config(resource_id, descriptor)?;
        tracing::info!(
            resource = %resource_id,
            user = ?config.user,
            url = %config.url,
            "Instantiating data source"
        );
        let pool = self.create_pool(&config, descriptor);
        let on_connect = descriptor
            .get(ON_CONNECT_SCRIPT_KEY)
            .map(|script| {
                script
                    .split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Arc::new(DataSource {
            config,
            pool,
            on_connect,
        }))
    }
}
