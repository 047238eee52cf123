use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::{Descriptor, Error, Resource, ResourceFactory, Result};

const UNRESOLVED: u8 = 0;
const RESOLVING: u8 = 1;
const RESOLVED: u8 = 2;

/// Materialization state of a [`LazyResourceProxy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    Unresolved,
    Resolving,
    Resolved,
}

/// A resource that is constructed the first time it is looked up.
///
/// Concurrent callers observe a single factory invocation and share its
/// result. A failed construction is not cached: every caller that was
/// waiting on the attempt receives its error, the proxy goes back to
/// [`ProxyState::Unresolved`], and the next access tries again.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use resource_registry::{Descriptor, LazyResourceProxy, ProxyState, Resource};
///
/// let factory = Arc::new(|id: &str, _: &Descriptor| -> resource_registry::Result<Resource> {
///     Ok(Arc::new(id.len()))
/// });
/// let proxy = LazyResourceProxy::new(factory, "jdbc/db1", Descriptor::new());
/// assert_eq!(proxy.state(), ProxyState::Unresolved);
///
/// let value = proxy.get_value().unwrap();
/// assert_eq!(value.downcast_ref::<usize>(), Some(&8));
/// assert_eq!(proxy.state(), ProxyState::Resolved);
/// ```
pub struct LazyResourceProxy {
    factory: Arc<dyn ResourceFactory>,
    resource_id: String,
    config: Descriptor,
    value: OnceLock<Resource>,
    state: AtomicU8,
    // Completed failed attempts; the section holds the latest error.
    failures: AtomicU64,
    section: Mutex<Option<Arc<Error>>>,
}

impl LazyResourceProxy {
    /// Creates an unresolved proxy. Nothing is built until the first lookup.
    pub fn new(
        factory: Arc<dyn ResourceFactory>,
        resource_id: impl Into<String>,
        config: Descriptor,
    ) -> Self {
        Self {
            factory,
            resource_id: resource_id.into(),
            config,
            value: OnceLock::new(),
            state: AtomicU8::new(UNRESOLVED),
            failures: AtomicU64::new(0),
            section: Mutex::new(None),
        }
    }

    /// The full path of the resource this proxy builds.
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// The descriptor handed to the factory.
    pub fn config(&self) -> &Descriptor {
        &self.config
    }

    /// The current construction state.
    pub fn state(&self) -> ProxyState {
        match self.state.load(Ordering::Acquire) {
            RESOLVED => ProxyState::Resolved,
            RESOLVING => ProxyState::Resolving,
            _ => ProxyState::Unresolved,
        }
    }

    /// Returns the resource, constructing it on first use.
    ///
    /// A caller that finds an attempt in progress waits for it. If that
    /// attempt fails, the waiter gets the same error as
    /// [`Error::Shared`] instead of running the factory again.
    pub fn get_value(&self) -> Result<Resource> {
        if let Some(value) = self.value.get() {
            return Ok(Arc::clone(value));
        }

        let failures_seen = self.failures.load(Ordering::Acquire);
        let mut last_failure = self.section.lock();
        if let Some(value) = self.value.get() {
            return Ok(Arc::clone(value));
        }
        if self.failures.load(Ordering::Acquire) != failures_seen
            && let Some(error) = last_failure.as_ref()
        {
            return Err(Error::Shared(Arc::clone(error)));
        }

        self.state.store(RESOLVING, Ordering::Release);
        tracing::info!(resource = %self.resource_id, "Materializing resource");
        match self.factory.create(&self.resource_id, &self.config) {
            Ok(value) => {
                let value = Arc::clone(self.value.get_or_init(|| value));
                *last_failure = None;
                self.state.store(RESOLVED, Ordering::Release);
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(
                    resource = %self.resource_id,
                    error = %e,
                    "Resource construction failed"
                );
                let error = Arc::new(e);
                *last_failure = Some(Arc::clone(&error));
                self.failures.fetch_add(1, Ordering::AcqRel);
                self.state.store(UNRESOLVED, Ordering::Release);
                Err(Error::Shared(error))
            }
        }
    }
}

impl fmt::Debug for LazyResourceProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyResourceProxy")
            .field("resource_id", &self.resource_id)
            .field("state", &self.state())
            .finish()
    }
}
