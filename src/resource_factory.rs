use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{Descriptor, Error, Resource, Result};

/// Builds a concrete resource from its declared configuration.
///
/// `resource_id` is the full registry path of the resource being built.
/// The registry treats the returned value as opaque.
///
/// Any `Fn(&str, &Descriptor) -> Result<Resource>` closure is a factory:
///
/// ```
/// use std::sync::Arc;
/// use resource_registry::{Descriptor, Resource, ResourceFactory};
///
/// let factory = |id: &str, _config: &Descriptor| -> resource_registry::Result<Resource> {
///     Ok(Arc::new(format!("built {}", id)))
/// };
/// let resource = factory.create("jdbc/db1", &Descriptor::new()).unwrap();
/// assert_eq!(resource.downcast_ref::<String>().unwrap(), "built jdbc/db1");
/// ```
pub trait ResourceFactory: Send + Sync {
    fn create(&self, resource_id: &str, config: &Descriptor) -> Result<Resource>;
}

impl<F> ResourceFactory for F
where
    F: Fn(&str, &Descriptor) -> Result<Resource> + Send + Sync,
{
    fn create(&self, resource_id: &str, config: &Descriptor) -> Result<Resource> {
        self(resource_id, config)
    }
}

struct Candidate {
    name: String,
    factory: Arc<dyn ResourceFactory>,
    available: AtomicBool,
}

/// An ordered list of alternative factories.
///
/// Candidates are tried in priority order. A candidate that fails once is
/// marked unavailable and skipped by every later call.
pub struct FallbackFactory {
    candidates: Vec<Candidate>,
}

impl FallbackFactory {
    /// Creates a factory with no candidates.
    pub fn new() -> Self {
        Self {
            candidates: Vec::new(),
        }
    }

    /// Appends a candidate with lower priority than the existing ones.
    pub fn with_candidate(
        mut self,
        name: impl Into<String>,
        factory: Arc<dyn ResourceFactory>,
    ) -> Self {
        self.candidates.push(Candidate {
            name: name.into(),
            factory,
            available: AtomicBool::new(true),
        });
        self
    }

    /// Whether the named candidate is still eligible.
    pub fn is_available(&self, name: &str) -> bool {
        self.candidates
            .iter()
            .any(|c| c.name == name && c.available.load(Ordering::Acquire))
    }

    /// Names of all candidates, in priority order.
    pub fn candidate_names(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.name.as_str())
    }

    /// Runs `attempt` on each available candidate until one succeeds,
    /// returning the name of the winner with its resource.
    ///
    /// `attempt` returns `None` to skip a candidate for this call only. A
    /// candidate whose attempt fails is disabled for every later call.
    pub fn create_with<F>(&self, resource_id: &str, mut attempt: F) -> Result<(String, Resource)>
    where
        F: FnMut(&str, &dyn ResourceFactory) -> Option<Result<Resource>>,
    {
        let mut attempted = Vec::new();
        for candidate in &self.candidates {
            if !candidate.available.load(Ordering::Acquire) {
                continue;
            }
            match attempt(&candidate.name, candidate.factory.as_ref()) {
                None => continue,
                Some(Ok(resource)) => return Ok((candidate.name.clone(), resource)),
                Some(Err(e)) => {
                    tracing::warn!(
                        resource = %resource_id,
                        candidate = %candidate.name,
                        error = %e,
                        "Factory candidate failed, disabling it"
                    );
                    candidate.available.store(false, Ordering::Release);
                    attempted.push(candidate.name.clone());
                }
            }
        }
        let message = if attempted.is_empty() {
            "no factory candidate available".to_string()
        } else {
            format!("all factory candidates failed: {}", attempted.join(", "))
        };
        Err(Error::configuration(resource_id, message))
    }
}

impl Default for FallbackFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceFactory for FallbackFactory {
    fn create(&self, resource_id: &str, config: &Descriptor) -> Result<Resource> {
        self.create_with(resource_id, |_, factory| {
            Some(factory.create(resource_id, config))
        })
        .map(|(_, resource)| resource)
    }
}
