//! The naming-tree node and its recursive path resolution.
//!
//! Multi-segment names are resolved by taking the leading segment, which
//! must name a subcontext, and delegating the remainder to that child.
//! Locks are held only around single map accesses and are always
//! released before recursing or calling into a factory. Compound
//! operations (check-then-insert, check-then-remove) are therefore not
//! atomic with respect to concurrent mutators of the same name.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::{
    Binding, Context, EntryKind, Environment, Error, LazyResourceProxy, NameClassPair,
    NameParser, Object, PathKey, Resource, Result,
};

#[derive(Clone)]
pub(crate) enum Entry {
    Value(Resource),
    Subcontext(Arc<RegistryNode>),
    PendingProxy(Arc<LazyResourceProxy>),
}

impl Entry {
    fn kind(&self) -> EntryKind {
        match self {
            Entry::Value(_) => EntryKind::Value,
            Entry::Subcontext(_) => EntryKind::Context,
            Entry::PendingProxy(_) => EntryKind::Lazy,
        }
    }

    /// The entry as an object, without materializing proxies.
    fn to_object(&self) -> Object {
        match self {
            Entry::Value(value) => Object::Value(Arc::clone(value)),
            Entry::Subcontext(node) => Object::Context(Context::from_node(Arc::clone(node))),
            Entry::PendingProxy(proxy) => Object::Lazy(Arc::clone(proxy)),
        }
    }
}

impl From<Object> for Entry {
    fn from(object: Object) -> Self {
        match object {
            Object::Value(value) => Entry::Value(value),
            Object::Context(context) => Entry::Subcontext(context.node()),
            Object::Lazy(proxy) => Entry::PendingProxy(proxy),
        }
    }
}

#[derive(Clone)]
struct Slot {
    // The name as it was bound, before case folding.
    name: String,
    entry: Entry,
}

pub(crate) struct RegistryNode {
    full_path: PathKey,
    parser: NameParser,
    bindings: RwLock<HashMap<String, Slot>>,
    environment: Arc<RwLock<Environment>>,
    closed: AtomicBool,
}

impl RegistryNode {
    pub(crate) fn root(environment: Environment) -> Self {
        let parser = NameParser::new(environment.ignore_case());
        Self::new(PathKey::empty(parser.ignore_case()), parser, environment)
    }

    fn new(full_path: PathKey, parser: NameParser, environment: Environment) -> Self {
        Self {
            full_path,
            parser,
            bindings: RwLock::new(HashMap::new()),
            environment: Arc::new(RwLock::new(environment)),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn full_path(&self) -> &PathKey {
        &self.full_path
    }

    pub(crate) fn parser(&self) -> NameParser {
        self.parser
    }

    pub(crate) fn environment(&self) -> Arc<RwLock<Environment>> {
        Arc::clone(&self.environment)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// The path used in error messages, `/` for the root.
    fn display_path(&self) -> String {
        if self.full_path.is_empty() {
            "/".to_string()
        } else {
            self.full_path.to_string()
        }
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed {
                context: self.display_path(),
            });
        }
        Ok(())
    }

    fn ensure_named(name: &PathKey, reason: &'static str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidName {
                name: String::new(),
                reason,
            });
        }
        Ok(())
    }

    fn entry(&self, segment: &str) -> Option<Entry> {
        self.bindings
            .read()
            .get(&self.full_path.fold(segment))
            .map(|slot| slot.entry.clone())
    }

    fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }

    /// Resolves the leading segment of `name` to a child node.
    fn child(&self, name: &PathKey) -> Result<Arc<RegistryNode>> {
        let segment = name.first().unwrap_or_default();
        match self.entry(segment) {
            Some(Entry::Subcontext(node)) => Ok(node),
            Some(_) => Err(Error::NotAContext {
                name: segment.to_string(),
                context: self.display_path(),
            }),
            None => Err(Error::NameNotFound {
                name: segment.to_string(),
                context: self.display_path(),
            }),
        }
    }

    fn not_found(&self, segment: &str) -> Error {
        Error::NameNotFound {
            name: segment.to_string(),
            context: self.display_path(),
        }
    }

    fn already_bound(&self, segment: &str) -> Error {
        Error::NameAlreadyBound {
            name: segment.to_string(),
            context: self.display_path(),
        }
    }

    fn is_bound(&self, segment: &str, environment: &RwLock<Environment>) -> bool {
        self.entry(segment).is_some() || environment.read().contains_key(segment)
    }

    /// Whether `target` is this node or one of its descendants.
    fn contains_node(&self, target: &RegistryNode) -> bool {
        if std::ptr::eq(self, target) {
            return true;
        }
        let children: Vec<_> = self
            .bindings
            .read()
            .values()
            .filter_map(|slot| match &slot.entry {
                Entry::Subcontext(node) => Some(Arc::clone(node)),
                _ => None,
            })
            .collect();
        children.iter().any(|child| child.contains_node(target))
    }

    /// Binds a new name. The single-segment step checks `environment` for
    /// conflicting properties; deeper steps use each child's own.
    pub(crate) fn bind(
        &self,
        name: &PathKey,
        object: Object,
        environment: &RwLock<Environment>,
    ) -> Result<()> {
        self.ensure_open()?;
        Self::ensure_named(name, "cannot bind to an empty name")?;

        if name.len() > 1 {
            let child = self.child(name)?;
            return child.bind(&name.suffix(1), object, &child.environment);
        }

        let segment = name.first().unwrap_or_default();
        if self.is_bound(segment, environment) {
            return Err(self.already_bound(segment));
        }
        if let Object::Context(context) = &object
            && context.node().contains_node(self)
        {
            return Err(Error::InvalidName {
                name: segment.to_string(),
                reason: "binding this context here would create a cycle",
            });
        }

        self.bindings.write().insert(
            self.full_path.fold(segment),
            Slot {
                name: segment.to_string(),
                entry: object.into(),
            },
        );
        Ok(())
    }

    pub(crate) fn rebind(
        &self,
        name: &PathKey,
        object: Object,
        environment: &RwLock<Environment>,
    ) -> Result<()> {
        self.ensure_open()?;
        Self::ensure_named(name, "cannot rebind to an empty name")?;

        if name.len() > 1 {
            let child = self.child(name)?;
            return child.rebind(&name.suffix(1), object, &child.environment);
        }
        self.unbind(name)?;
        self.bind(name, object, environment)
    }

    /// Removes a value or proxy binding. Subcontexts are left in place and
    /// an absent name is not an error.
    pub(crate) fn unbind(&self, name: &PathKey) -> Result<()> {
        self.ensure_open()?;
        Self::ensure_named(name, "cannot unbind an empty name")?;

        if name.len() > 1 {
            return self.child(name)?.unbind(&name.suffix(1));
        }

        let key = self.full_path.fold(name.first().unwrap_or_default());
        let mut bindings = self.bindings.write();
        if let Some(slot) = bindings.get(&key)
            && !matches!(slot.entry, Entry::Subcontext(_))
        {
            bindings.remove(&key);
        }
        Ok(())
    }

    /// Resolves a non-empty name, materializing a pending proxy.
    ///
    /// A leaf that is not bound falls back to a property of `environment`.
    pub(crate) fn lookup(
        &self,
        name: &PathKey,
        environment: &RwLock<Environment>,
    ) -> Result<Option<Object>> {
        self.ensure_open()?;
        Self::ensure_named(name, "cannot look up an empty name")?;

        if name.len() > 1 {
            let child = self.child(name)?;
            return child.lookup(&name.suffix(1), &child.environment);
        }

        let segment = name.first().unwrap_or_default();
        match self.entry(segment) {
            Some(Entry::PendingProxy(proxy)) => Ok(Some(Object::Value(proxy.get_value()?))),
            Some(entry) => Ok(Some(entry.to_object())),
            None => Ok(Self::environment_value(segment, environment)),
        }
    }

    /// Resolves a non-empty name without materializing a pending proxy.
    pub(crate) fn peek(
        &self,
        name: &PathKey,
        environment: &RwLock<Environment>,
    ) -> Result<Option<Object>> {
        self.ensure_open()?;
        Self::ensure_named(name, "cannot look up an empty name")?;

        if name.len() > 1 {
            let child = self.child(name)?;
            return child.peek(&name.suffix(1), &child.environment);
        }

        let segment = name.first().unwrap_or_default();
        match self.entry(segment) {
            Some(entry) => Ok(Some(entry.to_object())),
            None => Ok(Self::environment_value(segment, environment)),
        }
    }

    fn environment_value(segment: &str, environment: &RwLock<Environment>) -> Option<Object> {
        environment
            .read()
            .get(segment)
            .map(|value| Object::value(value.to_string()))
    }

    /// Moves the object bound at `old` to `new`.
    ///
    /// Performed as unbind(old), unbind(new), bind(new); the sequence is
    /// not atomic.
    pub(crate) fn rename(
        &self,
        old: &PathKey,
        new: &PathKey,
        environment: &RwLock<Environment>,
    ) -> Result<()> {
        self.ensure_open()?;
        Self::ensure_named(old, "cannot rename an empty name")?;
        Self::ensure_named(new, "cannot rename to an empty name")?;

        let object = self.peek(old, environment)?.ok_or_else(|| Error::NameNotFound {
            name: old.to_string(),
            context: self.display_path(),
        })?;
        if self.peek(new, environment)?.is_some() {
            return Err(Error::NameAlreadyBound {
                name: new.to_string(),
                context: self.display_path(),
            });
        }

        self.unbind(old)?;
        self.unbind(new)?;
        self.bind(new, object, environment)
    }

    /// Creates a child node whose environment is a copy of `environment`.
    pub(crate) fn create_subcontext(
        &self,
        name: &PathKey,
        environment: &RwLock<Environment>,
    ) -> Result<Arc<RegistryNode>> {
        self.ensure_open()?;
        Self::ensure_named(name, "cannot create a context with an empty name")?;

        if name.len() > 1 {
            let child = self.child(name)?;
            return child.create_subcontext(&name.suffix(1), &child.environment);
        }

        let segment = name.first().unwrap_or_default();
        if self.is_bound(segment, environment) {
            return Err(self.already_bound(segment));
        }

        tracing::debug!(
            context = %self.display_path(),
            name = %segment,
            "Creating subcontext"
        );
        let environment = environment.read().clone();
        let node = Arc::new(RegistryNode::new(
            self.full_path.child(segment),
            self.parser,
            environment,
        ));
        self.bindings.write().insert(
            self.full_path.fold(segment),
            Slot {
                name: segment.to_string(),
                entry: Entry::Subcontext(Arc::clone(&node)),
            },
        );
        Ok(node)
    }

    pub(crate) fn destroy_subcontext(&self, name: &PathKey) -> Result<()> {
        self.ensure_open()?;
        Self::ensure_named(name, "cannot destroy a context with an empty name")?;

        if name.len() > 1 {
            return self.child(name)?.destroy_subcontext(&name.suffix(1));
        }

        let segment = name.first().unwrap_or_default();
        let Some(Entry::Subcontext(node)) = self.entry(segment) else {
            return Err(self.not_found(segment));
        };
        if !node.is_empty() {
            return Err(Error::NotEmpty {
                name: node.full_path.to_string(),
            });
        }

        node.close()?;
        self.bindings.write().remove(&self.full_path.fold(segment));
        Ok(())
    }

    fn snapshot(&self) -> Vec<Slot> {
        let mut slots: Vec<_> = self.bindings.read().values().cloned().collect();
        slots.sort_by(|a, b| a.name.cmp(&b.name));
        slots
    }

    pub(crate) fn list(&self, name: &PathKey) -> Result<Vec<NameClassPair>> {
        self.ensure_open()?;
        if !name.is_empty() {
            return self.child(name)?.list(&name.suffix(1));
        }
        Ok(self
            .snapshot()
            .into_iter()
            .map(|slot| NameClassPair {
                kind: slot.entry.kind(),
                name: slot.name,
            })
            .collect())
    }

    pub(crate) fn list_bindings(&self, name: &PathKey) -> Result<Vec<Binding>> {
        self.ensure_open()?;
        if !name.is_empty() {
            return self.child(name)?.list_bindings(&name.suffix(1));
        }
        Ok(self
            .snapshot()
            .into_iter()
            .map(|slot| Binding {
                object: slot.entry.to_object(),
                name: slot.name,
            })
            .collect())
    }

    /// Closes this node and every subcontext below it.
    ///
    /// Idempotent. Failures while tearing down children are logged and do
    /// not stop the teardown.
    pub(crate) fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let slots: Vec<_> = self.bindings.write().drain().map(|(_, slot)| slot).collect();
        for slot in slots {
            if let Entry::Subcontext(node) = slot.entry
                && let Err(e) = node.close()
            {
                tracing::warn!(
                    context = %self.display_path(),
                    name = %slot.name,
                    error = %e,
                    "Failed to close subcontext"
                );
            }
        }
        tracing::debug!(context = %self.display_path(), "Context closed");
        Ok(())
    }
}
