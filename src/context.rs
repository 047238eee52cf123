use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::path_key::SEPARATOR;
use crate::registry_node::RegistryNode;
use crate::{
    Binding, EntryKind, Environment, Error, NameClassPair, NameParser, Object, PathKey, Result,
};

/// A client handle over a node of the naming tree.
///
/// Handles are cheap to clone; all handles over the same node share its
/// bindings. Names are `/`-separated and resolved relative to the node.
///
/// # Examples
///
/// ```
/// use resource_registry::{Context, Environment, Object};
///
/// let root = Context::new(Environment::new()).unwrap();
/// root.create_subcontext("jdbc").unwrap();
/// root.bind("jdbc/answer", Object::value(42u32)).unwrap();
///
/// let answer = root.lookup("jdbc/answer").unwrap().unwrap();
/// assert_eq!(answer.downcast_ref::<u32>(), Some(&42));
///
/// let names: Vec<_> = root.list("").unwrap().into_iter().map(|p| p.name).collect();
/// assert_eq!(names, ["jdbc"]);
/// ```
#[derive(Clone)]
pub struct Context {
    node: Arc<RegistryNode>,
    environment: Arc<RwLock<Environment>>,
}

impl Context {
    /// Creates the root of a new naming tree.
    ///
    /// Case folding of path segments is taken from
    /// [`IGNORE_CASE_KEY`](crate::IGNORE_CASE_KEY) and cannot change
    /// afterwards.
    pub fn new(environment: Environment) -> Result<Self> {
        if let Some(separator) = environment.separator()
            && separator != SEPARATOR.to_string()
        {
            return Err(Error::InvalidName {
                name: separator.to_string(),
                reason: "unsupported path separator",
            });
        }
        Ok(Self::from_node(Arc::new(RegistryNode::root(environment))))
    }

    pub(crate) fn from_node(node: Arc<RegistryNode>) -> Self {
        let environment = node.environment();
        Self { node, environment }
    }

    pub(crate) fn node(&self) -> Arc<RegistryNode> {
        Arc::clone(&self.node)
    }

    fn parse(&self, name: &str) -> Result<PathKey> {
        self.node.parser().parse(name)
    }

    /// Binds `object` to `name`. Fails if the name is already bound.
    pub fn bind(&self, name: &str, object: impl Into<Object>) -> Result<()> {
        self.node
            .bind(&self.parse(name)?, object.into(), &self.environment)
    }

    /// Binds `object` to `name`, replacing an existing value binding.
    pub fn rebind(&self, name: &str, object: impl Into<Object>) -> Result<()> {
        self.node
            .rebind(&self.parse(name)?, object.into(), &self.environment)
    }

    /// Removes the value bound to `name`. Subcontexts are not removed this
    /// way; use [`destroy_subcontext`](Self::destroy_subcontext).
    pub fn unbind(&self, name: &str) -> Result<()> {
        self.node.unbind(&self.parse(name)?)
    }

    /// Resolves `name`.
    ///
    /// A name is looked up as a binding, then as a subcontext, then as an
    /// environment property. A single-segment name uses this handle's
    /// environment; deeper names use the environment of the subcontext
    /// they resolve in. A pending lazy resource is
    /// constructed on first lookup. An absent leaf yields `Ok(None)`; an
    /// absent intermediate segment is an error.
    ///
    /// The empty name yields a new handle over this node whose environment
    /// can be modified independently.
    pub fn lookup(&self, name: &str) -> Result<Option<Object>> {
        let name = self.parse(name)?;
        if name.is_empty() {
            return Ok(Some(Object::Context(Self {
                node: Arc::clone(&self.node),
                environment: Arc::new(RwLock::new(self.environment()?)),
            })));
        }
        self.node.lookup(&name, &self.environment)
    }

    /// Same as [`lookup`](Self::lookup); the registry has no links.
    pub fn lookup_link(&self, name: &str) -> Result<Option<Object>> {
        self.lookup(name)
    }

    /// The kind of entry bound at `name`, without constructing a pending
    /// resource. Environment properties report [`EntryKind::Value`].
    pub fn kind_of(&self, name: &str) -> Result<Option<EntryKind>> {
        let name = self.parse(name)?;
        if name.is_empty() {
            return Ok(Some(EntryKind::Context));
        }
        Ok(self
            .node
            .peek(&name, &self.environment)?
            .map(|object| object.kind()))
    }

    /// Name and kind of every direct child of the context at `name`.
    pub fn list(&self, name: &str) -> Result<Vec<NameClassPair>> {
        self.node.list(&self.parse(name)?)
    }

    /// Name and object of every direct child of the context at `name`.
    /// Pending resources are returned unresolved.
    pub fn list_bindings(&self, name: &str) -> Result<Vec<Binding>> {
        self.node.list_bindings(&self.parse(name)?)
    }

    /// Moves the binding at `old` to `new`, which must be unbound.
    ///
    /// This is not atomic: a concurrent mutation of either name can
    /// interleave between the steps.
    pub fn rename(&self, old: &str, new: &str) -> Result<()> {
        self.node
            .rename(&self.parse(old)?, &self.parse(new)?, &self.environment)
    }

    /// Creates a subcontext. Intermediate contexts must already exist.
    pub fn create_subcontext(&self, name: &str) -> Result<Context> {
        let node = self
            .node
            .create_subcontext(&self.parse(name)?, &self.environment)?;
        Ok(Self::from_node(node))
    }

    /// Destroys an empty subcontext.
    pub fn destroy_subcontext(&self, name: &str) -> Result<()> {
        self.node.destroy_subcontext(&self.parse(name)?)
    }

    /// Closes the node and every subcontext below it. Idempotent.
    pub fn close(&self) -> Result<()> {
        self.node.close()
    }

    /// Whether the underlying node has been closed.
    pub fn is_closed(&self) -> bool {
        self.node.is_closed()
    }

    /// A snapshot of this handle's environment.
    pub fn environment(&self) -> Result<Environment> {
        self.node.ensure_open()?;
        Ok(self.environment.read().clone())
    }

    /// Sets a property of this handle's environment, returning the
    /// previous value.
    pub fn add_to_environment(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Option<String>> {
        self.node.ensure_open()?;
        Ok(self.environment.write().insert(key, value))
    }

    /// Removes a property of this handle's environment, returning its
    /// value.
    pub fn remove_from_environment(&self, key: &str) -> Result<Option<String>> {
        self.node.ensure_open()?;
        Ok(self.environment.write().remove(key))
    }

    /// Composes `name` relative to `prefix`.
    pub fn compose_name(&self, name: &str, prefix: &str) -> Result<String> {
        self.node.parser().compose(name, prefix)
    }

    /// The parser for names relative to this context.
    pub fn name_parser(&self) -> NameParser {
        self.node.parser()
    }

    /// The full path of this context; empty for the root.
    pub fn name_in_namespace(&self) -> String {
        self.node.full_path().to_string()
    }

    /// Whether both handles refer to the same node.
    pub fn same_context(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.name_in_namespace())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, IGNORE_CASE_KEY, SEPARATOR_KEY};

    fn root() -> Context {
        Context::new(Environment::new()).unwrap()
    }

    #[test]
    fn test_root_has_empty_path() {
        let root = root();
        assert_eq!(root.name_in_namespace(), "");
        let a = root.create_subcontext("a").unwrap();
        let b = a.create_subcontext("b").unwrap();
        assert_eq!(b.name_in_namespace(), "a/b");
    }

    #[test]
    fn test_unsupported_separator() {
        let env: Environment = [(SEPARATOR_KEY, ".")].into_iter().collect();
        let error = Context::new(env).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidName);
    }

    #[test]
    fn test_empty_lookup_gives_independent_environment() {
        let root = root();
        root.add_to_environment("shared", "1").unwrap();
        let view = root.lookup("").unwrap().unwrap().into_context().unwrap();
        assert!(view.same_context(&root));

        view.add_to_environment("only-view", "2").unwrap();
        assert!(root.environment().unwrap().get("only-view").is_none());
        assert_eq!(view.environment().unwrap().get("shared"), Some("1"));

        view.bind("x", Object::value(1u8)).unwrap();
        assert!(root.lookup("x").unwrap().is_some());
    }

    #[test]
    fn test_view_environment_is_used_for_resolution() {
        let root = root();
        let view = root.lookup("").unwrap().unwrap().into_context().unwrap();
        view.add_to_environment("k", "v").unwrap();

        let value = view.lookup("k").unwrap().unwrap();
        assert_eq!(value.downcast_ref::<String>().unwrap(), "v");
        assert!(root.lookup("k").unwrap().is_none());

        let error = view.bind("k", Object::value(1u8)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NameAlreadyBound);
        assert_eq!(view.kind_of("k").unwrap(), Some(EntryKind::Value));
        root.bind("k", Object::value(1u8)).unwrap();

        view.remove_from_environment("k").unwrap();
        assert_eq!(
            view.lookup("k").unwrap().unwrap().downcast_ref::<u8>(),
            Some(&1)
        );
    }

    #[test]
    fn test_subcontext_copies_handle_environment() {
        let root = root();
        let view = root.lookup("").unwrap().unwrap().into_context().unwrap();
        view.add_to_environment("from-view", "1").unwrap();
        let child = view.create_subcontext("child").unwrap();
        assert_eq!(child.environment().unwrap().get("from-view"), Some("1"));
        assert_eq!(
            root.lookup("child/from-view").unwrap().unwrap().downcast_ref::<String>().unwrap(),
            "1"
        );
    }

    #[test]
    fn test_lookup_falls_back_to_environment() {
        let env: Environment = [("greeting", "hello")].into_iter().collect();
        let root = Context::new(env).unwrap();
        let value = root.lookup("greeting").unwrap().unwrap();
        assert_eq!(value.downcast_ref::<String>().unwrap(), "hello");

        let error = root.bind("greeting", Object::value(1u8)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NameAlreadyBound);
    }

    #[test]
    fn test_subcontext_inherits_environment_copy() {
        let env: Environment = [("k", "v")].into_iter().collect();
        let root = Context::new(env).unwrap();
        let child = root.create_subcontext("child").unwrap();
        child.add_to_environment("k", "changed").unwrap();
        assert_eq!(root.environment().unwrap().get("k"), Some("v"));
        assert_eq!(
            root.lookup("child/k").unwrap().unwrap().downcast_ref::<String>().unwrap(),
            "changed"
        );
    }

    #[test]
    fn test_case_folding() {
        let env: Environment = [(IGNORE_CASE_KEY, "true")].into_iter().collect();
        let folding = Context::new(env).unwrap();
        folding.create_subcontext("JDBC").unwrap();
        folding.bind("jdbc/DB1", Object::value(1u8)).unwrap();
        assert!(folding.lookup("Jdbc/db1").unwrap().is_some());
        assert_eq!(folding.list("").unwrap()[0].name, "JDBC");

        let sensitive = root();
        sensitive.create_subcontext("JDBC").unwrap();
        let error = sensitive.lookup("jdbc/db1").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NameNotFound);
    }

    #[test]
    fn test_binding_context_into_itself_is_rejected() {
        let root = root();
        let a = root.create_subcontext("a").unwrap();
        let error = a.bind("loop", root.clone()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidName);
        let error = a.bind("self", a.clone()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidName);
    }

    #[test]
    fn test_bound_context_goes_to_subcontext_slot() {
        let root = root();
        let other = Context::new(Environment::new()).unwrap();
        other.bind("leaf", Object::value(7i64)).unwrap();
        root.bind("mounted", other.clone()).unwrap();

        assert_eq!(root.kind_of("mounted").unwrap(), Some(EntryKind::Context));
        assert_eq!(
            root.lookup("mounted/leaf").unwrap().unwrap().downcast_ref::<i64>(),
            Some(&7)
        );
    }

    #[test]
    fn test_compose_name() {
        let root = root();
        assert_eq!(root.compose_name("db1", "jdbc").unwrap(), "jdbc/db1");
    }
}
