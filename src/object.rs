use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::{Context, LazyResourceProxy};

/// An opaque resource produced by a factory or bound by a caller.
pub type Resource = Arc<dyn Any + Send + Sync>;

/// What a name can be bound to.
///
/// `Context` objects are stored as subcontexts, everything else as plain
/// bindings. Lookups never return `Lazy`: a proxy is materialized and its
/// value returned instead.
#[derive(Clone)]
pub enum Object {
    /// A resolved value.
    Value(Resource),
    /// A subcontext.
    Context(Context),
    /// A resource constructed on first lookup.
    Lazy(Arc<LazyResourceProxy>),
}

impl Object {
    /// Wraps any shareable value.
    ///
    /// # Examples
    ///
    /// ```
    /// use resource_registry::Object;
    ///
    /// let object = Object::value(10u32);
    /// assert_eq!(object.downcast_ref::<u32>(), Some(&10));
    /// assert!(object.downcast_ref::<String>().is_none());
    /// ```
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Object::Value(Arc::new(value))
    }

    /// The kind of entry this object represents.
    pub fn kind(&self) -> EntryKind {
        match self {
            Object::Value(_) => EntryKind::Value,
            Object::Context(_) => EntryKind::Context,
            Object::Lazy(_) => EntryKind::Lazy,
        }
    }

    /// The stored value, unless this is a context or an unresolved proxy.
    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Object::Value(resource) => Some(resource),
            _ => None,
        }
    }

    /// Borrows the value if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_resource()
            .and_then(|resource| resource.downcast_ref::<T>())
    }

    /// Returns a shared handle to the value if it has type `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.as_resource()
            .and_then(|resource| Arc::clone(resource).downcast::<T>().ok())
    }

    /// The context handle, if this object is one.
    pub fn as_context(&self) -> Option<&Context> {
        match self {
            Object::Context(context) => Some(context),
            _ => None,
        }
    }

    /// Converts into a context handle, if this object is one.
    pub fn into_context(self) -> Option<Context> {
        match self {
            Object::Context(context) => Some(context),
            _ => None,
        }
    }

    /// Whether this object is a context.
    pub fn is_context(&self) -> bool {
        matches!(self, Object::Context(_))
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Value(_) => f.write_str("Value(..)"),
            Object::Context(context) => {
                f.debug_tuple("Context").field(&context.name_in_namespace()).finish()
            }
            Object::Lazy(proxy) => f.debug_tuple("Lazy").field(proxy).finish(),
        }
    }
}

impl From<Context> for Object {
    fn from(context: Context) -> Self {
        Object::Context(context)
    }
}

impl From<Arc<LazyResourceProxy>> for Object {
    fn from(proxy: Arc<LazyResourceProxy>) -> Self {
        Object::Lazy(proxy)
    }
}

impl From<LazyResourceProxy> for Object {
    fn from(proxy: LazyResourceProxy) -> Self {
        Object::Lazy(Arc::new(proxy))
    }
}

/// The kind of entry a name is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Value,
    Context,
    Lazy,
}

/// A name and the kind of its binding, as returned by `list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameClassPair {
    pub name: String,
    pub kind: EntryKind,
}

/// A name and its bound object, as returned by `list_bindings`.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub object: Object,
}
