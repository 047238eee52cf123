use std::path::PathBuf;
use std::sync::Arc;

/// Discriminant of an [`Error`], convenient for matching without caring
/// about the attached names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidName,
    NameNotFound,
    NameAlreadyBound,
    NotEmpty,
    NotAContext,
    Closed,
    Configuration,
    Security,
    Io,
    Descriptor,
}

/// Errors produced by registry operations, factories and the loader.
///
/// Navigation errors name the offending segment and the full path of the
/// context in which resolution failed (`/` for the root).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An empty or malformed name where a non-empty one is required.
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// A missing intermediate segment or leaf.
    #[error("name '{name}' not found in context '{context}'")]
    NameNotFound { name: String, context: String },

    /// Bind onto a name that already resolves to something.
    #[error("name '{name}' already bound in context '{context}'; use rebind to override")]
    NameAlreadyBound { name: String, context: String },

    /// Destroy of a subcontext that still holds bindings.
    #[error("context '{name}' is not empty")]
    NotEmpty { name: String },

    /// A value was found where a subcontext was required.
    #[error("'{name}' in context '{context}' is not a context")]
    NotAContext { name: String, context: String },

    /// Operation on a closed context.
    #[error("context '{context}' is closed")]
    Closed { context: String },

    /// Resource construction failed or mandatory configuration is missing.
    #[error("configuration error for '{resource}': {message}")]
    Configuration { resource: String, message: String },

    /// Failure raised by a security collaborator, surfaced unchanged.
    #[error("security error for '{resource}': {source}")]
    Security {
        resource: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O error occurred while reading the configuration source.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A descriptor could not be parsed into a flat key-value map.
    #[error("malformed descriptor {}: {message}", file.display())]
    Descriptor { file: PathBuf, message: String },

    /// An error raised once and handed to several callers, such as every
    /// caller that waited on the same failed resource construction.
    #[error(transparent)]
    Shared(Arc<Error>),
}

impl Error {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidName { .. } => ErrorKind::InvalidName,
            Error::NameNotFound { .. } => ErrorKind::NameNotFound,
            Error::NameAlreadyBound { .. } => ErrorKind::NameAlreadyBound,
            Error::NotEmpty { .. } => ErrorKind::NotEmpty,
            Error::NotAContext { .. } => ErrorKind::NotAContext,
            Error::Closed { .. } => ErrorKind::Closed,
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::Security { .. } => ErrorKind::Security,
            Error::Io { .. } => ErrorKind::Io,
            Error::Descriptor { .. } => ErrorKind::Descriptor,
            Error::Shared(error) => error.kind(),
        }
    }

    pub(crate) fn configuration(
        resource: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Configuration {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
