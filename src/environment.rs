use std::collections::HashMap;

/// Property controlling case folding of path segments (`true`/`false`).
pub const IGNORE_CASE_KEY: &str = "registry.syntax.ignorecase";

/// Property naming the path separator. Only `/` is supported.
pub const SEPARATOR_KEY: &str = "registry.syntax.separator";

/// Property naming the directory scanned by the bootstrap.
pub const RESOURCES_DIRECTORY_KEY: &str = "registry.resources.directory";

/// The environment properties attached to a context.
///
/// Each node receives a copy of its parent's environment when it is
/// created and may modify it independently afterwards. Single-segment
/// lookups fall back to these properties when no binding matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    properties: HashMap<String, String>,
}

impl Environment {
    /// An empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// The value of a property.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Whether the property is set.
    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Sets a property, returning the previous value if there was one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.properties.insert(key.into(), value.into())
    }

    /// Removes a property, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.properties.remove(key)
    }

    /// Sets a property only if it is not already present.
    pub fn set_default(&mut self, key: &str, value: &str) {
        if !self.properties.contains_key(key) {
            self.properties.insert(key.to_string(), value.to_string());
        }
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether no property is set.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// All properties, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether path segments are compared case-insensitively.
    ///
    /// Absent or unparseable values mean case-sensitive.
    pub fn ignore_case(&self) -> bool {
        self.get(IGNORE_CASE_KEY)
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// The configured name separator.
    pub fn separator(&self) -> Option<&str> {
        self.get(SEPARATOR_KEY)
    }

    /// The directory the initial context is loaded from.
    pub fn resources_directory(&self) -> Option<&str> {
        self.get(RESOURCES_DIRECTORY_KEY)
    }
}

impl<K, V> FromIterator<(K, V)> for Environment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
