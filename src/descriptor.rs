use std::collections::BTreeMap;
use std::fmt;

/// The reserved descriptor key selecting the resource type.
pub const TYPE_KEY: &str = "type";

const MASK: &str = "*****";

/// The flat key-value configuration of a declared resource.
///
/// # Examples
///
/// ```
/// use resource_registry::Descriptor;
///
/// let descriptor: Descriptor = [
///     ("type", "data-source"),
///     ("url", "jdbc:h2:mem:test"),
///     ("password", "secret"),
/// ]
/// .into_iter()
/// .collect();
///
/// assert_eq!(descriptor.type_tag(), Some("data-source"));
/// assert_eq!(descriptor.masked().get("password"), Some("*****"));
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    properties: BTreeMap<String, String>,
}

impl Descriptor {
    /// An empty descriptor.
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

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether no property is set.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The resource type tag stored under [`TYPE_KEY`].
    pub fn type_tag(&self) -> Option<&str> {
        self.get(TYPE_KEY)
    }

    /// Returns `true` when the key holds `true` (case-insensitive).
    pub fn flag(&self, key: &str) -> bool {
        self.get(key)
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Keys starting with `prefix`, with the prefix stripped.
    pub fn strip_prefix(&self, prefix: &str) -> Descriptor {
        self.properties
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(prefix).map(|rest| (rest.to_string(), v.clone()))
            })
            .collect()
    }

    /// A copy safe for logging: values of password-like keys are hidden.
    pub fn masked(&self) -> Descriptor {
        self.properties
            .iter()
            .map(|(k, v)| {
                if k.to_ascii_lowercase().contains("pass") {
                    (k.clone(), MASK.to_string())
                } else {
                    (k.clone(), v.clone())
                }
            })
            .collect()
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.masked().properties.iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Descriptor
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

#[cfg(feature = "directory-loading")]
impl<'de> serde::Deserialize<'de> for Descriptor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as _;
        use serde_json::Value;

        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut properties = BTreeMap::new();
        for (key, value) in raw {
            let value = match value {
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Null => continue,
                Value::Array(_) | Value::Object(_) => {
                    return Err(D::Error::custom(format!(
                        "descriptor key '{}' must hold a scalar value",
                        key
                    )));
                }
            };
            properties.insert(key, value);
        }
        Ok(Self { properties })
    }
}
