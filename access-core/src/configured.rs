use serde::de::{DeserializeOwned, Error as DeError};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Key of the marker object used to persist an unknown value.
pub const UNKNOWN_MARKER: &str = "$unknown";

/// A persisted attribute that is either absent, not yet known, or set.
///
/// State files store `null` (or omit the attribute) for [`Configured::Unset`]
/// and the marker object `{"$unknown": true}` for [`Configured::Unknown`].
/// Any other JSON value decodes as [`Configured::Value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Configured<T> {
    /// Attribute absent or explicitly null.
    Unset,
    /// Attribute present but its value is computed later.
    Unknown,
    /// Attribute present with a known value.
    Value(T),
}

impl<T> Default for Configured<T> {
    fn default() -> Self {
        Configured::Unset
    }
}

impl<T> Configured<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Configured::Unset)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Configured::Unknown)
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Configured::Value(_))
    }

    /// Borrow the known value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Configured::Value(value) => Some(value),
            Configured::Unset | Configured::Unknown => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Configured::Value(value) => Some(value),
            Configured::Unset | Configured::Unknown => None,
        }
    }

    /// `Some` becomes a known value, `None` becomes unset.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(value) => Configured::Value(value),
            None => Configured::Unset,
        }
    }

    /// Replace a known value matching `predicate` with [`Configured::Unset`].
    pub fn unset_if(self, predicate: impl FnOnce(&T) -> bool) -> Self {
        match self {
            Configured::Value(value) if predicate(&value) => Configured::Unset,
            other => other,
        }
    }
}

impl<T: Serialize> Serialize for Configured<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Configured::Unset => serializer.serialize_none(),
            Configured::Unknown => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(UNKNOWN_MARKER, &true)?;
                map.end()
            }
            Configured::Value(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Configured<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Configured::Unset),
            Value::Object(map) if is_unknown_marker(&map) => Ok(Configured::Unknown),
            other => T::deserialize(other)
                .map(Configured::Value)
                .map_err(D::Error::custom),
        }
    }
}

fn is_unknown_marker(map: &Map<String, Value>) -> bool {
    map.len() == 1 && map.get(UNKNOWN_MARKER) == Some(&Value::Bool(true))
}
