use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

/// The raw body of a request, encoded lazily according to its `Content-Type`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    Empty,
    /// A literal body, sent as is for non-structured content types.
    Text(String),
    /// Ordered form fields.
    Fields(Vec<(String, FieldValue)>),
    /// Any JSON-shaped value.
    Structured(serde_json::Value),
}

/// The value of one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    /// Repeated values, sent as `name[]` parts in multipart bodies.
    List(Vec<String>),
}

impl Payload {
    /// Builds [`Payload::Fields`] from `(name, value)` pairs.
    pub fn fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        Self::Fields(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Serializes any value into [`Payload::Structured`].
    ///
    /// # Errors
    ///
    /// Returns the serializer error when `value` can't be represented as JSON.
    pub fn structured<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::Structured)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Structured(value)
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl<S: Into<String>> From<Vec<S>> for FieldValue {
    fn from(values: Vec<S>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(text) => serializer.serialize_str(text),
            Self::List(values) => values.serialize(serializer),
        }
    }
}

/// `Empty` serializes as `null`, `Fields` as an object keeping field order.
impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_none(),
            Self::Text(text) => serializer.serialize_str(text),
            Self::Fields(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
            Self::Structured(value) => value.serialize(serializer),
        }
    }
}
