//! Typed key/value pairs attached to structured log records.

use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fmt::{Debug, Display};

pub const FIELD_SERVICE: &str = "service";
pub const FIELD_REQUEST_ID: &str = "request-id";
pub const FIELD_TRACE_ID: &str = "trace-id";
pub const FIELD_MESSAGE: &str = "message";
pub const FIELD_SEVERITY: &str = "severity";
pub const FIELD_TIMESTAMP: &str = "timestamp";
pub const FIELD_ERROR: &str = "error";
pub const FIELD_DURATION: &str = "duration";
pub const FIELD_METHOD: &str = "method";
pub const FIELD_PATH: &str = "path";
pub const FIELD_STATUS_CODE: &str = "status_code";
pub const FIELD_USER_ID: &str = "user_id";
pub const FIELD_USER_AGENT: &str = "user_agent";
pub const FIELD_IP: &str = "ip";
pub const FIELD_CALLER: &str = "caller";
pub const FIELD_STACKTRACE: &str = "stacktrace";
pub const FIELD_RESPONSE_SIZE: &str = "response_size";

/// The value of a [`LogField`].
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// An error, rendered as its full message chain.
    Error(String),
    /// Anything else, rendered through its JSON representation.
    Opaque(serde_json::Value),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(value) | FieldValue::Error(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::String(value) | FieldValue::Error(value) => serializer.serialize_str(value),
            FieldValue::Int(value) => serializer.serialize_i64(*value),
            FieldValue::Float(value) => serializer.serialize_f64(*value),
            FieldValue::Bool(value) => serializer.serialize_bool(*value),
            FieldValue::Opaque(value) => value.serialize(serializer),
        }
    }
}

/// A single key/value pair of a structured log record.
#[derive(Clone, Debug, PartialEq)]
pub struct LogField {
    key: Cow<'static, str>,
    value: FieldValue,
}

impl LogField {
    pub fn new(key: impl Into<Cow<'static, str>>, value: FieldValue) -> Self {
        LogField {
            key: key.into(),
            value,
        }
    }

    pub fn string(key: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        Self::new(key, FieldValue::String(value.into()))
    }

    pub fn int(key: impl Into<Cow<'static, str>>, value: impl Into<i64>) -> Self {
        Self::new(key, FieldValue::Int(value.into()))
    }

    pub fn float(key: impl Into<Cow<'static, str>>, value: f64) -> Self {
        Self::new(key, FieldValue::Float(value))
    }

    pub fn bool(key: impl Into<Cow<'static, str>>, value: bool) -> Self {
        Self::new(key, FieldValue::Bool(value))
    }

    /// An error under the standard [`FIELD_ERROR`] key.
    ///
    /// `anyhow` errors are rendered with their whole context chain.
    pub fn error(err: impl Display) -> Self {
        Self::new(FIELD_ERROR, FieldValue::Error(format!("{:#}", err)))
    }

    /// Any serializable value.
    ///
    /// Values which fail to serialize are recorded as their error message instead.
    pub fn any<T: Serialize + ?Sized>(key: impl Into<Cow<'static, str>>, value: &T) -> Self {
        let value = serde_json::to_value(value)
            .unwrap_or_else(|err| serde_json::Value::String(format!("<unserializable: {}>", err)));
        Self::new(key, FieldValue::Opaque(value))
    }

    /// Any value, rendered through its `Debug` representation.
    pub fn debug<T: Debug + ?Sized>(key: impl Into<Cow<'static, str>>, value: &T) -> Self {
        Self::new(key, FieldValue::String(format!("{:?}", value)))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }
}
