//! Call-time value model.
//!
//! Dispatch is positional: a call supplies one [`ArgValue`] per declared
//! parameter, and the compiled parameter roles decide what each one becomes
//! (path/query variable, body, header map, ...). Results come back as a
//! [`DecodedValue`], with a serde escape hatch for callers that want a
//! concrete type.

use std::collections::BTreeMap;
use std::fmt;

use crate::codec::stream::LazySequence;
use crate::error::{DecodeError, EncodeError};
use crate::request::Options;
use crate::response::Response;

/// One positional argument to a compiled method.
#[derive(Debug, Clone)]
pub enum ArgValue {
    /// A single textual value.
    Str(String),
    /// A multi-valued binding (repeated query parameter, joined path value).
    Strings(Vec<String>),
    /// A string-keyed multimap, for header-map and query-map parameters.
    Map(BTreeMap<String, Vec<String>>),
    /// A structured payload, for body and query-map parameters.
    Json(serde_json::Value),
    /// Raw bytes, for body parameters.
    Bytes(Vec<u8>),
    /// A per-call URL override.
    Url(url::Url),
    /// Per-call request options.
    Options(Options),
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<String>> for ArgValue {
    fn from(values: Vec<String>) -> Self {
        Self::Strings(values)
    }
}

impl From<serde_json::Value> for ArgValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// Formats one argument into the literal text a template variable receives.
///
/// A custom expander registered for a parameter replaces [`ToStringExpander`]
/// for that position only.
pub trait ParamExpander: Send + Sync {
    /// Renders a single value.
    ///
    /// ## Errors
    ///
    /// Returns [`EncodeError::Unsupported`] for shapes the expander cannot
    /// render.
    fn expand(&self, value: &ArgValue) -> Result<String, EncodeError>;
}

/// Default expander: plain string rendering of scalar values.
#[derive(Debug, Default)]
pub struct ToStringExpander;

impl ParamExpander for ToStringExpander {
    fn expand(&self, value: &ArgValue) -> Result<String, EncodeError> {
        match value {
            ArgValue::Str(s) => Ok(s.clone()),
            ArgValue::Url(u) => Ok(u.as_str().to_string()),
            ArgValue::Json(serde_json::Value::String(s)) => Ok(s.clone()),
            ArgValue::Json(serde_json::Value::Number(n)) => Ok(n.to_string()),
            ArgValue::Json(serde_json::Value::Bool(b)) => Ok(b.to_string()),
            _ => Err(EncodeError::Unsupported {
                value_kind: "non-scalar argument",
            }),
        }
    }
}

/// A decoded call result.
///
/// The variant is chosen by the active decoder from the method's declared
/// return shape. [`DecodedValue::Stream`] is the lazy-sequence case: the
/// transport resource stays open until the sequence is closed or exhausted.
pub enum DecodedValue {
    /// Nothing decodable: unit returns and suppressed 404s.
    Empty,
    /// A textual body.
    Text(String),
    /// A raw body.
    Bytes(bytes::Bytes),
    /// A structured body.
    Json(serde_json::Value),
    /// The raw response, unconsumed.
    Response(Response),
    /// A lazily decoded, single-consumer sequence of elements.
    Stream(LazySequence),
}

impl DecodedValue {
    /// Whether this is the empty result.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Borrows the structured body, if that is what was decoded.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Converts a structured or textual result into a concrete type.
    ///
    /// ## Errors
    ///
    /// Returns [`DecodeError::Unsupported`] for variants that carry no
    /// deserializable payload, or [`DecodeError::Deserialize`] when the
    /// payload does not match `T`.
    pub fn deserialize<T: serde::de::DeserializeOwned>(self) -> Result<T, DecodeError> {
        let value = match self {
            Self::Json(value) => value,
            Self::Text(text) => {
                serde_json::from_str(&text).map_err(|source| DecodeError::Deserialize { source })?
            }
            Self::Bytes(bytes) => serde_json::from_slice(&bytes)
                .map_err(|source| DecodeError::Deserialize { source })?,
            Self::Empty => serde_json::Value::Null,
            Self::Response(_) | Self::Stream(_) => {
                return Err(DecodeError::Unsupported {
                    ty: "raw response or lazy sequence".to_string(),
                })
            }
        };
        serde_json::from_value(value).map_err(|source| DecodeError::Deserialize { source })
    }
}

impl fmt::Debug for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Response(response) => f.debug_tuple("Response").field(response).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}
