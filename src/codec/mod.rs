//! Pluggable body codecs and error decoding.
//!
//! The dispatch runtime only knows the trait seams here: [`Encoder`] turns a
//! body argument into request bytes, [`Decoder`] turns a 2xx response into a
//! [`DecodedValue`], [`ErrorDecoder`] turns a non-2xx response into the error
//! surfaced to the caller, and [`QueryMapEncoder`] flattens a query-map
//! argument into name/value pairs. Concrete wire formats stay out of the
//! core; the JSON pair below exists because the rest of the crate already
//! speaks `serde_json`.

pub mod stream;

use std::collections::BTreeMap;

use crate::error::{DecodeError, EncodeError, Error, HttpStatusError, TransportError, TransportErrorKind};
use crate::request::RequestTemplate;
use crate::response::Response;
use crate::template::{encode_value, QUERY};
use crate::types::TypeRef;
use crate::value::{ArgValue, DecodedValue};

/// Encodes a body argument into the request template.
pub trait Encoder: Send + Sync {
    /// Writes `value` as the template's body.
    ///
    /// ## Errors
    ///
    /// Returns [`EncodeError`] when the value shape is unsupported or
    /// serialization fails.
    fn encode(
        &self,
        value: &ArgValue,
        body_type: &TypeRef,
        template: &mut RequestTemplate,
    ) -> Result<(), EncodeError>;
}

/// Pass-through encoder: text and bytes go out as-is, form maps go out
/// URL-encoded. Anything structured needs a format-aware encoder.
#[derive(Debug, Default)]
pub struct DefaultEncoder;

impl Encoder for DefaultEncoder {
    fn encode(
        &self,
        value: &ArgValue,
        _body_type: &TypeRef,
        template: &mut RequestTemplate,
    ) -> Result<(), EncodeError> {
        match value {
            ArgValue::Str(text) => {
                template.set_body(text.as_bytes());
                Ok(())
            }
            ArgValue::Bytes(bytes) => {
                template.set_body(bytes.clone());
                Ok(())
            }
            ArgValue::Map(map) => {
                let mut pairs = Vec::new();
                for (name, values) in map {
                    for value in values {
                        pairs.push(format!(
                            "{}={}",
                            encode_value(name, QUERY),
                            encode_value(value, QUERY)
                        ));
                    }
                }
                template.set_body(pairs.join("&").into_bytes());
                Ok(())
            }
            _ => Err(EncodeError::Unsupported {
                value_kind: "structured value (use a format-aware encoder)",
            }),
        }
    }
}

/// JSON encoder over `serde_json`.
#[derive(Debug, Default)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(
        &self,
        value: &ArgValue,
        _body_type: &TypeRef,
        template: &mut RequestTemplate,
    ) -> Result<(), EncodeError> {
        let bytes = match value {
            ArgValue::Json(value) => {
                serde_json::to_vec(value).map_err(|source| EncodeError::Serialize { source })?
            }
            ArgValue::Str(text) => serde_json::to_vec(text)
                .map_err(|source| EncodeError::Serialize { source })?,
            ArgValue::Map(map) => {
                serde_json::to_vec(map).map_err(|source| EncodeError::Serialize { source })?
            }
            _ => {
                return Err(EncodeError::Unsupported {
                    value_kind: "non-JSON value",
                })
            }
        };
        template.set_body(bytes);
        Ok(())
    }
}

/// Decodes a 2xx response into the method's declared return shape.
pub trait Decoder: Send + Sync {
    /// Converts the response body.
    ///
    /// ## Errors
    ///
    /// Returns [`DecodeError`] when the body does not match the declared
    /// shape.
    fn decode(&self, response: Response, ty: &TypeRef) -> Result<DecodedValue, DecodeError>;
}

/// Pass-through decoder: raw responses, text, and bytes only.
#[derive(Debug, Default)]
pub struct DefaultDecoder;

impl Decoder for DefaultDecoder {
    fn decode(&self, mut response: Response, ty: &TypeRef) -> Result<DecodedValue, DecodeError> {
        if ty.is_response() {
            return Ok(DecodedValue::Response(response));
        }
        if ty.is_unit() {
            return Ok(DecodedValue::Empty);
        }
        let bytes = response.take_body().into_bytes()?;
        if bytes.is_empty() {
            return Ok(empty_value_of(ty));
        }
        if ty.is_textual() {
            return Ok(DecodedValue::Text(
                String::from_utf8_lossy(&bytes).into_owned(),
            ));
        }
        if ty.name() == "Bytes" {
            return Ok(DecodedValue::Bytes(bytes));
        }
        Err(DecodeError::Unsupported { ty: ty.to_string() })
    }
}

/// JSON decoder over `serde_json`.
#[derive(Debug, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode(&self, mut response: Response, ty: &TypeRef) -> Result<DecodedValue, DecodeError> {
        if ty.is_response() {
            return Ok(DecodedValue::Response(response));
        }
        if ty.is_unit() {
            return Ok(DecodedValue::Empty);
        }
        let bytes = response.take_body().into_bytes()?;
        if bytes.is_empty() {
            return Ok(empty_value_of(ty));
        }
        if ty.is_textual() {
            return Ok(DecodedValue::Text(
                String::from_utf8_lossy(&bytes).into_owned(),
            ));
        }
        let value = serde_json::from_slice(&bytes)
            .map_err(|source| DecodeError::Deserialize { source })?;
        Ok(DecodedValue::Json(value))
    }
}

/// The well-known empty value for a declared return shape, used when a 404
/// is suppressed into an empty result and for empty bodies.
pub fn empty_value_of(ty: &TypeRef) -> DecodedValue {
    if ty.is_unit() {
        return DecodedValue::Empty;
    }
    if ty.is_textual() {
        return DecodedValue::Text(String::new());
    }
    if ty.stream_element().is_some() {
        return DecodedValue::Stream(stream::LazySequence::empty());
    }
    match ty.name() {
        "Bytes" => DecodedValue::Bytes(bytes::Bytes::new()),
        "Vec" | "List" | "Set" => DecodedValue::Json(serde_json::Value::Array(Vec::new())),
        "Option" | "Optional" => DecodedValue::Json(serde_json::Value::Null),
        name if name.ends_with("Map") => {
            DecodedValue::Json(serde_json::Value::Object(serde_json::Map::new()))
        }
        _ => DecodedValue::Empty,
    }
}

/// Maps a response before it reaches the decoder.
pub trait ResponseMapper: Send + Sync {
    /// Produces the response the decoder will see.
    fn map(&self, response: Response, ty: &TypeRef) -> Response;
}

/// Decoder wrapper that applies a [`ResponseMapper`] first.
pub struct ResponseMappingDecoder {
    mapper: Box<dyn ResponseMapper>,
    delegate: Box<dyn Decoder>,
}

impl ResponseMappingDecoder {
    /// Wraps `delegate` behind `mapper`.
    pub fn new(mapper: Box<dyn ResponseMapper>, delegate: Box<dyn Decoder>) -> Self {
        Self { mapper, delegate }
    }
}

impl Decoder for ResponseMappingDecoder {
    fn decode(&self, response: Response, ty: &TypeRef) -> Result<DecodedValue, DecodeError> {
        self.delegate.decode(self.mapper.map(response, ty), ty)
    }
}

/// Flattens a query-map argument into name/value pairs.
pub trait QueryMapEncoder: Send + Sync {
    /// Produces the pairs appended to the resolved query string.
    ///
    /// ## Errors
    ///
    /// Returns [`EncodeError`] when the argument cannot be flattened.
    fn encode(&self, value: &ArgValue) -> Result<BTreeMap<String, Vec<String>>, EncodeError>;
}

/// Default query-map encoder: accepts string multimaps directly and
/// flattens one level of JSON object.
#[derive(Debug, Default)]
pub struct DefaultQueryMapEncoder;

impl QueryMapEncoder for DefaultQueryMapEncoder {
    fn encode(&self, value: &ArgValue) -> Result<BTreeMap<String, Vec<String>>, EncodeError> {
        match value {
            ArgValue::Map(map) => Ok(map.clone()),
            ArgValue::Json(serde_json::Value::Object(fields)) => {
                let mut out = BTreeMap::new();
                for (name, value) in fields {
                    let values = match value {
                        serde_json::Value::Null => continue,
                        serde_json::Value::String(s) => vec![s.clone()],
                        serde_json::Value::Number(n) => vec![n.to_string()],
                        serde_json::Value::Bool(b) => vec![b.to_string()],
                        serde_json::Value::Array(items) => items
                            .iter()
                            .map(|item| match item {
                                serde_json::Value::String(s) => Ok(s.clone()),
                                serde_json::Value::Number(n) => Ok(n.to_string()),
                                serde_json::Value::Bool(b) => Ok(b.to_string()),
                                _ => Err(EncodeError::Unsupported {
                                    value_kind: "nested structure in query map",
                                }),
                            })
                            .collect::<Result<_, _>>()?,
                        serde_json::Value::Object(_) => {
                            return Err(EncodeError::Unsupported {
                                value_kind: "nested object in query map",
                            })
                        }
                    };
                    out.insert(name.clone(), values);
                }
                Ok(out)
            }
            _ => Err(EncodeError::Unsupported {
                value_kind: "query map argument",
            }),
        }
    }
}

/// Decodes a non-2xx response into the error surfaced to the caller.
pub trait ErrorDecoder: Send + Sync {
    /// Produces the call error for `response`.
    fn decode(&self, config_key: &str, response: Response) -> Error;
}

/// Default error decoder: a typed status error, wrapped retryable when the
/// server sent a `Retry-After` hint.
#[derive(Debug, Default)]
pub struct DefaultErrorDecoder;

impl ErrorDecoder for DefaultErrorDecoder {
    fn decode(&self, config_key: &str, mut response: Response) -> Error {
        let retry_after = response.header("Retry-After").map(str::to_string);
        let status = response.status();
        let headers = response.headers().to_vec();
        let body = response.take_body().into_bytes().ok();
        let status_error = HttpStatusError {
            status,
            config_key: config_key.to_string(),
            headers,
            body,
        };
        match retry_after {
            Some(after) => Error::Transport(
                TransportError::new(
                    TransportErrorKind::Io,
                    format!("HTTP {status}, server asked to retry after {after}"),
                    true,
                )
                .with_source(status_error),
            ),
            None => Error::Status(status_error),
        }
    }
}
