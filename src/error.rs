//! Layered error types for the pretext crate.
//!
//! The taxonomy separates build-time failures from call-time failures:
//! - [`ConfigurationError`] - interface/method/parameter shape violations,
//!   detected while compiling a contract; fatal, the client cannot be built
//! - [`TemplateError`] - template construction or placeholder resolution
//!   failures; fatal to the affected call
//! - [`EncodeError`] / [`DecodeError`] - body conversion failures
//! - [`TransportError`] - raised by the transport collaborator, classified
//!   retryable or terminal
//! - [`HttpStatusError`] - a non-2xx response after error decoding
//! - [`DispatchError`] - a call against a method with no compiled executor

/// Top-level error type for all pretext operations.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The interface definition could not be compiled.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A request template could not be resolved.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A request body could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// A response body could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The transport collaborator failed to execute the request.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server returned a non-success status.
    #[error(transparent)]
    Status(#[from] HttpStatusError),

    /// The call could not be routed to a compiled executor.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Interface, method, or parameter shape violations detected at compile time.
///
/// Any of these aborts client construction entirely; there is no partial
/// client.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// The target interface declares generic type parameters.
    #[error("parameterized types unsupported: {interface}")]
    ParameterizedType {
        /// Name of the offending interface.
        interface: String,
    },

    /// The target interface extends more than one interface.
    #[error("only single inheritance supported: {interface}")]
    MultipleInheritance {
        /// Name of the offending interface.
        interface: String,
    },

    /// The extended interface itself extends another interface.
    #[error("only single-level inheritance supported: {interface}")]
    DeepInheritance {
        /// Name of the offending interface.
        interface: String,
    },

    /// The extends clause supplies the wrong number of type arguments.
    #[error("extends clause of {interface} supplies {supplied} type arguments, parent declares {declared}")]
    TypeArgumentArity {
        /// Name of the extending interface.
        interface: String,
        /// Number of type parameters on the parent.
        declared: usize,
        /// Number of arguments supplied by the extends clause.
        supplied: usize,
    },

    /// Two methods compiled to the same correlation key.
    #[error("overrides unsupported: {config_key}")]
    Override {
        /// The colliding correlation key.
        config_key: String,
    },

    /// A non-ignored method carries no HTTP verb marker.
    #[error("method {config_key} not marked with an HTTP method type (ex. GET, POST){warnings}")]
    MissingHttpMethod {
        /// Correlation key of the offending method.
        config_key: String,
        /// Accumulated diagnostic warnings, pre-formatted.
        warnings: String,
    },

    /// A request-line marker did not start with a recognized HTTP verb.
    #[error("request line did not start with an HTTP verb on method {config_key}: {value:?}")]
    MalformedRequestLine {
        /// Correlation key of the offending method.
        config_key: String,
        /// The raw request-line text.
        value: String,
    },

    /// A body marker in template mode could not be parsed.
    #[error("body template on {config_key} could not be parsed: {detail}")]
    MalformedBodyTemplate {
        /// Correlation key of the offending method.
        config_key: String,
        /// Parser diagnostic.
        detail: String,
    },

    /// A marker that requires a payload arrived empty.
    #[error("{marker} marker was empty on {config_key}")]
    EmptyMarker {
        /// Which marker was empty (e.g. "Headers", "Body", "Param").
        marker: &'static str,
        /// Correlation key (or parameter position) it was attached to.
        config_key: String,
    },

    /// A header line in a Headers marker had no `name: value` separator.
    #[error("malformed header {header:?} on {config_key}")]
    MalformedHeader {
        /// The raw header line.
        header: String,
        /// Correlation key of the offending method or type.
        config_key: String,
    },

    /// A body parameter coexists with form parameters.
    #[error("body parameters cannot be used with form parameters on {config_key}{warnings}")]
    BodyWithFormParams {
        /// Correlation key of the offending method.
        config_key: String,
        /// Accumulated diagnostic warnings, pre-formatted.
        warnings: String,
    },

    /// More than one parameter was left for implicit body binding.
    #[error("method {config_key} has too many body parameters{warnings}")]
    TooManyBodyParams {
        /// Correlation key of the offending method.
        config_key: String,
        /// Accumulated diagnostic warnings, pre-formatted.
        warnings: String,
    },

    /// A query-map marker was present on more than one parameter.
    #[error("query map marker was present on multiple parameters of {config_key}")]
    DuplicateQueryMap {
        /// Correlation key of the offending method.
        config_key: String,
    },

    /// A header-map marker was present on more than one parameter.
    #[error("header map marker was present on multiple parameters of {config_key}")]
    DuplicateHeaderMap {
        /// Correlation key of the offending method.
        config_key: String,
    },

    /// A parameter bound to a role that requires a map is not map-shaped.
    #[error("{role} parameter of {config_key} must be a map, found {ty}")]
    NotAMap {
        /// The role the parameter was bound to ("HeaderMap" or "QueryMap").
        role: &'static str,
        /// Correlation key of the offending method.
        config_key: String,
        /// Rendered parameter type.
        ty: String,
    },

    /// A map-shaped parameter's key type is not textual.
    #[error("{role} key of {config_key} must be a String, found {key_ty}")]
    MapKeyNotTextual {
        /// The role the parameter was bound to ("HeaderMap" or "QueryMap").
        role: &'static str,
        /// Correlation key of the offending method.
        config_key: String,
        /// Rendered key type.
        key_ty: String,
    },

    /// A parameter index was bound to more than one role.
    #[error("parameter {index} of {config_key} is bound to more than one role")]
    ConflictingRoles {
        /// Zero-based parameter position.
        index: usize,
        /// Correlation key of the offending method.
        config_key: String,
    },
}

/// Template construction and resolution failures.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// A literal chunk was constructed from an empty string.
    #[error("a literal chunk requires a value")]
    EmptyLiteral,

    /// An expression had no variable names, or a name with invalid characters.
    #[error("malformed template expression: {expression:?}")]
    MalformedExpression {
        /// The offending expression text, braces included.
        expression: String,
    },

    /// A required expression had no matching binding at resolution time.
    #[error("no binding for template variable {name:?}")]
    Unresolved {
        /// The unbound variable name.
        name: String,
    },

    /// The resolved template did not form a usable request.
    #[error("resolved request is incomplete: {reason}")]
    IncompleteRequest {
        /// What was missing (method, target, ...).
        reason: &'static str,
    },
}

/// Request body encoding failures.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The argument shape is not supported by the active encoder.
    #[error("{value_kind} is not a type supported by this encoder")]
    Unsupported {
        /// Short description of the rejected value shape.
        value_kind: &'static str,
    },

    /// Serialization of the body value failed.
    #[error("failed to serialize request body")]
    Serialize {
        /// The underlying serializer error.
        #[source]
        source: serde_json::Error,
    },
}

/// Response body decoding failures.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The declared return shape is not supported by the active decoder.
    #[error("type {ty} is not supported by this decoder")]
    Unsupported {
        /// Rendered declared type.
        ty: String,
    },

    /// Deserialization of the response body failed.
    #[error("failed to deserialize response body")]
    Deserialize {
        /// The underlying deserializer error.
        #[source]
        source: serde_json::Error,
    },

    /// Reading the response body failed.
    #[error("failed to read response body")]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// What went wrong inside the transport collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum TransportErrorKind {
    /// The connection could not be established.
    Connect,
    /// The request or response timed out.
    Timeout,
    /// An I/O failure while the request was in flight.
    Io,
    /// The request could not be expressed on the wire (bad URL, header, ...).
    Protocol,
}

/// A failure raised by the transport collaborator.
///
/// The `retryable` flag is the transport's classification; the retry policy
/// decides whether a retryable failure actually gets another attempt.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error executing request: {message}")]
pub struct TransportError {
    /// Broad failure classification.
    pub kind: TransportErrorKind,
    /// Human-readable detail.
    pub message: String,
    /// Whether the retry policy should be consulted.
    pub retryable: bool,
    /// The underlying failure, if any.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    /// Creates a transport error without an underlying source.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            source: None,
        }
    }

    /// Attaches the underlying failure.
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

/// A non-2xx response, carrying status, headers, and body.
#[derive(Debug, thiserror::Error)]
#[error("HTTP {status} returned by {config_key}")]
pub struct HttpStatusError {
    /// The HTTP status code.
    pub status: u16,
    /// Correlation key of the method that made the request.
    pub config_key: String,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Response body, if it could be read.
    pub body: Option<bytes::Bytes>,
}

/// A call that could not be routed to a compiled executor.
///
/// Unreachable for a correctly built client; raised values indicate a
/// programming-contract violation at the call site.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No executor is bound for the requested method.
    #[error("no compiled executor for method {method:?}")]
    Unknown {
        /// The method name or correlation key used for lookup.
        method: String,
    },

    /// A bare method name matched more than one overload.
    #[error("method name {method:?} is ambiguous: {candidates:?}")]
    Ambiguous {
        /// The ambiguous method name.
        method: String,
        /// Correlation keys of the matching overloads.
        candidates: Vec<String>,
    },

    /// The argument list does not match the compiled parameter count.
    #[error("method {config_key} expects {expected} arguments, got {got}")]
    Arity {
        /// Correlation key of the invoked method.
        config_key: String,
        /// Compiled parameter count.
        expected: usize,
        /// Number of arguments supplied.
        got: usize,
    },
}

/// How a terminal retry failure is surfaced to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExceptionPropagationPolicy {
    /// Propagate the transport error as-is.
    #[default]
    None,
    /// Unwrap the transport error to its underlying cause when one exists.
    UnwrapAndThrowCause,
}

impl ExceptionPropagationPolicy {
    /// Applies this policy to a terminal transport failure.
    pub(crate) fn apply(self, err: TransportError) -> Error {
        match self {
            Self::None => Error::Transport(err),
            Self::UnwrapAndThrowCause => {
                let TransportError {
                    kind,
                    message,
                    retryable,
                    source,
                } = err;
                let source = match source {
                    Some(source) => match source.downcast::<HttpStatusError>() {
                        Ok(status) => return Error::Status(*status),
                        Err(source) => Some(source),
                    },
                    None => None,
                };
                Error::Transport(TransportError {
                    kind,
                    message,
                    retryable,
                    source,
                })
            }
        }
    }
}
