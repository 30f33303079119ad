//! Pretext
//!
//! Declarative REST contract compiler and synchronous dispatch runtime.
//! An interface definition (verb, path template, headers, body, parameter
//! bindings) is compiled once into per-method request templates; at call
//! time the template is resolved against live arguments and executed
//! through a pluggable interceptor/retry/client pipeline.
//!
//! ## Features
//!
//! - **Compile once, call many**: descriptors and templates are immutable
//!   after construction and shared across threads
//! - **Registry-driven contract**: marker handlers are plain functions
//!   registered by kind, no reflection anywhere
//! - **Pluggable pipeline**: transport, retry policy, codecs, error
//!   decoding, interceptors, and dispatch construction are all trait seams
//! - **Lazy sequences**: a `Stream<T>` return shape decodes pull-based,
//!   one element at a time, off the open response
//!
//! ## Quick Start
//!
//! ```ignore
//! use pretext::contract::{InterfaceDefinition, MethodDefinition, MethodMarker, ParamDefinition, ParamMarker};
//! use pretext::types::TypeRef;
//! use pretext::{ArgValue, Pretext};
//!
//! let github = InterfaceDefinition::new("GitHub").method(
//!     MethodDefinition::new("contributors", TypeRef::generic("Vec", vec![TypeRef::new("Contributor")]))
//!         .marker(MethodMarker::request_line("GET /repos/{owner}/{repo}/contributors"))
//!         .param(ParamDefinition::new("owner", TypeRef::new("String")).marker(ParamMarker::param()))
//!         .param(ParamDefinition::new("repo", TypeRef::new("String")).marker(ParamMarker::param())),
//! );
//!
//! let client = Pretext::builder()
//!     .decoder(pretext::codec::JsonDecoder)
//!     .target(github, "https://api.github.com")?;
//!
//! let contributors = client.call(
//!     "contributors",
//!     &[ArgValue::from("octocat"), ArgValue::from("Hello-World")],
//! )?;
//! ```
//!
//! ## Module Structure
//!
//! - [`contract`] - interface definitions and the contract compiler
//! - [`template`] - the chunk-based templating engine
//! - [`dispatch`] - the compiled dispatch table and call pipeline
//! - [`codec`] - encoder/decoder seams, including lazy-sequence decoding
//! - [`client`] - the transport seam and the reqwest-backed default
//! - [`error`] - the call-time and compile-time error taxonomy

pub mod builder;
pub mod capability;
pub mod client;
pub mod codec;
pub mod contract;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod interceptor;
pub mod logger;
pub mod method;
pub mod request;
pub mod response;
pub mod retry;
pub mod target;
pub mod template;
pub mod types;
pub mod value;

// Re-export the main surface at the crate root for convenience
pub use builder::{config_key, Builder, Pretext};
pub use capability::Capability;
pub use client::{Client, ReqwestClient};
pub use contract::{Contract, DeclarativeContract, InterfaceDefinition};
pub use descriptor::MethodDescriptor;
pub use dispatch::{BoundClient, DispatchTable, InvocationHandler, InvocationHandlerFactory, MethodHandler};
pub use error::{
    ConfigurationError, DecodeError, DispatchError, EncodeError, Error, ExceptionPropagationPolicy,
    HttpStatusError, TemplateError, TransportError, TransportErrorKind,
};
pub use interceptor::{BearerAuthInterceptor, RequestInterceptor};
pub use logger::{Level, Logger};
pub use method::HttpMethod;
pub use request::{CollectionFormat, Options, Request, RequestTemplate};
pub use response::{Response, ResponseBody};
pub use retry::{RetryAttempt, Retryer};
pub use target::Target;
pub use value::{ArgValue, DecodedValue, ParamExpander};
