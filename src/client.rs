//! The transport seam and its reqwest-backed default.
//!
//! The dispatch runtime only sees the [`Client`] trait; what is on the other
//! side (a real HTTP stack, a scripted test double, a recording proxy) is
//! the caller's business. [`ReqwestClient`] is the default, built on
//! `reqwest`'s blocking client to match the synchronous call contract.

use std::io::Read;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{TransportError, TransportErrorKind};
use crate::request::{Options, Request};
use crate::response::Response;

/// Executes a resolved request.
pub trait Client: Send + Sync {
    /// Sends `request` and produces the raw response.
    ///
    /// Implementations classify their failures via
    /// [`TransportError::retryable`]; the retry policy decides what to do
    /// with retryable ones.
    ///
    /// ## Errors
    ///
    /// Returns [`TransportError`] for any failure to obtain a response.
    fn execute(&self, request: &Request, options: &Options) -> Result<Response, TransportError>;
}

/// Blocking HTTP client over `reqwest`.
///
/// The response body is exposed as an open reader, so lazy-sequence
/// decoding can stream it; buffering happens downstream when the decode
/// path wants bytes.
#[derive(Debug)]
pub struct ReqwestClient {
    inner: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client with default options.
    ///
    /// ## Errors
    ///
    /// Returns [`TransportError`] when the underlying client cannot be
    /// constructed.
    pub fn new() -> Result<Self, TransportError> {
        Self::from_options(&Options::default())
    }

    /// Creates a client honoring the connection-level parts of `options`
    /// (connect timeout, redirect policy). Per-request timeouts are applied
    /// on each call.
    ///
    /// ## Errors
    ///
    /// Returns [`TransportError`] when the underlying client cannot be
    /// constructed.
    pub fn from_options(options: &Options) -> Result<Self, TransportError> {
        let redirects = if options.follow_redirects() {
            reqwest::redirect::Policy::default()
        } else {
            reqwest::redirect::Policy::none()
        };
        let inner = reqwest::blocking::Client::builder()
            .connect_timeout(options.connect_timeout())
            .redirect(redirects)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|err| {
                TransportError::new(
                    TransportErrorKind::Protocol,
                    "could not construct HTTP client",
                    false,
                )
                .with_source(err)
            })?;
        Ok(Self { inner })
    }
}

impl Client for ReqwestClient {
    fn execute(&self, request: &Request, options: &Options) -> Result<Response, TransportError> {
        let url = url::Url::parse(request.url()).map_err(|err| {
            TransportError::new(
                TransportErrorKind::Protocol,
                format!("invalid URL {:?}", request.url()),
                false,
            )
            .with_source(err)
        })?;

        let mut headers = HeaderMap::new();
        for (name, value) in request.headers() {
            let name = HeaderName::try_from(name.as_str()).map_err(|err| {
                TransportError::new(
                    TransportErrorKind::Protocol,
                    format!("invalid header name {name:?}"),
                    false,
                )
                .with_source(err)
            })?;
            let value = HeaderValue::try_from(value.as_str()).map_err(|err| {
                TransportError::new(
                    TransportErrorKind::Protocol,
                    format!("invalid header value for {name:?}"),
                    false,
                )
                .with_source(err)
            })?;
            headers.append(name, value);
        }

        let mut builder = self
            .inner
            .request(request.method().to_reqwest(), url)
            .headers(headers)
            .timeout(options.read_timeout());
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send().map_err(classify)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect::<Vec<_>>();

        let mut out = Response::builder().status(status);
        for (name, value) in headers {
            out = out.header(name, value);
        }
        Ok(out.body_reader(BlockingBody { inner: response }).build())
    }
}

/// Classifies a reqwest failure for the retry policy: connection problems
/// and timeouts are retryable, everything else is terminal.
fn classify(err: reqwest::Error) -> TransportError {
    let (kind, retryable) = if err.is_timeout() {
        (TransportErrorKind::Timeout, true)
    } else if err.is_connect() {
        (TransportErrorKind::Connect, true)
    } else if err.is_request() || err.is_body() {
        (TransportErrorKind::Io, true)
    } else {
        (TransportErrorKind::Protocol, false)
    };
    TransportError::new(kind, err.to_string(), retryable).with_source(err)
}

/// Adapter exposing the blocking response as a body reader.
struct BlockingBody {
    inner: reqwest::blocking::Response,
}

impl Read for BlockingBody {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}
