//! HTTP response model.
//!
//! The body is either buffered bytes or an open reader. Readers exist for
//! the lazy-sequence decode strategy, which keeps the transport resource
//! open past the initial decode call; everything else buffers.

use std::fmt;
use std::io::Read;

use bytes::Bytes;

use crate::error::DecodeError;

/// A response body.
pub enum ResponseBody {
    /// No body.
    Empty,
    /// A fully buffered body.
    Bytes(Bytes),
    /// An open, unconsumed body stream.
    Reader(Box<dyn Read + Send>),
}

impl ResponseBody {
    /// Reads the body to completion.
    ///
    /// ## Errors
    ///
    /// Returns [`DecodeError::Io`] when a reader body fails mid-read.
    pub fn into_bytes(self) -> Result<Bytes, DecodeError> {
        match self {
            Self::Empty => Ok(Bytes::new()),
            Self::Bytes(bytes) => Ok(bytes),
            Self::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader
                    .read_to_end(&mut buf)
                    .map_err(|source| DecodeError::Io { source })?;
                Ok(Bytes::from(buf))
            }
        }
    }

    /// Converts into a reader over the body.
    pub fn into_reader(self) -> Box<dyn Read + Send> {
        match self {
            Self::Empty => Box::new(std::io::empty()),
            Self::Bytes(bytes) => Box::new(std::io::Cursor::new(bytes)),
            Self::Reader(reader) => reader,
        }
    }

    /// Whether the body is known to be absent.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Bytes(bytes) => bytes.is_empty(),
            Self::Reader(_) => false,
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

/// An HTTP response as seen by the decode pipeline.
#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: ResponseBody,
}

impl Response {
    /// Starts building a response.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::new()
    }

    /// The status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// All header pairs.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of the named header, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Takes the body, leaving an empty one behind.
    pub fn take_body(&mut self) -> ResponseBody {
        std::mem::replace(&mut self.body, ResponseBody::Empty)
    }

    /// Borrows the body.
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Buffers a reader body into bytes, leaving everything else alone.
    ///
    /// ## Errors
    ///
    /// Returns [`DecodeError::Io`] when the reader fails.
    pub fn buffered(mut self) -> Result<Response, DecodeError> {
        let body = self.take_body();
        self.body = match body.into_bytes()? {
            bytes if bytes.is_empty() => ResponseBody::Empty,
            bytes => ResponseBody::Bytes(bytes),
        };
        Ok(self)
    }
}

/// Builder for [`Response`].
#[derive(Debug)]
pub struct ResponseBuilder {
    status: u16,
    headers: Vec<(String, String)>,
    body: ResponseBody,
}

impl ResponseBuilder {
    fn new() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: ResponseBody::Empty,
        }
    }

    /// Sets the status code.
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Appends a header pair.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets a buffered body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = ResponseBody::Bytes(body.into());
        self
    }

    /// Sets a streaming body.
    pub fn body_reader(mut self, reader: impl Read + Send + 'static) -> Self {
        self.body = ResponseBody::Reader(Box::new(reader));
        self
    }

    /// Finishes the response.
    pub fn build(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}
