//! Lazy-sequence decoding.
//!
//! When a method declares `Stream<T>`, decoding must not buffer the body:
//! [`StreamDecoder`] wraps the configured decoder and, for stream shapes
//! only, hands the open body to an [`IteratorDecoder`] that pulls one
//! element at a time. The resulting [`LazySequence`] is forward-only and
//! single-consumer, and it owns the transport resource until it is closed,
//! exhausted, or dropped - which is why `close_after_decode` must be off
//! when this strategy is active.

use std::fmt;
use std::io::{BufRead, BufReader, Lines, Read};
use std::sync::{Arc, OnceLock};

use crate::codec::Decoder;
use crate::error::DecodeError;
use crate::response::Response;
use crate::types::TypeRef;
use crate::value::DecodedValue;

type RecordIter = Box<dyn Iterator<Item = Result<DecodedValue, DecodeError>> + Send>;

/// A pull-based, forward-only, single-consumer sequence of decoded
/// elements.
///
/// Dropping the sequence (or calling [`LazySequence::close`]) releases the
/// underlying transport resource; a consumer that stops early must do one
/// or the other.
pub struct LazySequence {
    iter: RecordIter,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl LazySequence {
    pub(crate) fn new(iter: RecordIter, on_close: Option<Box<dyn FnOnce() + Send>>) -> Self {
        Self { iter, on_close }
    }

    /// A sequence with no elements and no resource.
    pub fn empty() -> Self {
        Self {
            iter: Box::new(std::iter::empty()),
            on_close: None,
        }
    }

    /// Releases the underlying resource.
    ///
    /// Equivalent to dropping the sequence; exists so early abandonment
    /// reads as intent at the call site.
    pub fn close(self) {}
}

impl Iterator for LazySequence {
    type Item = Result<DecodedValue, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

impl Drop for LazySequence {
    fn drop(&mut self) {
        if let Some(hook) = self.on_close.take() {
            hook();
        }
    }
}

impl fmt::Debug for LazySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LazySequence(..)")
    }
}

/// Decodes a response body into an iterator of elements.
pub trait IteratorDecoder: Send + Sync {
    /// Produces the element iterator for `response`.
    ///
    /// ## Errors
    ///
    /// Returns [`DecodeError`] eagerly for malformed framing; per-element
    /// failures surface from the iterator itself.
    fn decode_iterator(
        &self,
        response: Response,
        element: &TypeRef,
    ) -> Result<RecordIter, DecodeError>;
}

/// Line-framed element decoding: each body line is handed to the delegate
/// decoder as one element of the declared type.
pub struct LineIteratorDecoder {
    delegate: Arc<dyn Decoder>,
}

impl LineIteratorDecoder {
    /// Creates a line-framed iterator decoder over `delegate`.
    pub fn new(delegate: Arc<dyn Decoder>) -> Self {
        Self { delegate }
    }
}

impl IteratorDecoder for LineIteratorDecoder {
    fn decode_iterator(
        &self,
        mut response: Response,
        element: &TypeRef,
    ) -> Result<RecordIter, DecodeError> {
        let status = response.status();
        let lines = BufReader::new(response.take_body().into_reader()).lines();
        Ok(Box::new(LineIterator {
            lines,
            delegate: self.delegate.clone(),
            element: element.clone(),
            status,
        }))
    }
}

struct LineIterator {
    lines: Lines<BufReader<Box<dyn Read + Send>>>,
    delegate: Arc<dyn Decoder>,
    element: TypeRef,
    status: u16,
}

impl Iterator for LineIterator {
    type Item = Result<DecodedValue, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Ok(line) => {
                    if line.is_empty() {
                        continue;
                    }
                    let response = Response::builder().status(self.status).body(line).build();
                    return Some(self.delegate.decode(response, &self.element));
                }
                Err(source) => return Some(Err(DecodeError::Io { source })),
            }
        }
    }
}

/// Decode strategy for lazy sequences.
///
/// Non-stream shapes delegate unchanged. For `Stream<T>`, the element
/// iterator decoder is built once on first use (single-checked) and the
/// body is wrapped into a [`LazySequence`] of `T`.
pub struct StreamDecoder {
    delegate: Arc<dyn Decoder>,
    iterator_decoder: OnceLock<Arc<dyn IteratorDecoder>>,
}

impl StreamDecoder {
    /// Wraps `delegate`, using line-framed element decoding.
    pub fn new(delegate: Arc<dyn Decoder>) -> Self {
        Self {
            delegate,
            iterator_decoder: OnceLock::new(),
        }
    }

    /// Wraps `delegate` with an explicit element-iterator decoder.
    pub fn with_iterator_decoder(
        delegate: Arc<dyn Decoder>,
        iterator_decoder: Arc<dyn IteratorDecoder>,
    ) -> Self {
        let slot = OnceLock::new();
        let _ = slot.set(iterator_decoder);
        Self {
            delegate,
            iterator_decoder: slot,
        }
    }

    fn iterator_decoder(&self) -> &Arc<dyn IteratorDecoder> {
        self.iterator_decoder
            .get_or_init(|| Arc::new(LineIteratorDecoder::new(self.delegate.clone())))
    }
}

impl Decoder for StreamDecoder {
    fn decode(&self, response: Response, ty: &TypeRef) -> Result<DecodedValue, DecodeError> {
        let Some(element) = ty.stream_element() else {
            return self.delegate.decode(response, ty);
        };
        let iter = self.iterator_decoder().decode_iterator(response, element)?;
        // the iterator owns the body reader, so dropping the sequence
        // releases the transport resource; no separate close hook needed
        Ok(DecodedValue::Stream(LazySequence::new(iter, None)))
    }
}
