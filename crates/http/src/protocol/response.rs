//! HTTP response handling.
//!
//! A [`Response`] is a [`ResponseHead`] (status and headers) plus a [`ResponseSink`] that moves
//! body bytes towards the transport. Sinks can be stacked: a filter wraps the current sink in its
//! own via [`Response::wrap_sink`].
//!
//! Every sink call receives the live head. A wrapping sink therefore sees the content type as it
//! is at the moment of the call, not as it was when the wrapper was installed.

use std::fmt;
use std::io;
use std::io::Write;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};

/// Status line and headers of a response under construction.
#[derive(Debug, Default)]
pub struct ResponseHead {
    status: StatusCode,
    headers: HeaderMap,
}

impl ResponseHead {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the current `Content-Type`, if one has been set.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(http::header::CONTENT_TYPE).and_then(|value| value.to_str().ok())
    }

    pub fn set_content_type(&mut self, value: HeaderValue) {
        self.headers.insert(http::header::CONTENT_TYPE, value);
    }

    /// Appends a header, keeping any value already present under the same name.
    pub fn add_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    /// Sets a header, replacing any value already present under the same name.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(http::header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
    }

    pub fn set_content_length(&mut self, len: u64) {
        self.headers.insert(http::header::CONTENT_LENGTH, HeaderValue::from(len));
    }
}

/// Destination of response body bytes.
pub trait ResponseSink: Send {
    /// Writes some bytes, returning how many were accepted.
    fn write(&mut self, head: &mut ResponseHead, buf: &[u8]) -> io::Result<usize>;

    fn flush(&mut self, head: &mut ResponseHead) -> io::Result<()>;

    /// Finishes the body. Nothing may be written afterwards.
    fn close(&mut self, head: &mut ResponseHead) -> io::Result<()>;

    /// Declares the body length. Sinks that change the body bytes may hold this back.
    fn set_content_length(&mut self, head: &mut ResponseHead, len: u64) {
        head.set_content_length(len);
    }

    fn write_all(&mut self, head: &mut ResponseHead, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(head, buf) {
                Ok(0) => return Err(io::Error::new(io::ErrorKind::WriteZero, "failed to write whole buffer")),
                Ok(n) => buf = &buf[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<S: ResponseSink + ?Sized> ResponseSink for Box<S> {
    fn write(&mut self, head: &mut ResponseHead, buf: &[u8]) -> io::Result<usize> {
        (**self).write(head, buf)
    }

    fn flush(&mut self, head: &mut ResponseHead) -> io::Result<()> {
        (**self).flush(head)
    }

    fn close(&mut self, head: &mut ResponseHead) -> io::Result<()> {
        (**self).close(head)
    }

    fn set_content_length(&mut self, head: &mut ResponseHead, len: u64) {
        (**self).set_content_length(head, len);
    }

    fn write_all(&mut self, head: &mut ResponseHead, buf: &[u8]) -> io::Result<()> {
        (**self).write_all(head, buf)
    }
}

/// The raw byte sink supplied by the transport.
///
/// Closing only flushes; shutting the connection down is up to the transport.
pub struct TransportSink<W> {
    inner: W,
}

impl<W: Write + Send> TransportSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W> fmt::Debug for TransportSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSink").finish_non_exhaustive()
    }
}

impl<W: Write + Send> ResponseSink for TransportSink<W> {
    fn write(&mut self, _head: &mut ResponseHead, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self, _head: &mut ResponseHead) -> io::Result<()> {
        self.inner.flush()
    }

    fn close(&mut self, _head: &mut ResponseHead) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A response being produced by the filter chain.
pub struct Response {
    head: ResponseHead,
    sink: Box<dyn ResponseSink>,
}

impl Response {
    /// Creates a response writing straight to `transport`.
    pub fn new<W>(transport: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self::with_sink(Box::new(TransportSink::new(transport)))
    }

    pub fn with_sink(sink: Box<dyn ResponseSink>) -> Self {
        Self { head: ResponseHead::new(), sink }
    }

    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    pub fn head_mut(&mut self) -> &mut ResponseHead {
        &mut self.head
    }

    pub fn content_type(&self) -> Option<&str> {
        self.head.content_type()
    }

    pub fn set_content_type(&mut self, value: HeaderValue) {
        self.head.set_content_type(value);
    }

    /// Declares the body length through the sink chain.
    pub fn set_content_length(&mut self, len: u64) {
        self.sink.set_content_length(&mut self.head, len);
    }

    /// Replaces the current sink with `f(current)`.
    pub fn wrap_sink<F>(&mut self, f: F)
    where
        F: FnOnce(Box<dyn ResponseSink>) -> Box<dyn ResponseSink>,
    {
        let current = std::mem::replace(&mut self.sink, Box::new(TransportSink::new(io::sink())));
        self.sink = f(current);
    }

    /// Returns a writer for the body.
    pub fn output_stream(&mut self) -> OutputStream<'_> {
        OutputStream { head: &mut self.head, sink: self.sink.as_mut() }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush(&mut self.head)
    }

    pub fn close(&mut self) -> io::Result<()> {
        self.sink.close(&mut self.head)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response").field("head", &self.head).finish_non_exhaustive()
    }
}

/// [`Write`] access to a response body.
pub struct OutputStream<'a> {
    head: &'a mut ResponseHead,
    sink: &'a mut dyn ResponseSink,
}

impl OutputStream<'_> {
    pub fn head(&self) -> &ResponseHead {
        self.head
    }

    pub fn close(&mut self) -> io::Result<()> {
        self.sink.close(self.head)
    }
}

impl fmt::Debug for OutputStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputStream").field("head", &self.head).finish_non_exhaustive()
    }
}

impl Write for OutputStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.write(self.head, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush(self.head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Uppercase(Box<dyn ResponseSink>);

    impl ResponseSink for Uppercase {
        fn write(&mut self, head: &mut ResponseHead, buf: &[u8]) -> io::Result<usize> {
            self.0.write_all(head, &buf.to_ascii_uppercase())?;
            Ok(buf.len())
        }

        fn flush(&mut self, head: &mut ResponseHead) -> io::Result<()> {
            self.0.flush(head)
        }

        fn close(&mut self, head: &mut ResponseHead) -> io::Result<()> {
            self.0.close(head)
        }

        fn set_content_length(&mut self, _head: &mut ResponseHead, _len: u64) {}
    }

    #[test]
    fn writes_reach_the_transport() {
        let transport = SharedBuf::default();
        let mut resp = Response::new(transport.clone());

        resp.output_stream().write_all(b"hello").unwrap();
        resp.close().unwrap();

        assert_eq!(*transport.0.lock().unwrap(), b"hello");
    }

    #[test]
    fn wrapped_sink_sees_every_write() {
        let transport = SharedBuf::default();
        let mut resp = Response::new(transport.clone());
        resp.wrap_sink(|inner| Box::new(Uppercase(inner)));

        write!(resp.output_stream(), "tile {}", 7).unwrap();
        resp.set_content_length(6);

        assert_eq!(*transport.0.lock().unwrap(), b"TILE 7");
        assert_eq!(resp.head().content_length(), None);
    }

    #[test]
    fn content_length_goes_to_head_by_default() {
        let mut resp = Response::new(io::sink());
        resp.set_content_length(128);
        assert_eq!(resp.head().content_length(), Some(128));
    }

    #[test]
    fn head_headers() {
        let mut head = ResponseHead::new();
        assert_eq!(head.content_type(), None);

        head.set_content_type(HeaderValue::from_static("image/png"));
        head.add_header(http::header::VARY, HeaderValue::from_static("Accept"));
        head.add_header(http::header::VARY, HeaderValue::from_static("Accept-Encoding"));

        assert_eq!(head.content_type(), Some("image/png"));
        assert_eq!(head.headers().get_all(http::header::VARY).iter().count(), 2);
        assert_eq!(head.status(), StatusCode::OK);
    }

    #[test]
    fn transport_errors_propagate() {
        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::BrokenPipe))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut resp = Response::new(Closed);
        let err = resp.output_stream().write_all(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
