use std::borrow::Cow;
use std::io;
use std::io::{Cursor, Read};

use bytes::Bytes;
use encoding_rs::Encoding;
use tracing::warn;

use crate::protocol::ParseError;
use crate::protocol::body::{InputStream, ReadListener};

/// A request payload drained into memory once, so it can be read any number of times.
///
/// The snapshot is taken eagerly when the body is built. The source stream is left exhausted, so
/// a request must be buffered at most once; [`crate::protocol::HttpRequest::buffer_body`] takes
/// care of that.
///
/// There is no size cap here. Callers bound the body size before deciding to buffer.
#[derive(Debug, Clone)]
pub struct BufferedBody {
    bytes: Bytes,
}

impl BufferedBody {
    /// Reads `reader` to its end and keeps the bytes.
    pub fn from_reader<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(Self { bytes: Bytes::from(buf) })
    }

    pub fn raw_bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decodes the body as text.
    ///
    /// `encoding` is a charset label such as `UTF-8` or `ISO-8859-1`. Without a label the body is
    /// read as UTF-8, replacing malformed sequences. An unknown label yields `None`.
    pub fn as_text(&self, encoding: Option<&str>) -> Option<Cow<'_, str>> {
        let Some(label) = encoding else {
            return Some(String::from_utf8_lossy(&self.bytes));
        };

        match Encoding::for_label(label.trim().as_bytes()) {
            Some(encoding) => {
                let (text, _) = encoding.decode_without_bom_handling(&self.bytes);
                Some(text)
            }
            None => {
                warn!("unable to decode request body - unsupported character set: {}", label);
                None
            }
        }
    }

    /// Returns a new stream positioned at the start of the body.
    pub fn replay(&self) -> BufferedRequestStream {
        BufferedRequestStream::new(self.bytes.clone())
    }
}

impl From<Bytes> for BufferedBody {
    fn from(bytes: Bytes) -> Self {
        Self { bytes }
    }
}

/// A stream over a [`BufferedBody`] snapshot.
#[derive(Debug)]
pub struct BufferedRequestStream {
    inner: Cursor<Bytes>,
}

impl BufferedRequestStream {
    fn new(bytes: Bytes) -> Self {
        Self { inner: Cursor::new(bytes) }
    }

    fn remaining(&self) -> usize {
        let len = self.inner.get_ref().len();
        let pos = usize::try_from(self.inner.position()).unwrap_or(len);
        len.saturating_sub(pos)
    }
}

impl Read for BufferedRequestStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl InputStream for BufferedRequestStream {
    fn is_finished(&self) -> bool {
        self.remaining() == 0
    }

    fn is_ready(&self) -> bool {
        self.remaining() > 0
    }

    /// Always fails: the whole body is already in memory, so a readiness callback would never
    /// have anything to wait for.
    fn set_read_listener(&mut self, _listener: Box<dyn ReadListener>) -> Result<(), ParseError> {
        Err(ParseError::unsupported("cannot use read listener with buffered request"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(mut stream: impl Read) -> Vec<u8> {
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn drains_the_source_once() {
        let mut source = &b"<GetMap/>"[..];
        let body = BufferedBody::from_reader(&mut source).unwrap();

        assert_eq!(body.raw_bytes().as_ref(), b"<GetMap/>");
        assert_eq!(body.len(), 9);
        assert!(source.is_empty());
    }

    #[test]
    fn every_replay_starts_from_the_beginning() {
        let payload: Vec<u8> = (0..=255).collect();
        let body = BufferedBody::from(Bytes::from(payload.clone()));

        let mut half_read = body.replay();
        let mut first = [0u8; 10];
        half_read.read_exact(&mut first).unwrap();

        assert_eq!(read_all(body.replay()), payload);
        assert!(body.as_text(None).is_some());
        assert_eq!(read_all(body.replay()), payload);
        assert_eq!(read_all(half_read), payload[10..]);
    }

    #[test]
    fn decodes_with_declared_charset() {
        let body = BufferedBody::from(Bytes::from_static(b"caf\xe9"));
        assert_eq!(body.as_text(Some("ISO-8859-1")).unwrap(), "café");
    }

    #[test]
    fn decodes_utf8_without_charset() {
        let body = BufferedBody::from(Bytes::from("{\"name\":\"café\"}"));
        assert_eq!(body.as_text(None).unwrap(), "{\"name\":\"café\"}");
    }

    #[test]
    fn unknown_charset_is_absent() {
        let body = BufferedBody::from(Bytes::from_static(b"abc"));
        assert!(body.as_text(Some("x-no-such-charset")).is_none());
    }

    #[test]
    fn replay_stream_readiness() {
        let body = BufferedBody::from(Bytes::from_static(b"ab"));
        let mut stream = body.replay();
        assert!(stream.is_ready());
        assert!(!stream.is_finished());

        read_all(&mut stream);
        assert!(!stream.is_ready());
        assert!(stream.is_finished());

        let empty = BufferedBody::from(Bytes::new()).replay();
        assert!(empty.is_finished());
    }

    #[test]
    fn read_listener_is_rejected() {
        struct Never;
        impl ReadListener for Never {
            fn on_data_available(&mut self) -> io::Result<()> {
                Ok(())
            }

            fn on_all_data_read(&mut self) -> io::Result<()> {
                Ok(())
            }

            fn on_error(&mut self, _error: &io::Error) {}
        }

        let mut stream = BufferedBody::from(Bytes::from_static(b"x")).replay();
        let err = stream.set_read_listener(Box::new(Never)).unwrap_err();
        assert!(err.is_unsupported());
    }
}
