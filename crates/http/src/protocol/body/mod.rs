//! Request body streams.
//!
//! The filter layer reads inbound payloads through the [`InputStream`] trait, which is a blocking
//! [`Read`] plus the readiness queries a transport exposes:
//!
//! - [`ReaderStream`]: adapts whatever reader the transport hands over
//! - [`BufferedRequestStream`]: an independently positioned replay over a [`BufferedBody`]
//!
//! A request body starts out as a transport stream. Once a filter needs to inspect it, the body
//! is drained into a [`BufferedBody`] and every later reader gets a fresh replay instead.

mod buffered;

pub use buffered::BufferedBody;
pub use buffered::BufferedRequestStream;

use std::fmt;
use std::io;
use std::io::Read;

use crate::protocol::ParseError;

/// Callbacks fired when request data becomes readable.
pub trait ReadListener: Send {
    /// Some data can be read without blocking.
    fn on_data_available(&mut self) -> io::Result<()>;

    /// Every byte of the body has been read.
    fn on_all_data_read(&mut self) -> io::Result<()>;

    /// A callback above failed.
    fn on_error(&mut self, error: &io::Error);
}

/// A readable request payload.
pub trait InputStream: Read + Send {
    /// Returns true once the stream has been read to its end.
    fn is_finished(&self) -> bool;

    /// Returns true if a read would return data without blocking.
    fn is_ready(&self) -> bool;

    /// Installs a listener notified when data can be read.
    fn set_read_listener(&mut self, listener: Box<dyn ReadListener>) -> Result<(), ParseError>;
}

impl<T: InputStream + ?Sized> InputStream for &mut T {
    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn set_read_listener(&mut self, listener: Box<dyn ReadListener>) -> Result<(), ParseError> {
        (**self).set_read_listener(listener)
    }
}

impl<T: InputStream + ?Sized> InputStream for Box<T> {
    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn set_read_listener(&mut self, listener: Box<dyn ReadListener>) -> Result<(), ParseError> {
        (**self).set_read_listener(listener)
    }
}

/// Adapts a blocking transport reader into an [`InputStream`].
///
/// A blocking reader never has to wait for readiness, so a listener installed here is told about
/// available data right away.
pub struct ReaderStream<R> {
    inner: R,
    finished: bool,
}

impl<R: Read + Send> ReaderStream<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, finished: false }
    }
}

impl<R> fmt::Debug for ReaderStream<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderStream").field("finished", &self.finished).finish_non_exhaustive()
    }
}

impl<R: Read + Send> Read for ReaderStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.finished {
            return Ok(0);
        }

        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.finished = true;
        }
        Ok(n)
    }
}

impl<R: Read + Send> InputStream for ReaderStream<R> {
    fn is_finished(&self) -> bool {
        self.finished
    }

    fn is_ready(&self) -> bool {
        !self.finished
    }

    fn set_read_listener(&mut self, mut listener: Box<dyn ReadListener>) -> Result<(), ParseError> {
        let result = if self.finished { listener.on_all_data_read() } else { listener.on_data_available() };

        result.map_err(|e| {
            listener.on_error(&e);
            ParseError::io(e)
        })
    }
}
