//! Gzip compression of response bodies.
//!
//! The main components are:
//! - [`CompressibleTypes`]: which content types are worth compressing
//! - [`GzipWriter`]: a response sink that gzips everything written through it
//! - [`DeferredCompressionWriter`]: a sink that picks gzip or passthrough at the first write
//! - [`CompressionDecorator`]: the filter installing the deferred writer on responses
//!
//! Compressed bytes are produced into an in-memory [`Writer`] and handed to the next sink after
//! every call, so nothing is held back longer than the gzip encoder itself holds it.

use bytes::{Bytes, BytesMut};
use std::io;

mod compressible;
mod deferred;
mod encoder;
mod gzip;

pub use compressible::CompressibleTypes;
pub use deferred::DeferredCompressionWriter;
pub use encoder::CompressionDecorator;
pub use encoder::CompressionHandler;
pub use gzip::GzipWriter;

pub(crate) struct Writer {
    buf: BytesMut,
}

impl Writer {
    pub(crate) fn new() -> Self {
        Self { buf: BytesMut::with_capacity(4096) }
    }

    pub(crate) fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
