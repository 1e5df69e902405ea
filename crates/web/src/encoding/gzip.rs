use std::fmt;
use std::io;
use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use micro_filter_http::protocol::{ResponseHead, ResponseSink};
use tracing::trace;

use super::Writer;

/// A sink gzip-compressing everything written through it into `delegate`.
///
/// Compressed output is forwarded as soon as the encoder produces it. `flush` emits a sync flush,
/// so a client can decode everything written so far, and `close` writes the gzip trailer before
/// closing the delegate.
pub struct GzipWriter<S> {
    encoder: Option<GzEncoder<Writer>>,
    delegate: S,
}

impl<S: ResponseSink> GzipWriter<S> {
    pub fn new(delegate: S) -> Self {
        Self::with_level(delegate, Compression::default())
    }

    pub fn with_level(delegate: S, level: Compression) -> Self {
        Self { encoder: Some(GzEncoder::new(Writer::new(), level)), delegate }
    }

    pub fn get_ref(&self) -> &S {
        &self.delegate
    }

    fn encoder(&mut self) -> io::Result<&mut GzEncoder<Writer>> {
        self.encoder.as_mut().ok_or_else(|| io::Error::other("gzip stream already closed"))
    }

    fn forward(&mut self, head: &mut ResponseHead) -> io::Result<()> {
        let Some(encoder) = self.encoder.as_mut() else {
            return Ok(());
        };

        let bytes = encoder.get_mut().take();
        if bytes.is_empty() {
            return Ok(());
        }

        self.delegate.write_all(head, &bytes)
    }
}

impl<S: ResponseSink> ResponseSink for GzipWriter<S> {
    fn write(&mut self, head: &mut ResponseHead, buf: &[u8]) -> io::Result<usize> {
        self.encoder()?.write_all(buf).inspect_err(|e| trace!("error encoding gzip: {}", e))?;
        self.forward(head)?;
        Ok(buf.len())
    }

    fn flush(&mut self, head: &mut ResponseHead) -> io::Result<()> {
        if self.encoder.is_none() {
            return Ok(());
        }

        self.encoder()?.flush()?;
        self.forward(head)?;
        self.delegate.flush(head)
    }

    fn close(&mut self, head: &mut ResponseHead) -> io::Result<()> {
        let Some(encoder) = self.encoder.take() else {
            return Ok(());
        };

        let mut writer = encoder.finish()?;
        let bytes = writer.take();
        if !bytes.is_empty() {
            self.delegate.write_all(head, &bytes)?;
        }
        self.delegate.close(head)
    }

    /// The compressed length is unknown up front, so the declared length is dropped.
    fn set_content_length(&mut self, _head: &mut ResponseHead, _len: u64) {}
}

impl<S> fmt::Debug for GzipWriter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GzipWriter").field("closed", &self.encoder.is_none()).finish_non_exhaustive()
    }
}
