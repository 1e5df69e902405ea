use std::fmt;
use std::io;
use std::sync::Arc;

use http::HeaderValue;
use micro_filter_http::protocol::{ResponseHead, ResponseSink};
use tracing::debug;

use super::{CompressibleTypes, GzipWriter};

enum StreamState<S> {
    Unresolved(S),
    PassThrough(S),
    Gzip(GzipWriter<S>),
}

/// A sink choosing between gzip and passthrough at the first write.
///
/// The choice is made from the content type the response carries at that moment, so handlers
/// may set it any time before emitting the first byte. Once made, the choice sticks for the rest
/// of the response even if the content type changes later.
///
/// A content length declared before the first write is held back: it is applied when the
/// response turns out to be passed through, and dropped when it gets compressed.
pub struct DeferredCompressionWriter<S = Box<dyn ResponseSink>> {
    state: Option<StreamState<S>>,
    compressible: Arc<CompressibleTypes>,
    content_length: Option<u64>,
}

impl<S: ResponseSink> DeferredCompressionWriter<S> {
    pub fn new(inner: S, compressible: Arc<CompressibleTypes>) -> Self {
        Self { state: Some(StreamState::Unresolved(inner)), compressible, content_length: None }
    }

    /// Creates a writer that already knows the expected body length.
    pub fn with_content_length(inner: S, compressible: Arc<CompressibleTypes>, content_length: u64) -> Self {
        Self { content_length: Some(content_length), ..Self::new(inner, compressible) }
    }

    /// Returns `Some(true)` once gzip was chosen, `Some(false)` for passthrough.
    pub fn is_compressing(&self) -> Option<bool> {
        match self.state.as_ref()? {
            StreamState::Unresolved(_) => None,
            StreamState::PassThrough(_) => Some(false),
            StreamState::Gzip(_) => Some(true),
        }
    }

    fn resolve(&mut self, head: &mut ResponseHead) -> io::Result<&mut StreamState<S>> {
        let state = self.state.take().ok_or_else(|| io::Error::other("response stream is poisoned"))?;

        let resolved = match state {
            StreamState::Unresolved(inner) => {
                if self.compressible.is_compressible(head.content_type()) {
                    debug!(content_type = head.content_type(), "compressing response with gzip");
                    head.add_header(http::header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
                    StreamState::Gzip(GzipWriter::new(inner))
                } else {
                    debug!(content_type = head.content_type(), "response is not compressible, passing through");
                    if let Some(len) = self.content_length {
                        head.set_content_length(len);
                    }
                    StreamState::PassThrough(inner)
                }
            }
            resolved => resolved,
        };

        Ok(self.state.insert(resolved))
    }

    /// The sink bytes currently go to, or `None` before the first write.
    fn dirty(&mut self) -> Option<&mut dyn ResponseSink> {
        match self.state.as_mut()? {
            StreamState::Unresolved(_) => None,
            StreamState::PassThrough(inner) => Some(inner as &mut dyn ResponseSink),
            StreamState::Gzip(gzip) => Some(gzip as &mut dyn ResponseSink),
        }
    }
}

impl<S: ResponseSink> ResponseSink for DeferredCompressionWriter<S> {
    fn write(&mut self, head: &mut ResponseHead, buf: &[u8]) -> io::Result<usize> {
        match self.resolve(head)? {
            StreamState::Gzip(gzip) => gzip.write(head, buf),
            StreamState::PassThrough(inner) | StreamState::Unresolved(inner) => inner.write(head, buf),
        }
    }

    fn flush(&mut self, head: &mut ResponseHead) -> io::Result<()> {
        match self.dirty() {
            Some(sink) => sink.flush(head),
            None => Ok(()),
        }
    }

    fn close(&mut self, head: &mut ResponseHead) -> io::Result<()> {
        match self.dirty() {
            Some(sink) => sink.close(head),
            None => Ok(()),
        }
    }

    fn set_content_length(&mut self, head: &mut ResponseHead, len: u64) {
        match self.state.as_mut() {
            Some(StreamState::PassThrough(inner)) => inner.set_content_length(head, len),
            Some(StreamState::Gzip(_)) => {}
            Some(StreamState::Unresolved(_)) | None => self.content_length = Some(len),
        }
    }
}

impl<S> fmt::Debug for DeferredCompressionWriter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            Some(StreamState::Unresolved(_)) => "unresolved",
            Some(StreamState::PassThrough(_)) => "passthrough",
            Some(StreamState::Gzip(_)) => "gzip",
            None => "poisoned",
        };

        f.debug_struct("DeferredCompressionWriter")
            .field("state", &state)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}
