use std::sync::Arc;

use async_trait::async_trait;
use micro_filter_http::protocol::{HttpError, IncomingRequest, Response, ResponseSink, SendError};
use tracing::trace;

use super::{CompressibleTypes, DeferredCompressionWriter};
use crate::config::CompressionConfig;
use crate::decorator::Decorator;
use crate::{BoxError, FilterError, RequestHandler};

/// A decorator gzip-compressing responses of the wrapped handler.
#[derive(Debug, Clone)]
pub struct CompressionDecorator {
    compressible: Arc<CompressibleTypes>,
}

impl CompressionDecorator {
    pub fn new(compressible: CompressibleTypes) -> Self {
        Self { compressible: Arc::new(compressible) }
    }

    pub fn from_config(config: &CompressionConfig) -> Result<Self, FilterError> {
        Ok(Self::new(CompressibleTypes::from_config(config)?))
    }
}

impl<H: RequestHandler> Decorator<H> for CompressionDecorator {
    type Out = CompressionHandler<H>;

    fn decorate(&self, raw: H) -> Self::Out {
        CompressionHandler { handler: raw, compressible: Arc::clone(&self.compressible) }
    }
}

/// A request handler whose response body is gzipped when the client accepts it and the content
/// type is compressible.
#[derive(Debug)]
pub struct CompressionHandler<H> {
    handler: H,
    compressible: Arc<CompressibleTypes>,
}

#[async_trait]
impl<H: RequestHandler> RequestHandler for CompressionHandler<H> {
    async fn invoke(&self, req: &mut IncomingRequest, resp: &mut Response) -> Result<(), BoxError> {
        let gzip = req
            .as_http()
            .and_then(|request| request.header().header_str(http::header::ACCEPT_ENCODING))
            .is_some_and(accepts_gzip);

        if !gzip {
            return self.handler.invoke(req, resp).await;
        }

        let compressible = Arc::clone(&self.compressible);
        resp.wrap_sink(move |inner| -> Box<dyn ResponseSink> {
            Box::new(DeferredCompressionWriter::new(inner, compressible))
        });

        self.handler.invoke(req, resp).await?;

        // the gzip trailer is only written on close
        resp.close().map_err(|e| {
            trace!("error closing compressed response: {}", e);
            HttpError::from(SendError::io(e))
        })?;
        Ok(())
    }
}

/// Whether an `Accept-Encoding` value lists gzip without refusing it through `q=0`.
fn accepts_gzip(accept_encoding: &str) -> bool {
    accept_encoding.split(',').any(|coding| {
        let mut parts = coding.split(';');
        let name = parts.next().unwrap_or_default().trim();
        if !name.eq_ignore_ascii_case("gzip") && !name.eq_ignore_ascii_case("x-gzip") {
            return false;
        }

        !parts.any(|param| {
            param
                .trim()
                .strip_prefix("q=")
                .and_then(|q| q.trim().parse::<f32>().ok())
                .is_some_and(|q| q == 0.0)
        })
    })
}
