//! Access logging.
//!
//! [`AccessLogDecorator`] logs one summary line per request before handing it on, and one
//! timing line once the rest of the chain has returned. What goes into the summary is decided per
//! request from [`SharedSettings`]:
//!
//! - `logRequestsEnabled`: log at all
//! - `logHeadersEnabled`: append every request header
//! - `logBodiesEnabled`: append the body of PUT, POST and PATCH requests, as long as
//!   `requestLogBufferSize` is above zero
//!
//! Logging a body buffers it in memory. The request handed downstream then reads from that buffer,
//! so later handlers still see the whole body.

use std::io;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use http::Method;
use micro_filter_http::protocol::{HttpRequest, IncomingRequest, Response};
use tracing::info;

use crate::config::{LoggingConfig, SharedSettings};
use crate::decorator::Decorator;
use crate::{BoxError, RequestHandler};

/// A decorator logging the requests that reach the wrapped handler.
#[derive(Debug, Clone)]
pub struct AccessLogDecorator {
    settings: Arc<SharedSettings>,
}

impl AccessLogDecorator {
    pub fn new(settings: Arc<SharedSettings>) -> Self {
        Self { settings }
    }
}

impl<H: RequestHandler> Decorator<H> for AccessLogDecorator {
    type Out = AccessLogHandler<H>;

    fn decorate(&self, raw: H) -> Self::Out {
        AccessLogHandler { handler: raw, settings: Arc::clone(&self.settings) }
    }
}

#[derive(Debug)]
pub struct AccessLogHandler<H> {
    handler: H,
    settings: Arc<SharedSettings>,
}

#[async_trait]
impl<H: RequestHandler> RequestHandler for AccessLogHandler<H> {
    async fn invoke(&self, req: &mut IncomingRequest, resp: &mut Response) -> Result<(), BoxError> {
        let config = LoggingConfig::resolve(self.settings.load().as_deref());
        if !config.requests_enabled {
            return self.handler.invoke(req, resp).await;
        }

        // stays empty for non-HTTP requests
        let mut path = String::new();
        let message = match req {
            IncomingRequest::Http(http) => {
                path = request_path(http);
                summarize(http, &path, &config)?
            }
            IncomingRequest::Raw(raw) => format!("{} made a non-HTTP request", raw.remote_host()),
        };
        info!("{}", message);

        let start = Instant::now();
        self.handler.invoke(req, resp).await?;
        info!("{} took {}ms", path, start.elapsed().as_millis());

        Ok(())
    }
}

/// `<client> "<METHOD> <path>[?<query>]"`
fn request_path(http: &HttpRequest) -> String {
    let header = http.header();
    match header.query() {
        Some(query) => format!("{} \"{} {}?{}\"", http.client_addr(), header.method(), header.path(), query),
        None => format!("{} \"{} {}\"", http.client_addr(), header.method(), header.path()),
    }
}

/// Header values are logged whatever bytes they carry; only a missing header prints as empty.
fn summarize(http: &mut HttpRequest, path: &str, config: &LoggingConfig) -> io::Result<String> {
    let header = http.header();
    let content_type = header.header_lossy(http::header::CONTENT_TYPE);

    let mut message = format!(
        "{} \"{}\" \"{}\" \"{}\" ",
        path,
        header.header_lossy(http::header::USER_AGENT).unwrap_or_default(),
        header.header_lossy(http::header::REFERER).unwrap_or_default(),
        content_type.as_deref().unwrap_or_default(),
    );

    if config.headers_enabled {
        message.push_str("\n  Headers:");
        for name in header.header_names() {
            message.push_str(&format!("\n    {}: {}", name, header.header_lossy(name).unwrap_or_default()));
        }
    }

    let has_body = [Method::PUT, Method::POST, Method::PATCH].contains(http.method());
    if !(config.logs_bodies() && has_body) {
        return Ok(message);
    }

    let binary = is_binary(content_type.as_deref());
    let charset = http.character_encoding();
    let size = http.content_length().map_or_else(|| "-1".to_string(), |len| len.to_string());
    message.push_str(&format!(" request-size: {} body: ", size));

    let body = http.buffer_body()?;
    if binary {
        message.push_str(&format!("{} bytes (binary content)\n", body.len()));
    } else if let Some(text) = body.as_text(charset.as_deref()) {
        message.push_str(&format!("\n{}\n", text));
    }

    Ok(message)
}

/// Whether a request body of this content type is logged as a byte count instead of as text.
///
/// Images other than SVG and `application/*` types that are not XML, JSON or GML count as binary,
/// as does a missing content type. Everything else is text.
pub fn is_binary(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return true;
    };

    // a type without a subtype is compared as given
    let (top, sub) = match content_type.split_once('/') {
        Some((top, sub)) => (top.to_ascii_lowercase(), sub.to_ascii_lowercase()),
        None => (content_type.to_string(), String::new()),
    };

    match top.as_str() {
        "image" => !sub.contains("svg"),
        "application" => !(sub.contains("xml") || sub.contains("json") || sub.contains("gml")),
        _ => false,
    }
}
