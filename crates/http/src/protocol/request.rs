//! HTTP request handling.
//!
//! [`RequestHeader`] wraps the standard `http::Request<()>` and answers the questions filters ask
//! about a request: path, query, headers, declared content type and charset. [`HttpRequest`] adds
//! the client address and the body, and [`IncomingRequest`] covers requests that did not arrive
//! over HTTP at all.

use std::borrow::Cow;
use std::fmt;
use std::io;
use std::io::Read;
use std::net::IpAddr;

use http::header::{AsHeaderName, HeaderName};
use http::{HeaderMap, Method, Request};
use mime::Mime;

use crate::protocol::ParseError;
use crate::protocol::body::{BufferedBody, InputStream, ReaderStream};

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Represents an HTTP request header.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl RequestHeader {
    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns the request path, without the query string.
    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    /// Returns the query string, if the URI has one.
    pub fn query(&self) -> Option<&str> {
        self.inner.uri().query()
    }

    /// Returns a reference to the request's headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Returns the first value of the header as a string.
    ///
    /// Values that are not visible ASCII are treated as absent.
    pub fn header_str<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers().get(name).and_then(|value| value.to_str().ok())
    }

    /// Returns the first value of the header as text, whatever bytes it carries.
    ///
    /// Bytes that are not valid UTF-8 are replaced, so a present header is never reported as
    /// absent.
    pub fn header_lossy<K: AsHeaderName>(&self, name: K) -> Option<Cow<'_, str>> {
        self.headers().get(name).map(|value| String::from_utf8_lossy(value.as_bytes()))
    }

    /// Returns the distinct header names in the order the transport supplied them.
    pub fn header_names(&self) -> impl Iterator<Item = &HeaderName> {
        self.headers().keys()
    }

    /// Returns the raw `Content-Type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(http::header::CONTENT_TYPE)
    }

    /// Returns the `charset` parameter of the `Content-Type` header.
    pub fn character_encoding(&self) -> Option<String> {
        let mime = self.content_type()?.parse::<Mime>().ok()?;
        mime.get_param(mime::CHARSET).map(|charset| charset.as_str().to_string())
    }

    /// Returns the declared `Content-Length`, if present.
    pub fn content_length(&self) -> Option<u64> {
        self.try_content_length().ok().flatten()
    }

    /// Like [`RequestHeader::content_length`], but reports a malformed header.
    pub fn try_content_length(&self) -> Result<Option<u64>, ParseError> {
        let Some(value) = self.headers().get(http::header::CONTENT_LENGTH) else {
            return Ok(None);
        };

        let value = value.to_str().map_err(ParseError::invalid_content_length)?;
        value.trim().parse::<u64>().map(Some).map_err(ParseError::invalid_content_length)
    }
}

/// Converts a bodyless request into a RequestHeader.
impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}

/// The payload of a request: the transport stream until someone buffers it.
enum RequestBody {
    Transport(Box<dyn InputStream>),
    Buffered(BufferedBody),
}

/// An inbound HTTP request: header, client address and body.
pub struct HttpRequest {
    header: RequestHeader,
    remote_addr: IpAddr,
    body: RequestBody,
}

impl HttpRequest {
    /// Creates a request reading its body from a blocking transport reader.
    pub fn new<R>(header: RequestHeader, remote_addr: IpAddr, body: R) -> Self
    where
        R: Read + Send + 'static,
    {
        Self::with_stream(header, remote_addr, Box::new(ReaderStream::new(body)))
    }

    pub fn with_stream(header: RequestHeader, remote_addr: IpAddr, body: Box<dyn InputStream>) -> Self {
        Self { header, remote_addr, body: RequestBody::Transport(body) }
    }

    pub fn header(&self) -> &RequestHeader {
        &self.header
    }

    pub fn method(&self) -> &Method {
        self.header.method()
    }

    /// The address of the peer the connection came from.
    pub fn remote_addr(&self) -> IpAddr {
        self.remote_addr
    }

    /// The address of the client, honoring the first `X-Forwarded-For` hop when a proxy set one.
    pub fn client_addr(&self) -> String {
        self.header
            .header_str(X_FORWARDED_FOR)
            .and_then(|forwarded| forwarded.split(',').map(str::trim).find(|hop| !hop.is_empty()))
            .map_or_else(|| self.remote_addr.to_string(), ToString::to_string)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.header.content_length()
    }

    pub fn character_encoding(&self) -> Option<String> {
        self.header.character_encoding()
    }

    /// Returns a stream over the body.
    ///
    /// Before buffering this is the transport stream itself. After [`HttpRequest::buffer_body`]
    /// every call returns a new stream starting at the first byte.
    pub fn input_stream(&mut self) -> Box<dyn InputStream + '_> {
        match &mut self.body {
            RequestBody::Transport(stream) => Box::new(stream.as_mut()),
            RequestBody::Buffered(body) => Box::new(body.replay()),
        }
    }

    /// Drains the transport stream into memory and makes the body replayable.
    ///
    /// Buffering an already buffered request returns the existing snapshot.
    /// Read failures are returned as they came from the transport.
    pub fn buffer_body(&mut self) -> io::Result<&BufferedBody> {
        if let RequestBody::Transport(stream) = &mut self.body {
            let buffered = BufferedBody::from_reader(stream.as_mut())?;
            self.body = RequestBody::Buffered(buffered);
        }

        match &self.body {
            RequestBody::Buffered(body) => Ok(body),
            RequestBody::Transport(_) => Err(io::Error::other("request body could not be buffered")),
        }
    }

    /// Returns the buffered snapshot, if the body has been buffered.
    pub fn buffered_body(&self) -> Option<&BufferedBody> {
        match &self.body {
            RequestBody::Buffered(body) => Some(body),
            RequestBody::Transport(_) => None,
        }
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("header", &self.header)
            .field("remote_addr", &self.remote_addr)
            .field("buffered", &self.buffered_body().is_some())
            .finish()
    }
}

/// A request that did not arrive over HTTP.
pub struct RawRequest {
    remote_host: String,
    body: Box<dyn InputStream>,
}

impl RawRequest {
    pub fn new<R>(remote_host: impl Into<String>, body: R) -> Self
    where
        R: Read + Send + 'static,
    {
        Self { remote_host: remote_host.into(), body: Box::new(ReaderStream::new(body)) }
    }

    pub fn remote_host(&self) -> &str {
        &self.remote_host
    }

    pub fn input_stream(&mut self) -> &mut dyn InputStream {
        self.body.as_mut()
    }
}

impl fmt::Debug for RawRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRequest").field("remote_host", &self.remote_host).finish_non_exhaustive()
    }
}

/// Whatever the transport handed to the filter chain.
#[derive(Debug)]
pub enum IncomingRequest {
    Http(HttpRequest),
    Raw(RawRequest),
}

impl IncomingRequest {
    pub fn as_http(&self) -> Option<&HttpRequest> {
        match self {
            Self::Http(req) => Some(req),
            Self::Raw(_) => None,
        }
    }

    pub fn as_http_mut(&mut self) -> Option<&mut HttpRequest> {
        match self {
            Self::Http(req) => Some(req),
            Self::Raw(_) => None,
        }
    }
}

impl From<HttpRequest> for IncomingRequest {
    fn from(req: HttpRequest) -> Self {
        Self::Http(req)
    }
}

impl From<RawRequest> for IncomingRequest {
    fn from(req: RawRequest) -> Self {
        Self::Raw(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn header(builder: http::request::Builder) -> RequestHeader {
        builder.body(()).unwrap().into()
    }

    #[test]
    fn splits_path_and_query() {
        let header = header(Request::builder().uri("/geoserver/wms?SERVICE=WMS&REQUEST=GetCapabilities"));
        assert_eq!(header.path(), "/geoserver/wms");
        assert_eq!(header.query(), Some("SERVICE=WMS&REQUEST=GetCapabilities"));

        let header = self::header(Request::builder().uri("/geoserver/web"));
        assert_eq!(header.query(), None);
    }

    #[test]
    fn reads_charset_from_content_type() {
        let header = header(Request::builder().header("Content-Type", "text/xml; charset=ISO-8859-1"));
        assert_eq!(header.content_type(), Some("text/xml; charset=ISO-8859-1"));
        assert_eq!(header.character_encoding().as_deref(), Some("ISO-8859-1"));

        let header = self::header(Request::builder().header("Content-Type", "application/json"));
        assert_eq!(header.character_encoding(), None);

        let header = self::header(Request::builder());
        assert_eq!(header.character_encoding(), None);
    }

    #[test]
    fn content_length_parsing() {
        let header = header(Request::builder().header("Content-Length", "42"));
        assert_eq!(header.content_length(), Some(42));

        let header = self::header(Request::builder().header("Content-Length", "many"));
        assert_eq!(header.content_length(), None);
        assert!(matches!(header.try_content_length(), Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn non_ascii_header_values_stay_present() {
        let value = HeaderValue::from_bytes("Mozilla/5.0 (Müller)".as_bytes()).unwrap();
        let header = header(Request::builder().header(http::header::USER_AGENT, value));

        assert_eq!(header.header_str(http::header::USER_AGENT), None);
        assert_eq!(header.header_lossy(http::header::USER_AGENT).as_deref(), Some("Mozilla/5.0 (Müller)"));

        let latin1 = HeaderValue::from_bytes(b"caf\xe9").unwrap();
        let header = self::header(Request::builder().header(http::header::REFERER, latin1));
        assert_eq!(header.header_lossy(http::header::REFERER).as_deref(), Some("caf\u{fffd}"));
        assert_eq!(header.header_lossy(http::header::ACCEPT), None);
    }

    #[test]
    fn header_names_keep_transport_order() {
        let header = header(
            Request::builder().header("Host", "localhost").header("User-Agent", "curl").header("Accept", "*/*"),
        );
        let names: Vec<&str> = header.header_names().map(HeaderName::as_str).collect();
        assert_eq!(names, vec!["host", "user-agent", "accept"]);
    }

    #[test]
    fn client_addr_prefers_forwarded_for() {
        let remote: IpAddr = "10.0.0.5".parse().unwrap();

        let direct = HttpRequest::new(header(Request::builder()), remote, io::empty());
        assert_eq!(direct.client_addr(), "10.0.0.5");

        let proxied = HttpRequest::new(
            header(Request::builder().header("X-Forwarded-For", "192.168.1.20, 10.0.0.1")),
            remote,
            io::empty(),
        );
        assert_eq!(proxied.client_addr(), "192.168.1.20");
        assert_eq!(proxied.remote_addr(), remote);
    }

    #[test]
    fn buffered_body_replays_through_input_stream() {
        let mut req = HttpRequest::new(
            header(Request::builder().method("POST")),
            "127.0.0.1".parse().unwrap(),
            io::Cursor::new(b"<wfs:Transaction/>".to_vec()),
        );
        assert!(req.buffered_body().is_none());

        assert_eq!(req.buffer_body().unwrap().raw_bytes().as_ref(), b"<wfs:Transaction/>");
        assert_eq!(req.buffer_body().unwrap().len(), 18);

        for _ in 0..3 {
            let mut body = Vec::new();
            req.input_stream().read_to_end(&mut body).unwrap();
            assert_eq!(body, b"<wfs:Transaction/>");
        }
    }

    #[test]
    fn buffering_returns_transport_errors_unchanged() {
        struct Reset;
        impl Read for Reset {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::ConnectionReset))
            }
        }

        let mut req = HttpRequest::new(header(Request::builder().method("POST")), "127.0.0.1".parse().unwrap(), Reset);
        let err = req.buffer_body().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert!(req.buffered_body().is_none());
    }

    #[test]
    fn transport_stream_is_read_only_once() {
        let mut req = HttpRequest::new(header(Request::builder()), "127.0.0.1".parse().unwrap(), &b"abc"[..]);

        let mut first = Vec::new();
        req.input_stream().read_to_end(&mut first).unwrap();
        let mut second = Vec::new();
        req.input_stream().read_to_end(&mut second).unwrap();

        assert_eq!(first, b"abc");
        assert!(second.is_empty());
        assert!(req.input_stream().is_finished());
    }

    #[test]
    fn raw_request_has_no_http_view() {
        let mut req = IncomingRequest::from(RawRequest::new("gateway.local", io::empty()));
        assert!(req.as_http().is_none());
        assert!(req.as_http_mut().is_none());
    }
}
