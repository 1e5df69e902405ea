//! Request and response primitives shared by every filter.
//!
//! # Architecture
//!
//! - **Requests** ([`request`]): what arrived from the transport
//!   - [`RequestHeader`]: method, URI and headers of an HTTP request
//!   - [`HttpRequest`]: header, client address and body
//!   - [`IncomingRequest`]: an HTTP request or a [`RawRequest`] from some other protocol
//!
//! - **Bodies** ([`body`]): readable request payloads
//!   - [`body::InputStream`]: a blocking reader with readiness queries
//!   - [`body::BufferedBody`]: a payload drained into memory for repeated reads
//!
//! - **Responses** ([`response`]): what goes back
//!   - [`ResponseHead`]: status and headers, mutable until the first byte is written
//!   - [`ResponseSink`]: where body bytes go; sinks wrap other sinks
//!   - [`Response`]: a head plus its current sink
//!
//! - **Errors** ([`error`]):
//!   - [`HttpError`]: top-level error type
//!   - [`ParseError`]: failures reading the request
//!   - [`SendError`]: failures writing the response

mod request;
pub use request::HttpRequest;
pub use request::IncomingRequest;
pub use request::RawRequest;
pub use request::RequestHeader;

mod response;
pub use response::OutputStream;
pub use response::Response;
pub use response::ResponseHead;
pub use response::ResponseSink;
pub use response::TransportSink;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

pub mod body;
