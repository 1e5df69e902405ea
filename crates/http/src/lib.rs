//! Request and response primitives for the micro filter chain.
//!
//! This crate models the pieces of a servlet-style request/response exchange that filters need
//! to intercept: request headers and bodies that can be buffered and replayed, and response
//! sinks that can be wrapped to transform the bytes on their way to the transport.
//!
//! All I/O is ordinary blocking I/O against the [`std::io::Read`] / [`std::io::Write`] handles
//! supplied by the transport. Failures are returned unchanged, never retried.
//!
//! # Example
//!
//! ```
//! use std::io::{Read, Write};
//! use http::{HeaderValue, Request};
//! use micro_filter_http::protocol::{HttpRequest, Response};
//!
//! let header = Request::builder().method("POST").uri("/wfs").body(()).unwrap().into();
//! let mut req = HttpRequest::new(header, "10.0.0.5".parse().unwrap(), &b"<Transaction/>"[..]);
//!
//! // drain once, read as many times as needed
//! let body = req.buffer_body().unwrap();
//! assert_eq!(body.as_text(None).unwrap(), "<Transaction/>");
//!
//! let mut text = String::new();
//! req.input_stream().read_to_string(&mut text).unwrap();
//! assert_eq!(text, "<Transaction/>");
//!
//! let mut resp = Response::new(Vec::new());
//! resp.set_content_type(HeaderValue::from_static("text/xml"));
//! resp.output_stream().write_all(b"<ok/>").unwrap();
//! resp.close().unwrap();
//! ```

pub mod protocol;
