//! Request filters for the micro filter chain.
//!
//! Two filters are provided, both as [`decorator::Decorator`]s over a [`RequestHandler`]:
//!
//! - [`encoding::CompressionDecorator`]: gzip-compresses response bodies whose content type is
//!   compressible, deciding at the first body write.
//! - [`logging::AccessLogDecorator`]: writes an access log line for every request, optionally
//!   with headers and a replayable copy of the request body, plus a timing line on completion.
//!
//! Filter behaviour is driven by [`config::SharedSettings`], read afresh on every request.

mod error;
mod handler;

pub mod config;
pub mod decorator;
pub mod encoding;
pub mod logging;

#[cfg(test)]
mod test_support;

pub use error::FilterError;
pub use handler::BoxError;
pub use handler::FnHandler;
pub use handler::RequestHandler;
pub use handler::handler_fn;
