use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use micro_filter_http::protocol::{IncomingRequest, Response};

/// The error type handlers hand back up the chain, unchanged by the filters in between.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// The next step of a filter chain.
///
/// A filter owns the handler after it and calls [`RequestHandler::invoke`] on it exactly once per
/// request. Whatever the handler returns, error included, is passed straight back to the caller.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, req: &mut IncomingRequest, resp: &mut Response) -> Result<(), BoxError>;
}

#[async_trait]
impl<H: RequestHandler + ?Sized> RequestHandler for Box<H> {
    async fn invoke(&self, req: &mut IncomingRequest, resp: &mut Response) -> Result<(), BoxError> {
        (**self).invoke(req, resp).await
    }
}

#[async_trait]
impl<H: RequestHandler + ?Sized> RequestHandler for Arc<H> {
    async fn invoke(&self, req: &mut IncomingRequest, resp: &mut Response) -> Result<(), BoxError> {
        (**self).invoke(req, resp).await
    }
}

/// a synchronous closure used as the end of a chain
#[derive(Debug)]
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&mut IncomingRequest, &mut Response) -> Result<(), BoxError> + Send + Sync,
{
    FnHandler { f }
}

#[async_trait]
impl<F> RequestHandler for FnHandler<F>
where
    F: Fn(&mut IncomingRequest, &mut Response) -> Result<(), BoxError> + Send + Sync,
{
    async fn invoke(&self, req: &mut IncomingRequest, resp: &mut Response) -> Result<(), BoxError> {
        (self.f)(req, resp)
    }
}
