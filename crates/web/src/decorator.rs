//! Stacking filters into a chain.
//!
//! A filter is a [`Decorator`] over the handler that follows it: decorating a handler yields a
//! new handler that runs the filter logic around the original. Decorators compose with
//! [`DecoratorExt::and_then`], and the decorator added last ends up outermost, so it sees the
//! request first and the response last.
//!
//! ```
//! use micro_filter_web::decorator::{Decorator, DecoratorExt, IdentityDecorator};
//! use micro_filter_web::encoding::{CompressibleTypes, CompressionDecorator};
//! use micro_filter_web::logging::AccessLogDecorator;
//! use micro_filter_web::config::SharedSettings;
//! use micro_filter_web::handler_fn;
//! use std::sync::Arc;
//!
//! let types = CompressibleTypes::parse("text/.*,.*xml.*").unwrap();
//! let chain = IdentityDecorator
//!     .and_then(CompressionDecorator::new(types))
//!     .and_then(AccessLogDecorator::new(Arc::new(SharedSettings::empty())));
//!
//! let handler = chain.decorate(handler_fn(|_req, _resp| Ok(())));
//! ```

use crate::RequestHandler;

/// Wraps a value, typically a request handler, into another one.
pub trait Decorator<In> {
    type Out;

    fn decorate(&self, raw: In) -> Self::Out;
}

/// Chaining for every decorator of request handlers.
///
/// Filters are generic over the handler they wrap, so the input is pinned to the boxed handler
/// to keep `and_then` callable on a concrete filter without naming a handler type.
pub trait DecoratorExt: Decorator<Box<dyn RequestHandler>> {
    /// Applies `decorator` on top of `self`, making it the outer layer.
    fn and_then<D>(self, decorator: D) -> DecoratorComposer<Self, D>
    where
        Self: Sized,
    {
        DecoratorComposer::new(self, decorator)
    }

    /// Applies `decorator` underneath `self`, making it the inner layer.
    fn compose<D>(self, decorator: D) -> DecoratorComposer<D, Self>
    where
        Self: Sized,
    {
        DecoratorComposer::new(decorator, self)
    }
}

impl<T: Decorator<Box<dyn RequestHandler>> + ?Sized> DecoratorExt for T {}

/// Two decorators applied one after the other: `inner` first, then `outer`.
#[derive(Debug, Clone, Copy)]
pub struct DecoratorComposer<D1, D2> {
    inner: D1,
    outer: D2,
}

impl<D1, D2> DecoratorComposer<D1, D2> {
    pub fn new(inner: D1, outer: D2) -> Self {
        Self { inner, outer }
    }
}

impl Default for DecoratorComposer<IdentityDecorator, IdentityDecorator> {
    fn default() -> Self {
        Self::new(IdentityDecorator, IdentityDecorator)
    }
}

impl<In, D1, D2> Decorator<In> for DecoratorComposer<D1, D2>
where
    D1: Decorator<In>,
    D2: Decorator<D1::Out>,
{
    type Out = D2::Out;

    fn decorate(&self, raw: In) -> Self::Out {
        self.outer.decorate(self.inner.decorate(raw))
    }
}

/// Leaves the handler as it is.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityDecorator;

impl<In> Decorator<In> for IdentityDecorator {
    type Out = In;

    #[inline]
    fn decorate(&self, raw: In) -> Self::Out {
        raw
    }
}
