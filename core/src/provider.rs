//! Source of session headers (auth, impersonation, CSRF) for every request.
//!
//! The crate does not implement authentication. It asks the provider for the
//! current headers each time it builds a request and never caches the answer,
//! so a change of token or impersonation shows up on the very next call.

use crate::http::Headers;

/// Produces the current request headers.
pub trait HeaderProvider: Send + Sync {
    fn headers(&self) -> Headers;
}

impl<F> HeaderProvider for F
where
    F: Fn() -> Headers + Send + Sync,
{
    fn headers(&self) -> Headers {
        self()
    }
}

/// Provider that contributes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHeaders;

impl HeaderProvider for NoHeaders {
    fn headers(&self) -> Headers {
        Headers::new()
    }
}

/// Provider returning a fixed set of headers.
#[derive(Debug, Clone, Default)]
pub struct StaticHeaders(pub Headers);

impl HeaderProvider for StaticHeaders {
    fn headers(&self) -> Headers {
        self.0.clone()
    }
}
