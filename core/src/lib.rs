//! Unified request-dispatch layer for the console's API traffic.
//!
//! # Overview
//! Every read and mutation of cluster state goes through `ConsoleFetch`. It
//! merges session headers into each request, races the request against a
//! timeout, picks body encoding per verb (JSON-Patch for PATCH), and turns
//! responses into one result shape: decoded JSON, plain text, or the raw
//! envelope.
//!
//! # Design
//! - `provider` supplies session headers; it is injected, never global.
//! - `builder` produces a `RequestDescriptor` (pure, no I/O).
//! - `dispatch` makes exactly one attempt through a `Transport` under the
//!   `timeout` guard. No retries.
//! - `interpret` decides between text and JSON from status and content type.
//! - `client` is the verb facade the rest of the application calls.

pub mod builder;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod interpret;
pub mod provider;
pub mod timeout;
#[cfg(feature = "reqwest")]
pub mod transport;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use builder::{RequestBuilder, RequestOptions};
pub use client::{ConsoleFetch, ConsoleFetchBuilder, NO_BODY};
pub use config::FetchConfig;
pub use dispatch::{Dispatcher, Transport};
pub use error::{FetchError, TransportError};
pub use http::{Headers, HttpMethod, RequestDescriptor, ResponseBody, ResponseEnvelope};
pub use interpret::ParsedResult;
pub use provider::{HeaderProvider, NoHeaders, StaticHeaders};
pub use timeout::{race_with_timeout, TimeoutSpec};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
