//! Dispatcher: one network attempt through a `Transport`, under the timeout
//! guard.
//!
//! # Design
//! The attempt runs on its own tokio task. If the timer wins, the task handle
//! is dropped, which detaches the task: the transport keeps running until it
//! finishes on its own, and its result is discarded without being observed.
//! Status codes are not inspected here; a 404 is a successful dispatch.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{FetchError, TransportError};
use crate::http::{RequestDescriptor, ResponseEnvelope};
use crate::timeout::{race_with_timeout, TimeoutSpec};

/// The platform fetch primitive.
///
/// Implementations must return non-2xx responses as `Ok`; only failures to
/// reach the server or to read its answer are errors.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: RequestDescriptor) -> Result<ResponseEnvelope, TransportError>;
}

#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Dispatch `request`; a timeout names the fully resolved request URL.
    pub async fn dispatch(
        &self,
        request: RequestDescriptor,
        timeout: TimeoutSpec,
    ) -> Result<ResponseEnvelope, FetchError> {
        let target = request.url.clone();
        self.dispatch_as(&target, request, timeout).await
    }

    /// Dispatch `request`, reporting a timeout against `target`, the URL as
    /// the caller wrote it before any base URL was joined on.
    pub async fn dispatch_as(
        &self,
        target: &str,
        request: RequestDescriptor,
        timeout: TimeoutSpec,
    ) -> Result<ResponseEnvelope, FetchError> {
        let url = request.url.clone();
        tracing::debug!(
            method = %request.method,
            url = %url,
            target,
            timeout_ms = timeout.as_millis(),
            "dispatching request"
        );

        let transport = Arc::clone(&self.transport);
        let attempt = tokio::spawn(async move { transport.send(request).await });

        let response = race_with_timeout(
            async move {
                match attempt.await {
                    Ok(result) => result.map_err(FetchError::from),
                    Err(join) => Err(TransportError::new(format!(
                        "transport task failed: {join}"
                    ))
                    .into()),
                }
            },
            timeout,
            target,
        )
        .await?;

        tracing::trace!(status = response.status, url = %url, "response received");
        Ok(response)
    }
}
