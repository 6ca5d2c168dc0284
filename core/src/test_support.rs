use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::dispatch::Transport;
use crate::error::TransportError;
use crate::http::{
    Headers, RequestDescriptor, ResponseBody, ResponseEnvelope, APPLICATION_JSON, CONTENT_TYPE,
    TEXT_PLAIN,
};

/// In-memory transport returning one canned response and recording every
/// request it receives.
pub(crate) struct CannedTransport {
    status: u16,
    headers: Headers,
    body: String,
    delay: Duration,
    failure: Option<String>,
    seen: Mutex<Vec<RequestDescriptor>>,
    completed: AtomicUsize,
}

impl CannedTransport {
    pub(crate) fn new(status: u16, headers: Headers, body: &str) -> Self {
        Self {
            status,
            headers,
            body: body.to_string(),
            delay: Duration::ZERO,
            failure: None,
            seen: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
        }
    }

    pub(crate) fn json(status: u16, body: &str) -> Self {
        Self::new(status, Headers::new().with(CONTENT_TYPE, APPLICATION_JSON), body)
    }

    pub(crate) fn text(status: u16, body: &str) -> Self {
        Self::new(status, Headers::new().with(CONTENT_TYPE, TEXT_PLAIN), body)
    }

    pub(crate) fn failing(message: &str) -> Self {
        let mut transport = Self::new(0, Headers::new(), "");
        transport.failure = Some(message.to_string());
        transport
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn requests(&self) -> Vec<RequestDescriptor> {
        self.seen.lock().unwrap().clone()
    }

    pub(crate) fn last_request(&self) -> RequestDescriptor {
        self.requests().pop().expect("no request was sent")
    }

    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for CannedTransport {
    async fn send(&self, request: RequestDescriptor) -> Result<ResponseEnvelope, TransportError> {
        self.seen.lock().unwrap().push(request);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.failure {
            return Err(TransportError::new(message.clone()));
        }
        Ok(ResponseEnvelope::new(
            self.status,
            self.headers.clone(),
            ResponseBody::from_bytes(self.body.clone()),
        ))
    }
}
