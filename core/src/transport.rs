//! `Transport` backed by `reqwest`.

use async_trait::async_trait;
use reqwest::Method;

use crate::dispatch::Transport;
use crate::error::TransportError;
use crate::http::{Headers, HttpMethod, RequestDescriptor, ResponseBody, ResponseEnvelope};

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: RequestDescriptor) -> Result<ResponseEnvelope, TransportError> {
        let RequestDescriptor {
            url,
            method: verb,
            headers,
            body,
        } = request;

        let mut builder = self.client.request(method(verb), &url);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::with_source(format!("{verb} {url} failed: {e}"), e))?;

        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v.to_string())))
            .collect();
        let body = ResponseBody::from_future(async move {
            response
                .bytes()
                .await
                .map_err(|e| TransportError::with_source(format!("failed to read response body: {e}"), e))
        });

        Ok(ResponseEnvelope::new(status, headers, body))
    }
}
