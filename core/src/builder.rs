//! Request builder: merge verb defaults, caller options and provider headers
//! into one `RequestDescriptor`.
//!
//! # Layering
//! Later layers win on conflicting header names:
//!
//! ```text
//! verb defaults (Accept / Content-Type)
//!     → caller RequestOptions
//!     → HeaderProvider::headers(), evaluated per build
//! ```
//!
//! Callers can replace a default such as `Accept`, but cannot drop or replace
//! a header the provider supplies.

use std::sync::Arc;

use serde::Serialize;

use crate::error::FetchError;
use crate::http::{
    Headers, HttpMethod, RequestDescriptor, ACCEPT, APPLICATION_JSON, CONTENT_TYPE,
    JSON_PATCH_UTF8, JSON_UTF8,
};
use crate::provider::HeaderProvider;

/// Caller-supplied request options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Only consulted by the raw `fetch` entry point; verb methods pass
    /// their own method explicitly.
    pub method: Option<HttpMethod>,
    pub headers: Headers,
    pub body: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// `Content-Type` for a JSON-bodied request. PATCH selects JSON-Patch.
pub fn json_content_type(method: HttpMethod) -> &'static str {
    match method {
        HttpMethod::Patch => JSON_PATCH_UTF8,
        _ => JSON_UTF8,
    }
}

/// Builds request descriptors for one configured client.
#[derive(Clone)]
pub struct RequestBuilder {
    base_url: Option<String>,
    provider: Arc<dyn HeaderProvider>,
}

impl RequestBuilder {
    pub fn new(base_url: Option<&str>, provider: Arc<dyn HeaderProvider>) -> Self {
        Self {
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
            provider,
        }
    }

    /// Prefix relative targets (starting with `/`) with the base URL.
    pub fn resolve_url(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if url.starts_with('/') => format!("{base}{url}"),
            _ => url.to_string(),
        }
    }

    /// Layer `defaults`, then `options`, then the provider's headers.
    pub fn build(
        &self,
        url: &str,
        method: HttpMethod,
        defaults: Headers,
        options: RequestOptions,
    ) -> RequestDescriptor {
        let mut headers = defaults;
        headers.merge(&options.headers);
        headers.merge(&self.provider.headers());

        RequestDescriptor {
            url: self.resolve_url(url),
            method,
            headers,
            body: options.body,
        }
    }

    /// Build a JSON-bodied request. A body serializing to `null` is sent as
    /// no body at all.
    pub fn build_json<T>(
        &self,
        url: &str,
        method: HttpMethod,
        json: Option<&T>,
        mut options: RequestOptions,
    ) -> Result<RequestDescriptor, FetchError>
    where
        T: Serialize + ?Sized,
    {
        if let Some(json) = json {
            let value = serde_json::to_value(json).map_err(FetchError::Serialize)?;
            if !value.is_null() {
                let body = serde_json::to_string(&value).map_err(FetchError::Serialize)?;
                options.body = Some(body);
            }
        }

        let defaults = Headers::new()
            .with(ACCEPT, APPLICATION_JSON)
            .with(CONTENT_TYPE, json_content_type(method));
        Ok(self.build(url, method, defaults, options))
    }

    /// Descriptor for the raw `fetch` entry point: caller options only, no
    /// defaults and no provider headers.
    pub fn raw(&self, url: &str, options: RequestOptions) -> RequestDescriptor {
        RequestDescriptor {
            url: self.resolve_url(url),
            method: options.method.unwrap_or_default(),
            headers: options.headers,
            body: options.body,
        }
    }
}
