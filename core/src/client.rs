//! Verb facade over the builder, dispatcher and interpreter.
//!
//! # Design
//! `ConsoleFetch` holds only immutable, shareable parts: the request builder
//! (base URL plus header provider), the dispatcher (transport) and the default
//! timeout. Each call builds its own descriptor and consumes its own envelope,
//! so clones can be used from any number of tasks at once.
//!
//! Every call is a single attempt. There is no retry anywhere in this crate.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::builder::{RequestBuilder, RequestOptions};
use crate::config::FetchConfig;
use crate::dispatch::{Dispatcher, Transport};
use crate::error::FetchError;
use crate::http::{Headers, HttpMethod, ResponseEnvelope, ACCEPT, APPLICATION_JSON};
use crate::interpret::{interpret, ParsedResult};
use crate::provider::{HeaderProvider, NoHeaders};
use crate::timeout::TimeoutSpec;

/// Typed "no body" for [`ConsoleFetch::delete`].
pub const NO_BODY: Option<&Value> = None;

/// The request-dispatch layer every API call goes through.
#[derive(Clone)]
pub struct ConsoleFetch {
    builder: RequestBuilder,
    dispatcher: Dispatcher,
    default_timeout: TimeoutSpec,
}

impl ConsoleFetch {
    pub fn new(
        transport: Arc<dyn Transport>,
        provider: Arc<dyn HeaderProvider>,
        config: &FetchConfig,
    ) -> Self {
        Self {
            builder: RequestBuilder::new(config.base_url.as_deref(), provider),
            dispatcher: Dispatcher::new(transport),
            default_timeout: config.timeout_ms,
        }
    }

    pub fn builder() -> ConsoleFetchBuilder {
        ConsoleFetchBuilder::default()
    }

    pub fn default_timeout(&self) -> TimeoutSpec {
        self.default_timeout
    }

    /// Raw dispatch: no default headers, no provider headers, no body
    /// interpretation. The method comes from `options.method` (GET if unset).
    pub async fn fetch(
        &self,
        url: &str,
        options: RequestOptions,
        timeout: Option<TimeoutSpec>,
    ) -> Result<ResponseEnvelope, FetchError> {
        let request = self.builder.raw(url, options);
        self.dispatcher
            .dispatch_as(url, request, timeout.unwrap_or(self.default_timeout))
            .await
    }

    async fn fetch_common(
        &self,
        url: &str,
        method: HttpMethod,
        defaults: Headers,
        options: RequestOptions,
        timeout: Option<TimeoutSpec>,
        entire_response: bool,
    ) -> Result<ParsedResult, FetchError> {
        let request = self.builder.build(url, method, defaults, options);
        let response = self
            .dispatcher
            .dispatch_as(url, request, timeout.unwrap_or(self.default_timeout))
            .await?;
        interpret(response, entire_response).await
    }

    /// Request with `Accept: application/json` unless `options` overrides it.
    pub async fn fetch_json(
        &self,
        url: &str,
        method: HttpMethod,
        options: RequestOptions,
        timeout: Option<TimeoutSpec>,
        entire_response: bool,
    ) -> Result<ParsedResult, FetchError> {
        let defaults = Headers::new().with(ACCEPT, APPLICATION_JSON);
        self.fetch_common(url, method, defaults, options, timeout, entire_response)
            .await
    }

    /// GET with no `Accept` default, for log and text endpoints.
    pub async fn fetch_text(
        &self,
        url: &str,
        options: RequestOptions,
        timeout: Option<TimeoutSpec>,
        entire_response: bool,
    ) -> Result<ParsedResult, FetchError> {
        self.fetch_common(
            url,
            HttpMethod::Get,
            Headers::new(),
            options,
            timeout,
            entire_response,
        )
        .await
    }

    pub async fn get(
        &self,
        url: &str,
        options: RequestOptions,
        timeout: Option<TimeoutSpec>,
    ) -> Result<ParsedResult, FetchError> {
        self.fetch_json(url, HttpMethod::Get, options, timeout, false)
            .await
    }

    async fn send_json<T>(
        &self,
        url: &str,
        method: HttpMethod,
        json: Option<&T>,
        options: RequestOptions,
        timeout: Option<TimeoutSpec>,
        entire_response: bool,
    ) -> Result<ParsedResult, FetchError>
    where
        T: Serialize + ?Sized,
    {
        let request = self.builder.build_json(url, method, json, options)?;
        let response = self
            .dispatcher
            .dispatch_as(url, request, timeout.unwrap_or(self.default_timeout))
            .await?;
        interpret(response, entire_response).await
    }

    pub async fn post<T>(
        &self,
        url: &str,
        json: &T,
        options: RequestOptions,
        timeout: Option<TimeoutSpec>,
        entire_response: bool,
    ) -> Result<ParsedResult, FetchError>
    where
        T: Serialize + ?Sized,
    {
        self.send_json(url, HttpMethod::Post, Some(json), options, timeout, entire_response)
            .await
    }

    pub async fn put<T>(
        &self,
        url: &str,
        json: &T,
        options: RequestOptions,
        timeout: Option<TimeoutSpec>,
        entire_response: bool,
    ) -> Result<ParsedResult, FetchError>
    where
        T: Serialize + ?Sized,
    {
        self.send_json(url, HttpMethod::Put, Some(json), options, timeout, entire_response)
            .await
    }

    /// PATCH with a JSON-Patch document
    /// (`application/json-patch+json;charset=UTF-8`).
    pub async fn patch<T>(
        &self,
        url: &str,
        json: &T,
        options: RequestOptions,
        timeout: Option<TimeoutSpec>,
        entire_response: bool,
    ) -> Result<ParsedResult, FetchError>
    where
        T: Serialize + ?Sized,
    {
        self.send_json(url, HttpMethod::Patch, Some(json), options, timeout, entire_response)
            .await
    }

    /// DELETE, optionally with a JSON body such as `DeleteOptions`. Without a
    /// body, or with one that serializes to `null`, the request carries no
    /// body and no `Content-Type`. Pass [`NO_BODY`] for the header-only form.
    pub async fn delete<T>(
        &self,
        url: &str,
        json: Option<&T>,
        options: RequestOptions,
        timeout: Option<TimeoutSpec>,
    ) -> Result<ParsedResult, FetchError>
    where
        T: Serialize + ?Sized,
    {
        let json = json
            .map(serde_json::to_value)
            .transpose()
            .map_err(FetchError::Serialize)?;
        match json {
            Some(json) if !json.is_null() => {
                self.send_json(url, HttpMethod::Delete, Some(&json), options, timeout, false)
                    .await
            }
            _ => {
                self.fetch_json(url, HttpMethod::Delete, options, timeout, false)
                    .await
            }
        }
    }
}

/// Startup-time assembly of a `ConsoleFetch`.
pub struct ConsoleFetchBuilder {
    config: FetchConfig,
    provider: Arc<dyn HeaderProvider>,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for ConsoleFetchBuilder {
    fn default() -> Self {
        Self {
            config: FetchConfig::default(),
            provider: Arc::new(NoHeaders),
            transport: None,
        }
    }
}

impl ConsoleFetchBuilder {
    pub fn config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn header_provider(mut self, provider: impl HeaderProvider + 'static) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Without an explicit transport, the reqwest transport is used when the
    /// `reqwest` feature is enabled.
    pub fn build(self) -> Result<ConsoleFetch, FetchError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };
        Ok(ConsoleFetch::new(transport, self.provider, &self.config))
    }
}

#[cfg(feature = "reqwest")]
fn default_transport() -> Result<Arc<dyn Transport>, FetchError> {
    Ok(Arc::new(crate::transport::ReqwestTransport::default()))
}

#[cfg(not(feature = "reqwest"))]
fn default_transport() -> Result<Arc<dyn Transport>, FetchError> {
    Err(FetchError::Config(
        "no transport configured and the reqwest feature is disabled".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::http::{CONTENT_TYPE, JSON_PATCH_UTF8, JSON_UTF8};
    use crate::test_support::CannedTransport;

    fn client(transport: &Arc<CannedTransport>) -> ConsoleFetch {
        ConsoleFetch::builder()
            .header_provider(|| Headers::new().with("Authorization", "Bearer session"))
            .transport(transport.clone())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn fetch_json_decodes_success_body() {
        let transport = Arc::new(CannedTransport::json(200, r#"{"a":1}"#));
        let result = client(&transport)
            .fetch_json("/api/x", HttpMethod::Get, RequestOptions::new(), None, false)
            .await
            .unwrap();
        assert_eq!(result.into_json(), Some(json!({ "a": 1 })));

        let sent = transport.last_request();
        assert_eq!(sent.headers.get(ACCEPT), Some(APPLICATION_JSON));
        assert_eq!(sent.headers.get("authorization"), Some("Bearer session"));
    }

    #[tokio::test]
    async fn accept_can_be_overridden_by_caller() {
        let transport = Arc::new(CannedTransport::text(200, "line 1\nline 2"));
        let result = client(&transport)
            .fetch_json(
                "/api/logs",
                HttpMethod::Get,
                RequestOptions::new().header("Accept", "text/plain"),
                None,
                false,
            )
            .await
            .unwrap();
        assert_eq!(result.into_text().as_deref(), Some("line 1\nline 2"));
        assert_eq!(transport.last_request().headers.get(ACCEPT), Some("text/plain"));
    }

    #[tokio::test]
    async fn fetch_text_sets_no_accept_and_returns_empty_string() {
        let transport = Arc::new(CannedTransport::text(200, ""));
        let result = client(&transport)
            .fetch_text("/healthz", RequestOptions::new(), None, false)
            .await
            .unwrap();
        assert_eq!(result.into_text().as_deref(), Some(""));

        let sent = transport.last_request();
        assert_eq!(sent.method, HttpMethod::Get);
        assert!(!sent.headers.contains(ACCEPT));
    }

    #[tokio::test]
    async fn not_found_json_comes_back_as_text() {
        let transport = Arc::new(CannedTransport::json(404, r#"{"message":"not found"}"#));
        let result = client(&transport)
            .get("/api/x", RequestOptions::new(), None)
            .await
            .unwrap();
        assert_eq!(result.into_text().as_deref(), Some(r#"{"message":"not found"}"#));
    }

    #[tokio::test]
    async fn patch_and_post_content_types() {
        let transport = Arc::new(CannedTransport::json(200, "{}"));
        let client = client(&transport);

        client
            .patch(
                "/x",
                &json!([{ "op": "replace", "path": "/data/k", "value": "v" }]),
                RequestOptions::new(),
                None,
                false,
            )
            .await
            .unwrap();
        let sent = transport.last_request();
        assert_eq!(sent.method, HttpMethod::Patch);
        assert_eq!(sent.headers.get(CONTENT_TYPE), Some(JSON_PATCH_UTF8));

        client
            .post("/x", &json!({ "kind": "ConfigMap" }), RequestOptions::new(), None, false)
            .await
            .unwrap();
        let sent = transport.last_request();
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(sent.headers.get(CONTENT_TYPE), Some(JSON_UTF8));

        client
            .put("/x", &json!({ "kind": "ConfigMap" }), RequestOptions::new(), None, false)
            .await
            .unwrap();
        assert_eq!(transport.last_request().method, HttpMethod::Put);
    }

    #[tokio::test]
    async fn delete_without_body_is_header_only() {
        let transport = Arc::new(CannedTransport::json(200, r#"{"status":"Success"}"#));
        client(&transport)
            .delete("/x", NO_BODY, RequestOptions::new(), None)
            .await
            .unwrap();

        let sent = transport.last_request();
        assert_eq!(sent.method, HttpMethod::Delete);
        assert!(sent.body.is_none());
        assert!(!sent.headers.contains(CONTENT_TYPE));
        assert_eq!(sent.headers.get(ACCEPT), Some(APPLICATION_JSON));
    }

    #[tokio::test]
    async fn delete_with_null_body_is_header_only() {
        let transport = Arc::new(CannedTransport::json(200, "{}"));
        let client = client(&transport);

        client
            .delete("/x", Some(&Value::Null), RequestOptions::new(), None)
            .await
            .unwrap();
        let sent = transport.last_request();
        assert!(sent.body.is_none());
        assert!(!sent.headers.contains(CONTENT_TYPE));

        client
            .delete("/x", Some(&None::<u8>), RequestOptions::new(), None)
            .await
            .unwrap();
        let sent = transport.last_request();
        assert!(sent.body.is_none());
        assert!(!sent.headers.contains(CONTENT_TYPE));
    }

    #[tokio::test]
    async fn delete_accepts_typed_bodies() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct DeleteOptions {
            propagation_policy: &'static str,
        }

        let transport = Arc::new(CannedTransport::json(200, "{}"));
        client(&transport)
            .delete(
                "/x",
                Some(&DeleteOptions {
                    propagation_policy: "Foreground",
                }),
                RequestOptions::new(),
                None,
            )
            .await
            .unwrap();

        let sent = transport.last_request();
        assert_eq!(sent.body.as_deref(), Some(r#"{"propagationPolicy":"Foreground"}"#));
        assert_eq!(sent.headers.get(CONTENT_TYPE), Some(JSON_UTF8));
    }

    #[tokio::test]
    async fn delete_with_body_sends_json() {
        let transport = Arc::new(CannedTransport::json(200, "{}"));
        client(&transport)
            .delete("/x", Some(&json!({ "reason": "x" })), RequestOptions::new(), None)
            .await
            .unwrap();

        let sent = transport.last_request();
        assert_eq!(sent.body.as_deref(), Some(r#"{"reason":"x"}"#));
        assert_eq!(sent.headers.get(CONTENT_TYPE), Some(JSON_UTF8));
    }

    #[tokio::test]
    async fn entire_response_skips_decoding() {
        let transport = Arc::new(CannedTransport::json(201, "not json at all"));
        let result = client(&transport)
            .post("/x", &json!({}), RequestOptions::new(), None, true)
            .await
            .unwrap();
        let response = result.into_response().unwrap();
        assert_eq!(response.status, 201);
    }

    #[tokio::test]
    async fn raw_fetch_adds_nothing() {
        let transport = Arc::new(CannedTransport::json(200, "{}"));
        let response = client(&transport)
            .fetch("/x", RequestOptions::new().method(HttpMethod::Options), None)
            .await
            .unwrap();
        assert_eq!(response.status, 200);

        let sent = transport.last_request();
        assert_eq!(sent.method, HttpMethod::Options);
        assert!(sent.headers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn per_call_timeout_overrides_default() {
        let transport = Arc::new(
            CannedTransport::json(200, "{}").with_delay(Duration::from_secs(2)),
        );
        let client = client(&transport);
        assert_eq!(client.default_timeout(), TimeoutSpec::DEFAULT);

        let err = client
            .get("/slow", RequestOptions::new(), Some(TimeoutSpec::from_millis(500)))
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        let ok = client
            .get("/slow", RequestOptions::new(), Some(TimeoutSpec::DISABLED))
            .await
            .unwrap();
        assert_eq!(ok.into_json(), Some(json!({})));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_names_the_url_the_caller_passed() {
        let transport = Arc::new(
            CannedTransport::json(200, "{}").with_delay(Duration::from_secs(2)),
        );
        let config = FetchConfig {
            base_url: Some("https://cluster.example/".to_string()),
            ..FetchConfig::default()
        };
        let client = ConsoleFetch::builder()
            .config(config)
            .transport(transport.clone())
            .build()
            .unwrap();

        let err = client
            .get("/api/v1/pods", RequestOptions::new(), Some(TimeoutSpec::from_millis(500)))
            .await
            .unwrap_err();
        assert!(
            matches!(err, FetchError::Timeout { ref url, .. } if url == "/api/v1/pods"),
            "{err:?}"
        );
        assert_eq!(
            transport.last_request().url,
            "https://cluster.example/api/v1/pods"
        );
    }

    #[tokio::test]
    async fn unserializable_body_fails_before_dispatch() {
        use std::collections::BTreeMap;

        let transport = Arc::new(CannedTransport::json(200, "{}"));
        let mut bad = BTreeMap::new();
        bad.insert(vec![1u8], "non-string keys cannot be JSON object keys");

        let err = client(&transport)
            .post("/x", &bad, RequestOptions::new(), None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Serialize(_)));
        assert!(transport.requests().is_empty());
    }
}
