//! HTTP transport types shared by every layer of the dispatcher.
//!
//! # Design
//! Requests are described as plain owned data (`RequestDescriptor`) so a
//! descriptor can be moved into the transport task and never touched again by
//! the caller. Responses carry a `ResponseBody` that is consumed by value:
//! reading a body twice does not type-check.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::error::TransportError;

pub const ACCEPT: &str = "accept";
pub const CONTENT_TYPE: &str = "content-type";

pub const APPLICATION_JSON: &str = "application/json";
pub const JSON_UTF8: &str = "application/json;charset=UTF-8";
pub const JSON_PATCH_UTF8: &str = "application/json-patch+json;charset=UTF-8";
pub const TEXT_PLAIN: &str = "text/plain";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header mapping with case-insensitive names.
///
/// Names are stored lower-cased. `insert` is last-write-wins, and `merge`
/// layers another mapping on top of this one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, returning the previous value if any.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.entries
            .insert(name.as_ref().to_ascii_lowercase(), value.into())
    }

    /// Builder-style `insert`.
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(&name.to_ascii_lowercase())
    }

    /// Layer `other` on top of `self`: keys present in both take the value
    /// from `other`, keys only in `self` survive.
    pub fn merge(&mut self, other: &Headers) {
        for (name, value) in &other.entries {
            self.entries.insert(name.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

impl IntoIterator for Headers {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A fully built request, ready for one dispatch.
///
/// Owned by the call that built it and moved into the transport; there is no
/// way to mutate it once dispatch has begun.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Headers,
    pub body: Option<String>,
}

/// Single-read response body.
///
/// The body is produced lazily by the transport; `bytes` and `text` take
/// `self`, so it can be read at most once.
pub struct ResponseBody {
    inner: BoxFuture<'static, Result<Bytes, TransportError>>,
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            inner: async move { Ok::<_, TransportError>(bytes) }.boxed(),
        }
    }

    /// Wrap a pending read, e.g. a streaming body that is still on the wire.
    pub fn from_future<F>(read: F) -> Self
    where
        F: Future<Output = Result<Bytes, TransportError>> + Send + 'static,
    {
        Self { inner: read.boxed() }
    }

    pub async fn bytes(self) -> Result<Bytes, TransportError> {
        self.inner.await
    }

    /// Read the whole body as text. Invalid UTF-8 is replaced, not rejected,
    /// and a leading byte-order mark is dropped.
    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(match text.strip_prefix('\u{feff}') {
            Some(rest) => rest.to_owned(),
            None => text.into_owned(),
        })
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody").finish_non_exhaustive()
    }
}

/// Status, headers and the unread body of a completed dispatch.
#[derive(Debug)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub headers: Headers,
    pub body: ResponseBody,
}

impl ResponseEnvelope {
    pub fn new(status: u16, headers: Headers, body: ResponseBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE)
    }
}
