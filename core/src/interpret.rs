//! Response interpreter: turn a `ResponseEnvelope` into the value handed back
//! to callers.
//!
//! Decoding policy, in order:
//! 1. the caller asked for the entire response: hand the envelope back
//!    untouched;
//! 2. read the body once as text;
//! 3. empty body: `""` for `text/plain`, `{}` otherwise;
//! 4. `text/plain`, or a status outside 2xx: the raw text, never decoded;
//! 5. otherwise decode JSON, failing with `FetchError::Decode`.
//!
//! Step 4 means a JSON error body on a 404 comes back as a string. Callers
//! that want the details parse it themselves.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::FetchError;
use crate::http::{ResponseEnvelope, TEXT_PLAIN};

/// The result of one call: decoded JSON, plain text, or the raw envelope.
#[derive(Debug)]
pub enum ParsedResult {
    Json(Value),
    Text(String),
    Response(ResponseEnvelope),
}

impl ParsedResult {
    pub fn into_json(self) -> Option<Value> {
        match self {
            ParsedResult::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            ParsedResult::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_response(self) -> Option<ResponseEnvelope> {
        match self {
            ParsedResult::Response(response) => Some(response),
            _ => None,
        }
    }

    /// Deserialize a JSON result into `T`. Text results are parsed as JSON
    /// first, which lets callers decode an error body they got back as text.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, FetchError> {
        match self {
            ParsedResult::Json(value) => serde_json::from_value(value).map_err(FetchError::Decode),
            ParsedResult::Text(text) => serde_json::from_str(&text).map_err(FetchError::Decode),
            ParsedResult::Response(_) => Err(FetchError::Decode(serde::de::Error::custom(
                "an entire response cannot be deserialized; read its body first",
            ))),
        }
    }
}

pub async fn interpret(
    envelope: ResponseEnvelope,
    entire_response: bool,
) -> Result<ParsedResult, FetchError> {
    if entire_response {
        return Ok(ParsedResult::Response(envelope));
    }
    parse_data(envelope).await
}

/// Read and decode the body according to the policy above.
pub async fn parse_data(envelope: ResponseEnvelope) -> Result<ParsedResult, FetchError> {
    let is_plain_text = envelope.content_type() == Some(TEXT_PLAIN);
    let is_success = envelope.is_success();
    let text = envelope.body.text().await?;

    if text.is_empty() {
        return Ok(if is_plain_text {
            ParsedResult::Text(String::new())
        } else {
            ParsedResult::Json(Value::Object(Map::new()))
        });
    }

    if is_plain_text || !is_success {
        return Ok(ParsedResult::Text(text));
    }

    serde_json::from_str(&text)
        .map(ParsedResult::Json)
        .map_err(FetchError::Decode)
}
