pub mod config;
pub mod error;
pub mod options;
pub mod testing;

pub use config::{EventSource, LambdaConfig, LogFormat};
pub use error::{BoxError, HttpQueryError, LambdaqlError, QueryError, Result};
pub use options::{OptionsFn, OptionsSource};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

pub type Stash = serde_json::Map<String, serde_json::Value>;

pub const POST_BODY_MISSING: &str = "POST body missing.";

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// An API Gateway proxy event, as delivered to the function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    pub http_method: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub query_string_parameters: HashMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_base64_encoded: bool,
}

impl InboundEvent {
    pub fn new(http_method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            http_method: http_method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_string_parameters
            .insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn is_post(&self) -> bool {
        self.http_method == "POST"
    }

    /// True when there is no body or the body is the empty string.
    pub fn body_is_empty(&self) -> bool {
        self.body.as_deref().map_or(true, str::is_empty)
    }
}

/// Per-invocation execution context handed over by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationContext {
    pub request_id: String,
    pub invoked_function_arn: String,
    pub xray_trace_id: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    /// When true the platform keeps the invocation open until pending work drains.
    pub callback_waits_for_empty_event_loop: bool,
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self {
            request_id: String::new(),
            invoked_function_arn: String::new(),
            xray_trace_id: None,
            deadline: None,
            callback_waits_for_empty_event_loop: true,
        }
    }
}

impl InvocationContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }

    /// Set the deadline from epoch milliseconds, the unit the runtime API uses.
    pub fn with_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.deadline = i64::try_from(deadline_ms)
            .ok()
            .and_then(DateTime::from_timestamp_millis);
        self
    }

    pub fn remaining_time_ms(&self) -> Option<i64> {
        self.deadline
            .map(|deadline| (deadline - Utc::now()).num_milliseconds().max(0))
    }
}

/// The raw query payload: the body for POST, the query string otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPayload {
    Body(String),
    Params(HashMap<String, String>),
}

/// The normalized HTTP sub-request seen by the query engine.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: http::Method,
    pub headers: http::HeaderMap,
}

/// Everything the query engine needs to run one request.
#[derive(Debug, Clone)]
pub struct HttpQueryRequest {
    pub method: String,
    pub query: QueryPayload,
    pub request: HttpRequest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseInit {
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpQueryResponse {
    pub graphql_response: String,
    pub response_init: ResponseInit,
}

/// The reply shape the platform expects back from the function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status_code: u16,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

impl ResponseEnvelope {
    pub fn post_body_missing() -> Self {
        Self {
            status_code: 500,
            body: POST_BODY_MISSING.to_string(),
            headers: None,
        }
    }
}

impl From<HttpQueryResponse> for ResponseEnvelope {
    fn from(response: HttpQueryResponse) -> Self {
        Self {
            status_code: 200,
            body: response.graphql_response,
            headers: Some(response.response_init.headers),
        }
    }
}

impl From<HttpQueryError> for ResponseEnvelope {
    fn from(err: HttpQueryError) -> Self {
        Self {
            status_code: err.status_code,
            body: err.message,
            headers: Some(err.headers),
        }
    }
}

/// A query-processing function reachable over an HTTP-shaped interface.
#[async_trait::async_trait]
pub trait QueryEngine: Send + Sync + 'static {
    async fn run_http_query(
        &self,
        request: HttpQueryRequest,
        context: &InvocationContext,
    ) -> std::result::Result<HttpQueryResponse, QueryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn proxy_event_with_null_maps_deserializes() {
        let event: InboundEvent = serde_json::from_value(json!({
            "httpMethod": "GET",
            "path": "/graphql",
            "queryStringParameters": null,
            "headers": null,
            "body": null,
            "isBase64Encoded": false
        }))
        .unwrap();

        assert_eq!(event.http_method, "GET");
        assert!(event.query_string_parameters.is_empty());
        assert!(event.headers.is_empty());
        assert!(event.body.is_none());
    }

    #[test]
    fn empty_body_counts_as_missing() {
        assert!(InboundEvent::new("POST", "/").body_is_empty());
        assert!(InboundEvent::new("POST", "/").body("").body_is_empty());
        assert!(!InboundEvent::new("POST", "/").body("{}").body_is_empty());
    }

    #[test]
    fn envelope_omits_absent_headers() {
        let value = serde_json::to_value(ResponseEnvelope::post_body_missing()).unwrap();
        assert_eq!(
            value,
            json!({ "statusCode": 500, "body": "POST body missing." })
        );
    }

    #[test]
    fn success_envelope_is_always_200() {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        let envelope = ResponseEnvelope::from(HttpQueryResponse {
            graphql_response: "X".to_string(),
            response_init: ResponseInit {
                headers: headers.clone(),
            },
        });
        assert_eq!(envelope.status_code, 200);
        assert_eq!(envelope.body, "X");
        assert_eq!(envelope.headers, Some(headers));
    }

    #[test]
    fn context_defaults_to_waiting_for_event_loop() {
        assert!(InvocationContext::default().callback_waits_for_empty_event_loop);
    }

    #[test]
    fn remaining_time_is_never_negative() {
        let ctx = InvocationContext::new("req-1").with_deadline_ms(1);
        assert_eq!(ctx.remaining_time_ms(), Some(0));
        assert_eq!(InvocationContext::new("req-2").remaining_time_ms(), None);
    }
}
