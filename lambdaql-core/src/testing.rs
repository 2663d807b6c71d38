//! Fixtures and a scripted query engine shared by the adapter test suites.

use crate::{
    HttpQueryError, HttpQueryRequest, HttpQueryResponse, InboundEvent, InvocationContext,
    QueryEngine, QueryError, ResponseInit,
};
use std::collections::HashMap;
use std::sync::Mutex;

pub const GRAPHQL_PATH: &str = "/graphql";

pub fn post_event(body: &str) -> InboundEvent {
    InboundEvent::new("POST", GRAPHQL_PATH)
        .header("content-type", "application/json")
        .body(body)
}

pub fn get_event(params: &[(&str, &str)]) -> InboundEvent {
    params
        .iter()
        .fold(InboundEvent::new("GET", GRAPHQL_PATH), |event, (k, v)| {
            event.query_param(*k, *v)
        })
}

pub fn context() -> InvocationContext {
    InvocationContext::new(uuid::Uuid::new_v4().to_string())
}

/// Untagged failure raised by [`ScriptedEngine`]; tests downcast to it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("scripted failure: {0}")]
pub struct ScriptedFailure(pub String);

#[derive(Debug, Clone)]
pub enum Outcome {
    Respond {
        body: String,
        headers: HashMap<String, String>,
    },
    Reject(HttpQueryError),
    Fail(String),
}

/// A query engine that replays one outcome and records every request it sees.
#[derive(Debug)]
pub struct ScriptedEngine {
    outcome: Outcome,
    requests: Mutex<Vec<HttpQueryRequest>>,
    waits_seen: Mutex<Vec<bool>>,
}

impl ScriptedEngine {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            requests: Mutex::new(Vec::new()),
            waits_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn responding(body: &str, headers: &[(&str, &str)]) -> Self {
        Self::new(Outcome::Respond {
            body: body.to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }

    pub fn rejecting(err: HttpQueryError) -> Self {
        Self::new(Outcome::Reject(err))
    }

    pub fn failing(message: &str) -> Self {
        Self::new(Outcome::Fail(message.to_string()))
    }

    pub fn requests(&self) -> Vec<HttpQueryRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// The context's wait flag as observed on each call.
    pub fn waits_seen(&self) -> Vec<bool> {
        self.waits_seen
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl QueryEngine for ScriptedEngine {
    async fn run_http_query(
        &self,
        request: HttpQueryRequest,
        context: &InvocationContext,
    ) -> Result<HttpQueryResponse, QueryError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        if let Ok(mut waits) = self.waits_seen.lock() {
            waits.push(context.callback_waits_for_empty_event_loop);
        }

        match &self.outcome {
            Outcome::Respond { body, headers } => Ok(HttpQueryResponse {
                graphql_response: body.clone(),
                response_init: ResponseInit {
                    headers: headers.clone(),
                },
            }),
            Outcome::Reject(err) => Err(QueryError::Http(err.clone())),
            Outcome::Fail(message) => Err(QueryError::other(ScriptedFailure(message.clone()))),
        }
    }
}
