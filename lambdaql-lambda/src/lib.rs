pub mod runtime;

pub use runtime::{invocation_context, run, run_http};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use lambdaql_core::{
    BoxError, HttpQueryError, HttpQueryRequest, HttpQueryResponse, HttpRequest, InboundEvent,
    InvocationContext, OptionsSource, QueryEngine, QueryError, QueryPayload, ResponseEnvelope,
};
use std::future::Future;
use tracing::{debug, info, warn};

/// Handler returned by [`graphql_lambda`]; one call per function invocation.
pub struct LambdaHandler<O> {
    options: OptionsSource<O>,
}

/// Build a Lambda handler that serves GraphQL through the given options.
///
/// Pass `OptionsSource::from(options)` for one static record, or `OptionsSource::derived(..)` to build
/// options per invocation.
pub fn graphql_lambda<O: QueryEngine>(options: OptionsSource<O>) -> LambdaHandler<O> {
    LambdaHandler { options }
}

impl<O: QueryEngine> LambdaHandler<O> {
    /// Await the event from `processor`, then handle it.
    pub async fn handle_with<P, Fut>(
        &self,
        processor: P,
        context: &mut InvocationContext,
    ) -> Result<ResponseEnvelope, BoxError>
    where
        P: FnOnce() -> Fut,
        Fut: Future<Output = Result<InboundEvent, BoxError>>,
    {
        let event = processor().await?;
        self.handle(event, context).await
    }

    /// Run one invocation.
    ///
    /// Tagged query errors come back as envelopes; any other engine error is returned as is.
    pub async fn handle(
        &self,
        event: InboundEvent,
        context: &mut InvocationContext,
    ) -> Result<ResponseEnvelope, BoxError> {
        context.callback_waits_for_empty_event_loop = false;

        if event.is_post() && event.body_is_empty() {
            return Ok(ResponseEnvelope::post_body_missing());
        }

        match self.dispatch(event, context).await {
            Ok(response) => Ok(response.into()),
            Err(QueryError::Http(e)) => {
                if e.is_graphql_error {
                    debug!(
                        request_id = %context.request_id,
                        status = e.status_code,
                        "query rejected with GraphQL errors"
                    );
                } else {
                    info!(
                        request_id = %context.request_id,
                        status = e.status_code,
                        reason = %e.message,
                        "request rejected"
                    );
                }
                Ok(e.into())
            }
            Err(QueryError::Other(e)) => Err(e),
        }
    }

    async fn dispatch(
        &self,
        event: InboundEvent,
        context: &InvocationContext,
    ) -> Result<HttpQueryResponse, QueryError> {
        let options = self.options.resolve(&event, context).await?;
        let request = query_request(event)?;
        debug!(
            request_id = %context.request_id,
            method = %request.method,
            url = %request.request.url,
            "dispatching query"
        );
        options.run_http_query(request, context).await
    }
}

/// Build the descriptor handed to the query engine.
pub fn query_request(event: InboundEvent) -> Result<HttpQueryRequest, QueryError> {
    let method = Method::from_bytes(event.http_method.as_bytes()).map_err(|_| {
        QueryError::from(
            HttpQueryError::new(405, "Only GET and POST requests are supported.")
                .header("Allow", "GET, POST"),
        )
    })?;
    let headers = header_map(&event);
    let body = decoded_body(&event)?;

    let query = if method == Method::POST {
        QueryPayload::Body(body.unwrap_or_default())
    } else {
        QueryPayload::Params(event.query_string_parameters)
    };

    Ok(HttpQueryRequest {
        method: event.http_method,
        query,
        request: HttpRequest {
            url: event.path,
            method,
            headers,
        },
    })
}

fn decoded_body(event: &InboundEvent) -> Result<Option<String>, QueryError> {
    match &event.body {
        Some(body) if event.is_base64_encoded => {
            let invalid = || QueryError::from(HttpQueryError::new(400, "Request body is not valid base64."));
            let bytes = BASE64.decode(body).map_err(|_| invalid())?;
            String::from_utf8(bytes).map(Some).map_err(|_| invalid())
        }
        body => Ok(body.clone()),
    }
}

fn header_map(event: &InboundEvent) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(event.headers.len());
    for (name, value) in &event.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => warn!(header = %name, "skipping invalid request header"),
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_payload_is_the_body() {
        let event = InboundEvent::new("POST", "/graphql")
            .query_param("ignored", "yes")
            .body(r#"{"query":"{ a }"}"#);
        let request = query_request(event).unwrap();
        assert_eq!(request.query, QueryPayload::Body(r#"{"query":"{ a }"}"#.to_string()));
        assert_eq!(request.request.method, Method::POST);
        assert_eq!(request.request.url, "/graphql");
    }

    #[test]
    fn base64_bodies_are_decoded() {
        let mut event = InboundEvent::new("POST", "/graphql").body(BASE64.encode("{\"query\":\"{ a }\"}"));
        event.is_base64_encoded = true;
        let request = query_request(event).unwrap();
        assert_eq!(request.query, QueryPayload::Body("{\"query\":\"{ a }\"}".to_string()));
    }

    #[test]
    fn undecodable_base64_is_a_bad_request() {
        let mut event = InboundEvent::new("POST", "/graphql").body("***");
        event.is_base64_encoded = true;
        match query_request(event) {
            Err(QueryError::Http(e)) => assert_eq!(e.status_code, 400),
            other => panic!("expected 400, got {other:?}"),
        }
    }

    #[test]
    fn invalid_headers_are_skipped() {
        let event = InboundEvent::new("GET", "/graphql")
            .header("x-ok", "1")
            .header("bad header", "2");
        let request = query_request(event).unwrap();
        assert_eq!(request.request.headers.len(), 1);
        assert_eq!(request.request.headers["x-ok"], "1");
    }

    #[test]
    fn malformed_method_is_not_allowed() {
        match query_request(InboundEvent::new("GE T", "/graphql")) {
            Err(QueryError::Http(e)) => {
                assert_eq!(e.status_code, 405);
                assert_eq!(e.headers["Allow"], "GET, POST");
            }
            other => panic!("expected 405, got {other:?}"),
        }
    }
}
