use crate::LambdaHandler;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use lambda_http::{Body, Request, RequestExt, Response};
use lambda_runtime::{service_fn, Context, LambdaEvent};
use lambdaql_core::{InboundEvent, InvocationContext, QueryEngine, ResponseEnvelope};
use std::sync::Arc;

pub fn invocation_context(context: &Context) -> InvocationContext {
    InvocationContext {
        request_id: context.request_id.clone(),
        invoked_function_arn: context.invoked_function_arn.clone(),
        xray_trace_id: context.xray_trace_id.clone(),
        ..InvocationContext::default()
    }
    .with_deadline_ms(context.deadline)
}

/// Serve raw API Gateway proxy events until the runtime shuts down.
pub async fn run<O: QueryEngine>(handler: LambdaHandler<O>) -> Result<(), lambda_runtime::Error> {
    let handler = Arc::new(handler);
    lambda_runtime::run(service_fn(move |event: LambdaEvent<InboundEvent>| {
        let handler = Arc::clone(&handler);
        async move {
            let mut context = invocation_context(&event.context);
            handler.handle(event.payload, &mut context).await
        }
    }))
    .await
}

/// Serve any event source `lambda_http` understands, converting through the proxy event shape.
pub async fn run_http<O: QueryEngine>(handler: LambdaHandler<O>) -> Result<(), lambda_http::Error> {
    let handler = Arc::new(handler);
    lambda_http::run(lambda_http::service_fn(move |request: Request| {
        let handler = Arc::clone(&handler);
        async move {
            let mut context = request
                .lambda_context_ref()
                .map(invocation_context)
                .unwrap_or_default();
            let event = inbound_event(&request);
            let envelope = handler.handle(event, &mut context).await?;
            http_response(envelope)
        }
    }))
    .await
}

pub fn inbound_event(request: &Request) -> InboundEvent {
    let query_string_parameters = request
        .query_string_parameters()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let headers = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let (body, is_base64_encoded) = match request.body() {
        Body::Empty => (None, false),
        Body::Text(text) => (Some(text.clone()), false),
        Body::Binary(bytes) => (Some(BASE64.encode(bytes)), true),
    };

    // Without API Gateway metadata there is no raw path; fall back to the URI.
    let path = match request.raw_http_path() {
        "" => request.uri().path(),
        raw => raw,
    };

    InboundEvent {
        http_method: request.method().as_str().to_string(),
        path: path.to_string(),
        query_string_parameters,
        headers,
        body,
        is_base64_encoded,
    }
}

pub fn http_response(envelope: ResponseEnvelope) -> Result<Response<Body>, lambda_http::Error> {
    let mut builder = Response::builder().status(envelope.status_code);
    for (name, value) in envelope.headers.unwrap_or_default() {
        builder = builder.header(name, value);
    }
    Ok(builder.body(Body::Text(envelope.body))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn runtime_context_becomes_invocation_context() {
        let mut runtime = Context::default();
        runtime.request_id = "req-7".to_string();
        runtime.invoked_function_arn = "arn:aws:lambda:eu-west-1:123456789012:function:books".to_string();
        runtime.xray_trace_id = Some("Root=1-5759e988-bd862e3fe1be46a994272793".to_string());
        runtime.deadline = 1_700_000_000_123;

        let context = invocation_context(&runtime);
        assert_eq!(context.request_id, "req-7");
        assert_eq!(
            context.invoked_function_arn,
            "arn:aws:lambda:eu-west-1:123456789012:function:books"
        );
        assert_eq!(
            context.xray_trace_id.as_deref(),
            Some("Root=1-5759e988-bd862e3fe1be46a994272793")
        );
        assert_eq!(
            context.deadline.map(|d| d.timestamp_millis()),
            Some(1_700_000_000_123)
        );
        assert!(context.callback_waits_for_empty_event_loop);
        assert_eq!(context.remaining_time_ms(), Some(0));
    }

    #[test]
    fn envelope_becomes_http_response() {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        let response = http_response(ResponseEnvelope {
            status_code: 400,
            body: "bad query".to_string(),
            headers: Some(headers),
        })
        .unwrap();

        assert_eq!(response.status(), 400);
        assert_eq!(response.headers()["content-type"], "application/json");
        match response.body() {
            Body::Text(text) => assert_eq!(text, "bad query"),
            other => panic!("expected text body, got {other:?}"),
        }
    }

    #[test]
    fn http_request_becomes_inbound_event() {
        let request = http::Request::builder()
            .method("POST")
            .uri("https://example.com/graphql")
            .header("content-type", "application/json")
            .body(Body::Text(r#"{"query":"{ a }"}"#.to_string()))
            .unwrap();

        let event = inbound_event(&request);
        assert_eq!(event.http_method, "POST");
        assert_eq!(event.path, "/graphql");
        assert_eq!(event.headers["content-type"], "application/json");
        assert_eq!(event.body.as_deref(), Some(r#"{"query":"{ a }"}"#));
        assert!(!event.is_base64_encoded);
    }

    #[test]
    fn binary_bodies_are_base64_encoded() {
        let request = http::Request::builder()
            .method("POST")
            .uri("/graphql")
            .body(Body::Binary(b"{}".to_vec()))
            .unwrap();

        let event = inbound_event(&request);
        assert!(event.is_base64_encoded);
        assert_eq!(event.body.as_deref(), Some("e30="));
    }
}
