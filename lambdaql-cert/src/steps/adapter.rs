use cucumber::{given, then, when};
use lambdaql_core::testing::ScriptedEngine;
use lambdaql_core::{HttpQueryError, InboundEvent, QueryPayload};
use std::collections::HashMap;

use crate::world::AdapterWorld;

#[given(expr = "a query engine that responds with {string}")]
fn engine_responds(world: &mut AdapterWorld, body: String) {
    world.set_engine(ScriptedEngine::responding(&body, &[]));
}

#[given(expr = "a query engine that responds with {string} and header {string} = {string}")]
fn engine_responds_with_header(world: &mut AdapterWorld, body: String, name: String, value: String) {
    world.set_engine(ScriptedEngine::responding(&body, &[(&name, &value)]));
}

#[given(expr = "a query engine that rejects with status {int} and message {string}")]
fn engine_rejects(world: &mut AdapterWorld, status: u16, message: String) {
    world.set_engine(ScriptedEngine::rejecting(HttpQueryError::new(status, message)));
}

#[given(expr = "a query engine that fails with {string}")]
fn engine_fails(world: &mut AdapterWorld, message: String) {
    world.set_engine(ScriptedEngine::failing(&message));
}

#[given("a POST request without a body")]
fn post_without_body(world: &mut AdapterWorld) {
    world.event = InboundEvent::new("POST", "/graphql");
}

#[given(expr = "a POST request with body {string}")]
fn post_with_body(world: &mut AdapterWorld, body: String) {
    world.event = InboundEvent::new("POST", "/graphql").body(body);
}

#[given(expr = "a GET request with query parameter {string} = {string}")]
fn get_with_param(world: &mut AdapterWorld, name: String, value: String) {
    world.event = InboundEvent::new("GET", "/graphql").query_param(name, value);
}

#[given(expr = "the request has header {string} = {string}")]
fn request_header(world: &mut AdapterWorld, name: String, value: String) {
    world.event.headers.insert(name, value);
}

#[given(expr = "the request has query parameter {string} = {string}")]
fn request_query_param(world: &mut AdapterWorld, name: String, value: String) {
    world.event.query_string_parameters.insert(name, value);
}

#[when("the function is invoked")]
async fn invoke(world: &mut AdapterWorld) {
    world.invoke().await;
}

#[then(expr = "the response status is {int}")]
fn response_status(world: &mut AdapterWorld, status: u16) {
    assert_eq!(world.envelope().status_code, status);
}

#[then(expr = "the response body is {string}")]
fn response_body(world: &mut AdapterWorld, body: String) {
    assert_eq!(world.envelope().body, body);
}

#[then(expr = "the response header {string} is {string}")]
fn response_header(world: &mut AdapterWorld, name: String, value: String) {
    let headers = world.envelope().headers.as_ref().expect("no response headers");
    assert_eq!(headers.get(&name), Some(&value));
}

#[then("the response has no headers")]
fn response_without_headers(world: &mut AdapterWorld) {
    assert!(world.envelope().headers.is_none());
}

#[then("the response has empty headers")]
fn response_with_empty_headers(world: &mut AdapterWorld) {
    assert_eq!(world.envelope().headers, Some(HashMap::new()));
}

#[then(expr = "the invocation fails with the engine's error {string}")]
fn invocation_fails(world: &mut AdapterWorld, message: String) {
    assert!(world.envelope.is_none());
    assert!(world.error_is_scripted, "error was wrapped or replaced");
    let error = world.error.as_deref().expect("invocation did not fail");
    assert!(error.contains(&message), "{error}");
}

#[then("the query engine was not called")]
fn engine_not_called(world: &mut AdapterWorld) {
    assert_eq!(world.engine().call_count(), 0);
}

#[then(expr = "the query engine received the query parameter {string} = {string}")]
fn engine_received_param(world: &mut AdapterWorld, name: String, value: String) {
    let requests = world.engine().requests();
    assert_eq!(requests.len(), 1);
    match &requests[0].query {
        QueryPayload::Params(params) => assert_eq!(params.get(&name), Some(&value)),
        QueryPayload::Body(body) => panic!("expected query parameters, got body {body}"),
    }
}

#[then(expr = "the query engine received the body {string}")]
fn engine_received_body(world: &mut AdapterWorld, body: String) {
    let requests = world.engine().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].query, QueryPayload::Body(body));
}

#[then("the function does not wait for the event loop")]
fn no_event_loop_wait(world: &mut AdapterWorld) {
    assert!(!world.context.callback_waits_for_empty_event_loop);
}
