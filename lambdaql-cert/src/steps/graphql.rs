use cucumber::{given, then};
use lambdaql_core::{InvocationContext, Stash};
use lambdaql_graphlette::{build_schema, GraphQLOptions, Resolver, ResolverRegistry};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::world::AdapterWorld;

const LIBRARY_SDL: &str = r#"
    type Author { name: String }
    type Book { id: ID!, title: String, author: Author }
    type Query { books: [Book!]!, book(id: ID!): Book }
    type Mutation { addBook(title: String!): Book }
"#;

struct Books;

#[async_trait::async_trait]
impl Resolver for Books {
    async fn resolve(&self, _args: &Stash, _ctx: &InvocationContext) -> lambdaql_core::Result<Value> {
        Ok(json!([
            {"id": "1", "title": "Dune", "author": {"name": "Frank Herbert"}},
            {"id": "2", "title": "Emma", "author": {"name": "Jane Austen"}}
        ]))
    }
}

struct BookById;

#[async_trait::async_trait]
impl Resolver for BookById {
    async fn resolve(&self, args: &Stash, _ctx: &InvocationContext) -> lambdaql_core::Result<Value> {
        Ok(match args.get("id").and_then(Value::as_str) {
            Some("1") => json!({"id": "1", "title": "Dune", "author": {"name": "Frank Herbert"}}),
            _ => Value::Null,
        })
    }
}

#[given("the library schema")]
fn library_schema(world: &mut AdapterWorld) {
    let registry = ResolverRegistry::new()
        .query("books", Arc::new(Books))
        .query("book", Arc::new(BookById));
    let schema = build_schema(LIBRARY_SDL, &registry).expect("library schema");
    let options = GraphQLOptions::builder()
        .schema(schema)
        .build()
        .expect("library options");
    world.set_graphql(lambdaql_lambda::graphql_lambda(options.into()));
}

#[then(expr = "the response data at {string} is {string}")]
fn response_data_at(world: &mut AdapterWorld, pointer: String, expected: String) {
    let body = world.body_json();
    let value = body
        .pointer(&pointer)
        .unwrap_or_else(|| panic!("nothing at {pointer} in {body}"));
    assert_eq!(value.as_str(), Some(expected.as_str()), "{body}");
}

#[then("the response reports GraphQL errors")]
fn response_has_errors(world: &mut AdapterWorld) {
    let body = world.body_json();
    let errors = body["errors"].as_array().expect("errors array");
    assert!(!errors.is_empty());
}
