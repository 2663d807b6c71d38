use lambdaql_core::{EventSource, InvocationContext, LambdaConfig, LogFormat, OptionsSource, Stash};
use lambdaql_graphlette::{build_schema, GraphQLOptions, Resolver, ResolverRegistry};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const BOOKS_GRAPHQL: &str = include_str!("../config/books.graphql");

fn catalog() -> Value {
    json!([
        {
            "id": "1",
            "title": "Dune",
            "published": "1965-08-01",
            "tags": ["science-fiction"],
            "author": {"name": "Frank Herbert", "born": 1920}
        },
        {
            "id": "2",
            "title": "Emma",
            "published": "1815-12-23",
            "tags": ["classic", "romance"],
            "author": {"name": "Jane Austen", "born": 1775}
        },
        {
            "id": "3",
            "title": "The Left Hand of Darkness",
            "published": "1969-03-01",
            "tags": ["science-fiction", "classic"],
            "author": {"name": "Ursula K. Le Guin", "born": 1929}
        }
    ])
}

fn books() -> Vec<Value> {
    match catalog() {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

struct ListBooks;

#[async_trait::async_trait]
impl Resolver for ListBooks {
    async fn resolve(&self, args: &Stash, _ctx: &InvocationContext) -> lambdaql_core::Result<Value> {
        let tag = args.get("tag").and_then(Value::as_str);
        let matching: Vec<Value> = books()
            .into_iter()
            .filter(|book| match tag {
                Some(tag) => book["tags"]
                    .as_array()
                    .is_some_and(|tags| tags.iter().any(|t| t == tag)),
                None => true,
            })
            .collect();
        Ok(Value::Array(matching))
    }
}

struct FindBook;

#[async_trait::async_trait]
impl Resolver for FindBook {
    async fn resolve(&self, args: &Stash, _ctx: &InvocationContext) -> lambdaql_core::Result<Value> {
        let id = args.get("id").and_then(Value::as_str);
        Ok(books()
            .into_iter()
            .find(|book| book["id"].as_str() == id)
            .unwrap_or(Value::Null))
    }
}

struct RequestId;

#[async_trait::async_trait]
impl Resolver for RequestId {
    async fn resolve(&self, _args: &Stash, ctx: &InvocationContext) -> lambdaql_core::Result<Value> {
        Ok(json!(ctx.request_id))
    }
}

/// Echoes the new book back; the catalog itself is read-only.
struct AddBook;

#[async_trait::async_trait]
impl Resolver for AddBook {
    async fn resolve(&self, args: &Stash, _ctx: &InvocationContext) -> lambdaql_core::Result<Value> {
        let author = args
            .get("author")
            .and_then(Value::as_str)
            .map(|name| json!({"name": name}));
        Ok(json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "title": args.get("title").cloned().unwrap_or(Value::Null),
            "tags": [],
            "author": author,
        }))
    }
}

fn init_tracing(format: LogFormat) {
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    match format {
        LogFormat::Json => builder.json().without_time().init(),
        LogFormat::Text => builder.with_target(false).without_time().init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), lambda_http::Error> {
    let config = LambdaConfig::from_env()?;
    init_tracing(config.log_format);

    let registry = ResolverRegistry::new()
        .query("books", Arc::new(ListBooks))
        .query("book", Arc::new(FindBook))
        .query("requestId", Arc::new(RequestId))
        .mutation("addBook", Arc::new(AddBook));
    let schema = build_schema(BOOKS_GRAPHQL, &registry)?;
    let options = GraphQLOptions::builder()
        .schema(schema)
        .introspection(config.introspection)
        .build()?;

    let handler = lambdaql_lambda::graphql_lambda(OptionsSource::from(options));

    info!(event_source = ?config.event_source, "starting books-lambda");
    match config.event_source {
        EventSource::Proxy => lambdaql_lambda::run(handler).await,
        EventSource::Http => lambdaql_lambda::run_http(handler).await,
    }
}
