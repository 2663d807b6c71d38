use crate::options::GraphQLOptions;
use async_graphql::Variables;
use async_graphql_parser::parse_query;
use async_graphql_parser::types::{DocumentOperations, OperationType};
use http::Method;
use lambdaql_core::{
    HttpQueryError, HttpQueryRequest, HttpQueryResponse, InvocationContext, QueryEngine,
    QueryError, QueryPayload, ResponseInit, POST_BODY_MISSING,
};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// One GraphQL operation as sent over HTTP.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphQLPayload {
    query: Option<String>,
    operation_name: Option<String>,
    variables: Option<serde_json::Value>,
    extensions: Option<serde_json::Value>,
}

fn bad_request(message: &str) -> QueryError {
    HttpQueryError::new(400, message).into()
}

fn parse_body(body: &str) -> Result<GraphQLPayload, QueryError> {
    if body.trim().is_empty() {
        return Err(HttpQueryError::new(500, POST_BODY_MISSING).into());
    }
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|_| bad_request("Malformed JSON input."))?;
    match value {
        serde_json::Value::Array(_) => Err(bad_request("Batched requests are not supported.")),
        serde_json::Value::Object(_) => serde_json::from_value(value)
            .map_err(|e| bad_request(&format!("Malformed GraphQL request: {e}"))),
        _ => Err(bad_request("GraphQL request must be a JSON object.")),
    }
}

fn parse_params(params: &HashMap<String, String>) -> Result<GraphQLPayload, QueryError> {
    if params.is_empty() {
        return Err(bad_request("GET query missing."));
    }
    Ok(GraphQLPayload {
        query: params.get("query").cloned(),
        operation_name: params.get("operationName").cloned(),
        variables: params
            .get("variables")
            .map(|v| serde_json::Value::String(v.clone())),
        extensions: params
            .get("extensions")
            .map(|v| serde_json::Value::String(v.clone())),
    })
}

/// Variables and extensions may arrive as JSON text (always, for GET).
fn json_object(
    value: Option<serde_json::Value>,
    invalid: &str,
) -> Result<Option<serde_json::Value>, QueryError> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(text)) if text.is_empty() => Ok(None),
        Some(serde_json::Value::String(text)) => match serde_json::from_str(&text) {
            Ok(serde_json::Value::Object(map)) => Ok(Some(serde_json::Value::Object(map))),
            Ok(serde_json::Value::Null) => Ok(None),
            _ => Err(bad_request(invalid)),
        },
        Some(serde_json::Value::Object(map)) => Ok(Some(serde_json::Value::Object(map))),
        Some(_) => Err(bad_request(invalid)),
    }
}

fn selects_mutation(query: &str, operation_name: Option<&str>) -> bool {
    let Ok(doc) = parse_query(query) else {
        // Syntax errors are reported by execution.
        return false;
    };
    // A lone named operation is still stored as `Multiple`.
    let operation = match (&doc.operations, operation_name) {
        (DocumentOperations::Single(op), _) => Some(op),
        (DocumentOperations::Multiple(ops), Some(name)) => ops.get(name),
        (DocumentOperations::Multiple(ops), None) if ops.len() == 1 => {
            ops.iter().next().map(|(_, op)| op)
        }
        (DocumentOperations::Multiple(_), None) => None,
    };
    operation.is_some_and(|op| op.node.ty == OperationType::Mutation)
}

fn build_request(
    payload: GraphQLPayload,
    is_get: bool,
) -> Result<async_graphql::Request, QueryError> {
    let query = payload
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| bad_request("Must provide query string."))?;

    if is_get && selects_mutation(&query, payload.operation_name.as_deref()) {
        return Err(HttpQueryError::new(405, "GET supports only query operation")
            .header("Allow", "POST")
            .into());
    }

    let variables = json_object(payload.variables, "Variables are invalid JSON.")?;
    let extensions = json_object(payload.extensions, "Extensions are invalid JSON.")?;

    let mut request = async_graphql::Request::new(query);
    if let Some(name) = payload.operation_name.filter(|n| !n.is_empty()) {
        request = request.operation_name(name);
    }
    if let Some(variables) = variables {
        request = request.variables(Variables::from_json(variables));
    }
    if let Some(serde_json::Value::Object(map)) = extensions {
        for (key, value) in map {
            let value = async_graphql::Value::from_json(value)
                .map_err(|_| bad_request("Extensions are invalid JSON."))?;
            request.extensions.insert(key, value);
        }
    }
    Ok(request)
}

#[async_trait::async_trait]
impl QueryEngine for GraphQLOptions {
    async fn run_http_query(
        &self,
        request: HttpQueryRequest,
        context: &InvocationContext,
    ) -> Result<HttpQueryResponse, QueryError> {
        let is_get = match request.request.method {
            Method::GET => true,
            Method::POST => false,
            _ => {
                return Err(HttpQueryError::new(405, "Only GET and POST requests are supported.")
                    .header("Allow", "GET, POST")
                    .into())
            }
        };

        let payload = match &request.query {
            QueryPayload::Body(body) => parse_body(body)?,
            QueryPayload::Params(params) => parse_params(params)?,
        };

        let mut gql_request = build_request(payload, is_get)?.data(context.clone());
        if !self.introspection {
            gql_request = gql_request.disable_introspection();
        }

        debug!(
            request_id = %context.request_id,
            url = %request.request.url,
            operation = ?gql_request.operation_name,
            "executing GraphQL request"
        );

        let response = self.schema.execute(gql_request).await;
        let body = serde_json::to_string(&response).map_err(QueryError::other)?;

        // Parse and validation failures carry no path and produce no data.
        let rejected = response.data == async_graphql::Value::Null
            && !response.errors.is_empty()
            && response.errors.iter().all(|e| e.path.is_empty());
        if rejected {
            return Err(HttpQueryError::graphql(400, body).into());
        }

        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Content-Length".to_string(), body.len().to_string());

        Ok(HttpQueryResponse {
            graphql_response: body,
            response_init: ResponseInit { headers },
        })
    }
}
