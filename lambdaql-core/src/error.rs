use std::collections::HashMap;

/// Boxed error carried on the invocation's error channel.
///
/// Same shape as `lambda_runtime::Error`, so errors cross the runtime edge untouched.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum LambdaqlError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Options error: {0}")]
    Options(String),
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Resolver error: {0}")]
    Resolver(String),
}

pub type Result<T> = std::result::Result<T, LambdaqlError>;

/// A client-facing failure raised by the query engine.
///
/// The adapter turns these into response envelopes instead of invocation errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HttpQueryError {
    pub status_code: u16,
    pub message: String,
    /// Set when `message` is already a serialized GraphQL response.
    pub is_graphql_error: bool,
    pub headers: HashMap<String, String>,
}

impl HttpQueryError {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            is_graphql_error: false,
            headers: HashMap::new(),
        }
    }

    /// A tagged error whose body is a JSON `{"errors": [...]}` document.
    pub fn graphql(status_code: u16, body: impl Into<String>) -> Self {
        let mut err = Self::new(status_code, body).header("Content-Type", "application/json");
        err.is_graphql_error = true;
        err
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Failure of a query engine call.
#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Http(#[from] HttpQueryError),
    #[error("{0}")]
    Other(BoxError),
}

impl QueryError {
    pub fn other(err: impl Into<BoxError>) -> Self {
        QueryError::Other(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graphql_error_carries_json_content_type() {
        let err = HttpQueryError::graphql(400, r#"{"errors":[]}"#);
        assert!(err.is_graphql_error);
        assert_eq!(err.status_code, 400);
        assert_eq!(
            err.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn other_keeps_the_original_error() {
        let err = QueryError::other(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        match err {
            QueryError::Other(inner) => {
                assert!(inner.downcast_ref::<std::io::Error>().is_some());
                assert_eq!(inner.to_string(), "boom");
            }
            QueryError::Http(_) => panic!("expected untagged error"),
        }
    }
}
