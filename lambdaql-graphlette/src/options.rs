use async_graphql::dynamic::Schema;
use lambdaql_core::LambdaqlError;

/// Options for the async-graphql query engine.
#[derive(Clone)]
pub struct GraphQLOptions {
    pub(crate) schema: Schema,
    pub(crate) introspection: bool,
}

impl GraphQLOptions {
    pub fn builder() -> GraphQLOptionsBuilder {
        GraphQLOptionsBuilder::default()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn introspection(&self) -> bool {
        self.introspection
    }
}

pub struct GraphQLOptionsBuilder {
    schema: Option<Schema>,
    introspection: bool,
}

impl Default for GraphQLOptionsBuilder {
    fn default() -> Self {
        Self {
            schema: None,
            introspection: true,
        }
    }
}

impl GraphQLOptionsBuilder {
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn introspection(mut self, enabled: bool) -> Self {
        self.introspection = enabled;
        self
    }

    /// Fails when no schema was supplied; such options could never run a query.
    pub fn build(self) -> lambdaql_core::Result<GraphQLOptions> {
        let schema = self
            .schema
            .ok_or_else(|| LambdaqlError::Options("GraphQL options require a schema".to_string()))?;
        Ok(GraphQLOptions {
            schema,
            introspection: self.introspection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_without_schema_are_unusable() {
        let err = GraphQLOptions::builder().build().err().unwrap();
        assert!(matches!(err, LambdaqlError::Options(_)));
    }
}
