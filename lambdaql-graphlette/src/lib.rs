pub mod options;
pub mod runner;
pub mod schema_builder;

pub use options::{GraphQLOptions, GraphQLOptionsBuilder};
pub use schema_builder::{build_schema, Resolver, ResolverRegistry};
