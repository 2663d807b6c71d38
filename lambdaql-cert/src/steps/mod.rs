pub mod adapter;
pub mod graphql;
