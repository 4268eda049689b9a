//! API exposures
//!
//! An exposure turns execution options into an Axum router for one
//! protocol. Only GraphQL over HTTP is provided.

pub mod graphql;

pub use graphql::{GraphQLExposure, HttpRequestInfo};
