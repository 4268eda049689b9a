//! Server module for serving GraphQL over HTTP
//!
//! This module provides a `ServerBuilder` that mounts the GraphQL route,
//! merges custom routes and serves the application with graceful shutdown.

pub mod builder;
pub mod exposure;

pub use builder::ServerBuilder;
pub use exposure::{GraphQLExposure, HttpRequestInfo};
