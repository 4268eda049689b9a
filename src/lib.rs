//! # GraphQL HTTP Runner
//!
//! Runs GraphQL requests arriving over HTTP: one operation or a batch of
//! them, each executed by a pluggable engine, with results assembled in the
//! order they were sent.
//!
//! ## Features
//!
//! - **GET and POST**: GET is read-only; mutations over GET are refused with `405`
//! - **Batching**: an array body runs every operation and answers with an array
//! - **Ordering**: serial operations run one by one, the rest concurrently
//! - **Context Isolation**: every batched operation gets its own context clone
//! - **Typed HTTP Errors**: request-level failures carry status, body and headers
//! - **Per-Request Options**: static options or a factory fed with the request
//! - **Built-in Engine**: root-field resolvers with projection of sub-selections
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use graphql_http::prelude::*;
//!
//! let engine = ResolverEngine::<()>::new()
//!     .query("hello", |_| async { Ok(json!("world")) });
//!
//! ServerBuilder::new()
//!     .with_options(QueryOptions::new(Arc::new(engine), ()))
//!     .serve()
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod engine;
pub mod runner;
pub mod server;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Types ===
    pub use crate::core::{
        ClassifyError, ConfigError, DefaultErrorFormatter, ErrorFormatter, ExecutionContext,
        ExecutionEngine, ExecutionFailure, ExecutionParams, ExecutionResult, FormattedError,
        HttpQueryError, HttpQueryRequest, LogAction, LogMessage, LogStep, OperationKind,
        OptionsFactory, OptionsSource, PathSegment, QueryInput, QueryOptions, RawOperation,
        RequestPayload, VariablesInput, classify, parse_document,
    };

    // === Runner ===
    pub use crate::runner::run_http_query;

    // === Engine ===
    pub use crate::engine::{ResolverArgs, ResolverEngine};

    // === Config ===
    pub use crate::config::{ExecutionSettings, ServerConfig, ServerSettings};

    // === Server ===
    pub use crate::server::{GraphQLExposure, HttpRequestInfo, ServerBuilder};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde_json::{Value, json};
    pub use std::sync::Arc;

    // === Axum ===
    pub use axum::{
        Router,
        http::{Method, StatusCode},
    };
}
