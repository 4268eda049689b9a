//! Echo server
//!
//! Serves a tiny schema over GET and POST:
//!
//! ```text
//! curl 'http://127.0.0.1:4000/graphql?query=%7Bhello%7D'
//! curl -X POST http://127.0.0.1:4000/graphql \
//!   -d '[{"query":"mutation { increment }"},{"query":"{ counter }"}]'
//! ```
//!
//! Pass a YAML configuration file as first argument to override defaults.

use graphql_http::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::from_yaml_file(&path)?,
        None => ServerConfig::default(),
    };

    let engine = ResolverEngine::<Arc<AtomicU64>>::new()
        .query("hello", |_| async { Ok(json!("world")) })
        .query("echo", |args: ResolverArgs<Arc<AtomicU64>>| async move {
            Ok(args.args.get("text").cloned().unwrap_or(Value::Null))
        })
        .query("counter", |args: ResolverArgs<Arc<AtomicU64>>| async move {
            Ok(json!(args.context.load(Ordering::SeqCst)))
        })
        .mutation("increment", |args: ResolverArgs<Arc<AtomicU64>>| async move {
            Ok(json!(args.context.fetch_add(1, Ordering::SeqCst) + 1))
        });

    let options = QueryOptions::new(Arc::new(engine), Arc::new(AtomicU64::new(0)))
        .with_log_function(|message: &LogMessage| {
            tracing::trace!(action = ?message.action, step = ?message.step, "graphql");
        });

    ServerBuilder::new()
        .with_config(config)
        .with_options(options)
        .with_custom_routes(
            Router::new().route("/health", axum::routing::get(|| async { "ok" })),
        )
        .serve()
        .await
}
