//! ServerBuilder for fluent API to build HTTP servers

use super::exposure::{GraphQLExposure, HttpRequestInfo};
use crate::config::ServerConfig;
use crate::core::{ExecutionContext, OptionsFactory, OptionsSource, QueryOptions};
use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;

/// Builder for creating GraphQL HTTP servers
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(ServerConfig::from_yaml_file("server.yaml")?)
///     .with_options(QueryOptions::new(Arc::new(engine), ()))
///     .build()?;
/// ```
pub struct ServerBuilder<C: ExecutionContext> {
    config: ServerConfig,
    options: Option<OptionsSource<HttpRequestInfo, C>>,
    custom_routes: Vec<Router>,
}

impl<C: ExecutionContext> ServerBuilder<C> {
    /// Create a new ServerBuilder with the default configuration
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            options: None,
            custom_routes: Vec::new(),
        }
    }

    /// Replace the server configuration
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Serve every request with the same options
    ///
    /// The configuration's execution settings are applied when building.
    pub fn with_options(mut self, options: QueryOptions<C>) -> Self {
        self.options = Some(OptionsSource::Static(options));
        self
    }

    /// Build options per request from its transport arguments
    ///
    /// The factory owns its flags; execution settings are not applied.
    pub fn with_options_factory(
        mut self,
        factory: impl OptionsFactory<HttpRequestInfo, C> + 'static,
    ) -> Self {
        self.options = Some(OptionsSource::factory(factory));
        self
    }

    /// Add custom routes to the server
    ///
    /// Use this for routes that are not GraphQL, such as health checks or
    /// webhooks.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Configuration the server will run with
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the final router
    pub fn build(self) -> Result<Router> {
        self.config.validate()?;

        let mut options = self
            .options
            .ok_or_else(|| anyhow::anyhow!("Execution options are required"))?;
        if let OptionsSource::Static(options) = &mut options {
            options.apply_settings(&self.config.execution);
        }

        let mut app = GraphQLExposure::build_router(options, &self.config.server.path);
        for routes in self.custom_routes {
            app = app.merge(routes);
        }

        Ok(app)
    }

    /// Serve on the configured address with graceful shutdown
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.server.address();
        self.serve_on(&addr).await
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve_on(self, addr: &str) -> Result<()> {
        let path = self.config.server.path.clone();
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("GraphQL server listening on {}{}", addr, path);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl<C: ExecutionContext> Default for ServerBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::warn!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
