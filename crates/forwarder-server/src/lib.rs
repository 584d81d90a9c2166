//! HTTP server assembly: routes, middleware and graceful shutdown

mod auth;
mod cors;
mod health;
mod request_context;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use forwarder_auth::{Authorizer, StaticKeyAuthorizer};
use forwarder_config::Config;
use forwarder_llm::LlmState;
use forwarder_registry::CapabilityRegistry;
use tower_http::trace::TraceLayer;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a chat or image provider fails to initialize
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8787)));

        let registry = Arc::new(CapabilityRegistry::from_config(&config.models));
        tracing::debug!(models = registry.entries().count(), "capability registry built");

        let imagegen_state = forwarder_imagegen::build_server(config, Arc::clone(&registry))?;
        let llm_state = LlmState::from_config(&config.llm, registry)
            .map_err(|e| anyhow::anyhow!("failed to initialize chat providers: {e}"))?;

        let mut app = Router::new();

        // Health check
        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }

        // Chat, responses and model listing
        app = app.merge(forwarder_llm::llm_router(llm_state));

        // Image generation
        app = app.merge(forwarder_imagegen::endpoint_router().with_state(imagegen_state));

        // Middleware layers, innermost first

        // Request context runs just before handlers
        app = app.layer(axum::middleware::from_fn(request_context::request_context_middleware));

        // Bearer authentication
        let authorizer = StaticKeyAuthorizer::from_config(config.server.auth.as_ref());
        if authorizer.is_enabled() {
            let authorizer: Arc<dyn Authorizer> = Arc::new(authorizer);
            let public_paths: Arc<[String]> = config
                .server
                .auth
                .as_ref()
                .map(|auth| auth.public_paths.clone())
                .unwrap_or_default()
                .into();

            app = app.layer(axum::middleware::from_fn(move |req, next| {
                let authorizer = Arc::clone(&authorizer);
                let public_paths = Arc::clone(&public_paths);
                async move { auth::auth_middleware(authorizer, public_paths, req, next).await }
            }));
        }

        // Tracing
        app = app.layer(TraceLayer::new_for_http());

        // CORS
        if let Some(ref cors_config) = config.server.cors {
            app = app.layer(cors::cors_layer(cors_config));
        }

        Ok(Self {
            router: app,
            listen_address,
        })
    }

    /// Replace the configured listen address
    #[must_use]
    pub fn with_listen_address(mut self, listen_address: SocketAddr) -> Self {
        self.listen_address = listen_address;
        self
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}
