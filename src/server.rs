//! HTTP/WebSocket server: shared state, router and listener.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use derive_getters::Getters;
use tower::ServiceBuilder;
use tracing::{info, instrument};

use crate::admin::{dataset_sizes, health, reload_datasets};
use crate::config::ServerConfig;
use crate::dataset::DatasetLoader;
use crate::handler::CommandHandler;
use crate::registry::{RegistryOptions, SessionRegistry};
use crate::words::SharedWordSets;
use crate::ws::{WsGateway, ws_handler};

/// State shared by every route.
#[derive(Debug, Clone, Getters)]
pub struct AppState {
    /// Command dispatcher, owning the registry.
    handler: CommandHandler,
    /// Live connections and rooms.
    gateway: Arc<WsGateway>,
    /// Word sets every session validates against.
    words: Arc<SharedWordSets>,
    /// Reads datasets for reloads.
    loader: DatasetLoader,
}

impl AppState {
    /// Wires a registry over `words`, delivering through a fresh gateway.
    pub fn new(config: &ServerConfig, words: Arc<SharedWordSets>, loader: DatasetLoader) -> Self {
        let gateway = Arc::new(WsGateway::new());
        let registry = Arc::new(SessionRegistry::new(
            RegistryOptions::from(config),
            words.clone(),
            gateway.clone(),
        ));
        Self {
            handler: CommandHandler::new(registry),
            gateway,
            words,
            loader,
        }
    }

    /// The session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.handler.registry()
    }
}

/// The game server process.
#[derive(Debug, Getters)]
pub struct GameServer {
    config: ServerConfig,
    state: AppState,
}

impl GameServer {
    /// Loads datasets and builds the shared state.
    ///
    /// # Errors
    ///
    /// Fails if the dataset directory cannot be prepared.
    #[instrument(skip(config), fields(data_dir = %config.data_dir().display()))]
    pub fn new(config: ServerConfig) -> Result<Self> {
        let loader = DatasetLoader::new(config.data_dir().clone());
        let sets = loader.load_all().context("Failed to load datasets")?;
        let words = Arc::new(SharedWordSets::new(sets));
        let state = AppState::new(&config, words, loader);
        info!("Game server initialized");
        Ok(Self { config, state })
    }

    /// Routes served by the process.
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Binds the configured address and serves until ctrl-c.
    ///
    /// # Errors
    ///
    /// Fails if the address cannot be bound or the server stops with an
    /// I/O error.
    #[instrument(skip(self), fields(host = %self.config.host(), port = self.config.port()))]
    pub async fn serve(self) -> Result<()> {
        let app = self.router();
        let address = (self.config.host().as_str(), *self.config.port());
        let listener = tokio::net::TcpListener::bind(address)
            .await
            .with_context(|| format!("Failed to bind {}:{}", address.0, address.1))?;
        info!(address = %listener.local_addr()?, "Server ready");

        let registry = self.state.registry().clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutdown requested");
            })
            .await?;
        registry.shutdown().await;
        info!("Server stopped");
        Ok(())
    }
}

/// Builds the router over `state`, with request logging.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/admin/datasets", get(dataset_sizes))
        .route("/admin/reload-datasets", post(reload_datasets))
        .route("/health", get(health))
        .layer(ServiceBuilder::new().map_request(|req: Request<Body>| {
            info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
            req
        }))
        .with_state(state)
}
