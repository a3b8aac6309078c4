// Extension Server
//
// Embedded HTTP server backing the loader:
// - POST listing endpoint answering which files an extension point has
// - Static file serving of the base directory, so module and markup paths
//   reported by the listing resolve directly

use crate::config::ServerConfig;
use crate::extensions::plugins::validate_extension_point;
use crate::extensions::{
    normalize_path, ExtensionResolver, LoadExtensionsRequest, LoadExtensionsResponse,
    PluginDirResolver,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

/// Future driving a bound server until it stops
pub type ServerFuture = Pin<Box<dyn Future<Output = std::io::Result<()>> + Send>>;

#[derive(Clone)]
pub struct ServerState {
    pub resolver: Arc<PluginDirResolver>,
}

pub struct ExtensionServer {
    config: ServerConfig,
}

impl ExtensionServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn resolver(&self) -> PluginDirResolver {
        PluginDirResolver::new(
            self.config.base_dir.clone(),
            self.config.resolved_plugin_roots(),
        )
    }

    pub fn router(&self) -> Router {
        let state = Arc::new(ServerState {
            resolver: Arc::new(self.resolver()),
        });

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route(&normalize_path(&self.config.endpoint), post(load_webui_extensions))
            .fallback_service(ServeDir::new(&self.config.base_dir))
            .layer(cors)
            .with_state(state)
    }

    /// Bind the listener; the returned future serves requests until dropped
    pub async fn bind(self) -> anyhow::Result<(SocketAddr, ServerFuture)> {
        let app = self.router();

        let addr = SocketAddr::from(([127, 0, 0, 1], self.config.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        log::info!("Extension server starting on http://{}", local_addr);
        log::info!("Base directory: {:?}", self.config.base_dir);

        Ok((local_addr, Box::pin(axum::serve(listener, app).into_future())))
    }

    pub async fn start(self) -> anyhow::Result<()> {
        let (_, server) = self.bind().await?;
        server.await?;

        Ok(())
    }
}

// List webui extension files for an extension point
async fn load_webui_extensions(
    State(state): State<Arc<ServerState>>,
    Json(input): Json<LoadExtensionsRequest>,
) -> Response {
    if let Err(e) = validate_extension_point(&input.extension_point) {
        return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
    }

    match state
        .resolver
        .resolve(&input.extension_point, &input.filters)
        .await
    {
        Ok(extensions) => Json(LoadExtensionsResponse { extensions }).into_response(),
        Err(e) => {
            log::error!(
                "Failed to list extensions for {}: {:#}",
                input.extension_point,
                e
            );
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)).into_response()
        }
    }
}
