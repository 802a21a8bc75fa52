//! HTTP binding for docsplice documents.
//!
//! Each route loads the document named by the `file_path` query parameter
//! (or the configured default), runs one operation on it and replies with
//! JSON. Documents are parsed per request on the blocking pool and never
//! written back.

mod config;
mod reply;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use docsplice::{DocError, DocumentParser, Engine};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub use config::{DEFAULT_DOCUMENT, ServerConfig};
pub use reply::{ApiError, Json, status_for};

/// What every handler needs: the engine and the fallback document.
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: Engine,
    pub default_document: PathBuf,
}

impl AppState {
    pub fn new(engine: Engine, default_document: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            default_document: default_document.into(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.engine, config.default_document.clone())
    }

    fn document_path(&self, params: &routes::Params) -> PathBuf {
        params
            .get("file_path")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| self.default_document.clone())
    }

    /// Parses the requested document on the blocking pool and runs `op`
    /// against it. The document is dropped before the reply is built.
    pub(crate) async fn with_document<R, F>(
        &self,
        params: &routes::Params,
        op: F,
    ) -> Result<R, ApiError>
    where
        F: FnOnce(&mut dyn DocumentParser) -> Result<R, DocError> + Send + 'static,
        R: Send + 'static,
    {
        let engine = self.engine;
        let path = self.document_path(params);
        debug!(path = %path.display(), %engine, "loading document");
        let result = tokio::task::spawn_blocking(move || {
            let mut doc = engine.open(&path);
            op(doc.as_mut())
        })
        .await
        .map_err(|err| ApiError::internal(format!("document task failed: {err}")))?;
        result.map_err(ApiError::from)
    }
}

/// Builds the router with every document route.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::hello))
        .route("/get-by-id", get(routes::get_by_id))
        .route("/check-exists", get(routes::check_exists))
        .route("/get-by-name", get(routes::get_by_name))
        .route("/get-elements-by-name", get(routes::get_elements_by_name))
        .route("/get-by-path", get(routes::get_by_path))
        .route("/get-elements-by-path", get(routes::get_elements_by_path))
        .route("/get-by-value", get(routes::get_by_value))
        .route("/get-by-jinja-variable", get(routes::get_by_jinja_variable))
        .route("/replace-by-id", post(routes::replace_by_id))
        .route("/remove-by-id", delete(routes::remove_by_id))
        .route(
            "/delete-elements-by-path",
            delete(routes::delete_elements_by_path),
        )
        .route(
            "/insert-element-by-path",
            post(routes::insert_element_by_path),
        )
        .route(
            "/update-element-by-path",
            post(routes::update_element_by_path),
        )
        .route("/check-if-node-exists", post(routes::check_if_node_exists))
        .fallback(routes::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Serves the router on an already bound listener until the process exits.
pub async fn serve_on(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}

/// Binds the configured address and serves.
pub async fn serve(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(config.addr()).await?;
    info!(
        addr = %listener.local_addr()?,
        engine = %config.engine,
        document = %config.default_document.display(),
        "docsplice server listening"
    );
    serve_on(listener, AppState::from_config(&config)).await?;
    Ok(())
}
