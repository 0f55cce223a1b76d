//! HTTP read surface over the latest stock snapshot.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use stock::StockHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub stock: StockHandle,
    pub watch_list: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(stock: StockHandle, watch_list: Vec<String>) -> Self {
        Self {
            stock,
            watch_list: Arc::new(watch_list),
        }
    }
}

pub fn router(state: AppState, static_dir: Option<&str>) -> Router {
    let mut app = Router::new()
        .route("/wanted", get(wanted))
        .route("/all", get(all_items))
        .route("/last-seen", get(last_seen))
        .route("/images", get(images))
        .route("/restocked", get(restocked))
        .route("/health", get(health));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serialize `value` with an exact `Content-Length` and a wildcard CORS origin.
fn json_response<T: Serialize>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
                (header::CONTENT_LENGTH, HeaderValue::from(body.len())),
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
            ],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to serialize response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn wanted(State(state): State<AppState>) -> Response {
    let container = state.stock.container().await;
    json_response(&container.wanted_stock(&state.watch_list))
}

async fn all_items(State(state): State<AppState>) -> Response {
    let container = state.stock.container().await;
    json_response(&container.all_items())
}

async fn last_seen(State(state): State<AppState>) -> Response {
    let container = state.stock.container().await;
    json_response(&container.last_seen())
}

async fn images(State(state): State<AppState>) -> Response {
    let container = state.stock.container().await;
    json_response(container.image_data())
}

async fn restocked(State(state): State<AppState>) -> Response {
    let update = state.stock.current().await;
    json_response(&*update.restocked)
}

async fn health() -> &'static str {
    "OK"
}
