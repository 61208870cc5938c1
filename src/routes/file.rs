//! File route definitions

use axum::Router;

use crate::app_state::AppState;
use crate::handlers::*;

pub fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/api/files", axum::routing::post(upload_file))
        .route("/api/files/:id", axum::routing::get(get_file))
}
