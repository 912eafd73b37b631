//! Route table (§6): `POST /files`, `GET /files`, `GET /documents/pdf`,
//! `DELETE /files/{doc_id}`, plus the ambient `/health` convention.

use axum::routing::{delete, get, post};
use axum::Router;

use super::handlers;
use crate::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/files", post(handlers::add_file))
        .route("/files", get(handlers::search_files))
        .route("/files/{doc_id}", delete(handlers::delete_file))
        .route("/documents/pdf", get(handlers::get_document_pdf))
        .with_state(state)
}
