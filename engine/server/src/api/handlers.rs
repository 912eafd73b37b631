//! Request handlers (§6): thin translation between HTTP and `StoreService`.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use doc_engine_core::source_file::temp_file;

use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::AppState;

pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn metrics(State(metrics): State<std::sync::Arc<Metrics>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        metrics.render(),
    )
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

pub async fn add_file(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<impl IntoResponse> {
    let bucket = header(&headers, "bucket").ok_or_else(|| Error::BadRequest("missing 'bucket' header".to_string()))?;
    let id = header(&headers, "id").ok_or_else(|| Error::BadRequest("missing 'id' header".to_string()))?;
    let file_name =
        header(&headers, "fileName").ok_or_else(|| Error::BadRequest("missing 'fileName' header".to_string()))?;
    let mime_type = header(&headers, "fileMimeType").unwrap_or_default();

    let guard = temp_file(&body, None, Some(&mime_type), Some(&file_name))
        .await
        .map_err(Error::Core)?;
    let file = doc_engine_core::SourceFile::new(id.clone(), guard.path().to_path_buf(), mime_type, file_name, false);

    let started = std::time::Instant::now();
    let format = state.store_service.add_file(file, &bucket, &id, None, None).await.map_err(Error::Core)?;

    state.metrics.ingest_duration_seconds.with_label_values(&[format]).observe(started.elapsed().as_secs_f64());
    state.metrics.files_ingested_bytes.observe(body.len() as f64);
    state.metrics.files_ingested_total.inc();

    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    query: String,
    bucket: Option<String>,
    take: usize,
    #[serde(rename = "docIds")]
    doc_ids: Option<String>,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    sources: Vec<doc_engine_core::SourceDto>,
}

pub async fn search_files(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    let doc_ids = params.doc_ids.map(|s| s.split(',').map(str::to_string).collect::<Vec<_>>());

    let chunks = state
        .store_service
        .search(&params.query, params.bucket.as_deref(), params.take, doc_ids)
        .await
        .map_err(Error::Core)?;
    let sources = state.store_service.get_file_sources(&chunks).await.map_err(Error::Core)?;

    state.metrics.search_requests_total.inc();

    Ok(Json(SearchResponse { sources }))
}

#[derive(Debug, Deserialize)]
pub struct PdfQuery {
    doc_id: String,
}

pub async fn get_document_pdf(State(state): State<AppState>, Query(params): Query<PdfQuery>) -> Result<impl IntoResponse> {
    let pdf = state.store_service.get_document_pdf(&params.doc_id).await.map_err(Error::Core)?;
    let Some(pdf) = pdf else {
        return Err(Error::Core(doc_engine_core::Error::NotFound(params.doc_id)));
    };

    let bytes = pdf.buffer().await.map_err(Error::Core)?;
    Ok((StatusCode::OK, [("Content-Type", "application/pdf")], bytes))
}

pub async fn delete_file(State(state): State<AppState>, Path(doc_id): Path<String>) -> Result<impl IntoResponse> {
    state.store_service.delete_file(&doc_id).await.map_err(Error::Core)?;
    Ok(StatusCode::OK)
}
