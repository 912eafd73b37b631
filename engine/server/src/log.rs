//! Logging and HTTP tracing setup (§4.10): Bunyan JSON or human-readable
//! text, chosen (or auto-detected from TTY) via [`crate::config::LogFormat`].

use axum::extract::MatchedPath;
use axum::http::Request;
use tower_http::trace::TraceLayer;
use tracing::info_span;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

/// Initializes the global tracing subscriber. Only the binary crate calls
/// this; `doc_engine_core` only ever emits events.
pub fn initialize_logging(log_format: LogFormat) {
    let env_filter = EnvFilter::from_default_env();

    match log_format.resolve() {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(JsonStorageLayer)
                .with(BunyanFormattingLayer::new(
                    "doc-engine-server".to_string(),
                    std::io::stdout,
                ))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
        LogFormat::Auto => unreachable!("resolve() never returns Auto"),
    }
}

/// A `TraceLayer` that attaches `endpoint`/`method` fields to every request
/// span, the way the teacher's `create_http_trace_layer` does.
pub fn create_http_trace_layer<B>() -> TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
    impl tower_http::trace::MakeSpan<B> + Clone,
> {
    TraceLayer::new_for_http().make_span_with(|request: &Request<B>| {
        let matched_path = request
            .extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str())
            .unwrap_or("unknown");

        info_span!(
            "http_request",
            method = %request.method(),
            endpoint = %matched_path,
        )
    })
}
