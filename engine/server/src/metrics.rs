//! Prometheus metrics (§4.11): incremented only on successful full
//! processing of a file (§7), per `format` where applicable.

use prometheus::{Encoder, HistogramVec, IntCounter, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    pub files_ingested_total: IntCounter,
    pub files_ingested_bytes: prometheus::Histogram,
    pub ingest_duration_seconds: HistogramVec,
    pub search_requests_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let files_ingested_total =
            IntCounter::new("files_ingested_total", "Number of files fully processed and stored").unwrap();
        let files_ingested_bytes = prometheus::Histogram::with_opts(prometheus::HistogramOpts::new(
            "files_ingested_bytes",
            "Size in bytes of successfully ingested files",
        ))
        .unwrap();
        let ingest_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new("ingest_duration_seconds", "Time spent processing a file, by format"),
            &["format"],
        )
        .unwrap();
        let search_requests_total =
            IntCounter::new("search_requests_total", "Number of similarity search requests served").unwrap();

        registry.register(Box::new(files_ingested_total.clone())).unwrap();
        registry.register(Box::new(files_ingested_bytes.clone())).unwrap();
        registry.register(Box::new(ingest_duration_seconds.clone())).unwrap();
        registry.register(Box::new(search_requests_total.clone())).unwrap();

        Self {
            registry,
            files_ingested_total,
            files_ingested_bytes,
            ingest_duration_seconds,
            search_requests_total,
        }
    }

    /// Renders the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        encoder.encode(&families, &mut buffer).expect("metrics encoding cannot fail");
        String::from_utf8(buffer).expect("prometheus text output is always valid utf-8")
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

