//! Document ingestion and retrieval engine: binary entry point. Owns HTTP,
//! configuration loading, logging, and metrics — the concerns the core
//! crate (`doc_engine_core`) treats as external collaborators.

mod api;
mod config;
mod error;
mod log;
mod metrics;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use doc_engine_core::blob_store::{BlobStore, DevNullBlobStore, FilesystemBlobStore, ObjectStoreBlobStore, ObjectStoreConfig};
use doc_engine_core::embedder::{Embedder, NoOpEmbedder};
use doc_engine_core::vector_store::{AzureSearchConfig, AzureSearchStore, DevNullVectorStore, PgVectorStore, VectorStore};
use doc_engine_core::{IsolationHarness, ProviderRegistry, StoreService};

use config::{Args, Config, FileStoreType, VectorStoreType};
use metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub store_service: Arc<StoreService>,
    pub metrics: Arc<Metrics>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.into_config().context("failed to load configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    log::initialize_logging(config.log_format);
    tracing::info!(host = %config.host, port = config.port, "starting document engine");

    let blob_store = build_blob_store(&config).await?;
    let vector_store = build_vector_store(&config).await?;
    let embedder: Arc<dyn Embedder> = Arc::new(NoOpEmbedder::new(config.vector_store_dims));

    let store_service = Arc::new(StoreService::new(
        ProviderRegistry::new(),
        vector_store,
        blob_store,
        embedder,
        IsolationHarness::new(config.filesize_threshold),
        config.batch_size,
    ));

    let metrics = Arc::new(Metrics::new());
    let state = AppState {
        store_service,
        metrics: metrics.clone(),
    };

    let app = api::create_app(state);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .context("failed to bind TCP listener")?;
    tracing::info!("listening on http://{}:{}", config.host, config.port);

    if let Some(metrics_port) = config.metrics_port {
        let metrics_app = api::create_metrics_app(metrics);
        let metrics_listener = tokio::net::TcpListener::bind((config.host.as_str(), metrics_port))
            .await
            .context("failed to bind metrics listener")?;
        tracing::info!("metrics listening on http://{}:{}", config.host, metrics_port);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, metrics_app).await {
                tracing::error!(error = %e, "metrics server exited");
            }
        });
    }

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn build_blob_store(config: &Config) -> Result<Option<Arc<dyn BlobStore>>> {
    match &config.file_store_type {
        None => Ok(None),
        Some(FileStoreType::Filesystem) => {
            let basepath = config
                .file_store_filesystem_basepath
                .clone()
                .context("file_store_filesystem_basepath is required for the filesystem blob store")?;
            let store = FilesystemBlobStore::new(basepath).await?;
            Ok(Some(Arc::new(store) as Arc<dyn BlobStore>))
        }
        Some(FileStoreType::S3) => {
            let object_config = ObjectStoreConfig {
                endpoint_url: config.file_store_s3_endpoint_url.clone(),
                access_key_id: config.file_store_s3_access_key_id.clone(),
                secret_access_key: config.file_store_s3_secret_access_key.clone(),
                region_name: config.file_store_s3_region_name.clone(),
                bucket_name: config
                    .file_store_s3_bucket_name
                    .clone()
                    .context("file_store_s3_bucket_name is required for the s3 blob store")?,
            };
            let store = ObjectStoreBlobStore::new(object_config).await?;
            Ok(Some(Arc::new(store) as Arc<dyn BlobStore>))
        }
    }
}

async fn build_vector_store(config: &Config) -> Result<Arc<dyn VectorStore>> {
    let embedder: Arc<dyn Embedder> = Arc::new(NoOpEmbedder::new(config.vector_store_dims));

    match config.store_type {
        VectorStoreType::DevNull => Ok(Arc::new(DevNullVectorStore::default())),
        VectorStoreType::Pgvector => {
            let conn_str = config
                .vector_store_connection_string
                .clone()
                .context("vector_store_connection_string is required for pgvector")?;
            let store = PgVectorStore::new(&conn_str, config.vector_store_dims, embedder).await?;
            Ok(Arc::new(store))
        }
        VectorStoreType::AzureAiSearch => {
            let endpoint = config
                .azure_search_endpoint
                .clone()
                .context("azure_search_endpoint is required for azure-ai-search")?;
            let index_name = config
                .azure_search_index_name
                .clone()
                .context("azure_search_index_name is required for azure-ai-search")?;
            let api_key = config
                .azure_search_api_key
                .clone()
                .context("azure_search_api_key is required for azure-ai-search")?;
            let store = AzureSearchStore::new(AzureSearchConfig::new(endpoint, index_name, api_key), embedder);
            Ok(Arc::new(store))
        }
    }
}
