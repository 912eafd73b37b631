//! Configuration loading (§4.9 / §6): a TOML file (optional, via `--config`)
//! provides a base, overridden field-by-field by CLI flags. `TMP_FILES_ROOT`
//! is read directly from the environment by `doc_engine_core::source_file`,
//! not through this struct.

use std::fs;
use std::io::IsTerminal;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
    #[default]
    Auto,
}

impl LogFormat {
    /// Resolves `Auto` to `Json` when stdout is not a TTY, `Text` otherwise.
    pub fn resolve(self) -> LogFormat {
        match self {
            LogFormat::Auto if std::io::stdout().is_terminal() => LogFormat::Text,
            LogFormat::Auto => LogFormat::Json,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStoreType {
    Filesystem,
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VectorStoreType {
    Pgvector,
    AzureAiSearch,
    DevNull,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub metrics_port: Option<u16>,
    pub log_format: LogFormat,

    pub file_store_type: Option<FileStoreType>,
    pub file_store_filesystem_basepath: Option<String>,
    pub file_store_s3_endpoint_url: Option<String>,
    pub file_store_s3_access_key_id: Option<String>,
    pub file_store_s3_secret_access_key: Option<String>,
    pub file_store_s3_region_name: Option<String>,
    pub file_store_s3_bucket_name: Option<String>,

    pub store_type: VectorStoreType,
    pub vector_store_connection_string: Option<String>,
    pub vector_store_dims: usize,
    pub azure_search_endpoint: Option<String>,
    pub azure_search_index_name: Option<String>,
    pub azure_search_api_key: Option<String>,

    pub batch_size: usize,
    pub filesize_threshold: u64,
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            metrics_port: None,
            log_format: LogFormat::Auto,
            file_store_type: None,
            file_store_filesystem_basepath: None,
            file_store_s3_endpoint_url: None,
            file_store_s3_access_key_id: None,
            file_store_s3_secret_access_key: None,
            file_store_s3_region_name: None,
            file_store_s3_bucket_name: None,
            store_type: VectorStoreType::DevNull,
            vector_store_connection_string: None,
            vector_store_dims: 1536,
            azure_search_endpoint: None,
            azure_search_index_name: None,
            azure_search_api_key: None,
            batch_size: 0,
            filesize_threshold: doc_engine_core::DEFAULT_FILESIZE_THRESHOLD,
            workers: 4,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::Config(format!("failed to read config: {e}")))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("failed to parse config: {e}")))
    }
}

#[derive(Parser, Debug)]
#[command(name = "doc-engine-server")]
#[command(about = "Document ingestion and retrieval engine", long_about = None)]
pub struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(short, long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub metrics_port: Option<u16>,

    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(long)]
    pub filesize_threshold: Option<u64>,

    #[arg(long)]
    pub workers: Option<usize>,
}

impl Args {
    /// Loads the base config (file or default) and applies CLI overrides.
    pub fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(metrics_port) = self.metrics_port {
            config.metrics_port = Some(metrics_port);
        }
        if let Some(log_format) = self.log_format {
            config.log_format = log_format;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(filesize_threshold) = self.filesize_threshold {
            config.filesize_threshold = filesize_threshold;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }

        Ok(config)
    }
}
