use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use once_cell::sync::Lazy;
use tokio::sync::Mutex;

use super::BlobStore;
use crate::error::{Error, Result};
use crate::source_file::{temp_file, SourceFile, TempFileGuard};

/// Connection parameters for the object-store blob store variant, mirroring
/// the `file_store_s3_*` configuration keys in spec §6.
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    pub endpoint_url: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region_name: String,
    pub bucket_name: String,
}

/// Serialises "create bucket if it doesn't exist" across every object-store
/// client in the process, so two concurrent startups don't race (§5).
static BUCKET_CREATE_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// S3-compatible object-store blob store.
pub struct ObjectStoreBlobStore {
    client: Client,
    bucket: String,
}

impl ObjectStoreBlobStore {
    /// Builds a client for `config` and ensures the target bucket exists,
    /// treating "already owned by you" as success (§4.2).
    pub async fn new(config: ObjectStoreConfig) -> Result<Self> {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "doc-engine",
        );

        let mut builder = aws_sdk_s3::config::Builder::new()
            .region(Region::new(config.region_name.clone()))
            .credentials_provider(credentials)
            .force_path_style(true);

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(builder.build());
        let store = Self {
            client,
            bucket: config.bucket_name,
        };

        store.ensure_bucket().await?;
        Ok(store)
    }

    async fn ensure_bucket(&self) -> Result<()> {
        let _guard = BUCKET_CREATE_LOCK.lock().await;
        match self
            .client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(e)) if e.err().is_bucket_already_owned_by_you() => Ok(()),
            Err(SdkError::ServiceError(e)) if e.err().is_bucket_already_exists() => Ok(()),
            Err(e) => Err(Error::Store(format!("failed to create bucket: {e}"))),
        }
    }
}

#[async_trait]
impl BlobStore for ObjectStoreBlobStore {
    async fn add_document(&self, file: &SourceFile) -> Result<()> {
        let bytes = file.buffer().await?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(file.id())
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| Error::Store(format!("put_object failed: {e}")))?;
        Ok(())
    }

    async fn delete(&self, doc_id: &str) -> Result<()> {
        if !self.exists(doc_id).await? {
            return Err(Error::NotFound(doc_id.to_string()));
        }
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(doc_id)
            .send()
            .await
            .map_err(|e| Error::Store(format!("delete_object failed: {e}")))?;
        Ok(())
    }

    async fn get_document(&self, doc_id: &str) -> Result<SourceFile> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(doc_id)
            .send()
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    Error::NotFound(doc_id.to_string())
                } else {
                    Error::Store(format!("get_object failed: {e}"))
                }
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| Error::Store(format!("failed reading object body: {e}")))?
            .into_bytes();

        let guard: TempFileGuard = temp_file(&bytes, None, None, Some(doc_id)).await?;
        Ok(guard.into_inner())
    }

    async fn exists(&self, doc_id: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(doc_id)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(Error::Store(format!("head_object failed: {e}"))),
        }
    }
}

fn is_not_found<E, R>(err: &SdkError<E, R>) -> bool {
    if let SdkError::ServiceError(service_err) = err {
        return service_err.raw().status().as_u16() == 404;
    }
    false
}
