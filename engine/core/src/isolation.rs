//! Process-isolation harness (§4.5): runs a provider's `process_file` or
//! `convert_file_to_pdf` either in the caller or in a freshly spawned
//! worker, by a size threshold. Rust has no interpreter-global lock, so
//! unlike the source's `multiprocessing`-based harness this exists purely
//! to bound peak memory and contain a misbehaving parser's panic.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::chunk::Chunk;
use crate::error::{Error, Result};
use crate::providers::Provider;
use crate::source_file::SourceFile;

/// Default byte size above which process isolation engages (`filesize_threshold`, §6).
pub const DEFAULT_FILESIZE_THRESHOLD: u64 = 100_000;

pub struct IsolationHarness {
    threshold: u64,
}

impl IsolationHarness {
    pub fn new(threshold: u64) -> Self {
        Self { threshold }
    }

    async fn should_isolate(&self, provider: &dyn Provider, file: &SourceFile) -> Result<bool> {
        if !provider.multiprocessable() {
            return Ok(false);
        }
        Ok(file.size().await? >= self.threshold)
    }

    pub async fn process_file(
        &self,
        provider: Arc<dyn Provider>,
        file: SourceFile,
        chunk_size: Option<i64>,
        chunk_overlap: Option<i64>,
    ) -> Result<Vec<Chunk>> {
        if !self.should_isolate(provider.as_ref(), &file).await? {
            return provider.process_file(&file, chunk_size, chunk_overlap).await;
        }

        run_isolated(move || {
            let runtime = worker_runtime()?;
            runtime.block_on(provider.process_file(&file, chunk_size, chunk_overlap))
        })
        .await
    }

    pub async fn convert_file_to_pdf(&self, provider: Arc<dyn Provider>, file: SourceFile) -> Result<SourceFile> {
        if !self.should_isolate(provider.as_ref(), &file).await? {
            return provider.convert_file_to_pdf(&file).await;
        }

        run_isolated(move || {
            let runtime = worker_runtime()?;
            runtime.block_on(provider.convert_file_to_pdf(&file))
        })
        .await
    }
}

impl Default for IsolationHarness {
    fn default() -> Self {
        Self::new(DEFAULT_FILESIZE_THRESHOLD)
    }
}

fn worker_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Store(format!("failed to start isolated worker: {e}")))
}

/// Spawns `work` on a dedicated OS thread and awaits its result through a
/// single-shot channel, matching the contract that the harness either
/// returns the provider's exact result or re-raises its error (§9) — a
/// panic inside `work` is caught and surfaced as a store-level error rather
/// than propagating into the caller's thread.
async fn run_isolated<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();

    std::thread::spawn(move || {
        let result = std::panic::catch_unwind(AssertUnwindSafe(work))
            .unwrap_or_else(|payload| Err(Error::Store(format!("isolated worker panicked: {}", panic_message(payload)))));
        let _ = tx.send(result);
    });

    rx.await
        .map_err(|_| Error::Store("isolated worker dropped its result channel".to_string()))?
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderRegistry;

    #[tokio::test]
    async fn small_file_runs_in_caller() {
        let harness = IsolationHarness::new(DEFAULT_FILESIZE_THRESHOLD);
        let registry = ProviderRegistry::new();
        let guard = crate::source_file::temp_file(b"hello", Some("txt"), None, Some("a.txt"))
            .await
            .unwrap();
        let provider = registry.find(&guard).unwrap();
        let chunks = harness
            .process_file(provider, (*guard).clone(), None, None)
            .await
            .unwrap();
        assert_eq!(chunks[0].content, "hello");
    }
}
