//! Deferred posting loaders
//!
//! A lazy index owns a loader handed to it at construction. The loader runs
//! on first query; a rejected load leaves the index unloaded.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use serde::de::DeserializeOwned;

use super::inverted::PostingMap;
use super::snapshot;

/// Future returned by a loader
pub type LoadFuture<'a, K> = Pin<Box<dyn Future<Output = Result<PostingMap<K>, String>> + Send + 'a>>;

/// Materializes the posting map of a deferred index
pub trait PostingLoader<K>: Send + Sync {
    fn load(&self) -> LoadFuture<'_, K>;
}

/// Adapts an async closure into a loader
pub struct FnLoader<F>(pub F);

impl<K, F, Fut> PostingLoader<K> for FnLoader<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<PostingMap<K>, String>> + Send + 'static,
{
    fn load(&self) -> LoadFuture<'_, K> {
        Box::pin((self.0)())
    }
}

/// Reads a snapshot file written from `InvertedIndex::serialize`
#[derive(Debug, Clone)]
pub struct FileLoader {
    path: PathBuf,
}

impl FileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl<K> PostingLoader<K> for FileLoader
where
    K: DeserializeOwned + Send + 'static,
{
    fn load(&self) -> LoadFuture<'_, K> {
        Box::pin(async move {
            let bytes = tokio::fs::read(&self.path)
                .await
                .map_err(|e| format!("{}: {}", self.path.display(), e))?;
            snapshot::decode(&bytes).map_err(|e| e.to_string())
        })
    }
}
