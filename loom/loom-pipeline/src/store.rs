//! The artifact store boundary.
//!
//! The pipeline persists every stage's output through this trait; the
//! backing storage is free to be a filesystem, a database or anything
//! key-value shaped. The first failed write aborts the job.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

/// The store could not persist an artifact.
#[derive(Debug, Error)]
#[error("Store unavailable while writing {path}: {detail}")]
pub struct StoreError {
    pub path: String,
    pub detail: String,
}

/// Artifact persistence, keyed by job id and artifact path.
pub trait ArtifactStore: Send + Sync {
    fn put(&self, job_id: &str, path: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

/// Filesystem-backed store: artifacts land under `<root>/<job_id>/<path>`.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn target(&self, job_id: &str, path: &str) -> PathBuf {
        let mut full = self.root.join(job_id);
        for part in path.split('/') {
            full.push(part);
        }
        full
    }
}

impl ArtifactStore for FsStore {
    fn put(&self, job_id: &str, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let target = self.target(job_id, path);
        let io_err = |e: io::Error| StoreError {
            path: path.to_string(),
            detail: e.to_string(),
        };
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(&target, bytes).map_err(io_err)
    }
}

/// In-memory store for tests.
#[derive(Debug, Default)]
pub struct MemStore {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    /// Artifact path that fails on write, to exercise abort behavior.
    fail_on: Option<String>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses to write the given artifact path.
    pub fn failing_on(path: impl Into<String>) -> Self {
        Self {
            files: Mutex::new(BTreeMap::new()),
            fail_on: Some(path.into()),
        }
    }

    pub fn get(&self, job_id: &str, path: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(&format!("{}/{}", job_id, path))
            .cloned()
    }

    pub fn get_json(&self, job_id: &str, path: &str) -> Option<serde_json::Value> {
        self.get(job_id, path)
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
    }

    pub fn paths(&self, job_id: &str) -> Vec<String> {
        let prefix = format!("{}/", job_id);
        self.files
            .lock()
            .unwrap()
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }
}

impl ArtifactStore for MemStore {
    fn put(&self, job_id: &str, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        if self.fail_on.as_deref() == Some(path) {
            return Err(StoreError {
                path: path.to_string(),
                detail: "simulated store outage".to_string(),
            });
        }
        self.files
            .lock()
            .unwrap()
            .insert(format!("{}/{}", job_id, path), bytes.to_vec());
        Ok(())
    }
}
