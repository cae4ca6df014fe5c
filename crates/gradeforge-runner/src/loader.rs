//! Registry-backed submission loading.
//!
//! Submissions cannot be compiled and linked at grading time, so every
//! submission is backed by an adapter registered ahead of time. The file
//! must still exist on disk; its directory name (or, failing that, its file
//! stem) selects the adapter.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use gradeforge_core::error::LoadError;
use gradeforge_core::implementation::Implementation;
use gradeforge_core::traits::ImplementationLoader;

/// Builds a fresh implementation for one submission.
pub type Adapter = dyn Fn() -> Implementation + Send + Sync;

/// Loader mapping submission keys to registered adapters.
#[derive(Default, Clone)]
pub struct RegistryLoader {
    adapters: BTreeMap<String, Arc<Adapter>>,
}

impl RegistryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under a submission directory name or file stem.
    pub fn register<F>(mut self, key: impl Into<String>, adapter: F) -> Self
    where
        F: Fn() -> Implementation + Send + Sync + 'static,
    {
        self.adapters.insert(key.into(), Arc::new(adapter));
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    fn adapter_for(&self, path: &Path) -> Option<&Arc<Adapter>> {
        let dir = path
            .parent()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str());
        let stem = path.file_stem().and_then(|stem| stem.to_str());
        dir.and_then(|key| self.adapters.get(key))
            .or_else(|| stem.and_then(|key| self.adapters.get(key)))
    }
}

impl ImplementationLoader for RegistryLoader {
    fn load(&self, path: &Path) -> Result<Implementation, LoadError> {
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
            _ => LoadError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
        })?;
        if !metadata.is_file() {
            return Err(LoadError::NotAFile(path.to_path_buf()));
        }

        let adapter = self
            .adapter_for(path)
            .ok_or_else(|| LoadError::Unregistered(path.to_path_buf()))?;
        tracing::debug!(submission = %path.display(), "loaded submission from registry");
        Ok(adapter().with_origin(path.display().to_string()))
    }
}
