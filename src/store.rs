use crate::error::{ZarrError, ZarrResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// StorageBackend trait
// ---------------------------------------------------------------------------

/// Async key/value view of a Zarr store.
///
/// Keys are `/`-separated paths relative to the store root; the empty key
/// names the root itself.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Fetch the contents at `path`.
    /// Returns `Ok(None)` when the key does not exist (rather than an error).
    async fn get(&self, path: &str) -> ZarrResult<Option<Bytes>>;

    /// Store `data` at `path`, creating intermediate prefixes as needed.
    async fn set(&self, path: &str, data: Bytes) -> ZarrResult<()>;

    /// List immediate children under `prefix` (names only, no leading path).
    async fn list(&self, prefix: &str) -> ZarrResult<Vec<String>>;

    /// Remove every key under `prefix`. Removing a missing prefix is not an error.
    async fn erase_prefix(&self, prefix: &str) -> ZarrResult<()>;

    /// Join a base path with a relative segment.
    fn join(&self, base: &str, segment: &str) -> String;
}

/// Shared, type-erased store handle.
pub type StoreRef = Arc<dyn StorageBackend>;

// ---------------------------------------------------------------------------
// LocalBackend  (tokio::fs)
// ---------------------------------------------------------------------------

/// Directory store on the local filesystem, using `tokio::fs`.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a new backend rooted at `root`. Nothing is touched on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open an existing directory store, failing if `root` is not a directory.
    pub async fn open_existing(root: impl Into<PathBuf>) -> ZarrResult<Self> {
        let root = root.into();
        match tokio::fs::metadata(&root).await {
            Ok(md) if md.is_dir() => Ok(Self { root }),
            Ok(_) => Err(ZarrError::NotFound(format!(
                "{} is not a directory store",
                root.display()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ZarrError::NotFound(
                format!("No store at {}", root.display()),
            )),
            Err(e) => Err(ZarrError::io_at(root, e)),
        }
    }

    /// Create `root` (and parents) if absent, then return a backend for it.
    pub async fn create(root: impl Into<PathBuf>) -> ZarrResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| ZarrError::io_at(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    async fn get(&self, path: &str) -> ZarrResult<Option<Bytes>> {
        let full = self.resolve(path);
        match tokio::fs::read(&full).await {
            Ok(data) => {
                if data.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Bytes::from(data)))
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
                ) =>
            {
                Ok(None)
            }
            // Reading a directory where a chunk or metadata key is expected.
            Err(_) if full.is_dir() => Ok(None),
            Err(e) => Err(ZarrError::Storage(format!(
                "Failed to read {}: {e}",
                full.display()
            ))),
        }
    }

    async fn set(&self, path: &str, data: Bytes) -> ZarrResult<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ZarrError::io_at(parent, e))?;
        }
        tokio::fs::write(&full, &data)
            .await
            .map_err(|e| ZarrError::io_at(&full, e))
    }

    async fn list(&self, prefix: &str) -> ZarrResult<Vec<String>> {
        let dir = self.resolve(prefix);
        let mut entries = Vec::new();
        let mut reader = match tokio::fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => {
                return Err(ZarrError::Storage(format!(
                    "Failed to list {}: {e}",
                    dir.display()
                )));
            }
        };
        while let Some(entry) = reader.next_entry().await.map_err(|e| {
            ZarrError::Storage(format!("Failed to read entry in {}: {e}", dir.display()))
        })? {
            if let Some(name) = entry.file_name().to_str() {
                entries.push(name.to_string());
            }
        }
        entries.sort();
        Ok(entries)
    }

    async fn erase_prefix(&self, prefix: &str) -> ZarrResult<()> {
        let target = self.resolve(prefix);
        let md = match tokio::fs::symlink_metadata(&target).await {
            Ok(md) => md,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(ZarrError::io_at(&target, e)),
        };

        if !md.is_dir() {
            return tokio::fs::remove_file(&target)
                .await
                .map_err(|e| ZarrError::io_at(&target, e));
        }

        // The root directory itself is kept; only its contents go.
        let mut reader = tokio::fs::read_dir(&target)
            .await
            .map_err(|e| ZarrError::io_at(&target, e))?;
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| ZarrError::io_at(&target, e))?
        {
            let path = entry.path();
            let is_dir = entry
                .file_type()
                .await
                .map_err(|e| ZarrError::io_at(&path, e))?
                .is_dir();
            let removed = if is_dir {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };
            removed.map_err(|e| ZarrError::io_at(&path, e))?;
        }
        Ok(())
    }

    fn join(&self, base: &str, segment: &str) -> String {
        if base.is_empty() {
            return segment.to_string();
        }
        let p = Path::new(base).join(segment);
        p.to_string_lossy().into_owned()
    }
}

// ---------------------------------------------------------------------------
// ObjectStoreBackend  (wraps object_store crate)
// ---------------------------------------------------------------------------

/// Backend that wraps any [`object_store::ObjectStore`] implementation.
pub struct ObjectStoreBackend {
    store: Box<dyn object_store::ObjectStore>,
    prefix: String,
}

impl ObjectStoreBackend {
    pub fn new(store: Box<dyn object_store::ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    fn full_path(&self, path: &str) -> object_store::path::Path {
        match (self.prefix.is_empty(), path.is_empty()) {
            (true, _) => object_store::path::Path::from(path),
            (false, true) => object_store::path::Path::from(self.prefix.as_str()),
            (false, false) => object_store::path::Path::from(format!("{}/{}", self.prefix, path)),
        }
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    async fn get(&self, path: &str) -> ZarrResult<Option<Bytes>> {
        let location = self.full_path(path);
        match self.store.get(&location).await {
            Ok(result) => {
                let data = result.bytes().await.map_err(|e| {
                    ZarrError::Storage(format!("Failed to read bytes from {path}: {e}"))
                })?;
                if data.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(data))
                }
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(ZarrError::Storage(format!(
                "Object store error for {path}: {e}"
            ))),
        }
    }

    async fn set(&self, path: &str, data: Bytes) -> ZarrResult<()> {
        let location = self.full_path(path);
        self.store
            .put(&location, object_store::PutPayload::from(data))
            .await
            .map_err(|e| ZarrError::Storage(format!("Object store put error for {path}: {e}")))?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> ZarrResult<Vec<String>> {
        let location = self.full_path(prefix);
        let scope = if location.as_ref().is_empty() {
            None
        } else {
            Some(&location)
        };
        let listing = self.store.list_with_delimiter(scope).await.map_err(|e| {
            ZarrError::Storage(format!("Object store list error for {prefix}: {e}"))
        })?;

        let mut entries: Vec<String> = listing
            .common_prefixes
            .iter()
            .chain(listing.objects.iter().map(|meta| &meta.location))
            .filter_map(|p| p.filename().map(str::to_string))
            .collect();
        entries.sort();
        entries.dedup();
        Ok(entries)
    }

    async fn erase_prefix(&self, prefix: &str) -> ZarrResult<()> {
        use futures::TryStreamExt;
        let location = self.full_path(prefix);
        let scope = if location.as_ref().is_empty() {
            None
        } else {
            Some(&location)
        };
        let doomed: Vec<_> = self
            .store
            .list(scope)
            .map_ok(|meta| meta.location)
            .try_collect()
            .await
            .map_err(|e| {
                ZarrError::Storage(format!("Object store list error for {prefix}: {e}"))
            })?;
        for key in doomed {
            self.store.delete(&key).await.map_err(|e| {
                ZarrError::Storage(format!("Object store delete error for {key}: {e}"))
            })?;
        }
        Ok(())
    }

    fn join(&self, base: &str, segment: &str) -> String {
        if base.is_empty() {
            segment.to_string()
        } else {
            format!("{base}/{segment}")
        }
    }
}
