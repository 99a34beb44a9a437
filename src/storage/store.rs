//! Blueprint files under a root directory.

use ahash::AHashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::{atomic_write, sanitize_file_name, unique_location, StorageError};
use crate::blueprints::BlueprintRoot;
use crate::codec::binary::{self, BinaryOptions};
use crate::codec::{text, BlueprintFormat};

/// Pending background write, resolving to the path written
pub type PersistHandle = JoinHandle<Result<PathBuf, StorageError>>;

/// Pending background filesystem change with no payload
pub type RemoveHandle = JoinHandle<Result<(), StorageError>>;

/// Orders background writes per path so the newest snapshot is the one
/// left on disk, whatever order the blocking pool runs them in.
#[derive(Debug, Default)]
struct WriteSequencer {
    next: AtomicU64,
    written: Mutex<AHashMap<PathBuf, Arc<Mutex<u64>>>>,
}

impl WriteSequencer {
    fn ticket(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn slot(&self, path: &Path) -> Result<Arc<Mutex<u64>>, StorageError> {
        let mut written = self
            .written
            .lock()
            .map_err(|_| StorageError::Task("write sequencer poisoned".into()))?;
        Ok(written.entry(path.to_path_buf()).or_default().clone())
    }

    /// Write `snapshot` unless a newer ticket already reached `path`
    fn write(&self, ticket: u64, snapshot: &BlueprintRoot, path: &Path) -> Result<(), StorageError> {
        let slot = self.slot(path)?;
        let mut last = slot
            .lock()
            .map_err(|_| StorageError::Task(format!("writer for {} panicked", path.display())))?;
        if *last > ticket {
            tracing::debug!(
                "Skipping stale snapshot of '{}' for {}",
                snapshot.name,
                path.display()
            );
            return Ok(());
        }
        write_snapshot(snapshot, path)?;
        *last = ticket;
        Ok(())
    }
}

/// A directory of blueprint files with background persistence
#[derive(Debug, Clone)]
pub struct BlueprintStore {
    root: PathBuf,
    format: BlueprintFormat,
    runtime: Handle,
    writes: Arc<WriteSequencer>,
}

impl BlueprintStore {
    /// Store writing native binary files under `root`
    pub fn new(root: impl Into<PathBuf>, runtime: Handle) -> Self {
        Self {
            root: root.into(),
            format: BlueprintFormat::Binary,
            runtime,
            writes: Arc::default(),
        }
    }

    /// Change the format new files are written in
    pub fn with_format(mut self, format: BlueprintFormat) -> Result<Self, StorageError> {
        if !format.is_writable() {
            return Err(StorageError::NotWritable(format.extension().to_string()));
        }
        self.format = format;
        Ok(self)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn format(&self) -> BlueprintFormat {
        self.format
    }

    /// Free path for a new blueprint called `name`
    pub fn location_for(&self, name: &str) -> PathBuf {
        unique_location(
            &self.root,
            &sanitize_file_name(name),
            self.format.extension(),
            Path::exists,
        )
    }

    /// Make sure the blueprint has a writable storage location
    ///
    /// Blueprints imported from a legacy file get a native file next to it.
    pub fn assign_location(&self, root: &mut BlueprintRoot) -> PathBuf {
        let location = match root.storage_location.take() {
            Some(path) if writable_format(&path).is_some() => path,
            Some(legacy) => {
                let dir = legacy.parent().unwrap_or(self.root.as_path());
                unique_location(
                    dir,
                    &sanitize_file_name(&root.name),
                    self.format.extension(),
                    Path::exists,
                )
            }
            None => self.location_for(&root.name),
        };
        root.storage_location = Some(location.clone());
        location
    }

    /// Write the blueprint now, on the calling thread
    pub fn save(&self, root: &mut BlueprintRoot) -> Result<PathBuf, StorageError> {
        root.validate()?;
        let path = self.assign_location(root);
        self.writes.write(self.writes.ticket(), root, &path)?;
        Ok(path)
    }

    /// Write a snapshot of the blueprint on the blocking pool
    ///
    /// The blueprint may be mutated freely once this returns. Awaiting the
    /// handle is optional; failures are logged either way. When persists of
    /// one blueprint overlap, the file ends up holding the latest snapshot.
    pub fn persist(&self, root: &mut BlueprintRoot) -> Result<PersistHandle, StorageError> {
        root.validate()?;
        let path = self.assign_location(root);
        let snapshot = root.snapshot();
        let ticket = self.writes.ticket();
        let writes = Arc::clone(&self.writes);

        Ok(self.runtime.spawn_blocking(move || {
            writes
                .write(ticket, &snapshot, &path)
                .map(|()| path)
                .inspect_err(|e| tracing::error!("Failed to save blueprint '{}': {}", snapshot.name, e))
        }))
    }

    /// Rename the blueprint and move its backing file in the background
    ///
    /// Returns `None` when nothing is stored yet.
    pub fn rename(&self, root: &mut BlueprintRoot, name: &str) -> Option<RemoveHandle> {
        let old = root.storage_location.clone();
        root.rename(name);
        let (old, derived) = old.zip(root.storage_location.clone())?;
        if old == derived {
            return None;
        }

        let dir = derived.parent().unwrap_or(self.root.as_path()).to_path_buf();
        let ext = derived
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(self.format.extension())
            .to_string();
        let new = unique_location(&dir, &sanitize_file_name(name), &ext, Path::exists);
        root.storage_location = Some(new.clone());

        Some(self.runtime.spawn_blocking(move || {
            std::fs::rename(&old, &new)
                .map_err(|e| StorageError::io(&old, e))
                .inspect_err(|e| tracing::error!("Failed to move blueprint file: {}", e))
        }))
    }

    /// Forget the blueprint's backing file and delete it in the background
    pub fn delete(&self, root: &mut BlueprintRoot) -> Option<RemoveHandle> {
        let path = root.storage_location.take()?;
        tracing::info!("Deleting blueprint '{}' at {}", root.name, path.display());

        Some(self.runtime.spawn_blocking(move || {
            match std::fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => {
                    tracing::error!("Failed to delete {}: {}", path.display(), e);
                    Err(StorageError::io(&path, e))
                }
            }
        }))
    }
}

fn writable_format(path: &Path) -> Option<BlueprintFormat> {
    BlueprintFormat::from_path(path).filter(|f| f.is_writable())
}

/// Encode for the format implied by `path` and write it atomically
fn write_snapshot(root: &BlueprintRoot, path: &Path) -> Result<(), StorageError> {
    let bytes = match writable_format(path) {
        Some(BlueprintFormat::Text) => text::encode(root)?.into_bytes(),
        Some(_) => binary::encode(root, BinaryOptions::FULL),
        None => return Err(StorageError::NotWritable(path.display().to_string())),
    };
    atomic_write(path, &bytes).map_err(|e| StorageError::io(path, e))?;
    tracing::debug!("Wrote blueprint '{}' to {}", root.name, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprints::BlueprintObject;
    use crate::codec::read_file;
    use crate::core::BlueprintConfig;
    use glam::Vec3;

    fn make_blueprint(name: &str) -> BlueprintRoot {
        let mut root = BlueprintRoot::new(name);
        root.objects
            .push(BlueprintObject::new("wood_floor", Vec3::ZERO, Vec3::ZERO));
        root
    }

    #[tokio::test]
    async fn test_persist_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlueprintStore::new(dir.path(), Handle::current());
        let mut root = make_blueprint("Hut");

        let handle = store.persist(&mut root).unwrap();
        // Mutating after handoff must not affect the write.
        root.objects.clear();
        let path = handle.await.unwrap().unwrap();

        assert_eq!(path, dir.path().join("Hut.bpb"));
        let back = read_file(&path, &BlueprintConfig::default()).unwrap();
        assert_eq!(back.objects.len(), 1);
    }

    #[tokio::test]
    async fn test_name_collisions_get_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlueprintStore::new(dir.path(), Handle::current());

        let mut first = make_blueprint("Hut");
        let mut second = make_blueprint("Hut");
        let mut third = make_blueprint("Hut");
        store.save(&mut first).unwrap();
        store.save(&mut second).unwrap();
        store.save(&mut third).unwrap();

        assert_eq!(second.storage_location, Some(dir.path().join("Hut (1).bpb")));
        assert_eq!(third.storage_location, Some(dir.path().join("Hut (2).bpb")));
    }

    #[tokio::test]
    async fn test_invalid_blueprint_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlueprintStore::new(dir.path(), Handle::current());
        let mut empty = BlueprintRoot::new("Nothing");

        assert!(matches!(
            store.persist(&mut empty),
            Err(StorageError::Invalid(_))
        ));
        assert!(empty.storage_location.is_none());
    }

    #[tokio::test]
    async fn test_rename_moves_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlueprintStore::new(dir.path(), Handle::current())
            .with_format(BlueprintFormat::Text)
            .unwrap();
        let mut root = make_blueprint("Hut");
        let old = store.save(&mut root).unwrap();

        store.rename(&mut root, "Cabin").unwrap().await.unwrap().unwrap();

        assert_eq!(root.name, "Cabin");
        assert_eq!(root.storage_location, Some(dir.path().join("Cabin.bpt")));
        assert!(!old.exists());
        assert!(dir.path().join("Cabin.bpt").exists());
    }

    #[tokio::test]
    async fn test_delete_removes_backing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlueprintStore::new(dir.path(), Handle::current());
        let mut root = make_blueprint("Hut");
        let path = store.save(&mut root).unwrap();

        store.delete(&mut root).unwrap().await.unwrap().unwrap();

        assert!(!path.exists());
        assert!(root.storage_location.is_none());
        assert!(store.delete(&mut root).is_none());
    }

    #[tokio::test]
    async fn test_legacy_import_saved_as_native() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlueprintStore::new(dir.path(), Handle::current());
        let mut root = make_blueprint("Old Mill");
        root.storage_location = Some(dir.path().join("old_mill.vbuild"));

        let path = store.save(&mut root).unwrap();

        assert_eq!(path, dir.path().join("Old Mill.bpb"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_overlapping_persists_keep_latest_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlueprintStore::new(dir.path(), Handle::current());
        let mut root = make_blueprint("Hall");
        for i in 0..5_000 {
            root.objects.push(BlueprintObject::new(
                "stone_wall",
                Vec3::new(i as f32, 0.0, 0.0),
                Vec3::ZERO,
            ));
        }

        for _ in 0..20 {
            let first = store.persist(&mut root).unwrap();
            root.objects.pop();
            let second = store.persist(&mut root).unwrap();

            let first_path = first.await.unwrap().unwrap();
            let second_path = second.await.unwrap().unwrap();
            assert_eq!(first_path, second_path);

            let back = read_file(&second_path, &BlueprintConfig::default()).unwrap();
            assert_eq!(back.objects.len(), root.objects.len());
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_legacy_format_rejected_for_writing() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let store = BlueprintStore::new("/tmp", runtime.handle().clone());
        assert!(store.with_format(BlueprintFormat::PlanBuild).is_err());
    }
}
