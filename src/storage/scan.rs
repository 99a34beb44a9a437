//! Background batch scanning of a blueprint directory.
//!
//! A scan walks the directory tree on the blocking pool, decodes every file
//! whose extension is enabled in the config, and reports what it found over
//! a channel. Bad documents are logged and listed, never fatal. A new
//! request cancels the scan in flight: the last request wins.

use std::path::{Path, PathBuf};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::blueprints::BlueprintRoot;
use crate::codec::{read_file, BlueprintFormat};
use crate::core::BlueprintConfig;

/// A file the scan could not use
#[derive(Debug, Clone)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of one completed scan
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Request number this report answers
    pub generation: u64,
    pub root: PathBuf,
    /// Valid blueprints, in path order
    pub blueprints: Vec<BlueprintRoot>,
    pub failures: Vec<ScanFailure>,
}

fn format_enabled(format: BlueprintFormat, config: &BlueprintConfig) -> bool {
    match format {
        BlueprintFormat::Binary => config.scan_binary_files,
        BlueprintFormat::Text => config.scan_text_files,
        BlueprintFormat::PlanBuild | BlueprintFormat::VBuild => config.scan_legacy_files,
    }
}

/// Recursively collect files with an enabled blueprint extension
fn collect_files(
    dir: &Path,
    config: &BlueprintConfig,
    files: &mut Vec<PathBuf>,
    failures: &mut Vec<ScanFailure>,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot read directory {}: {}", dir.display(), e);
            failures.push(ScanFailure {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            });
            return;
        }
    };

    // Symlinked directories are not followed, so a link to an ancestor
    // cannot loop the walk.
    for entry in entries.flatten() {
        let path = entry.path();
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            collect_files(&path, config, files, failures);
        } else if BlueprintFormat::from_path(&path).is_some_and(|f| format_enabled(f, config)) {
            files.push(path);
        }
    }
}

/// Scan `root` on the calling thread
///
/// Returns `None` if `cancel` fires before the scan finishes. Cancellation
/// is checked between files.
pub fn scan_directory(
    root: &Path,
    config: &BlueprintConfig,
    cancel: &CancellationToken,
) -> Option<ScanReport> {
    let mut report = ScanReport {
        root: root.to_path_buf(),
        ..Default::default()
    };

    let mut files = Vec::new();
    collect_files(root, config, &mut files, &mut report.failures);
    files.sort();

    for path in files {
        if cancel.is_cancelled() {
            tracing::debug!("Scan of {} cancelled", root.display());
            return None;
        }

        let loaded = read_file(&path, config).and_then(|bp| {
            bp.validate()?;
            Ok(bp)
        });
        match loaded {
            Ok(bp) => report.blueprints.push(bp),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                report.failures.push(ScanFailure {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "Scanned {}: {} blueprints, {} skipped",
        root.display(),
        report.blueprints.len(),
        report.failures.len()
    );
    Some(report)
}

/// Restartable background scanner owned by the simulation thread
pub struct ScanService {
    runtime: Handle,
    config: BlueprintConfig,
    generation: u64,
    cancel: Option<CancellationToken>,
    tx: UnboundedSender<ScanReport>,
    rx: UnboundedReceiver<ScanReport>,
}

impl ScanService {
    pub fn new(runtime: Handle, config: BlueprintConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            runtime,
            config,
            generation: 0,
            cancel: None,
            tx,
            rx,
        }
    }

    /// Start scanning `root`, superseding any scan in flight
    ///
    /// Returns the generation the eventual report will carry.
    pub fn request(&mut self, root: impl Into<PathBuf>) -> u64 {
        self.cancel();
        self.generation += 1;

        let root = root.into();
        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());

        let generation = self.generation;
        let config = self.config.clone();
        let tx = self.tx.clone();
        self.runtime.spawn_blocking(move || {
            if let Some(mut report) = scan_directory(&root, &config, &cancel) {
                report.generation = generation;
                let _ = tx.send(report);
            }
        });
        generation
    }

    /// Cancel the scan in flight, if any
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }

    /// Latest generation requested
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Non-blocking poll for the current request's report
    ///
    /// Call once per tick from the simulation thread. Reports from
    /// superseded requests are discarded.
    pub fn drain_completed(&mut self) -> Option<ScanReport> {
        let mut latest = None;
        while let Ok(report) = self.rx.try_recv() {
            if report.generation == self.generation {
                latest = Some(report);
            }
        }
        if latest.is_some() {
            self.cancel = None;
        }
        latest
    }

    /// Wait for the current request's report
    pub async fn next_report(&mut self) -> Option<ScanReport> {
        while let Some(report) = self.rx.recv().await {
            if report.generation == self.generation {
                self.cancel = None;
                return Some(report);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprints::BlueprintObject;
    use crate::codec::binary::{self, BinaryOptions};
    use crate::codec::text;
    use glam::Vec3;

    fn make_blueprint(name: &str) -> BlueprintRoot {
        let mut root = BlueprintRoot::new(name);
        root.objects
            .push(BlueprintObject::new("wood_floor", Vec3::ZERO, Vec3::ZERO));
        root
    }

    fn populate(dir: &Path) {
        std::fs::create_dir_all(dir.join("walls")).unwrap();
        std::fs::write(
            dir.join("Hut.bpb"),
            binary::encode(&make_blueprint("Hut"), BinaryOptions::FULL),
        )
        .unwrap();
        std::fs::write(
            dir.join("walls/Rampart.bpt"),
            text::encode(&make_blueprint("Rampart")).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.join("broken.bpt"), "name = [").unwrap();
        std::fs::write(dir.join("empty.bpt"), "name = \"Empty\"\n").unwrap();
        std::fs::write(dir.join("old.vbuild"), "beam 0 0 0 1 0 0 0\n").unwrap();
        std::fs::write(dir.join("notes.txt"), "not a blueprint").unwrap();
    }

    #[test]
    fn test_scan_skips_bad_documents() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());

        let report =
            scan_directory(dir.path(), &BlueprintConfig::default(), &CancellationToken::new())
                .unwrap();

        let mut names: Vec<&str> = report.blueprints.iter().map(|b| b.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Hut", "Rampart"]);
        assert_eq!(report.failures.len(), 2);
        assert!(report
            .blueprints
            .iter()
            .all(|b| b.storage_location.is_some()));
    }

    #[test]
    fn test_scan_extension_switches() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let config = BlueprintConfig {
            scan_text_files: false,
            scan_legacy_files: true,
            ..Default::default()
        };

        let report = scan_directory(dir.path(), &config, &CancellationToken::new()).unwrap();

        let mut names: Vec<&str> = report.blueprints.iter().map(|b| b.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Hut", "old"]);
        assert!(report.failures.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_ancestor_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        std::os::unix::fs::symlink(dir.path(), dir.path().join("walls/loop")).unwrap();

        let report =
            scan_directory(dir.path(), &BlueprintConfig::default(), &CancellationToken::new())
                .unwrap();

        let mut names: Vec<&str> = report.blueprints.iter().map(|b| b.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Hut", "Rampart"]);
        assert_eq!(report.failures.len(), 2);
    }

    #[test]
    fn test_cancelled_scan_reports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(scan_directory(dir.path(), &BlueprintConfig::default(), &cancel).is_none());
    }

    #[test]
    fn test_missing_root_is_a_failure_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let report = scan_directory(
            &dir.path().join("missing"),
            &BlueprintConfig::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        assert!(report.blueprints.is_empty());
        assert_eq!(report.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_last_request_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        populate(first.path());
        std::fs::write(
            second.path().join("Tower.bpb"),
            binary::encode(&make_blueprint("Tower"), BinaryOptions::FULL),
        )
        .unwrap();

        let mut service = ScanService::new(Handle::current(), BlueprintConfig::default());
        service.request(first.path());
        let generation = service.request(second.path());

        let report = service.next_report().await.unwrap();
        assert_eq!(report.generation, generation);
        assert_eq!(report.root, second.path());
        assert_eq!(report.blueprints.len(), 1);
        assert_eq!(report.blueprints[0].name, "Tower");
    }
}
