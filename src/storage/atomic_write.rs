//! Write-rename file persistence.
//!
//! Bytes go to a uniquely named temp file in the target directory, are
//! synced, then renamed over the final path. A crash mid-write leaves the
//! previous file intact, and concurrent writers never share a temp file.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

/// Atomically replace `path` with `data`, creating parent directories
pub fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    // On failure the temp file is removed when the error drops it.
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_replaces_existing_and_cleans_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Hut.bpb");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert_eq!(entries(dir.path()), 1);
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("walls/stone/Rampart.bpt");

        atomic_write(&path, b"name = \"Rampart\"").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_concurrent_writers_to_one_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Hut.bpb");
        let first = vec![1u8; 256 * 1024];
        let second = vec![2u8; 256 * 1024];

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| atomic_write(&path, &first).unwrap());
                s.spawn(|| atomic_write(&path, &second).unwrap());
            }
        });

        let written = fs::read(&path).unwrap();
        assert!(written == first || written == second);
        assert_eq!(entries(dir.path()), 1);
    }
}
