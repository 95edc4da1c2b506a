//! File store and playable-asset validation
//!
//! Local filesystem primitives consumed by the registry and session. Both
//! are traits so the registry never assumes a concrete disk layout; the
//! bundled [`LocalFileStore`] resolves the relative paths recorded by the
//! transfer engine against a fixed base directory.

use std::io;
use std::path::{Path, PathBuf};

/// Checks existence of and deletes files at a local path
pub trait FileStore: Send + Sync {
    /// Whether a file (or asset package directory) exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Delete the file or asset package at `path`.
    ///
    /// A missing path is not an error; deleting it is a no-op.
    fn delete(&self, path: &Path) -> io::Result<()>;
}

/// A validated handle to a fully offline-playable asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayableAsset {
    path: PathBuf,
}

impl PlayableAsset {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Absolute path of the playable asset on disk
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Confirms that a fully offline-playable asset exists at a local path.
///
/// A recorded registry entry whose backing file was externally deleted must
/// verify to `None`, never to a stale handle.
pub trait AssetVerifier: Send + Sync {
    fn verify(&self, path: &Path) -> Option<PlayableAsset>;
}

/// File store over the local filesystem.
///
/// Transfer engines report asset locations relative to a base directory
/// (the app home); recorded paths are resolved against it on every access.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    base: PathBuf,
}

impl LocalFileStore {
    /// Create a store resolving relative paths against `base`
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }
}

impl FileStore for LocalFileStore {
    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        let target = self.resolve(path);
        if !target.exists() {
            return Ok(());
        }
        if target.is_dir() {
            // Segmented assets are stored as package directories
            std::fs::remove_dir_all(&target)?;
        } else {
            std::fs::remove_file(&target)?;
        }
        tracing::debug!("deleted asset at {:?}", target);
        Ok(())
    }
}

impl AssetVerifier for LocalFileStore {
    fn verify(&self, path: &Path) -> Option<PlayableAsset> {
        let target = self.resolve(path);
        if target.exists() {
            Some(PlayableAsset::new(target))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn delete_missing_file_is_ok() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path());
        assert!(store.delete(Path::new("nope.mov")).is_ok());
    }

    #[test]
    fn delete_removes_files_and_package_dirs() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path());

        std::fs::write(dir.path().join("a.mov"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("b.movpkg")).unwrap();
        std::fs::write(dir.path().join("b.movpkg").join("seg0"), b"x").unwrap();

        store.delete(Path::new("a.mov")).unwrap();
        store.delete(Path::new("b.movpkg")).unwrap();
        assert!(!store.exists(Path::new("a.mov")));
        assert!(!store.exists(Path::new("b.movpkg")));
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path());
        std::fs::write(dir.path().join("a.mov"), b"x").unwrap();

        assert!(store.exists(Path::new("a.mov")));
        let asset = store.verify(Path::new("a.mov")).unwrap();
        assert_eq!(asset.path(), dir.path().join("a.mov"));
    }

    #[test]
    fn verify_returns_none_for_missing_asset() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path());
        assert!(store.verify(Path::new("missing.mov")).is_none());
    }

    #[test]
    fn absolute_paths_are_used_as_is() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path());

        let abs = other.path().join("c.mov");
        std::fs::write(&abs, b"x").unwrap();
        assert!(store.exists(&abs));
    }
}
