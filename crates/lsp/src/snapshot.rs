//! On-disk snapshots of in-memory document text.
//!
//! The parser and verifier only read files, so every edit's text is written
//! to a per-document snapshot file that both tools are pointed at. That keeps
//! unsaved edits verifiable.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::{Error, Result};

/// Extension of snapshot files.
pub const SNAPSHOT_EXTENSION: &str = "tmp.bjy";

/// Writes and removes snapshot files in one directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
	dir: PathBuf,
}

impl SnapshotStore {
	/// Creates a store rooted at `dir`. The directory is created on first write.
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	/// Snapshot directory.
	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Snapshot path for a document URI. Stable for a given URI.
	pub fn path_for(&self, uri: &str) -> PathBuf {
		let name = URL_SAFE_NO_PAD.encode(uri.as_bytes());
		self.dir.join(format!("{name}.{SNAPSHOT_EXTENSION}"))
	}

	/// Writes `text` as the snapshot for `uri` and returns its path.
	///
	/// The text is written to a side file and renamed into place, so checks
	/// still reading the previous snapshot never observe a partial write.
	pub async fn write(&self, uri: &str, text: &str) -> Result<PathBuf> {
		let path = self.path_for(uri);
		let partial = path.with_extension("bjy.partial");
		tokio::fs::create_dir_all(&self.dir).await.map_err(|source| Error::Snapshot {
			path: self.dir.clone(),
			source,
		})?;
		tokio::fs::write(&partial, text).await.map_err(|source| Error::Snapshot {
			path: partial.clone(),
			source,
		})?;
		tokio::fs::rename(&partial, &path).await.map_err(|source| Error::Snapshot {
			path: path.clone(),
			source,
		})?;
		Ok(path)
	}

	/// Removes the snapshot for `uri`, ignoring a missing file.
	pub async fn remove(&self, uri: &str) {
		let path = self.path_for(uri);
		if let Err(err) = tokio::fs::remove_file(&path).await
			&& err.kind() != std::io::ErrorKind::NotFound
		{
			tracing::debug!(path = %path.display(), error = %err, "failed to remove snapshot");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn write_and_remove() {
		let dir = tempfile::tempdir().unwrap();
		let store = SnapshotStore::new(dir.path().join("snapshots"));
		let uri = "file:///home/user/a b/doc.bjy";

		let path = store.write(uri, "let x = 1").await.unwrap();
		assert_eq!(path, store.path_for(uri));
		assert_eq!(path.parent(), Some(store.dir()));
		assert_eq!(std::fs::read_to_string(&path).unwrap(), "let x = 1");

		store.write(uri, "let x = 2").await.unwrap();
		assert_eq!(std::fs::read_to_string(&path).unwrap(), "let x = 2");
		assert_eq!(std::fs::read_dir(store.dir()).unwrap().count(), 1);

		store.remove(uri).await;
		assert!(!path.exists());
		store.remove(uri).await;
	}

	#[test]
	fn paths_are_distinct_per_uri() {
		let store = SnapshotStore::new("/tmp/bluejay-lsp");
		assert_ne!(store.path_for("file:///a.bjy"), store.path_for("file:///b.bjy"));
		assert!(store.path_for("file:///a.bjy").to_string_lossy().ends_with(".tmp.bjy"));
	}
}
