//! Session-scoped file namespace for the ffmpeg engine.
//!
//! A [`Sandbox`] owns a private temporary directory. It exposes a flat
//! namespace of plain file names; anything that could escape the directory
//! (separators, `.`, `..`) is rejected. The directory is removed when the
//! sandbox is dropped.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tempfile::TempDir;

/// Flat, isolated file namespace backed by a temp directory.
///
/// # Example
///
/// ```no_run
/// use slicer_av::Sandbox;
///
/// # async fn example() -> slicer_core::Result<()> {
/// let sandbox = Sandbox::new()?;
/// sandbox.write("input.mp3", b"ID3".as_slice()).await?;
/// assert_eq!(sandbox.list().await?, vec!["input.mp3".to_string()]);
/// sandbox.remove("input.mp3").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Sandbox {
    temp_dir: TempDir,
}

impl Sandbox {
    /// Create a new, empty sandbox.
    pub fn new() -> slicer_core::Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("audioslicer-")
            .tempdir()
            .map_err(|e| slicer_core::Error::tool("sandbox", format!("failed to create temp dir: {e}")))?;
        Ok(Self { temp_dir })
    }

    /// Path to the backing directory. Commands run with this as their
    /// working directory so they can use bare file names.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Resolve a plain file name to its path inside the sandbox.
    pub fn path_of(&self, name: &str) -> slicer_core::Result<PathBuf> {
        check_name(name)?;
        Ok(self.temp_dir.path().join(name))
    }

    /// Write (or overwrite) a file.
    pub async fn write(&self, name: &str, data: impl AsRef<[u8]>) -> slicer_core::Result<()> {
        let path = self.path_of(name)?;
        tokio::fs::write(&path, data.as_ref()).await?;
        Ok(())
    }

    /// Read a whole file.
    pub async fn read(&self, name: &str) -> slicer_core::Result<Bytes> {
        let path = self.path_of(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(slicer_core::Error::not_found("file", name))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a file. Removing a file that does not exist is not an error.
    pub async fn remove(&self, name: &str) -> slicer_core::Result<()> {
        let path = self.path_of(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Names of all files currently in the sandbox, sorted.
    pub async fn list(&self) -> slicer_core::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(self.temp_dir.path()).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Validate that `name` is a single plain path component.
pub fn check_name(name: &str) -> slicer_core::Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(slicer_core::Error::Validation(format!(
            "invalid sandbox file name: {name:?}"
        )));
    }
    Ok(())
}
