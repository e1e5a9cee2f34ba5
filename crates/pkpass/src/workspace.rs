//! Per-build scratch directory.
//!
//! Each build gets its own uniquely named directory under the configured
//! temporary root, so concurrent builds sharing a root never touch each
//! other's files. The directory holds the intermediate `manifest.json`,
//! `signature` and `pass.pkpass` files and is removed when the build ends.

use crate::pass::{MANIFEST_JSON, SIGNATURE};
use crate::{Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// File name of the container while it is being written.
pub const CONTAINER_FILE: &str = "pass.pkpass";

const DIR_PREFIX: &str = "PKPass";

/// A build's private scratch directory.
///
/// Dropping a `Workspace` removes it as well; [`Workspace::clean`] does the
/// same eagerly and logs anything it could not remove.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh directory beneath `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `root` is not an existing directory,
    /// or [`Error::Io`] if the directory cannot be created.
    pub fn create(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::configuration("Temporary path not found"));
        }
        let dir = tempfile::Builder::new()
            .prefix(DIR_PREFIX)
            .tempdir_in(root)?;
        tracing::debug!(path = %dir.path().display(), "workspace created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.path().join(MANIFEST_JSON)
    }

    pub fn signature_path(&self) -> PathBuf {
        self.dir.path().join(SIGNATURE)
    }

    pub fn container_path(&self) -> PathBuf {
        self.dir.path().join(CONTAINER_FILE)
    }

    /// Remove the intermediate files and the directory itself.
    ///
    /// Files that are already gone are not an error; failures are logged and
    /// otherwise ignored.
    pub fn clean(self) {
        for path in [
            self.manifest_path(),
            self.signature_path(),
            self.container_path(),
        ] {
            if let Err(e) = remove_if_present(&path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove build file");
            }
        }

        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => tracing::debug!(path = %path.display(), "workspace removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove workspace")
            }
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
