//! `.pkpass` container creation.
//!
//! A pass is a flat ZIP archive with these members, written in this order:
//!
//! | Member | Content |
//! |--------|---------|
//! | `signature` | DER detached PKCS#7 signature |
//! | `manifest.json` | digest table |
//! | `pass.json` | payload |
//! | *asset name* | asset bytes, one member per asset |
//!
//! Entry timestamps are pinned so the same inputs give the same archive
//! layout.
//!
//! # Examples
//!
//! ```no_run
//! use pkpass::archive::{assemble, CompressionLevel, PassMembers};
//! use pkpass::{Asset, AssetList, Payload};
//! use std::path::Path;
//!
//! let payload = Payload::from_json("{}")?;
//! let assets: AssetList = [Asset::new("icon.png", b"PNG".to_vec())?].into_iter().collect();
//! let members = PassMembers {
//!     signature: b"sig",
//!     manifest: b"{}",
//!     payload: &payload,
//!     assets: &assets,
//! };
//! let bytes = assemble(Path::new("pass.pkpass"), &members, CompressionLevel::DEFAULT)?;
//! # Ok::<(), pkpass::Error>(())
//! ```

use crate::pass::{AssetList, Payload, MANIFEST_JSON, PASS_JSON, SIGNATURE};
use crate::{Error, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime as ZipDateTime, ZipWriter};

/// ZIP compression level for the pass container.
///
/// # Examples
///
/// ```
/// use pkpass::archive::CompressionLevel;
///
/// let fast = CompressionLevel::NONE;
/// let balanced = CompressionLevel::DEFAULT;
/// let custom = CompressionLevel::new(12);
/// assert_eq!(custom.level(), 9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(u32);

impl CompressionLevel {
    /// No compression (level 0), entries are stored.
    pub const NONE: CompressionLevel = CompressionLevel(0);

    /// Default compression (level 6).
    pub const DEFAULT: CompressionLevel = CompressionLevel(6);

    /// Maximum compression (level 9).
    pub const MAX: CompressionLevel = CompressionLevel(9);

    /// Creates a compression level from 0-9.
    ///
    /// Values greater than 9 are clamped to 9.
    #[must_use]
    pub fn new(level: u32) -> Self {
        CompressionLevel(level.min(9))
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.0
    }

    fn file_options(self) -> SimpleFileOptions {
        let options = SimpleFileOptions::default()
            .last_modified_time(zip_timestamp())
            .unix_permissions(0o644);
        if self.0 == 0 {
            options.compression_method(CompressionMethod::Stored)
        } else {
            options
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(i64::from(self.0)))
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u32> for CompressionLevel {
    fn from(level: u32) -> Self {
        CompressionLevel::new(level)
    }
}

/// Everything that goes into a pass container.
#[derive(Debug, Clone, Copy)]
pub struct PassMembers<'a> {
    pub signature: &'a [u8],
    pub manifest: &'a [u8],
    pub payload: &'a Payload,
    pub assets: &'a AssetList,
}

/// Write the pass container to `target` and return its bytes.
///
/// # Errors
///
/// Returns [`Error::Packaging`] if `target` cannot be created, if writing an
/// entry fails, or if the finished file is missing or empty.
pub fn assemble(
    target: &Path,
    members: &PassMembers<'_>,
    compression_level: CompressionLevel,
) -> Result<Vec<u8>> {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| target.display().to_string());

    let file = File::create(target).map_err(|e| {
        Error::packaging(format!("Could not open {file_name} for writing: {e}"))
    })?;
    let mut zip = ZipWriter::new(file);
    let options = compression_level.file_options();

    add_entry(&mut zip, SIGNATURE, members.signature, options)?;
    add_entry(&mut zip, MANIFEST_JSON, members.manifest, options)?;
    add_entry(&mut zip, PASS_JSON, members.payload.as_bytes(), options)?;
    for asset in members.assets {
        add_entry(&mut zip, asset.name(), asset.data(), options)?;
    }

    zip.finish().map_err(|e| zip_failed(&file_name, e))?;

    let bytes = match fs::read(target) {
        Ok(bytes) if !bytes.is_empty() => bytes,
        _ => {
            return Err(Error::packaging(format!(
                "Error while creating {file_name}"
            )))
        }
    };

    tracing::debug!(
        bytes = bytes.len(),
        members = members.assets.len() + 3,
        level = compression_level.level(),
        "container written"
    );

    Ok(bytes)
}

fn add_entry(
    zip: &mut ZipWriter<File>,
    name: &str,
    data: &[u8],
    options: SimpleFileOptions,
) -> Result<()> {
    zip.start_file(name, options)
        .map_err(|e| zip_failed(name, e))?;
    zip.write_all(data)
        .map_err(|e| Error::packaging(format!("Failed to write {name}: {e}")))
}

fn zip_failed(name: &str, e: ZipError) -> Error {
    Error::packaging(format!("Zip error on {name}: {e}"))
}

fn zip_timestamp() -> ZipDateTime {
    ZipDateTime::from_date_and_time(1980, 1, 1, 0, 0, 0).unwrap_or_default()
}
