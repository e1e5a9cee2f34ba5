//! `manifest.json` generation.
//!
//! The manifest maps every member of the pass (except `manifest.json` and
//! `signature` themselves) to the hex SHA-1 of its content. It is the exact
//! byte string that gets signed.
//!
//! # Format
//!
//! ```json
//! {"pass.json":"bf21a9e8fbc5a3846fb05b4fa0859e0917b2202f","icon.png":"..."}
//! ```
//!
//! The table is always written as a JSON object, even with a single entry.

use crate::digest::{digest, Sha1Digest};
use crate::pass::{AssetList, Payload, ICON, PASS_JSON};
use crate::{Error, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Insertion-ordered table of member name to content digest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestTable {
    entries: Vec<(String, Sha1Digest)>,
}

impl DigestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `digest` for `name`, replacing any earlier value in place.
    pub fn insert(&mut self, name: impl Into<String>, digest: Sha1Digest) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = digest,
            None => self.entries.push((name, digest)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Sha1Digest> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Sha1Digest)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for DigestTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, digest) in &self.entries {
            map.serialize_entry(name, &digest.to_hex())?;
        }
        map.end()
    }
}

/// A serialized manifest together with the table it was built from.
#[derive(Debug, Clone)]
pub struct Manifest {
    table: DigestTable,
    bytes: Vec<u8>,
}

impl Manifest {
    pub fn table(&self) -> &DigestTable {
        &self.table
    }

    /// The canonical JSON bytes, as signed and as stored in the pass.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Hash the payload and every asset and serialize the result.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if no `icon.png` asset is present. The
/// check runs before anything is hashed.
pub fn build_manifest(payload: &Payload, assets: &AssetList) -> Result<Manifest> {
    require_icon(assets)?;

    let mut table = DigestTable::new();
    table.insert(PASS_JSON, digest(payload.as_bytes()));
    for asset in assets {
        table.insert(asset.name(), digest(asset.data()));
    }

    let bytes = serde_json::to_vec(&table)
        .map_err(|e| Error::configuration(format!("Failed to serialize manifest: {e}")))?;

    tracing::debug!(entries = table.len(), "manifest built");

    Ok(Manifest { table, bytes })
}

/// Every pass must carry `icon.png`.
pub(crate) fn require_icon(assets: &AssetList) -> Result<()> {
    if !assets.contains(ICON) {
        return Err(Error::configuration("Missing required icon.png file"));
    }
    Ok(())
}
