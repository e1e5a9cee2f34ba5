//! Pass inputs: the JSON payload and the asset files.
//!
//! Both types validate at construction, so a [`crate::PkPass`] only ever holds
//! inputs that are known to be well formed.

use crate::{Error, Result};
use std::fs;
use std::path::Path;

/// Archive member name of the pass payload.
pub const PASS_JSON: &str = "pass.json";
/// Archive member name of the digest manifest.
pub const MANIFEST_JSON: &str = "manifest.json";
/// Archive member name of the detached signature.
pub const SIGNATURE: &str = "signature";
/// Asset every pass must carry.
pub const ICON: &str = "icon.png";

const RESERVED_NAMES: [&str; 3] = [PASS_JSON, MANIFEST_JSON, SIGNATURE];

/// Syntactically valid JSON text for `pass.json`.
///
/// The content is only checked for syntax; its fields are never interpreted
/// and the exact bytes given are written to the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(String);

impl Payload {
    /// Validate and wrap a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `json` does not parse, or parses to
    /// a bare `null`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pkpass::Payload;
    ///
    /// assert!(Payload::from_json(r#"{"formatVersion": 1}"#).is_ok());
    /// assert!(Payload::from_json("hello").is_err());
    /// ```
    pub fn from_json(json: impl Into<String>) -> Result<Self> {
        let json = json.into();
        match serde_json::from_str::<serde_json::Value>(&json) {
            Ok(serde_json::Value::Null) | Err(_) => {
                Err(Error::configuration("This is not a JSON string"))
            }
            Ok(_) => Ok(Payload(json)),
        }
    }

    /// Read and validate a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::configuration(format!(
                "Payload file does not exist: {}",
                path.display()
            )));
        }
        let json = String::from_utf8(fs::read(path)?)
            .map_err(|_| Error::configuration("This is not a JSON string"))?;
        Self::from_json(json)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A named file to place in the pass, such as `icon.png` or `logo@2x.png`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    name: String,
    data: Vec<u8>,
}

impl Asset {
    /// Create an asset from in-memory bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the name is empty, contains a
    /// backslash or a `..` component, or collides with one of the generated
    /// members (`pass.json`, `manifest.json`, `signature`).
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            data: data.into(),
        })
    }

    /// Read an asset from disk, naming it after the file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::configuration(format!("Invalid asset path: {}", path.display()))
            })?;
        Self::from_path_named(path, name)
    }

    /// Read an asset from disk and store it under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the file does not exist, or for the
    /// naming rules of [`Asset::new`].
    pub fn from_path_named(path: impl AsRef<Path>, name: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::configuration(format!(
                "File does not exist: {}",
                path.display()
            )));
        }
        let data = fs::read(path)?;
        Self::new(name, data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::configuration("Asset name must not be empty"));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(Error::configuration(format!(
            "Asset name {name} is reserved for a generated member"
        )));
    }
    if name.contains('\\') || name.starts_with('/') || name.split('/').any(|c| c == "..") {
        return Err(Error::configuration(format!(
            "Asset name {name} is not a relative archive path"
        )));
    }
    Ok(())
}

/// Ordered asset collection keyed by name.
///
/// Inserting an asset whose name is already present replaces the earlier
/// content in place, so member order follows first insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetList(Vec<Asset>);

impl AssetList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: Asset) {
        match self.0.iter_mut().find(|a| a.name == asset.name) {
            Some(existing) => existing.data = asset.data,
            None => self.0.push(asset),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|a| a.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Asset> {
        self.0.iter().find(|a| a.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Asset> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a AssetList {
    type Item = &'a Asset;
    type IntoIter = std::slice::Iter<'a, Asset>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Asset> for AssetList {
    fn from_iter<I: IntoIterator<Item = Asset>>(iter: I) -> Self {
        let mut list = AssetList::new();
        for asset in iter {
            list.insert(asset);
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_payload_accepts_objects_and_arrays() {
        assert!(Payload::from_json("{}").is_ok());
        assert!(Payload::from_json(r#"["Test"]"#).is_ok());
    }

    #[test]
    fn test_payload_rejects_invalid_json() {
        let err = Payload::from_json("hello").unwrap_err();
        assert!(matches!(err, Error::Configuration(ref m) if m == "This is not a JSON string"));
        assert!(Payload::from_json("null").is_err());
        assert!(Payload::from_json("").is_err());
    }

    #[test]
    fn test_payload_file_with_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pass.json");
        fs::write(&path, b"{\"a\":\"\xff\"}").unwrap();

        let err = Payload::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::Configuration(ref m) if m == "This is not a JSON string"));
    }

    #[test]
    fn test_payload_keeps_bytes_verbatim() {
        let json = "{ \"a\" :  1 }";
        let payload = Payload::from_json(json).unwrap();
        assert_eq!(payload.as_bytes(), json.as_bytes());
    }

    #[test]
    fn test_asset_from_path_uses_basename() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("icon.png");
        fs::write(&path, b"PNG_DATA").unwrap();

        let asset = Asset::from_path(&path).unwrap();
        assert_eq!(asset.name(), "icon.png");
        assert_eq!(asset.data(), b"PNG_DATA");

        let renamed = Asset::from_path_named(&path, "icon-bigger.png").unwrap();
        assert_eq!(renamed.name(), "icon-bigger.png");
    }

    #[test]
    fn test_asset_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Asset::from_path(dir.path().join("background.png")).unwrap_err();
        assert!(matches!(err, Error::Configuration(ref m) if m.starts_with("File does not exist")));
    }

    #[test]
    fn test_asset_reserved_names() {
        for name in ["pass.json", "manifest.json", "signature"] {
            assert!(Asset::new(name, b"x".to_vec()).is_err(), "{name} accepted");
        }
        assert!(Asset::new("", b"x".to_vec()).is_err());
        assert!(Asset::new("../escape.png", b"x".to_vec()).is_err());
        assert!(Asset::new("en.lproj/pass.strings", b"x".to_vec()).is_ok());
    }

    #[test]
    fn test_asset_list_last_write_wins() {
        let mut list = AssetList::new();
        list.insert(Asset::new("icon.png", b"one".to_vec()).unwrap());
        list.insert(Asset::new("logo.png", b"logo".to_vec()).unwrap());
        list.insert(Asset::new("icon.png", b"two".to_vec()).unwrap());

        assert_eq!(list.len(), 2);
        assert_eq!(list.get("icon.png").unwrap().data(), b"two");
        let names: Vec<_> = list.iter().map(Asset::name).collect();
        assert_eq!(names, ["icon.png", "logo.png"]);
    }
}
