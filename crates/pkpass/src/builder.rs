//! PkPass builder API
//!
//! Provides a builder pattern interface for producing signed `.pkpass`
//! bundles from a payload, a set of assets and a Pass Type ID certificate.

use crate::archive::{assemble, CompressionLevel, PassMembers};
use crate::crypto::{Credential, ManifestSigner, SignatureEncoding};
use crate::delivery::PassPackage;
use crate::manifest::{build_manifest, require_icon, Manifest};
use crate::pass::{Asset, AssetList, Payload};
use crate::workspace::Workspace;
use crate::{Error, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Pass bundle builder.
///
/// A `PkPass` is an immutable description of one pass; every call to
/// [`PkPass::create`] runs an independent build in its own workspace, so the
/// same value may be built repeatedly or from several threads.
///
/// # Example
///
/// ```no_run
/// use pkpass::{Asset, Credential, Payload, PkPass};
///
/// let package = PkPass::new(
///     Credential::from_p12_file("Certificate.p12", "secret")?,
///     Payload::from_json(r#"{"formatVersion":1}"#)?,
/// )
/// .wwdr_certificate("AppleWWDRCA.pem")
/// .asset(Asset::from_path("icon.png")?)
/// .asset(Asset::from_path("logo.png")?)
/// .name("boarding.pkpass")
/// .create()?;
///
/// std::fs::write(package.filename(), package.bytes())?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct PkPass {
    credential: Credential,
    payload: Payload,
    assets: AssetList,
    wwdr_certificate: Option<PathBuf>,
    temp_dir: PathBuf,
    name: Option<String>,
    compression_level: CompressionLevel,
    signature_encoding: SignatureEncoding,
}

/// Progress of a single build. Holds the last stage reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildStage {
    Idle,
    ManifestBuilt,
    Signed,
    Assembled,
    Delivered,
    Failed,
}

impl BuildStage {
    /// The step that runs once this stage is reached.
    fn next_step(self) -> Option<&'static str> {
        match self {
            BuildStage::Idle => Some("building manifest"),
            BuildStage::ManifestBuilt => Some("signing"),
            BuildStage::Signed => Some("assembling"),
            BuildStage::Assembled => Some("delivering"),
            BuildStage::Delivered | BuildStage::Failed => None,
        }
    }
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildStage::Idle => "idle",
            BuildStage::ManifestBuilt => "manifest built",
            BuildStage::Signed => "signed",
            BuildStage::Assembled => "assembled",
            BuildStage::Delivered => "delivered",
            BuildStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl PkPass {
    /// Create a new builder for the given credential and payload.
    pub fn new(credential: Credential, payload: Payload) -> Self {
        Self {
            credential,
            payload,
            assets: AssetList::new(),
            wwdr_certificate: None,
            temp_dir: std::env::temp_dir(),
            name: None,
            compression_level: CompressionLevel::DEFAULT,
            signature_encoding: SignatureEncoding::default(),
        }
    }

    /// Set the Apple WWDR intermediate certificate (PEM or DER).
    ///
    /// Its existence is checked when the pass is signed.
    pub fn wwdr_certificate(mut self, path: impl AsRef<Path>) -> Self {
        self.wwdr_certificate = Some(path.as_ref().to_path_buf());
        self
    }

    /// Add a file to the pass. An asset with the same name replaces the
    /// earlier one.
    pub fn asset(mut self, asset: Asset) -> Self {
        self.assets.insert(asset);
        self
    }

    pub fn assets(mut self, assets: impl IntoIterator<Item = Asset>) -> Self {
        for asset in assets {
            self.assets.insert(asset);
        }
        self
    }

    /// Set the directory under which per-build workspaces are created.
    ///
    /// Defaults to [`std::env::temp_dir`]. Must exist when the pass is built.
    pub fn temp_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.temp_dir = path.as_ref().to_path_buf();
        self
    }

    /// Set the file name suggested when the pass is downloaded.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set ZIP compression level (0-9). Default is 6.
    pub fn compression_level(mut self, level: impl Into<CompressionLevel>) -> Self {
        self.compression_level = level.into();
        self
    }

    pub fn signature_encoding(mut self, encoding: SignatureEncoding) -> Self {
        self.signature_encoding = encoding;
        self
    }

    pub fn get_assets(&self) -> &AssetList {
        &self.assets
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Build, sign and package the pass.
    ///
    /// The build runs these steps in order:
    /// 1. Check for `icon.png` and the temp directory
    /// 2. Hash every member into the manifest
    /// 3. Create a private workspace under the temp directory
    /// 4. Sign the manifest
    /// 5. Write the ZIP container and read it back
    ///
    /// The workspace is removed afterwards whether or not the build succeeded.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Configuration`] for a missing `icon.png` or temp directory
    ///   (nothing is written to disk in either case)
    /// - [`crate::Error::Credential`] for certificate or signing problems
    /// - [`crate::Error::Packaging`] if the container cannot be written
    pub fn create(&self) -> Result<PassPackage> {
        let mut stage = BuildStage::Idle;
        self.create_tracked(&mut stage)
    }

    fn create_tracked(&self, stage: &mut BuildStage) -> Result<PassPackage> {
        match self.build(stage) {
            Ok(bytes) => {
                *stage = BuildStage::Delivered;
                tracing::info!(
                    bytes = bytes.len(),
                    assets = self.assets.len(),
                    "pass created"
                );
                Ok(PassPackage::new(bytes, self.name.as_deref()))
            }
            Err(e) => {
                tracing::warn!(
                    step = stage.next_step().unwrap_or("unknown"),
                    reached = %stage,
                    error = %e,
                    "pass build failed"
                );
                *stage = BuildStage::Failed;
                Err(e)
            }
        }
    }

    fn build(&self, stage: &mut BuildStage) -> Result<Vec<u8>> {
        require_icon(&self.assets)?;
        if !self.temp_dir.is_dir() {
            return Err(Error::configuration("Temporary path not found"));
        }

        let manifest = build_manifest(&self.payload, &self.assets)?;
        *stage = BuildStage::ManifestBuilt;

        let workspace = Workspace::create(&self.temp_dir)?;
        let result = self.run(&workspace, &manifest, stage);
        workspace.clean();
        result
    }

    fn run(
        &self,
        workspace: &Workspace,
        manifest: &Manifest,
        stage: &mut BuildStage,
    ) -> Result<Vec<u8>> {
        fs::write(workspace.manifest_path(), manifest.as_bytes())?;

        let mut signer =
            ManifestSigner::new(&self.credential).encoding(self.signature_encoding);
        if let Some(ref chain) = self.wwdr_certificate {
            signer = signer.chain_certificate(chain);
        }
        let signature = signer.sign(manifest.as_bytes())?;
        fs::write(workspace.signature_path(), &signature)?;
        *stage = BuildStage::Signed;

        let members = PassMembers {
            signature: &signature,
            manifest: manifest.as_bytes(),
            payload: &self.payload,
            assets: &self.assets,
        };
        let bytes = assemble(
            &workspace.container_path(),
            &members,
            self.compression_level,
        )?;
        *stage = BuildStage::Assembled;

        Ok(bytes)
    }
}
