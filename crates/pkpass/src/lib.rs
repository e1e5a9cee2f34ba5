//! Build signed Apple Wallet `.pkpass` bundles.
//!
//! A pass is a ZIP archive holding `pass.json`, image assets, a
//! `manifest.json` listing the SHA-1 of every file, and a detached PKCS#7
//! `signature` over that manifest made with a Pass Type ID certificate.
//!
//! Start with [`PkPass`]; the lower-level modules are public for callers that
//! need a single step on its own.

pub mod archive;
pub mod builder;
pub mod crypto;
pub mod delivery;
pub mod digest;
pub mod error;
pub mod manifest;
pub mod pass;
pub mod workspace;

pub use archive::CompressionLevel;
pub use builder::PkPass;
pub use crypto::{Credential, SignatureEncoding};
pub use delivery::PassPackage;
pub use error::Error;
pub use pass::{Asset, AssetList, Payload};

pub type Result<T> = std::result::Result<T, Error>;
