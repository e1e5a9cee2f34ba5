//! Pass Type ID certificate loading.
//!
//! Passes are signed with the Pass Type ID certificate exported from Keychain
//! Access as a password-protected PKCS#12 (.p12) container. [`Credential`]
//! holds the raw container and its password; [`SigningIdentity`] is the parsed
//! certificate and private key, which only lives for the duration of a build.

use crate::{Error, Result};
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::fs;
use std::path::Path;

/// Message for every PKCS#12 failure. Wrong passwords and damaged files are
/// reported the same way.
pub(crate) const UNREADABLE_CERTIFICATE: &str = "Could not read the certificate";

/// A password-protected PKCS#12 container, not yet opened.
///
/// The password is stored as a [`SecretString`] and zeroized on drop.
#[derive(Clone)]
pub struct Credential {
    p12: Vec<u8>,
    password: SecretString,
}

impl Credential {
    /// Load a `.p12` file from disk.
    ///
    /// Only the file's existence and readability are checked here; the
    /// container is opened when a pass is signed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Credential`] if the file does not exist.
    pub fn from_p12_file(path: impl AsRef<Path>, password: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::credential("Certificate file does not exist"));
        }
        let p12 = fs::read(path)?;
        Ok(Self::from_p12_bytes(p12, password))
    }

    /// Wrap PKCS#12 bytes already in memory.
    pub fn from_p12_bytes(p12: impl Into<Vec<u8>>, password: impl Into<String>) -> Self {
        Self {
            p12: p12.into(),
            password: SecretString::new(password.into()),
        }
    }

    /// Open the container and decrypt the certificate and private key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Credential`] with the message "Could not read the
    /// certificate" if the data is not PKCS#12, the password is wrong, or the
    /// container lacks a certificate or key. The key must also match the
    /// certificate's public key.
    pub fn open(&self) -> Result<SigningIdentity> {
        let parsed = Pkcs12::from_der(&self.p12)
            .and_then(|p12| p12.parse2(self.password.expose_secret()))
            .map_err(|e| {
                tracing::debug!(error = %e, "PKCS#12 container rejected");
                Error::credential(UNREADABLE_CERTIFICATE)
            })?;

        let (certificate, private_key) = match (parsed.cert, parsed.pkey) {
            (Some(cert), Some(pkey)) => (cert, pkey),
            (cert, pkey) => {
                tracing::debug!(
                    has_cert = cert.is_some(),
                    has_key = pkey.is_some(),
                    "PKCS#12 container incomplete"
                );
                return Err(Error::credential(UNREADABLE_CERTIFICATE));
            }
        };

        validate_key_pair(&certificate, &private_key)?;

        if let Some(ca) = parsed.ca.as_ref() {
            tracing::debug!(count = ca.len(), "ignoring CA certificates bundled in PKCS#12");
        }

        Ok(SigningIdentity {
            certificate,
            private_key,
        })
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("p12_len", &self.p12.len())
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// An opened credential: end-entity certificate and its private key.
///
/// Treat as sensitive; avoid logging or holding it beyond a single build.
pub struct SigningIdentity {
    /// Pass Type ID certificate.
    pub certificate: X509,
    /// Private key matching `certificate`.
    pub private_key: PKey<Private>,
}

impl SigningIdentity {
    /// Common name of the certificate subject, e.g. `Pass Type ID: pass.com.example`.
    pub fn common_name(&self) -> Option<String> {
        self.certificate
            .subject_name()
            .entries_by_nid(openssl::nid::Nid::COMMONNAME)
            .next()
            .map(|entry| String::from_utf8_lossy(entry.data().as_slice()).into_owned())
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("subject", &self.common_name())
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Load a chain certificate (e.g. Apple WWDR) from PEM or DER.
pub(crate) fn load_chain_certificate(path: &Path) -> Result<X509> {
    if !path.exists() {
        return Err(Error::credential(
            "WWDR Intermediate Certificate does not exist",
        ));
    }
    let data = fs::read(path)
        .map_err(|_| Error::credential("Could not read the chain certificate"))?;
    X509::from_pem(&data)
        .or_else(|_| X509::from_der(&data))
        .map_err(|e| {
            tracing::debug!(error = %e, path = %path.display(), "chain certificate rejected");
            Error::credential("Could not read the chain certificate")
        })
}

fn validate_key_pair(cert: &X509, private_key: &PKey<Private>) -> Result<()> {
    let cert_public_key = cert.public_key().map_err(|e| {
        Error::credential(format!(
            "Failed to extract public key from certificate: {e}"
        ))
    })?;

    if !private_key.public_eq(&cert_public_key) {
        return Err(Error::credential(
            "Private key does not match certificate public key",
        ));
    }

    Ok(())
}
