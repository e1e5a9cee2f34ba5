//! Detached PKCS#7 signing of `manifest.json`.
//!
//! The signature is a PKCS#7 `SignedData` over the manifest bytes with the
//! content left out (detached) and binary mode on, so OpenSSL does not
//! canonicalize line endings. When a chain certificate (Apple WWDR) is
//! configured it is carried in the signature's certificate set.

use super::credential::{load_chain_certificate, Credential};
use super::smime::smime_to_der;
use crate::{Error, Result};
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::stack::Stack;
use openssl::x509::X509;
use std::path::{Path, PathBuf};

/// How the signature bytes are obtained from OpenSSL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignatureEncoding {
    /// Serialize the `SignedData` straight to DER.
    #[default]
    Der,
    /// Render S/MIME text and decode the `smime.p7s` part back to DER.
    ///
    /// Produces the same structure as [`SignatureEncoding::Der`]; kept for
    /// parity with tooling that only emits S/MIME.
    Smime,
}

/// Signs manifests with a PKCS#12 credential.
///
/// # Examples
///
/// ```no_run
/// use pkpass::crypto::{Credential, ManifestSigner};
///
/// let credential = Credential::from_p12_file("Certificate.p12", "secret")?;
/// let der = ManifestSigner::new(&credential)
///     .chain_certificate("AppleWWDRCA.pem")
///     .sign(br#"{"pass.json":"bf21a9e8fbc5a3846fb05b4fa0859e0917b2202f"}"#)?;
/// assert!(!der.is_empty());
/// # Ok::<(), pkpass::Error>(())
/// ```
pub struct ManifestSigner<'a> {
    credential: &'a Credential,
    chain_certificate: Option<PathBuf>,
    encoding: SignatureEncoding,
}

impl<'a> ManifestSigner<'a> {
    pub fn new(credential: &'a Credential) -> Self {
        Self {
            credential,
            chain_certificate: None,
            encoding: SignatureEncoding::default(),
        }
    }

    /// Include an intermediate certificate (PEM or DER) in the signature.
    pub fn chain_certificate(mut self, path: impl AsRef<Path>) -> Self {
        self.chain_certificate = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn encoding(mut self, encoding: SignatureEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Produce the DER-encoded detached signature over `manifest`.
    ///
    /// The signing steps run in this order:
    /// 1. Open the PKCS#12 container
    /// 2. Load the chain certificate, if configured
    /// 3. Sign with `BINARY | DETACHED`
    /// 4. Encode to DER
    ///
    /// # Errors
    ///
    /// Every failure is an [`Error::Credential`]: an unreadable container or
    /// wrong password, a missing or unreadable chain certificate (reported
    /// before OpenSSL is asked to sign), or a signing failure.
    pub fn sign(&self, manifest: &[u8]) -> Result<Vec<u8>> {
        let identity = self.credential.open()?;

        let mut extra_certs = Stack::<X509>::new().map_err(signing_failed)?;
        if let Some(ref path) = self.chain_certificate {
            let chain = load_chain_certificate(path)?;
            extra_certs.push(chain).map_err(signing_failed)?;
        }

        let flags = Pkcs7Flags::BINARY | Pkcs7Flags::DETACHED;
        let pkcs7 = Pkcs7::sign(
            &identity.certificate,
            &identity.private_key,
            &extra_certs,
            manifest,
            flags,
        )
        .map_err(signing_failed)?;

        let der = match self.encoding {
            SignatureEncoding::Der => pkcs7.to_der().map_err(signing_failed)?,
            SignatureEncoding::Smime => {
                let smime = pkcs7.to_smime(manifest, flags).map_err(signing_failed)?;
                smime_to_der(&smime)?
            }
        };

        tracing::debug!(
            bytes = der.len(),
            encoding = ?self.encoding,
            chain = self.chain_certificate.is_some(),
            signer = identity.common_name().as_deref().unwrap_or("unknown"),
            "manifest signed"
        );

        Ok(der)
    }
}

/// Sign `manifest` with default settings. See [`ManifestSigner::sign`].
pub fn sign(manifest: &[u8], credential: &Credential, chain_certificate: Option<&Path>) -> Result<Vec<u8>> {
    let mut signer = ManifestSigner::new(credential);
    if let Some(path) = chain_certificate {
        signer = signer.chain_certificate(path);
    }
    signer.sign(manifest)
}

fn signing_failed(e: openssl::error::ErrorStack) -> Error {
    Error::credential(format!("Failed to sign manifest: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::credential::test_support::*;
    use openssl::x509::store::X509StoreBuilder;
    use std::fs;
    use tempfile::TempDir;

    const MANIFEST: &[u8] = br#"{"pass.json":"bf21a9e8fbc5a3846fb05b4fa0859e0917b2202f"}"#;

    fn verify(der: &[u8], cert: &X509, content: &[u8]) -> bool {
        let pkcs7 = Pkcs7::from_der(der).unwrap();
        let mut certs = Stack::new().unwrap();
        certs.push(cert.clone()).unwrap();
        let store = X509StoreBuilder::new().unwrap().build();
        pkcs7
            .verify(
                &certs,
                &store,
                Some(content),
                None,
                Pkcs7Flags::BINARY | Pkcs7Flags::NOVERIFY,
            )
            .is_ok()
    }

    fn write_chain(dir: &Path) -> PathBuf {
        let key = generate_key();
        let cert = generate_cert(&key, "Test WWDR");
        let path = dir.join("wwdr.pem");
        fs::write(&path, cert.to_pem().unwrap()).unwrap();
        path
    }

    #[test]
    fn test_signature_is_detached_der() {
        let (p12, cert) = generate_p12("password");
        let credential = Credential::from_p12_bytes(p12, "password");

        let der = sign(MANIFEST, &credential, None).unwrap();
        assert_eq!(der[0], 0x30, "DER SEQUENCE expected");
        assert!(!der.windows(MANIFEST.len()).any(|w| w == MANIFEST));
        assert!(verify(&der, &cert, MANIFEST));
        assert!(!verify(&der, &cert, b"{\"pass.json\":\"tampered\"}"));
    }

    #[test]
    fn test_repeated_signatures_both_verify() {
        let dir = TempDir::new().unwrap();
        let chain = write_chain(dir.path());
        let (p12, cert) = generate_p12("password");
        let credential = Credential::from_p12_bytes(p12, "password");

        let first = sign(MANIFEST, &credential, Some(&chain)).unwrap();
        let second = sign(MANIFEST, &credential, Some(&chain)).unwrap();
        assert!(verify(&first, &cert, MANIFEST));
        assert!(verify(&second, &cert, MANIFEST));
    }

    #[test]
    fn test_chain_certificate_is_embedded() {
        let dir = TempDir::new().unwrap();
        let chain = write_chain(dir.path());
        let chain_der = X509::from_pem(&fs::read(&chain).unwrap())
            .unwrap()
            .to_der()
            .unwrap();
        let (p12, _) = generate_p12("password");
        let credential = Credential::from_p12_bytes(p12, "password");

        let der = sign(MANIFEST, &credential, Some(&chain)).unwrap();
        assert!(der.windows(chain_der.len()).any(|w| w == chain_der.as_slice()));
    }

    #[test]
    fn test_smime_encoding_matches_der_structure() {
        let (p12, cert) = generate_p12("password");
        let credential = Credential::from_p12_bytes(p12, "password");

        let der = ManifestSigner::new(&credential)
            .encoding(SignatureEncoding::Smime)
            .sign(MANIFEST)
            .unwrap();
        assert!(verify(&der, &cert, MANIFEST));
    }

    #[test]
    fn test_missing_chain_certificate() {
        let dir = TempDir::new().unwrap();
        let (p12, _) = generate_p12("password");
        let credential = Credential::from_p12_bytes(p12, "password");

        let err = sign(MANIFEST, &credential, Some(&dir.path().join("missing.pem"))).unwrap_err();
        assert!(
            matches!(err, Error::Credential(ref m) if m == "WWDR Intermediate Certificate does not exist")
        );
    }

    #[test]
    fn test_wrong_password() {
        let (p12, _) = generate_p12("password");
        let credential = Credential::from_p12_bytes(p12, "password1");

        let err = sign(MANIFEST, &credential, None).unwrap_err();
        assert!(matches!(err, Error::Credential(ref m) if m == "Could not read the certificate"));
    }
}
