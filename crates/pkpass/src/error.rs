//! Error types for pass building.
//!
//! This module defines the [`enum@Error`] enum covering every failure a build
//! can report. Errors fall into three families: caller input mistakes
//! ([`Error::Configuration`]), certificate and signing problems
//! ([`Error::Credential`]) and container output problems ([`Error::Packaging`]).
//!
//! # See Also
//!
//! - [`crate::Result`] - Convenience type alias using this error

use thiserror::Error;

/// Error type for pass building operations.
///
/// All public functions in this crate return [`crate::Result<T>`], which uses this error type.
/// None of these errors are transient; retrying the same build with the same
/// inputs fails the same way.
///
/// # Examples
///
/// ```no_run
/// use pkpass::{Credential, Error, Payload, PkPass};
///
/// # fn run() -> pkpass::Result<()> {
/// let credential = Credential::from_p12_file("Certificate.p12", "secret")?;
/// let pass = PkPass::new(credential, Payload::from_json("{}")?);
/// match pass.create() {
///     Ok(package) => println!("{} bytes", package.content_length()),
///     Err(Error::Configuration(msg)) => eprintln!("Fix the inputs: {msg}"),
///     Err(Error::Credential(msg)) => eprintln!("Certificate problem: {msg}"),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid caller input.
    ///
    /// Missing `icon.png`, a temporary path that is not a directory, a payload
    /// that is not JSON, or an asset that cannot be found. Always detected
    /// before any cryptographic work.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Certificate or signing failure.
    ///
    /// The PKCS#12 container could not be opened (wrong password and corrupt
    /// data report the same message), the chain certificate is missing or
    /// unreadable, or the signing primitive failed.
    #[error("Certificate error: {0}")]
    Credential(String),

    /// The ZIP container could not be written or came out empty.
    #[error("Packaging error: {0}")]
    Packaging(String),

    /// I/O operation failed.
    ///
    /// Occurs when creating the build workspace or writing intermediate files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub(crate) fn credential(msg: impl Into<String>) -> Self {
        Error::Credential(msg.into())
    }

    pub(crate) fn packaging(msg: impl Into<String>) -> Self {
        Error::Packaging(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_family() {
        let err = Error::configuration("Missing required icon.png file");
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required icon.png file"
        );

        let err = Error::credential("Could not read the certificate");
        assert!(err.to_string().starts_with("Certificate error"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
