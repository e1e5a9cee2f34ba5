//! Download metadata for a finished pass.
//!
//! Nothing here does network I/O; it only supplies what an HTTP handler needs
//! to serve the bytes so Wallet recognises them.

/// MIME type of a pass bundle.
pub const CONTENT_TYPE: &str = "application/vnd.apple.pkpass";

/// File name offered when none was configured.
pub const DEFAULT_FILENAME: &str = "pass.pkpass";

/// A built pass: the container bytes plus how to deliver them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassPackage {
    bytes: Vec<u8>,
    filename: String,
}

impl PassPackage {
    pub(crate) fn new(bytes: Vec<u8>, filename: Option<&str>) -> Self {
        Self {
            bytes,
            filename: filename.unwrap_or(DEFAULT_FILENAME).to_string(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    pub fn content_length(&self) -> usize {
        self.bytes.len()
    }

    /// Suggested download file name.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Response headers for serving the pass as a download.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Pragma", "no-cache".to_string()),
            ("Content-Type", CONTENT_TYPE.to_string()),
            ("Content-Length", self.content_length().to_string()),
            (
                "Content-Disposition",
                format!(
                    "attachment; filename=\"{}\"",
                    self.filename.replace(&['"', '\\'][..], "_")
                ),
            ),
        ]
    }
}

impl AsRef<[u8]> for PassPackage {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filename() {
        let package = PassPackage::new(vec![1, 2, 3], None);
        assert_eq!(package.filename(), "pass.pkpass");
        assert_eq!(package.content_length(), 3);
        assert_eq!(package.content_type(), "application/vnd.apple.pkpass");
    }

    #[test]
    fn test_headers() {
        let package = PassPackage::new(vec![0; 42], Some("boarding.pkpass"));
        let headers = package.headers();

        assert!(headers.contains(&("Pragma", "no-cache".to_string())));
        assert!(headers.contains(&("Content-Length", "42".to_string())));
        assert!(headers.contains(&(
            "Content-Disposition",
            "attachment; filename=\"boarding.pkpass\"".to_string()
        )));
    }

    #[test]
    fn test_header_filename_is_quoted_safely() {
        let package = PassPackage::new(vec![0], Some("a\"b.pkpass"));
        let disposition = &package.headers()[3].1;
        assert_eq!(disposition, "attachment; filename=\"a_b.pkpass\"");
    }
}
