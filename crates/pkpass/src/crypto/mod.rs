pub mod credential;
pub mod signer;
pub mod smime;

pub use credential::{Credential, SigningIdentity};
pub use signer::{sign, ManifestSigner, SignatureEncoding};
pub use smime::smime_to_der;
