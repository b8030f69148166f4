//! Access control ledger for CipherDrop.
//!
//! The server-held, authoritative record of which wrapped content key
//! belongs to which `(file, user)` pair. The ledger stores envelope
//! metadata and grant rows, parks ciphertext in the blob store under an
//! opaque reference, and answers exactly one question for the HTTP layer:
//! may this caller have this file's wrapped key?
//!
//! It never sees key material it could use — every stored key is wrapped
//! under some recipient's public key, and resolving access only relays the
//! wrapped copy.

mod error;
mod ledger;
mod policy;
mod types;

pub use error::{LedgerError, LedgerResult};
pub use ledger::AccessLedger;
pub use policy::UploadPolicy;
pub use types::{Download, FileMetadata, FileRecord, OwnedFile, SharedFile};
