//! File envelope engine for CipherDrop.
//!
//! An envelope is everything needed to later decrypt one file: the
//! ciphertext, its nonce, a SHA-256 integrity hash of the ciphertext, and
//! the file's content key wrapped under a recipient's public key.
//!
//! [`seal`] produces an envelope for the owner; [`reshare`] grants another
//! recipient access by re-wrapping the content key — the ciphertext is never
//! touched, so sharing is O(1) in file size and each grant is independently
//! revocable. [`open`] verifies integrity before it decrypts anything.

mod cache;
mod engine;
mod error;
mod meta;

pub use cache::OpenFileCache;
pub use engine::{
    open, open_async, reshare, reshare_async, seal, seal_async, SealedFile,
};
pub use error::{EnvelopeError, EnvelopeResult};
pub use meta::EnvelopeMeta;
