//! Upload validation policy.

use crate::error::{LedgerError, LedgerResult};
use cipherdrop_envelope::EnvelopeMeta;

/// Server-side constraints on uploaded envelopes.
#[derive(Clone, Debug)]
pub struct UploadPolicy {
    /// Hard cap on ciphertext bytes accepted per upload.
    pub max_payload_bytes: u64,

    /// Accepted declared MIME types. An upload with no declared type is
    /// allowed; a declared type outside this list is not.
    pub allowed_mime_types: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_payload_bytes: 10 * 1024 * 1024, // 10 MiB
            allowed_mime_types: [
                "image/jpeg",
                "image/png",
                "image/gif",
                "image/webp",
                "application/pdf",
                "text/plain",
                "application/msword",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "application/vnd.ms-excel",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl UploadPolicy {
    /// Validates declared metadata before any bytes are accepted.
    pub fn validate(&self, meta: &EnvelopeMeta) -> LedgerResult<()> {
        if meta.original_size > self.max_payload_bytes {
            return Err(LedgerError::PayloadTooLarge {
                size: meta.original_size,
                max: self.max_payload_bytes,
            });
        }
        if let Some(mime) = &meta.mime_type {
            if !self.allowed_mime_types.iter().any(|m| m == mime) {
                return Err(LedgerError::UnsupportedType(mime.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(size: u64, mime: Option<&str>) -> EnvelopeMeta {
        EnvelopeMeta {
            filename: "f.bin".into(),
            iv: String::new(),
            integrity_hash: String::new(),
            encrypted_key: String::new(),
            original_size: size,
            mime_type: mime.map(String::from),
        }
    }

    #[test]
    fn default_policy_accepts_common_documents() {
        let policy = UploadPolicy::default();
        policy.validate(&meta(1024, Some("application/pdf"))).unwrap();
        policy.validate(&meta(1024, None)).unwrap();
    }

    #[test]
    fn oversize_declaration_is_rejected() {
        let policy = UploadPolicy::default();
        let err = policy.validate(&meta(11 * 1024 * 1024, None)).unwrap_err();
        assert!(matches!(err, LedgerError::PayloadTooLarge { .. }));
    }

    #[test]
    fn unknown_mime_type_is_rejected() {
        let policy = UploadPolicy::default();
        let err = policy
            .validate(&meta(10, Some("application/x-msdownload")))
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnsupportedType(_)));
    }
}
