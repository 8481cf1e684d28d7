use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;

use crate::utils::error::{Result, TokenizeError};

/// A KMS-wrapped data key and the name of the KMS key that unwraps it.
///
/// The wrapped bytes are only ever handed to the remote service; they are
/// never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    wrapped_key: Vec<u8>,
    key_name: String,
}

impl KeyMaterial {
    pub fn new(wrapped_key: Vec<u8>, key_name: impl Into<String>) -> Self {
        Self {
            wrapped_key,
            key_name: key_name.into(),
        }
    }

    /// Decodes the base64 transport form of the wrapped key.
    pub fn from_base64(wrapped_key_b64: &str, key_name: impl Into<String>) -> Result<Self> {
        let wrapped_key = STANDARD
            .decode(wrapped_key_b64.trim())
            .map_err(|e| TokenizeError::InvalidKeyMaterial {
                message: e.to_string(),
            })?;
        if wrapped_key.is_empty() {
            return Err(TokenizeError::InvalidKeyMaterial {
                message: "wrapped key is empty".to_string(),
            });
        }
        Ok(Self::new(wrapped_key, key_name))
    }

    pub fn wrapped_key(&self) -> &[u8] {
        &self.wrapped_key
    }

    /// Wrapped key re-encoded for JSON transport.
    pub fn wrapped_key_base64(&self) -> String {
        STANDARD.encode(&self.wrapped_key)
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("wrapped_key", &"[REDACTED]")
            .field("key_name", &self.key_name)
            .finish()
    }
}

/// The transformation the remote service should apply to one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformationConfig {
    FormatPreservingEncryption {
        fields: Vec<String>,
        key: KeyMaterial,
        alphabet: Option<String>,
        surrogate_type: Option<String>,
    },
    DeterministicEncryption {
        fields: Vec<String>,
        key: KeyMaterial,
        surrogate_type: Option<String>,
    },
    /// A transformation stored server-side and referenced by resource name.
    TemplateReference { template_name: String },
}

impl TransformationConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            TransformationConfig::FormatPreservingEncryption { .. } => "format_preserving_encryption",
            TransformationConfig::DeterministicEncryption { .. } => "deterministic_encryption",
            TransformationConfig::TemplateReference { .. } => "template_reference",
        }
    }

    pub fn fields(&self) -> &[String] {
        match self {
            TransformationConfig::FormatPreservingEncryption { fields, .. }
            | TransformationConfig::DeterministicEncryption { fields, .. } => fields,
            TransformationConfig::TemplateReference { .. } => &[],
        }
    }

    pub fn template_name(&self) -> Option<&str> {
        match self {
            TransformationConfig::TemplateReference { template_name } => Some(template_name),
            _ => None,
        }
    }
}
