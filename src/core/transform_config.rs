use crate::domain::model::Method;
use crate::domain::transformation::{KeyMaterial, TransformationConfig};
use crate::utils::error::{Result, TokenizeError};

/// Assembles the [`TransformationConfig`] for a single call.
///
/// A template name wins over everything else: the template carries its own
/// crypto settings server-side, so method, alphabet and key are ignored.
/// Field names are not checked against any header here.
#[derive(Debug, Clone)]
pub struct TransformationConfigBuilder {
    method: Method,
    fields: Vec<String>,
    key: Option<KeyMaterial>,
    alphabet: Option<String>,
    surrogate_type: Option<String>,
    template_name: Option<String>,
}

impl TransformationConfigBuilder {
    pub fn new(method: Method, fields: Vec<String>) -> Self {
        Self {
            method,
            fields,
            key: None,
            alphabet: None,
            surrogate_type: None,
            template_name: None,
        }
    }

    pub fn key_material(mut self, key: KeyMaterial) -> Self {
        self.key = Some(key);
        self
    }

    pub fn alphabet(mut self, alphabet: Option<String>) -> Self {
        self.alphabet = alphabet;
        self
    }

    pub fn surrogate_type(mut self, surrogate_type: Option<String>) -> Self {
        self.surrogate_type = surrogate_type;
        self
    }

    pub fn template_name(mut self, template_name: Option<String>) -> Self {
        self.template_name = template_name;
        self
    }

    pub fn build(self) -> Result<TransformationConfig> {
        if let Some(template_name) = self.template_name {
            return Ok(TransformationConfig::TemplateReference { template_name });
        }

        let key = self.key.ok_or_else(|| TokenizeError::ConfigurationMissing {
            fields: vec!["WRAPPED_KEY".to_string(), "GOOGLE_CLOUD_KEY_PATH".to_string()],
        })?;

        Ok(match self.method {
            Method::Fpe => TransformationConfig::FormatPreservingEncryption {
                fields: self.fields,
                key,
                alphabet: self.alphabet,
                surrogate_type: self.surrogate_type,
            },
            Method::Deterministic => TransformationConfig::DeterministicEncryption {
                fields: self.fields,
                key,
                surrogate_type: self.surrogate_type,
            },
        })
    }
}

/// Functional form of [`TransformationConfigBuilder`].
pub fn build(
    method: Method,
    fields: Vec<String>,
    key: Option<KeyMaterial>,
    alphabet: Option<String>,
    surrogate_type: Option<String>,
    template_name: Option<String>,
) -> Result<TransformationConfig> {
    let mut builder = TransformationConfigBuilder::new(method, fields)
        .alphabet(alphabet)
        .surrogate_type(surrogate_type)
        .template_name(template_name);
    if let Some(key) = key {
        builder = builder.key_material(key);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> KeyMaterial {
        KeyMaterial::new(vec![7; 32], "projects/p/locations/global/keyRings/r/cryptoKeys/k")
    }

    fn fields() -> Vec<String> {
        vec!["pesel".to_string(), "idNumber".to_string()]
    }

    #[test]
    fn test_fpe_without_template() {
        let config = TransformationConfigBuilder::new(Method::Fpe, fields())
            .key_material(key())
            .alphabet(Some("UPPER_CASE_ALPHA_NUMERIC".to_string()))
            .build()
            .unwrap();

        assert_eq!(
            config,
            TransformationConfig::FormatPreservingEncryption {
                fields: fields(),
                key: key(),
                alphabet: Some("UPPER_CASE_ALPHA_NUMERIC".to_string()),
                surrogate_type: None,
            }
        );
        assert_eq!(config.kind(), "format_preserving_encryption");
    }

    #[test]
    fn test_template_wins_regardless_of_method() {
        for method in [Method::Fpe, Method::Deterministic] {
            let config = build(
                method,
                fields(),
                Some(key()),
                Some("NUMERIC".to_string()),
                Some("TOKEN".to_string()),
                Some("t1".to_string()),
            )
            .unwrap();
            assert_eq!(
                config,
                TransformationConfig::TemplateReference {
                    template_name: "t1".to_string()
                }
            );
            assert_eq!(config.template_name(), Some("t1"));
        }
    }

    #[test]
    fn test_template_does_not_need_key() {
        let config = build(Method::Fpe, fields(), None, None, None, Some("t1".to_string()));
        assert!(config.is_ok());
    }

    #[test]
    fn test_deterministic_drops_alphabet() {
        let config = build(
            Method::Deterministic,
            fields(),
            Some(key()),
            Some("NUMERIC".to_string()),
            None,
            None,
        )
        .unwrap();

        assert_eq!(
            config,
            TransformationConfig::DeterministicEncryption {
                fields: fields(),
                key: key(),
                surrogate_type: None,
            }
        );
    }

    #[test]
    fn test_surrogate_type_attached_for_both_methods() {
        let fpe = build(Method::Fpe, fields(), Some(key()), None, Some("PESEL_TOKEN".to_string()), None)
            .unwrap();
        let det = build(
            Method::Deterministic,
            fields(),
            Some(key()),
            None,
            Some("PESEL_TOKEN".to_string()),
            None,
        )
        .unwrap();

        assert!(matches!(
            fpe,
            TransformationConfig::FormatPreservingEncryption { surrogate_type: Some(ref s), .. } if s == "PESEL_TOKEN"
        ));
        assert!(matches!(
            det,
            TransformationConfig::DeterministicEncryption { surrogate_type: Some(ref s), .. } if s == "PESEL_TOKEN"
        ));
    }

    #[test]
    fn test_unknown_fields_are_accepted() {
        let config = build(
            Method::Deterministic,
            vec!["doesNotExist".to_string()],
            Some(key()),
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(config.fields(), ["doesNotExist".to_string()]);
    }

    #[test]
    fn test_crypto_config_without_key_is_missing_configuration() {
        let err = build(Method::Fpe, fields(), None, None, None, None).unwrap_err();
        assert!(matches!(err, TokenizeError::ConfigurationMissing { .. }));
    }
}
