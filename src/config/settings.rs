use crate::domain::model::Method;
use crate::domain::transformation::KeyMaterial;
use crate::utils::error::{Result, TokenizeError};
use crate::utils::validation::{self, Validate};
use std::env;

pub const DEFAULT_API_ENDPOINT: &str = "https://dlp.googleapis.com";
pub const DEFAULT_LOCATION: &str = "global";
pub const DEFAULT_ALPHABET: &str = "UPPER_CASE_ALPHA_NUMERIC";

/// Alphabets accepted by `cryptoReplaceFfxFpeConfig.commonAlphabet`.
pub const COMMON_ALPHABETS: &[&str] = &[
    "NUMERIC",
    "HEXADECIMAL",
    "UPPER_CASE_ALPHA_NUMERIC",
    "ALPHA_NUMERIC",
];

pub const ENV_PROJECT: &str = "GOOGLE_CLOUD_PROJECT";
pub const ENV_WRAPPED_KEY: &str = "WRAPPED_KEY";
pub const ENV_KEY_PATH: &str = "GOOGLE_CLOUD_KEY_PATH";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_API_ENDPOINT: &str = "DLP_API_ENDPOINT";
pub const ENV_LOCATION: &str = "DLP_LOCATION";
pub const ENV_ALPHABET: &str = "DLP_ALPHABET";
pub const ENV_ACCESS_TOKEN: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Process-wide settings, loaded once at startup and passed by reference.
#[derive(Clone, Default)]
pub struct DlpSettings {
    pub project_id: Option<String>,
    /// Base64 transport form of the KMS-wrapped data key.
    pub wrapped_key: Option<String>,
    pub key_name: Option<String>,
    pub database_url: Option<String>,
    pub api_endpoint: String,
    pub location: String,
    pub alphabet: String,
    pub access_token: Option<String>,
}

impl std::fmt::Debug for DlpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("DlpSettings")
            .field("project_id", &self.project_id)
            .field("wrapped_key", &redacted(&self.wrapped_key))
            .field("key_name", &self.key_name)
            .field("database_url", &self.database_url)
            .field("api_endpoint", &self.api_endpoint)
            .field("location", &self.location)
            .field("alphabet", &self.alphabet)
            .field("access_token", &redacted(&self.access_token))
            .finish()
    }
}

impl DlpSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable source; blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            project_id: get(ENV_PROJECT),
            wrapped_key: get(ENV_WRAPPED_KEY),
            key_name: get(ENV_KEY_PATH),
            database_url: get(ENV_DATABASE_URL),
            api_endpoint: get(ENV_API_ENDPOINT).unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
            location: get(ENV_LOCATION).unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            alphabet: get(ENV_ALPHABET).unwrap_or_else(|| DEFAULT_ALPHABET.to_string()),
            access_token: get(ENV_ACCESS_TOKEN),
        }
    }

    /// Names of the required values that are absent.
    pub fn missing_required(&self) -> Vec<String> {
        [
            (ENV_PROJECT, &self.project_id),
            (ENV_WRAPPED_KEY, &self.wrapped_key),
            (ENV_KEY_PATH, &self.key_name),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name.to_string())
        .collect()
    }

    pub fn ensure_required(&self) -> Result<()> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TokenizeError::ConfigurationMissing { fields: missing })
        }
    }

    /// Decodes the wrapped key into [`KeyMaterial`].
    pub fn key_material(&self) -> Result<KeyMaterial> {
        self.ensure_required()?;
        let wrapped = validation::validate_required_field(ENV_WRAPPED_KEY, &self.wrapped_key)?;
        let key_name = validation::validate_required_field(ENV_KEY_PATH, &self.key_name)?;
        KeyMaterial::from_base64(wrapped, key_name.clone())
    }
}

impl Validate for DlpSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_url("dlp.endpoint", &self.api_endpoint)?;
        validation::validate_non_empty_string("dlp.location", &self.location)?;
        validation::validate_one_of("dlp.alphabet", &self.alphabet, COMMON_ALPHABETS)?;
        if let Some(url) = &self.database_url {
            validation::validate_path("database.url", url)?;
        }
        Ok(())
    }
}

/// Which fields to transform when a call does not name any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelection {
    Default(Vec<String>),
    /// Callers must always pass fields explicitly.
    Required,
}

impl Default for FieldSelection {
    fn default() -> Self {
        FieldSelection::Default(vec!["pesel".to_string(), "idNumber".to_string()])
    }
}

/// What the facade does when configuration or field validation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingConfigPolicy {
    /// Log and hand the input back untouched.
    #[default]
    PassThrough,
    Fail,
}

impl std::str::FromStr for MissingConfigPolicy {
    type Err = TokenizeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pass_through" | "pass-through" => Ok(MissingConfigPolicy::PassThrough),
            "fail" => Ok(MissingConfigPolicy::Fail),
            other => Err(TokenizeError::InvalidConfigValueError {
                field: "on_missing_config".to_string(),
                value: other.to_string(),
                reason: "Expected 'pass_through' or 'fail'".to_string(),
            }),
        }
    }
}

/// Per-facade choices made by the caller.
#[derive(Debug, Clone)]
pub struct TokenizerOptions {
    pub method: Method,
    pub template_name: Option<String>,
    pub surrogate_type: Option<String>,
    pub field_selection: FieldSelection,
    pub on_missing_config: MissingConfigPolicy,
}

impl TokenizerOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            template_name: None,
            surrogate_type: None,
            field_selection: FieldSelection::default(),
            on_missing_config: MissingConfigPolicy::default(),
        }
    }

    pub fn with_template(mut self, template_name: impl Into<String>) -> Self {
        self.template_name = Some(template_name.into());
        self
    }

    pub fn with_surrogate_type(mut self, surrogate_type: impl Into<String>) -> Self {
        self.surrogate_type = Some(surrogate_type.into());
        self
    }

    pub fn with_field_selection(mut self, field_selection: FieldSelection) -> Self {
        self.field_selection = field_selection;
        self
    }

    pub fn with_policy(mut self, policy: MissingConfigPolicy) -> Self {
        self.on_missing_config = policy;
        self
    }
}
