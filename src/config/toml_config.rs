use crate::config::settings::{
    DlpSettings, FieldSelection, MissingConfigPolicy, TokenizerOptions, COMMON_ALPHABETS,
};
use crate::domain::model::Method;
use crate::utils::error::{Result, TokenizeError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub dlp: DlpSection,
    #[serde(default)]
    pub tokenization: TokenizationSection,
    #[serde(default)]
    pub database: DatabaseSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DlpSection {
    pub project_id: Option<String>,
    pub wrapped_key: Option<String>,
    pub key_name: Option<String>,
    pub endpoint: Option<String>,
    pub location: Option<String>,
    pub alphabet: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenizationSection {
    pub method: Option<String>,
    pub template_name: Option<String>,
    pub surrogate_type: Option<String>,
    pub default_fields: Option<Vec<String>>,
    pub fields_required: Option<bool>,
    pub on_missing_config: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: Option<String>,
    pub collection: Option<String>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(TokenizeError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| TokenizeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| TokenizeError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        if let Some(endpoint) = &self.dlp.endpoint {
            validation::validate_url("dlp.endpoint", endpoint)?;
        }
        if let Some(alphabet) = &self.dlp.alphabet {
            validation::validate_one_of("dlp.alphabet", alphabet, COMMON_ALPHABETS)?;
        }
        if let Some(method) = &self.tokenization.method {
            validation::validate_one_of(
                "tokenization.method",
                &method.to_ascii_lowercase(),
                &["fpe", "deterministic"],
            )?;
        }
        if let Some(template) = &self.tokenization.template_name {
            validation::validate_non_empty_string("tokenization.template_name", template)?;
        }
        if let Some(policy) = &self.tokenization.on_missing_config {
            policy.parse::<MissingConfigPolicy>()?;
        }
        if let Some(fields) = &self.tokenization.default_fields {
            for field in fields {
                validation::validate_non_empty_string("tokenization.default_fields", field)?;
            }
        }
        if let Some(url) = &self.database.url {
            validation::validate_path("database.url", url)?;
        }
        Ok(())
    }

    /// Overlays file values on top of `base`; the file wins where it sets a value.
    pub fn merge_into(&self, base: DlpSettings) -> DlpSettings {
        let dlp = &self.dlp;
        DlpSettings {
            project_id: dlp.project_id.clone().or(base.project_id),
            wrapped_key: dlp.wrapped_key.clone().or(base.wrapped_key),
            key_name: dlp.key_name.clone().or(base.key_name),
            database_url: self.database.url.clone().or(base.database_url),
            api_endpoint: dlp.endpoint.clone().unwrap_or(base.api_endpoint),
            location: dlp.location.clone().unwrap_or(base.location),
            alphabet: dlp.alphabet.clone().unwrap_or(base.alphabet),
            access_token: dlp.access_token.clone().or(base.access_token),
        }
    }

    pub fn tokenizer_options(&self) -> Result<TokenizerOptions> {
        let section = &self.tokenization;
        let method = match &section.method {
            Some(m) => m.parse::<Method>()?,
            None => Method::Fpe,
        };

        let mut options = TokenizerOptions::new(method);
        options.template_name = section.template_name.clone();
        options.surrogate_type = section.surrogate_type.clone();
        options.field_selection = if section.fields_required.unwrap_or(false) {
            FieldSelection::Required
        } else {
            match &section.default_fields {
                Some(fields) => FieldSelection::Default(fields.clone()),
                None => FieldSelection::default(),
            }
        };
        if let Some(policy) = &section.on_missing_config {
            options.on_missing_config = policy.parse()?;
        }
        Ok(options)
    }

    pub fn collection(&self) -> &str {
        self.database.collection.as_deref().unwrap_or("Client")
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
