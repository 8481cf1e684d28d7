//! REST client for the Cloud DLP `content:deidentify` / `content:reidentify` endpoints.

use crate::config::settings::{DlpSettings, DEFAULT_LOCATION};
use crate::domain::model::{Direction, Table};
use crate::domain::ports::TransformationService;
use crate::domain::transformation::{KeyMaterial, TransformationConfig};
use crate::utils::error::{Result, TokenizeError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldId {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Value {
    #[serde(default)]
    pub string_value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Row {
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireTable {
    #[serde(default)]
    pub headers: Vec<FieldId>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl From<Table> for WireTable {
    fn from(table: Table) -> Self {
        WireTable {
            headers: table.headers.into_iter().map(|name| FieldId { name }).collect(),
            rows: table
                .rows
                .into_iter()
                .map(|row| Row {
                    values: row
                        .into_iter()
                        .map(|string_value| Value { string_value })
                        .collect(),
                })
                .collect(),
        }
    }
}

impl From<WireTable> for Table {
    fn from(table: WireTable) -> Self {
        Table {
            headers: table.headers.into_iter().map(|h| h.name).collect(),
            rows: table
                .rows
                .into_iter()
                .map(|row| row.values.into_iter().map(|v| v.string_value).collect())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub table: Option<WireTable>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KmsWrappedCryptoKey {
    wrapped_key: String,
    crypto_key_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CryptoKey {
    kms_wrapped: KmsWrappedCryptoKey,
}

impl From<&KeyMaterial> for CryptoKey {
    fn from(key: &KeyMaterial) -> Self {
        CryptoKey {
            kms_wrapped: KmsWrappedCryptoKey {
                wrapped_key: key.wrapped_key_base64(),
                crypto_key_name: key.key_name().to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct InfoType {
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CryptoReplaceFfxFpeConfig {
    crypto_key: CryptoKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    common_alphabet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    surrogate_info_type: Option<InfoType>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CryptoDeterministicConfig {
    crypto_key: CryptoKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    surrogate_info_type: Option<InfoType>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum PrimitiveTransformation {
    CryptoReplaceFfxFpeConfig(CryptoReplaceFfxFpeConfig),
    CryptoDeterministicConfig(CryptoDeterministicConfig),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldTransformation {
    fields: Vec<FieldId>,
    primitive_transformation: PrimitiveTransformation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordTransformations {
    field_transformations: Vec<FieldTransformation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeidentifyConfig {
    record_transformations: RecordTransformations,
}

fn field_ids(fields: &[String]) -> Vec<FieldId> {
    fields.iter().map(|name| FieldId { name: name.clone() }).collect()
}

fn info_type(surrogate_type: &Option<String>) -> Option<InfoType> {
    surrogate_type.as_ref().map(|name| InfoType { name: name.clone() })
}

/// Inline crypto config; `None` for template references.
fn inline_config(config: &TransformationConfig) -> Option<DeidentifyConfig> {
    let (fields, primitive_transformation) = match config {
        TransformationConfig::FormatPreservingEncryption {
            fields,
            key,
            alphabet,
            surrogate_type,
        } => (
            fields,
            PrimitiveTransformation::CryptoReplaceFfxFpeConfig(CryptoReplaceFfxFpeConfig {
                crypto_key: key.into(),
                common_alphabet: alphabet.clone(),
                surrogate_info_type: info_type(surrogate_type),
            }),
        ),
        TransformationConfig::DeterministicEncryption {
            fields,
            key,
            surrogate_type,
        } => (
            fields,
            PrimitiveTransformation::CryptoDeterministicConfig(CryptoDeterministicConfig {
                crypto_key: key.into(),
                surrogate_info_type: info_type(surrogate_type),
            }),
        ),
        TransformationConfig::TemplateReference { .. } => return None,
    };

    Some(DeidentifyConfig {
        record_transformations: RecordTransformations {
            field_transformations: vec![FieldTransformation {
                fields: field_ids(fields),
                primitive_transformation,
            }],
        },
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeidentifyContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    deidentify_config: Option<DeidentifyConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deidentify_template_name: Option<String>,
    item: ContentItem,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReidentifyContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    reidentify_config: Option<DeidentifyConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reidentify_template_name: Option<String>,
    item: ContentItem,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    item: Option<ContentItem>,
}

/// Builds the JSON body for one call in the given direction.
pub fn request_body(
    direction: Direction,
    config: &TransformationConfig,
    table: Table,
) -> Result<serde_json::Value> {
    let item = ContentItem {
        table: Some(table.into()),
    };
    let template = config.template_name().map(str::to_string);
    let body = match direction {
        Direction::Tokenize => serde_json::to_value(DeidentifyContentRequest {
            deidentify_config: inline_config(config),
            deidentify_template_name: template,
            item,
        })?,
        Direction::Detokenize => serde_json::to_value(ReidentifyContentRequest {
            reidentify_config: inline_config(config),
            reidentify_template_name: template,
            item,
        })?,
    };
    Ok(body)
}

/// [`TransformationService`] backed by the DLP REST API.
#[derive(Debug, Clone)]
pub struct DlpClient {
    client: Client,
    endpoint: String,
    project_id: Option<String>,
    location: String,
    access_token: Option<String>,
}

impl DlpClient {
    pub fn new(endpoint: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project_id: Some(project_id.into()),
            location: DEFAULT_LOCATION.to_string(),
            access_token: None,
        }
    }

    pub fn from_settings(settings: &DlpSettings) -> Self {
        Self {
            client: Client::new(),
            endpoint: settings.api_endpoint.trim_end_matches('/').to_string(),
            project_id: settings.project_id.clone(),
            location: settings.location.clone(),
            access_token: settings.access_token.clone(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Resource parent: project-scoped for templates, location-scoped for inline configs.
    fn parent(&self, config: &TransformationConfig) -> Result<String> {
        let project = self
            .project_id
            .as_deref()
            .ok_or_else(|| TokenizeError::ConfigurationMissing {
                fields: vec!["GOOGLE_CLOUD_PROJECT".to_string()],
            })?;
        Ok(match config {
            TransformationConfig::TemplateReference { .. } => format!("projects/{}", project),
            _ => format!("projects/{}/locations/{}", project, self.location),
        })
    }

    pub fn url(&self, direction: Direction, config: &TransformationConfig) -> Result<String> {
        let verb = match direction {
            Direction::Tokenize => "deidentify",
            Direction::Detokenize => "reidentify",
        };
        Ok(format!(
            "{}/v2/{}/content:{}",
            self.endpoint,
            self.parent(config)?,
            verb
        ))
    }

    async fn call(
        &self,
        direction: Direction,
        config: &TransformationConfig,
        table: Table,
    ) -> Result<Table> {
        let url = self.url(direction, config)?;
        let body = request_body(direction, config, table)?;

        tracing::debug!("POST {} ({})", url, config.kind());
        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("DLP response status: {}", status);

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TokenizeError::RemoteServiceFailure {
                status: Some(status.as_u16()),
                message: if message.is_empty() {
                    status.to_string()
                } else {
                    message
                },
            });
        }

        let parsed: ContentResponse =
            response
                .json()
                .await
                .map_err(|e| TokenizeError::RemoteServiceFailure {
                    status: Some(status.as_u16()),
                    message: format!("malformed response: {}", e),
                })?;

        parsed
            .item
            .and_then(|item| item.table)
            .map(Table::from)
            .ok_or_else(|| TokenizeError::RemoteServiceFailure {
                status: Some(status.as_u16()),
                message: "response did not contain a table".to_string(),
            })
    }
}

#[async_trait]
impl TransformationService for DlpClient {
    async fn tokenize_table(&self, config: &TransformationConfig, table: Table) -> Result<Table> {
        self.call(Direction::Tokenize, config, table).await
    }

    async fn detokenize_table(&self, config: &TransformationConfig, table: Table) -> Result<Table> {
        self.call(Direction::Detokenize, config, table).await
    }
}
