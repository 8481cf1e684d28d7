use crate::config::settings::{DlpSettings, FieldSelection, MissingConfigPolicy, TokenizerOptions};
use crate::core::table;
use crate::core::transform_config::TransformationConfigBuilder;
use crate::domain::model::{Direction, Record};
use crate::domain::ports::TransformationService;
use crate::domain::transformation::{KeyMaterial, TransformationConfig};
use crate::utils::error::{Result, TokenizeError};

/// Records returned by [`Tokenizer::apply`], with whether the service was called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub records: Vec<Record>,
    /// `false` when the batch was passed through or was empty.
    pub invoked: bool,
}

impl Transformed {
    fn passed_through(records: Vec<Record>) -> Self {
        Self {
            records,
            invoked: false,
        }
    }
}

/// Tokenizes and detokenizes record batches through a [`TransformationService`].
///
/// Configuration and field-selection problems are handled according to
/// [`MissingConfigPolicy`]; failures of the remote call always propagate.
pub struct Tokenizer<'a, S: TransformationService> {
    settings: &'a DlpSettings,
    options: TokenizerOptions,
    service: S,
}

impl<'a, S: TransformationService> Tokenizer<'a, S> {
    pub fn new(settings: &'a DlpSettings, options: TokenizerOptions, service: S) -> Self {
        Self {
            settings,
            options,
            service,
        }
    }

    pub fn options(&self) -> &TokenizerOptions {
        &self.options
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub async fn tokenize(&self, records: Vec<Record>, fields: Option<&[String]>) -> Result<Vec<Record>> {
        Ok(self.apply(Direction::Tokenize, records, fields).await?.records)
    }

    pub async fn detokenize(
        &self,
        records: Vec<Record>,
        fields: Option<&[String]>,
    ) -> Result<Vec<Record>> {
        Ok(self.apply(Direction::Detokenize, records, fields).await?.records)
    }

    /// Runs one batch in `direction` and reports whether the service was reached.
    pub async fn apply(
        &self,
        direction: Direction,
        records: Vec<Record>,
        fields: Option<&[String]>,
    ) -> Result<Transformed> {
        let config = match self.prepare(fields) {
            Ok(config) => config,
            Err(e)
                if e.is_recoverable_by_pass_through()
                    && self.options.on_missing_config == MissingConfigPolicy::PassThrough =>
            {
                tracing::warn!("{} skipped, returning records unchanged: {}", direction, e);
                return Ok(Transformed::passed_through(records));
            }
            Err(e) => return Err(e),
        };

        if records.is_empty() {
            tracing::debug!("{} called with an empty batch", direction);
            return Ok(Transformed::passed_through(records));
        }

        let table = table::encode(&records)?;
        tracing::info!(
            "{} {} records ({} columns) with {}",
            direction,
            table.rows.len(),
            table.headers.len(),
            config.kind()
        );

        let result = self.service.invoke(direction, &config, table).await?;
        Ok(Transformed {
            records: table::decode(&records, &result)?,
            invoked: true,
        })
    }

    /// Checks settings and fields, then builds the config for this call.
    fn prepare(&self, fields: Option<&[String]>) -> Result<TransformationConfig> {
        self.settings.ensure_required()?;
        let fields = self.resolve_fields(fields)?;

        let mut builder = TransformationConfigBuilder::new(self.options.method, fields)
            .alphabet(Some(self.settings.alphabet.clone()))
            .surrogate_type(self.options.surrogate_type.clone())
            .template_name(self.options.template_name.clone());

        if self.options.template_name.is_none() {
            builder = builder.key_material(self.key_material()?);
        }

        builder.build()
    }

    fn key_material(&self) -> Result<KeyMaterial> {
        self.settings.key_material()
    }

    fn resolve_fields(&self, fields: Option<&[String]>) -> Result<Vec<String>> {
        let fields = match (fields, &self.options.field_selection) {
            (Some(fields), _) => fields.to_vec(),
            (None, FieldSelection::Default(defaults)) => defaults.clone(),
            (None, FieldSelection::Required) => {
                return Err(TokenizeError::InvalidFieldSelection {
                    message: "fields must be provided".to_string(),
                })
            }
        };

        if fields.is_empty() || fields.iter().any(|f| f.trim().is_empty()) {
            return Err(TokenizeError::InvalidFieldSelection {
                message: "fields cannot be empty".to_string(),
            });
        }
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{ENV_KEY_PATH, ENV_PROJECT, ENV_WRAPPED_KEY};
    use crate::domain::model::{Method, Table};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Reverses the characters of every configured column; its own inverse.
    #[derive(Default)]
    struct ReversingService {
        calls: AtomicUsize,
        last_config: Mutex<Option<TransformationConfig>>,
    }

    impl ReversingService {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn apply(&self, config: &TransformationConfig, mut table: Table) -> Table {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_config.lock().unwrap() = Some(config.clone());
            let columns: Vec<usize> = table
                .headers
                .iter()
                .enumerate()
                .filter(|(_, h)| config.fields().contains(*h))
                .map(|(i, _)| i)
                .collect();
            for row in &mut table.rows {
                for &i in &columns {
                    row[i] = row[i].chars().rev().collect();
                }
            }
            table
        }
    }

    #[async_trait]
    impl TransformationService for ReversingService {
        async fn tokenize_table(&self, config: &TransformationConfig, table: Table) -> Result<Table> {
            Ok(self.apply(config, table))
        }

        async fn detokenize_table(&self, config: &TransformationConfig, table: Table) -> Result<Table> {
            Ok(self.apply(config, table))
        }
    }

    /// Replaces the `id` column with a fixed token.
    struct FixedTokenService;

    #[async_trait]
    impl TransformationService for FixedTokenService {
        async fn tokenize_table(&self, _config: &TransformationConfig, mut table: Table) -> Result<Table> {
            let id = table.headers.iter().position(|h| h == "id").unwrap();
            for row in &mut table.rows {
                row[id] = "XXXXXXX".to_string();
            }
            Ok(table)
        }

        async fn detokenize_table(&self, _config: &TransformationConfig, table: Table) -> Result<Table> {
            Ok(table)
        }
    }

    struct FailingService;

    #[async_trait]
    impl TransformationService for FailingService {
        async fn tokenize_table(&self, _config: &TransformationConfig, _table: Table) -> Result<Table> {
            Err(TokenizeError::RemoteServiceFailure {
                status: Some(503),
                message: "unavailable".to_string(),
            })
        }

        async fn detokenize_table(&self, _config: &TransformationConfig, _table: Table) -> Result<Table> {
            Err(TokenizeError::RemoteServiceFailure {
                status: Some(503),
                message: "unavailable".to_string(),
            })
        }
    }

    fn settings() -> DlpSettings {
        DlpSettings::from_lookup(|name| match name {
            ENV_PROJECT => Some("demo-project".to_string()),
            ENV_WRAPPED_KEY => Some("AAECAwQFBgc=".to_string()),
            ENV_KEY_PATH => Some("projects/demo-project/locations/global/keyRings/r/cryptoKeys/k".to_string()),
            _ => None,
        })
    }

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().copied().collect()
    }

    fn batch() -> Vec<Record> {
        vec![
            record(&[("name", "John Doe"), ("pesel", "90010112345"), ("idNumber", "ABC123456")]),
            record(&[("name", "Jane Roe"), ("pesel", "85020254321"), ("idNumber", "XYZ654321")]),
        ]
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_deterministic_scenario() {
        let settings = settings();
        let tokenizer = Tokenizer::new(
            &settings,
            TokenizerOptions::new(Method::Deterministic),
            FixedTokenService,
        );

        let result = tokenizer
            .tokenize(vec![record(&[("name", "John"), ("id", "ABC123")])], Some(fields(&["id"]).as_slice()))
            .await
            .unwrap();

        assert_eq!(result, vec![record(&[("name", "John"), ("id", "XXXXXXX")])]);
    }

    #[tokio::test]
    async fn test_detokenize_inverts_tokenize() {
        let settings = settings();
        let tokenizer = Tokenizer::new(
            &settings,
            TokenizerOptions::new(Method::Fpe),
            ReversingService::default(),
        );
        let selected = fields(&["pesel", "idNumber"]);

        let tokenized = tokenizer.tokenize(batch(), Some(selected.as_slice())).await.unwrap();
        assert_ne!(tokenized, batch());
        assert_eq!(tokenized[0].get("name"), Some("John Doe"));
        assert_eq!(tokenized[0].get("pesel"), Some("54321101009"));

        let restored = tokenizer.detokenize(tokenized, Some(selected.as_slice())).await.unwrap();
        assert_eq!(restored, batch());
        assert_eq!(tokenizer.service().calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_configuration_passes_through_without_remote_call() {
        let settings = DlpSettings::from_lookup(|name| match name {
            ENV_PROJECT => Some("demo-project".to_string()),
            _ => None,
        });
        let tokenizer = Tokenizer::new(
            &settings,
            TokenizerOptions::new(Method::Fpe),
            ReversingService::default(),
        );

        let result = tokenizer.tokenize(batch(), Some(fields(&["pesel"]).as_slice())).await.unwrap();

        assert_eq!(result, batch());
        assert_eq!(tokenizer.service().calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_fields_pass_through_without_remote_call() {
        let settings = settings();
        let tokenizer = Tokenizer::new(
            &settings,
            TokenizerOptions::new(Method::Fpe),
            ReversingService::default(),
        );

        let result = tokenizer.detokenize(batch(), Some(&[][..])).await.unwrap();

        assert_eq!(result, batch());
        assert_eq!(tokenizer.service().calls(), 0);
    }

    #[tokio::test]
    async fn test_required_fields_without_fields_passes_through() {
        let settings = settings();
        let tokenizer = Tokenizer::new(
            &settings,
            TokenizerOptions::new(Method::Fpe).with_field_selection(FieldSelection::Required),
            ReversingService::default(),
        );

        let result = tokenizer.tokenize(batch(), None).await.unwrap();

        assert_eq!(result, batch());
        assert_eq!(tokenizer.service().calls(), 0);
    }

    #[tokio::test]
    async fn test_default_fields_are_used_when_none_given() {
        let settings = settings();
        let tokenizer = Tokenizer::new(
            &settings,
            TokenizerOptions::new(Method::Deterministic),
            ReversingService::default(),
        );

        let result = tokenizer.tokenize(batch(), None).await.unwrap();

        assert_eq!(result[0].get("name"), Some("John Doe"));
        assert_eq!(result[0].get("idNumber"), Some("654321CBA"));
        let config = tokenizer.service().last_config.lock().unwrap().clone().unwrap();
        assert_eq!(config.fields(), fields(&["pesel", "idNumber"]).as_slice());
        assert_eq!(config.kind(), "deterministic_encryption");
    }

    #[tokio::test]
    async fn test_fail_policy_surfaces_configuration_errors() {
        let settings = DlpSettings::default();
        let tokenizer = Tokenizer::new(
            &settings,
            TokenizerOptions::new(Method::Fpe).with_policy(MissingConfigPolicy::Fail),
            ReversingService::default(),
        );

        let err = tokenizer.tokenize(batch(), Some(fields(&["pesel"]).as_slice())).await.unwrap_err();

        assert!(matches!(err, TokenizeError::ConfigurationMissing { ref fields } if fields.len() == 3));
        assert_eq!(tokenizer.service().calls(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_key_passes_through() {
        let settings = DlpSettings::from_lookup(|name| match name {
            ENV_PROJECT => Some("demo-project".to_string()),
            ENV_WRAPPED_KEY => Some("%%%".to_string()),
            ENV_KEY_PATH => Some("k".to_string()),
            _ => None,
        });
        let tokenizer = Tokenizer::new(
            &settings,
            TokenizerOptions::new(Method::Fpe),
            ReversingService::default(),
        );

        let result = tokenizer.tokenize(batch(), None).await.unwrap();

        assert_eq!(result, batch());
        assert_eq!(tokenizer.service().calls(), 0);
    }

    #[tokio::test]
    async fn test_template_is_used_when_configured() {
        let settings = settings();
        let tokenizer = Tokenizer::new(
            &settings,
            TokenizerOptions::new(Method::Fpe)
                .with_template("projects/demo-project/deidentifyTemplates/t1"),
            ReversingService::default(),
        );

        tokenizer.tokenize(batch(), None).await.unwrap();

        let config = tokenizer.service().last_config.lock().unwrap().clone().unwrap();
        assert_eq!(
            config.template_name(),
            Some("projects/demo-project/deidentifyTemplates/t1")
        );
    }

    #[tokio::test]
    async fn test_fpe_config_carries_alphabet_and_surrogate() {
        let settings = settings();
        let tokenizer = Tokenizer::new(
            &settings,
            TokenizerOptions::new(Method::Fpe).with_surrogate_type("PESEL_TOKEN"),
            ReversingService::default(),
        );

        tokenizer.tokenize(batch(), None).await.unwrap();

        let config = tokenizer.service().last_config.lock().unwrap().clone().unwrap();
        match config {
            TransformationConfig::FormatPreservingEncryption {
                alphabet,
                surrogate_type,
                key,
                ..
            } => {
                assert_eq!(alphabet.as_deref(), Some("UPPER_CASE_ALPHA_NUMERIC"));
                assert_eq!(surrogate_type.as_deref(), Some("PESEL_TOKEN"));
                assert_eq!(key.wrapped_key(), &[0, 1, 2, 3, 4, 5, 6, 7]);
            }
            other => panic!("unexpected config: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_schema_mismatch_stops_before_remote_call() {
        let settings = settings();
        let tokenizer = Tokenizer::new(
            &settings,
            TokenizerOptions::new(Method::Fpe),
            ReversingService::default(),
        );
        let records = vec![
            record(&[("name", "A"), ("pesel", "1")]),
            record(&[("name", "B"), ("pesel", "2")]),
            record(&[("name", "C"), ("idNumber", "3")]),
        ];

        let err = tokenizer.tokenize(records, None).await.unwrap_err();

        assert!(matches!(err, TokenizeError::SchemaMismatch { .. }));
        assert_eq!(tokenizer.service().calls(), 0);
    }

    #[tokio::test]
    async fn test_remote_failure_propagates() {
        let settings = settings();
        let tokenizer = Tokenizer::new(&settings, TokenizerOptions::new(Method::Fpe), FailingService);

        let err = tokenizer.tokenize(batch(), None).await.unwrap_err();

        assert!(matches!(
            err,
            TokenizeError::RemoteServiceFailure { status: Some(503), .. }
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_remote_call() {
        let settings = settings();
        let tokenizer = Tokenizer::new(
            &settings,
            TokenizerOptions::new(Method::Fpe),
            ReversingService::default(),
        );

        let result = tokenizer.tokenize(Vec::new(), None).await.unwrap();

        assert!(result.is_empty());
        assert_eq!(tokenizer.service().calls(), 0);
    }

    #[tokio::test]
    async fn test_apply_reports_whether_service_was_called() {
        let settings = settings();
        let tokenizer = Tokenizer::new(
            &settings,
            TokenizerOptions::new(Method::Fpe),
            ReversingService::default(),
        );

        // Selected field is not in the batch: the call happens, values come back unchanged.
        let absent = fields(&["email"]);
        let outcome = tokenizer
            .apply(Direction::Tokenize, batch(), Some(absent.as_slice()))
            .await
            .unwrap();
        assert!(outcome.invoked);
        assert_eq!(outcome.records, batch());

        let outcome = tokenizer
            .apply(Direction::Tokenize, batch(), Some(&[][..]))
            .await
            .unwrap();
        assert!(!outcome.invoked);
        assert_eq!(outcome.records, batch());
        assert_eq!(tokenizer.service().calls(), 1);
    }
}
