use dlp_tokenize::utils::logger;
use dlp_tokenize::{
    Direction, DlpClient, DlpSettings, Record, Tokenizer, TokenizerOptions, TomlConfig,
};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Tokenize,
    Detokenize,
}

#[derive(Deserialize)]
pub struct Request {
    pub operation: Operation,
    pub records: Vec<Record>,
    pub fields: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct Response {
    pub records: Vec<Record>,
    /// Whether the DLP service was called; `false` means the records were passed through.
    pub transformed: bool,
}

async fn function_handler(
    settings: &DlpSettings,
    options: &TokenizerOptions,
    event: LambdaEvent<Request>,
) -> Result<Response, Error> {
    let request = event.payload;
    tracing::info!(
        "Handling {:?} for {} records",
        request.operation,
        request.records.len()
    );

    let tokenizer = Tokenizer::new(settings, options.clone(), DlpClient::from_settings(settings));
    let fields = request.fields.as_deref();
    let direction = match request.operation {
        Operation::Tokenize => Direction::Tokenize,
        Operation::Detokenize => Direction::Detokenize,
    };

    let outcome = tokenizer
        .apply(direction, request.records, fields)
        .await
        .map_err(|e| {
            tracing::error!("{} (Severity: {:?})", e, e.severity());
            Box::new(e) as Box<dyn std::error::Error + Send + Sync>
        })?;

    Ok(Response {
        records: outcome.records,
        transformed: outcome.invoked,
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    // Optional bundled config; the environment alone is enough otherwise.
    let file_config = match std::env::var("DLP_TOKENIZE_CONFIG") {
        Ok(path) => TomlConfig::from_file(path)?,
        Err(_) => TomlConfig::default(),
    };
    file_config.validate_config()?;

    let settings = file_config.merge_into(DlpSettings::from_env());
    let options = file_config.tokenizer_options()?;

    let settings = &settings;
    let options = &options;
    run(service_fn(move |event: LambdaEvent<Request>| async move {
        function_handler(settings, options, event).await
    }))
    .await
}
