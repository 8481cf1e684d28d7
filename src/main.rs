use clap::Parser;
use dlp_tokenize::adapters::document_store::is_mongodb_url;
use dlp_tokenize::adapters::record_io;
use dlp_tokenize::config::cli::{fields_arg, Command, RoundtripArgs, TransformArgs};
use dlp_tokenize::domain::ports::{DocumentStore, TransformationService};
use dlp_tokenize::utils::error::ErrorSeverity;
use dlp_tokenize::utils::{logger, validation::validate_required_field, validation::Validate};
use dlp_tokenize::{
    CliConfig, Direction, DlpClient, DlpSettings, JsonFileStore, Result, Tokenizer, TomlConfig,
};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);
    tracing::info!("Starting dlp-tokenize");

    if let Err(e) = run(&cli).await {
        tracing::error!(
            "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
            command_name(&cli.command),
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Tokenize(_) => "tokenize",
        Command::Detokenize(_) => "detokenize",
        Command::StoreRoundtrip(_) => "store-roundtrip",
    }
}

async fn run(cli: &CliConfig) -> Result<()> {
    let file_config = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            TomlConfig::from_file(path)?
        }
        None => TomlConfig::default(),
    };
    file_config.validate()?;

    let settings = file_config.merge_into(DlpSettings::from_env());
    settings.validate()?;
    if cli.verbose {
        tracing::debug!("Settings: {:?}", settings);
    }

    let options = cli.apply_overrides(file_config.tokenizer_options()?)?;
    tracing::debug!("Tokenizer options: {:?}", options);

    let client = DlpClient::from_settings(&settings);
    let tokenizer = Tokenizer::new(&settings, options, client);

    match &cli.command {
        Command::Tokenize(args) => transform_file(&tokenizer, Direction::Tokenize, args).await,
        Command::Detokenize(args) => transform_file(&tokenizer, Direction::Detokenize, args).await,
        Command::StoreRoundtrip(args) => {
            store_roundtrip(&tokenizer, &settings, &file_config, args).await
        }
    }
}

async fn transform_file<S: TransformationService>(
    tokenizer: &Tokenizer<'_, S>,
    direction: Direction,
    args: &TransformArgs,
) -> Result<()> {
    let records = record_io::read_records(&args.input, args.format)?;
    let fields = fields_arg(&args.fields);

    let result = match direction {
        Direction::Tokenize => tokenizer.tokenize(records, fields).await?,
        Direction::Detokenize => tokenizer.detokenize(records, fields).await?,
    };

    match &args.output {
        Some(path) => {
            record_io::write_records(path, &result)?;
            tracing::info!("✅ {} {} records into {}", direction, result.len(), path.display());
        }
        None => println!("{}", record_io::to_json(&result)?),
    }
    Ok(())
}

/// Picks the document store from the `DATABASE_URL` scheme and runs the round trip against it.
async fn store_roundtrip<S: TransformationService>(
    tokenizer: &Tokenizer<'_, S>,
    settings: &DlpSettings,
    file_config: &TomlConfig,
    args: &RoundtripArgs,
) -> Result<()> {
    let database_url = validate_required_field("DATABASE_URL", &settings.database_url)?;
    let collection = args
        .collection
        .as_deref()
        .unwrap_or_else(|| file_config.collection());

    #[cfg(feature = "mongo")]
    if is_mongodb_url(database_url) {
        let store = dlp_tokenize::MongoStore::connect(database_url).await?;
        return roundtrip(tokenizer, &store, collection, args).await;
    }
    #[cfg(not(feature = "mongo"))]
    if is_mongodb_url(database_url) {
        tracing::warn!("mongodb:// URLs need a build with the `mongo` feature");
    }

    let store = JsonFileStore::from_database_url(database_url)?;
    roundtrip(tokenizer, &store, collection, args).await
}

/// Tokenize a batch, store it, read the first document back by its id and detokenize it.
async fn roundtrip<S: TransformationService, D: DocumentStore>(
    tokenizer: &Tokenizer<'_, S>,
    store: &D,
    collection: &str,
    args: &RoundtripArgs,
) -> Result<()> {
    let records = record_io::read_records(&args.input, args.format)?;
    let fields = fields_arg(&args.fields);

    let tokenized = tokenizer.tokenize(records, fields).await?;
    println!("Tokenized data\n{}", record_io::to_json(&tokenized)?);

    let mut first_id = None;
    for record in &tokenized {
        let id = store.insert(collection, record).await?;
        tracing::info!("Inserted document {} into {}", id, collection);
        first_id.get_or_insert(id);
    }

    let (Some(first), Some(id)) = (tokenized.first(), first_id) else {
        println!("Nothing to store");
        return Ok(());
    };

    let mut filter = first.clone();
    filter.insert("_id", id);
    let Some(found) = store.find_one(collection, &filter).await? else {
        println!("Tokenized document not found in {}", collection);
        return Ok(());
    };
    println!(
        "Tokenized data retrieved from store ({})\n{}",
        found.id,
        record_io::to_json(std::slice::from_ref(&found.record))?
    );

    let detokenized = tokenizer.detokenize(vec![found.record], fields).await?;
    println!("Detokenized data\n{}", record_io::to_json(&detokenized)?);
    Ok(())
}
