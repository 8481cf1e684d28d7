use crate::adapters::record_io::RecordFormat;
use crate::config::settings::{FieldSelection, MissingConfigPolicy, TokenizerOptions};
use crate::domain::model::Method;
use crate::utils::error::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "dlp-tokenize")]
#[command(about = "Tokenize and detokenize record fields with Cloud DLP")]
pub struct CliConfig {
    /// TOML configuration file; values there override the environment
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Crypto method: fpe or deterministic
    #[arg(long, global = true)]
    pub method: Option<String>,

    /// Server-side de-identify template to use instead of an inline config
    #[arg(long, global = true)]
    pub template: Option<String>,

    /// Info-type name attached to surrogate values
    #[arg(long, global = true)]
    pub surrogate_type: Option<String>,

    /// Return an error instead of passing records through on missing config
    #[arg(long, global = true)]
    pub fail_closed: bool,

    /// Require --fields on every call instead of using the default field list
    #[arg(long, global = true)]
    pub fields_required: bool,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Replace sensitive fields with tokens
    Tokenize(TransformArgs),
    /// Recover original values from tokens
    Detokenize(TransformArgs),
    /// Tokenize, store, look up and detokenize a batch against the document store
    StoreRoundtrip(RoundtripArgs),
}

#[derive(Debug, Clone, Args)]
pub struct TransformArgs {
    /// Input file (JSON array of objects or CSV with a header row)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file; prints to stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Input format, guessed from the extension when omitted
    #[arg(long)]
    pub format: Option<RecordFormat>,

    /// Fields to transform
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct RoundtripArgs {
    #[arg(short, long)]
    pub input: PathBuf,

    #[arg(long)]
    pub format: Option<RecordFormat>,

    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Collection to insert into
    #[arg(long)]
    pub collection: Option<String>,
}

impl CliConfig {
    /// Applies command-line overrides on top of options loaded from file.
    pub fn apply_overrides(&self, mut options: TokenizerOptions) -> Result<TokenizerOptions> {
        if let Some(method) = &self.method {
            options.method = method.parse::<Method>()?;
        }
        if let Some(template) = &self.template {
            options.template_name = Some(template.clone());
        }
        if let Some(surrogate_type) = &self.surrogate_type {
            options.surrogate_type = Some(surrogate_type.clone());
        }
        if self.fail_closed {
            options.on_missing_config = MissingConfigPolicy::Fail;
        }
        if self.fields_required {
            options.field_selection = FieldSelection::Required;
        }
        Ok(options)
    }
}

/// `None` when no fields were given, so the configured selection applies.
pub fn fields_arg(fields: &[String]) -> Option<&[String]> {
    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}
