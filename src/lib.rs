pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::{dlp_client::DlpClient, document_store::JsonFileStore};
#[cfg(feature = "mongo")]
pub use crate::adapters::mongo_store::MongoStore;
pub use crate::config::{DlpSettings, FieldSelection, MissingConfigPolicy, TokenizerOptions, TomlConfig};
pub use crate::core::tokenizer::{Tokenizer, Transformed};
pub use crate::domain::model::{Direction, Method, Record, Table};
pub use crate::domain::transformation::{KeyMaterial, TransformationConfig};
pub use crate::utils::error::{Result, TokenizeError};
