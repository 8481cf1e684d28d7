pub mod table;
pub mod tokenizer;
pub mod transform_config;

pub use crate::domain::model::{Direction, Method, Record, Table};
pub use crate::domain::ports::{DocumentStore, StoredDocument, TransformationService};
pub use crate::domain::transformation::{KeyMaterial, TransformationConfig};
pub use crate::utils::error::Result;
