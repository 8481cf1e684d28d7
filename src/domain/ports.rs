use crate::domain::model::{Direction, Record, Table};
use crate::domain::transformation::TransformationConfig;
use crate::utils::error::Result;
use async_trait::async_trait;

/// The remote de-identification service.
///
/// Implementations must surface every transport or service failure as
/// `TokenizeError::RemoteServiceFailure`.
#[async_trait]
pub trait TransformationService: Send + Sync {
    async fn tokenize_table(&self, config: &TransformationConfig, table: Table) -> Result<Table>;

    async fn detokenize_table(&self, config: &TransformationConfig, table: Table)
        -> Result<Table>;

    async fn invoke(
        &self,
        direction: Direction,
        config: &TransformationConfig,
        table: Table,
    ) -> Result<Table> {
        match direction {
            Direction::Tokenize => self.tokenize_table(config, table).await,
            Direction::Detokenize => self.detokenize_table(config, table).await,
        }
    }
}

/// A document collection holding tokenized records.
pub trait DocumentStore: Send + Sync {
    /// Stores `record` and returns the identifier assigned to it.
    fn insert(
        &self,
        collection: &str,
        record: &Record,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    /// First document whose fields contain every entry of `filter`.
    fn find_one(
        &self,
        collection: &str,
        filter: &Record,
    ) -> impl std::future::Future<Output = Result<Option<StoredDocument>>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub id: String,
    pub record: Record,
}
