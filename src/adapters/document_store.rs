use crate::domain::model::Record;
use crate::domain::ports::{DocumentStore, StoredDocument};
use crate::utils::error::{Result, TokenizeError};
use crate::utils::validation::{validate_collection_name, validate_path};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

pub(crate) const ID_FIELD: &str = "_id";

/// `mongodb://` and `mongodb+srv://` connection strings.
pub fn is_mongodb_url(database_url: &str) -> bool {
    database_url.starts_with("mongodb://") || database_url.starts_with("mongodb+srv://")
}

/// Document store keeping one JSON-lines file per collection under a directory.
#[derive(Debug)]
pub struct JsonFileStore {
    base_path: PathBuf,
    sequence: AtomicU64,
}

impl JsonFileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Accepts a `file://` URL or a plain directory path.
    pub fn from_database_url(database_url: &str) -> Result<Self> {
        validate_path("DATABASE_URL", database_url)?;

        if !database_url.contains("://") {
            return Ok(Self::new(database_url));
        }

        let url = Url::parse(database_url).map_err(|e| TokenizeError::InvalidConfigValueError {
            field: "DATABASE_URL".to_string(),
            value: database_url.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "file" => url
                .to_file_path()
                .map(Self::new)
                .map_err(|_| TokenizeError::InvalidConfigValueError {
                    field: "DATABASE_URL".to_string(),
                    value: database_url.to_string(),
                    reason: "not a valid local path".to_string(),
                }),
            scheme => Err(TokenizeError::StoreError {
                message: format!(
                    "unsupported database scheme '{}' for the file store (mongodb:// needs the `mongo` feature)",
                    scheme
                ),
            }),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn collection_path(&self, collection: &str) -> Result<PathBuf> {
        validate_collection_name(collection)?;
        Ok(self.base_path.join(format!("{}.jsonl", collection)))
    }

    fn next_id(&self) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        format!("{:x}{:06x}", nanos, seq)
    }
}

impl DocumentStore for JsonFileStore {
    async fn insert(&self, collection: &str, record: &Record) -> Result<String> {
        let path = self.collection_path(collection)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut fields = record.clone();
        let id = fields.remove(ID_FIELD).unwrap_or_else(|| self.next_id());

        let mut document = Record::new();
        document.insert(ID_FIELD, id.clone());
        for (k, v) in fields.iter() {
            document.insert(k, v);
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", serde_json::to_string(&document)?)?;

        tracing::debug!("Inserted document {} into {}", id, path.display());
        Ok(id)
    }

    async fn find_one(&self, collection: &str, filter: &Record) -> Result<Option<StoredDocument>> {
        let path = self.collection_path(collection)?;
        if !path.exists() {
            return Ok(None);
        }

        let reader = BufReader::new(fs::File::open(&path)?);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let mut record: Record = serde_json::from_str(&line)?;
            if record.matches(filter) {
                let id = record.remove(ID_FIELD).unwrap_or_default();
                return Ok(Some(StoredDocument { id, record }));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_insert_then_find_one() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path());

        let first = record(&[("name", "John"), ("idNumber", "TOKEN1")]);
        let second = record(&[("name", "Jane"), ("idNumber", "TOKEN2")]);
        let id1 = store.insert("Client", &first).await.unwrap();
        let id2 = store.insert("Client", &second).await.unwrap();
        assert_ne!(id1, id2);

        let found = store
            .find_one("Client", &record(&[("idNumber", "TOKEN2")]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id2);
        assert_eq!(found.record, second);

        let missing = store
            .find_one("Client", &record(&[("idNumber", "NOPE")]))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_find_one_by_returned_id() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path());

        let john = record(&[("name", "John")]);
        let id = store.insert("Client", &john).await.unwrap();
        store.insert("Client", &record(&[("name", "Jane")])).await.unwrap();

        let found = store
            .find_one("Client", &record(&[("_id", id.as_str())]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.record, john);

        let mut with_id = john.clone();
        with_id.insert("_id", id.clone());
        let found = store.find_one("Client", &with_id).await.unwrap().unwrap();
        assert_eq!(found.record, john);
    }

    #[tokio::test]
    async fn test_find_one_on_missing_collection() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path());
        assert!(store.find_one("Nothing", &Record::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_existing_id_is_kept() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path());

        let id = store
            .insert("Client", &record(&[("_id", "abc"), ("name", "John")]))
            .await
            .unwrap();
        assert_eq!(id, "abc");

        let found = store.find_one("Client", &Record::new()).await.unwrap().unwrap();
        assert_eq!(found.record, record(&[("name", "John")]));
    }

    #[tokio::test]
    async fn test_rejects_path_like_collection_names() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path());
        let err = store.insert("../escape", &Record::new()).await.unwrap_err();
        assert!(matches!(err, TokenizeError::StoreError { .. }));
    }

    #[test]
    fn test_from_database_url() {
        let store = JsonFileStore::from_database_url("file:///tmp/dlp-store").unwrap();
        assert_eq!(store.base_path(), Path::new("/tmp/dlp-store"));

        let store = JsonFileStore::from_database_url("./data").unwrap();
        assert_eq!(store.base_path(), Path::new("./data"));

        assert!(matches!(
            JsonFileStore::from_database_url("mongodb://localhost:27017/app"),
            Err(TokenizeError::StoreError { .. })
        ));
    }

    #[test]
    fn test_is_mongodb_url() {
        assert!(is_mongodb_url("mongodb://localhost:27017/app"));
        assert!(is_mongodb_url("mongodb+srv://user:pw@cluster.example.net/app"));
        assert!(!is_mongodb_url("file:///tmp/dlp-store"));
        assert!(!is_mongodb_url("./data"));
    }
}
