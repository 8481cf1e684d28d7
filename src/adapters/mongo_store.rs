use crate::adapters::document_store::ID_FIELD;
use crate::domain::model::Record;
use crate::domain::ports::{DocumentStore, StoredDocument};
use crate::utils::error::{Result, TokenizeError};
use crate::utils::validation::validate_collection_name;
use mongodb::bson::{oid::ObjectId, Bson, Document};
use mongodb::{Client, Database};

/// Document store on the MongoDB database named in a `mongodb://` connection string.
#[derive(Debug, Clone)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let client = Client::with_uri_str(database_url)
            .await
            .map_err(store_error)?;
        let database = client
            .default_database()
            .ok_or_else(|| TokenizeError::ConfigValidationError {
                field: "DATABASE_URL".to_string(),
                message: "connection string must name a database, e.g. mongodb://host:27017/app"
                    .to_string(),
            })?;

        tracing::info!("Connected to MongoDB database {}", database.name());
        Ok(Self { database })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }
}

fn store_error(e: mongodb::error::Error) -> TokenizeError {
    TokenizeError::StoreError {
        message: e.to_string(),
    }
}

/// All values are stored as strings, except an `_id` that parses as an ObjectId.
fn to_document(record: &Record) -> Document {
    let mut document = Document::new();
    for (key, value) in record.iter() {
        let value = match ObjectId::parse_str(value) {
            Ok(oid) if key == ID_FIELD => Bson::ObjectId(oid),
            _ => Bson::String(value.to_string()),
        };
        document.insert(key, value);
    }
    document
}

fn id_string(id: Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s,
        other => other.to_string(),
    }
}

fn from_document(document: Document) -> Result<StoredDocument> {
    let mut id = String::new();
    let mut record = Record::new();
    for (key, value) in document {
        if key == ID_FIELD {
            id = id_string(value);
            continue;
        }
        match value {
            Bson::String(s) => record.insert(key, s),
            other => {
                return Err(TokenizeError::StoreError {
                    message: format!(
                        "field '{}' holds {:?}, only string fields can be detokenized",
                        key,
                        other.element_type()
                    ),
                })
            }
        }
    }
    Ok(StoredDocument { id, record })
}

impl DocumentStore for MongoStore {
    async fn insert(&self, collection: &str, record: &Record) -> Result<String> {
        validate_collection_name(collection)?;
        let result = self
            .database
            .collection::<Document>(collection)
            .insert_one(to_document(record))
            .await
            .map_err(store_error)?;

        let id = id_string(result.inserted_id);
        tracing::debug!("Inserted document {} into {}", id, collection);
        Ok(id)
    }

    async fn find_one(&self, collection: &str, filter: &Record) -> Result<Option<StoredDocument>> {
        validate_collection_name(collection)?;
        let found = self
            .database
            .collection::<Document>(collection)
            .find_one(to_document(filter))
            .await
            .map_err(store_error)?;

        found.map(from_document).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_to_document_keeps_order_and_object_ids() {
        let oid = ObjectId::new();
        let hex = oid.to_hex();
        let document = to_document(&record(&[
            ("_id", hex.as_str()),
            ("name", "John Doe"),
            ("idNumber", "7Q4-Z81KD0"),
        ]));

        assert_eq!(
            document.keys().collect::<Vec<_>>(),
            vec!["_id", "name", "idNumber"]
        );
        assert_eq!(document.get_object_id("_id").unwrap(), oid);
        assert_eq!(document.get_str("idNumber").unwrap(), "7Q4-Z81KD0");
    }

    #[test]
    fn test_object_id_like_values_stay_strings_outside_id() {
        let hex = ObjectId::new().to_hex();
        let document = to_document(&record(&[("token", hex.as_str())]));
        assert_eq!(document.get_str("token").unwrap(), hex);
    }

    #[test]
    fn test_from_document_strips_id() {
        let oid = ObjectId::new();
        let stored = from_document(doc! {
            "_id": oid,
            "name": "John Doe",
            "companies": "[]",
        })
        .unwrap();

        assert_eq!(stored.id, oid.to_hex());
        assert_eq!(stored.record, record(&[("name", "John Doe"), ("companies", "[]")]));
    }

    #[test]
    fn test_from_document_rejects_non_string_fields() {
        let err = from_document(doc! { "_id": "abc", "age": 42 }).unwrap_err();
        assert!(matches!(err, TokenizeError::StoreError { .. }));
        assert!(err.to_string().contains("age"));
    }
}
