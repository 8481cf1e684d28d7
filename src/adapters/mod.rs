// Adapters layer: concrete implementations for the DLP API, document storage and record files.

pub mod dlp_client;
pub mod document_store;
#[cfg(feature = "mongo")]
pub mod mongo_store;
pub mod record_io;
