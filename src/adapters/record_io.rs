use crate::domain::model::Record;
use crate::utils::error::{Result, TokenizeError};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    Json,
    Csv,
}

impl RecordFormat {
    /// Guesses the format from the file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => RecordFormat::Csv,
            _ => RecordFormat::Json,
        }
    }
}

impl FromStr for RecordFormat {
    type Err = TokenizeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(RecordFormat::Json),
            "csv" => Ok(RecordFormat::Csv),
            other => Err(TokenizeError::InvalidConfigValueError {
                field: "format".to_string(),
                value: other.to_string(),
                reason: "Expected 'json' or 'csv'".to_string(),
            }),
        }
    }
}

/// Parses a JSON array of objects, or a single object, into records.
///
/// Deserializes straight from the text: an intermediate `Value` would sort
/// the keys and silently collapse repeated ones.
pub fn parse_json(content: &str) -> Result<Vec<Record>> {
    match content.trim_start().chars().next() {
        Some('[') => Ok(serde_json::from_str(content)?),
        Some('{') => Ok(vec![serde_json::from_str(content)?]),
        _ => Err(TokenizeError::InvalidConfigValueError {
            field: "input".to_string(),
            value: "non-object JSON".to_string(),
            reason: "Expected an object or an array of objects".to_string(),
        }),
    }
}

/// Parses CSV with a header row; column order becomes field order.
pub fn parse_csv(content: &str) -> Result<Vec<Record>> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();

    let mut seen = HashSet::new();
    if let Some(duplicate) = headers.iter().find(|h| !seen.insert(*h)) {
        return Err(TokenizeError::SchemaMismatch {
            message: format!("CSV header repeats column '{}'", duplicate),
        });
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(headers.iter().zip(row.iter()).collect::<Record>());
    }
    Ok(records)
}

pub fn read_records(path: &Path, format: Option<RecordFormat>) -> Result<Vec<Record>> {
    let content = std::fs::read_to_string(path)?;
    let records = match format.unwrap_or_else(|| RecordFormat::from_path(path)) {
        RecordFormat::Json => parse_json(&content)?,
        RecordFormat::Csv => parse_csv(&content)?,
    };
    tracing::debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

pub fn to_json(records: &[Record]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

pub fn write_records(path: &Path, records: &[Record]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, to_json(records)?)?;
    Ok(())
}
