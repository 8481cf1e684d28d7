use crate::domain::model::{Record, Table};
use crate::utils::error::{Result, TokenizeError};

/// Flattens a batch of records into a header plus positional rows.
///
/// The header is taken from the first record; every other record must carry
/// the same keys in the same order.
pub fn encode(records: &[Record]) -> Result<Table> {
    let first = records.first().ok_or_else(|| TokenizeError::SchemaMismatch {
        message: "cannot encode an empty batch".to_string(),
    })?;

    let headers: Vec<String> = first.keys().map(str::to_string).collect();
    let mut rows = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        if !record.keys().eq(headers.iter().map(String::as_str)) {
            return Err(TokenizeError::SchemaMismatch {
                message: format!(
                    "record {} has fields [{}], expected [{}]",
                    index,
                    record.keys().collect::<Vec<_>>().join(", "),
                    headers.join(", ")
                ),
            });
        }
        rows.push(record.values().map(str::to_string).collect());
    }

    Ok(Table { headers, rows })
}

/// Re-keys transformed rows with the field names of the records they came from.
pub fn decode(records: &[Record], result: &Table) -> Result<Vec<Record>> {
    if result.rows.len() != records.len() {
        return Err(TokenizeError::RowCountMismatch {
            message: format!(
                "sent {} records but received {} rows",
                records.len(),
                result.rows.len()
            ),
        });
    }

    records
        .iter()
        .zip(&result.rows)
        .enumerate()
        .map(|(index, (record, row))| {
            if row.len() != record.len() {
                return Err(TokenizeError::RowCountMismatch {
                    message: format!(
                        "row {} has {} values but the record has {} fields",
                        index,
                        row.len(),
                        record.len()
                    ),
                });
            }
            Ok(record
                .keys()
                .zip(row.iter().map(String::as_str))
                .collect::<Record>())
        })
        .collect()
}
