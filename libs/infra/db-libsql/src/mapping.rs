// [libs/infra/db-libsql/src/mapping.rs]
/*!
 * =================================================================
 * APARATO: ROW MAPPING TOOLKIT (V2.1 - NOMINAL SYNC)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: TRANSFORMACIÓN DETERMINISTA SQLite <-> DOMINIO
 * =================================================================
 */

use crate::errors::StoreError;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::{Row, Value};

/// Marca temporal canónica del Ledger (RFC3339, UTC).
pub fn format_ledger_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339()
}

/**
 * Interpreta una marca temporal del Ledger.
 *
 * Acepta RFC3339 (escrituras del dominio) y el formato plano
 * `YYYY-MM-DD HH:MM:SS` que emite CURRENT_TIMESTAMP.
 */
pub fn parse_ledger_timestamp(raw_timestamp: &str) -> Result<DateTime<Utc>, StoreError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw_timestamp) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw_timestamp, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| {
            StoreError::Mapping(format!("TIMESTAMP_SHAPE_VIOLATION: {}", raw_timestamp))
        })
}

/// Columna TEXT obligatoria.
pub fn column_text(data_row: &Row, index: i32) -> Result<String, StoreError> {
    data_row
        .get::<String>(index)
        .map_err(|e| StoreError::Mapping(e.to_string()))
}

/// Columna INTEGER obligatoria.
pub fn column_i64(data_row: &Row, index: i32) -> Result<i64, StoreError> {
    data_row
        .get::<i64>(index)
        .map_err(|e| StoreError::Mapping(e.to_string()))
}

/// Columna REAL obligatoria.
pub fn column_f64(data_row: &Row, index: i32) -> Result<f64, StoreError> {
    data_row
        .get::<f64>(index)
        .map_err(|e| StoreError::Mapping(e.to_string()))
}

/// Columna TEXT anulable.
pub fn column_opt_text(data_row: &Row, index: i32) -> Result<Option<String>, StoreError> {
    match data_row
        .get_value(index)
        .map_err(|e| StoreError::Mapping(e.to_string()))?
    {
        Value::Null => Ok(None),
        Value::Text(text) => Ok(Some(text)),
        other => Err(StoreError::Mapping(format!(
            "TEXT_SHAPE_VIOLATION at column {}: {:?}",
            index, other
        ))),
    }
}

/// Columna INTEGER anulable.
pub fn column_opt_i64(data_row: &Row, index: i32) -> Result<Option<i64>, StoreError> {
    match data_row
        .get_value(index)
        .map_err(|e| StoreError::Mapping(e.to_string()))?
    {
        Value::Null => Ok(None),
        Value::Integer(number) => Ok(Some(number)),
        other => Err(StoreError::Mapping(format!(
            "INTEGER_SHAPE_VIOLATION at column {}: {:?}",
            index, other
        ))),
    }
}

/// Columna BLOB anulable; Null degrada a buffer vacío.
pub fn column_blob(data_row: &Row, index: i32) -> Result<Vec<u8>, StoreError> {
    match data_row
        .get_value(index)
        .map_err(|e| StoreError::Mapping(e.to_string()))?
    {
        Value::Null => Ok(Vec::new()),
        Value::Blob(buffer) => Ok(buffer),
        other => Err(StoreError::Mapping(format!(
            "BLOB_SHAPE_VIOLATION at column {}: {:?}",
            index, other
        ))),
    }
}

/// Marca temporal obligatoria.
pub fn column_timestamp(data_row: &Row, index: i32) -> Result<DateTime<Utc>, StoreError> {
    parse_ledger_timestamp(&column_text(data_row, index)?)
}

/// Marca temporal anulable.
pub fn column_opt_timestamp(
    data_row: &Row,
    index: i32,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    match column_opt_text(data_row, index)? {
        Some(raw_timestamp) => Ok(Some(parse_ledger_timestamp(&raw_timestamp)?)),
        None => Ok(None),
    }
}

/// Columna booleana persistida como INTEGER 0/1.
pub fn column_bool(data_row: &Row, index: i32) -> Result<bool, StoreError> {
    Ok(column_i64(data_row, index)? != 0)
}

/// Valor anulable de texto para params.
pub fn nullable_text(optional_text: Option<String>) -> Value {
    match optional_text {
        Some(text) => Value::Text(text),
        None => Value::Null,
    }
}

/// Valor anulable entero para params.
pub fn nullable_i64(optional_number: Option<i64>) -> Value {
    match optional_number {
        Some(number) => Value::Integer(number),
        None => Value::Null,
    }
}

/// Valor anulable de blob para params; buffer vacío persiste como Null.
pub fn nullable_blob(buffer: &[u8]) -> Value {
    if buffer.is_empty() {
        Value::Null
    } else {
        Value::Blob(buffer.to_vec())
    }
}

/// Marca temporal anulable para params.
pub fn nullable_timestamp(optional_instant: Option<DateTime<Utc>>) -> Value {
    match optional_instant {
        Some(instant) => Value::Text(format_ledger_timestamp(instant)),
        None => Value::Null,
    }
}
