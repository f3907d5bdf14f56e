//! Timestamp nel formato usato dal foglio

use chrono::{DateTime, FixedOffset, Utc};
use std::time::Instant;

const SHEET_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const PROCESS_ID_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Formatta un istante come `YYYY-MM-DD HH:MM:SS` nel fuso indicato
pub fn format_sheet_timestamp(at: DateTime<Utc>, tz: &FixedOffset) -> String {
    at.with_timezone(tz).format(SHEET_TIMESTAMP_FORMAT).to_string()
}

/// Prefisso `YYYYMMDD_HHMMSS` degli ID processo
pub fn format_process_stamp(at: DateTime<Utc>, tz: &FixedOffset) -> String {
    at.with_timezone(tz).format(PROCESS_ID_FORMAT).to_string()
}

/// Millisecondi dall'epoch, usati negli ID generati
pub fn epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Secondi trascorsi, con i millisecondi come decimali
pub fn seconds_since(start: Instant) -> f64 {
    start.elapsed().as_millis() as f64 / 1000.0
}
