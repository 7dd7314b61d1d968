//! Loading of event logs stored as JSON row arrays.

use crate::config::SessionConfig;
use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use eventflow_core::EventRecord;
use serde_json::Value;
use std::fs;
use std::path::Path;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>> {
    match value {
        Value::String(text) => {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                return Ok(parsed.with_timezone(&Utc));
            }
            NAIVE_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|naive| naive.and_utc())
                .ok_or_else(|| anyhow!("unrecognized timestamp '{}'", text))
        }
        Value::Number(number) => {
            let seconds = number
                .as_f64()
                .ok_or_else(|| anyhow!("timestamp {} out of range", number))?;
            let whole = seconds.floor();
            let nanos = ((seconds - whole) * 1e9).round() as u32;
            Utc.timestamp_opt(whole as i64, nanos.min(999_999_999))
                .single()
                .ok_or_else(|| anyhow!("timestamp {} out of range", number))
        }
        other => bail!("timestamp must be a string or a number, got {}", other),
    }
}

fn text_field(row: &Value, column: &str) -> Result<String> {
    match row.get(column) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(other) => bail!("column '{}' must be a string or a number, got {}", column, other),
        None => bail!("missing column '{}'", column),
    }
}

fn parse_row(row: &Value, config: &SessionConfig) -> Result<EventRecord> {
    let event = text_field(row, &config.explorer.event_col)?;
    let case_id = text_field(row, &config.log.case_col)?;
    let timestamp = row
        .get(&config.log.timestamp_col)
        .ok_or_else(|| anyhow!("missing column '{}'", config.log.timestamp_col))
        .and_then(parse_timestamp)?;

    let mut record = EventRecord::new(event, case_id, timestamp);
    for column in &config.explorer.custom_metrics {
        let Some(value) = row.get(column).and_then(Value::as_f64) else {
            continue;
        };
        if !value.is_finite() {
            tracing::warn!("Skipping non-finite value of '{}'", column);
            continue;
        }
        record = record.with_extra(column.clone(), value);
    }
    Ok(record)
}

/// Converts JSON rows into event records using the configured column names.
/// Custom metric columns that are absent or not numeric are left unset.
pub fn events_from_rows(rows: &[Value], config: &SessionConfig) -> Result<Vec<EventRecord>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| parse_row(row, config).with_context(|| format!("Invalid log row {index}")))
        .collect()
}

pub fn load_event_log(path: &Path, config: &SessionConfig) -> Result<Vec<EventRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read event log {}", path.display()))?;
    let rows: Vec<Value> = serde_json::from_str(&content)
        .with_context(|| format!("Event log {} is not a JSON array of rows", path.display()))?;
    let events = events_from_rows(&rows, config)?;
    tracing::info!("Loaded {} events from {}", events.len(), path.display());
    Ok(events)
}
