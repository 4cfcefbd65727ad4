use crate::error::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use csv::ReaderBuilder;
use serde_json::{Map, Value};

/// Field added to every row, carrying the extraction instant.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// One exported row: column name to verbatim string value, in header order.
pub type Record = Map<String, Value>;

/// A parsed CSV row before it is stamped.
///
/// Every header column is present, in header order. Columns a short row does
/// not reach carry `None`; values past the last header column are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub fields: Vec<(String, Option<String>)>,
}

#[cfg(test)]
impl RawRow {
    pub fn get(&self, column: &str) -> Option<Option<&str>> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_deref())
    }
}

/// Parses the `;`-delimited export, treating the first line as the header.
///
/// No validation happens here: every value stays a string and malformed rows
/// surface as missing values rather than errors.
pub fn parse_meldefonds_csv(body: &str) -> Result<Vec<RawRow>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        let fields = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), record.get(i).map(str::to_string)))
            .collect();
        rows.push(RawRow { fields });
    }

    Ok(rows)
}

/// Formats an instant the way downstream targets expect it, e.g.
/// `2024-05-01T08:30:00.123456Z`.
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Attaches the same extraction timestamp to every row.
pub fn stamp_records(rows: Vec<RawRow>, now: DateTime<Utc>) -> Vec<Record> {
    let timestamp = format_timestamp(now);

    rows.into_iter()
        .map(|row| {
            let mut record: Record = row
                .fields
                .into_iter()
                .map(|(name, value)| (name, value.map_or(Value::Null, Value::String)))
                .collect();
            record.insert(
                TIMESTAMP_FIELD.to_string(),
                Value::String(timestamp.clone()),
            );
            record
        })
        .collect()
}
