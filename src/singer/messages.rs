use crate::data::Record;
use crate::error::Result;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;

/// A single line of the Singer record stream.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message<'a> {
    Schema {
        stream: &'a str,
        schema: &'a Value,
        key_properties: &'a [&'a str],
    },
    Record {
        stream: &'a str,
        record: &'a Record,
    },
}

/// Writes Singer messages as newline-delimited JSON.
///
/// Nothing else may share the underlying writer; log output goes to stderr.
pub struct SingerWriter<W: Write> {
    out: W,
}

impl<W: Write> SingerWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn write_message(&mut self, message: &Message<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.out, message)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    pub fn write_schema(
        &mut self,
        stream: &str,
        schema: &Value,
        key_properties: &[&str],
    ) -> Result<()> {
        self.write_message(&Message::Schema {
            stream,
            schema,
            key_properties,
        })
    }

    /// Writes one RECORD message per record, in order, and returns how many were written.
    pub fn write_records(&mut self, stream: &str, records: &[Record]) -> Result<usize> {
        for record in records {
            self.write_message(&Message::Record { stream, record })?;
        }
        Ok(records.len())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}
