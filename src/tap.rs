use crate::data::{parse_meldefonds_csv, stamp_records, MeldefondsSource};
use crate::error::Result;
use crate::singer::{schema_json, MetricsSink, SingerWriter, Tags, KEY_PROPERTIES, MELDEFONDS_FIELDS, STREAM};
use chrono::Utc;
use std::io::Write;
use std::time::Instant;
use tracing::{info, Instrument, Span};

/// Runs one extraction: fetch, parse, stamp, emit.
///
/// The extraction timestamp is captured once, before the download, and shared by
/// every record. The fetch completes before anything is written, so a failed
/// download leaves `out` untouched.
///
/// # Arguments
/// * `source`: Where the CSV export comes from
/// * `out`: Destination of the Singer messages (stdout in production)
/// * `metrics`: Sink for the request timer and record counter
/// * `span`: Logging context supplied by the caller; all events of the run are recorded inside it
///
/// # Returns
/// The number of RECORD messages written
///
/// # Errors
/// Returns an error if the download fails, the body cannot be read as CSV, or
/// writing to `out` fails
pub async fn run<W: Write>(
    source: &dyn MeldefondsSource,
    out: W,
    metrics: &dyn MetricsSink,
    span: Span,
) -> Result<usize> {
    async move {
        let now = Utc::now();
        let endpoint = source.endpoint();

        info!("Start of download from source");
        let started = Instant::now();
        let fetched = source.fetch().await;

        let mut timer_tags = Tags::new();
        timer_tags.insert("endpoint", endpoint);
        timer_tags.insert("status", if fetched.is_ok() { "succeeded" } else { "failed" });
        metrics.timer("request_duration", started.elapsed(), &timer_tags);

        let body = fetched?;
        let records = stamp_records(parse_meldefonds_csv(&body)?, now);

        let mut count_tags = Tags::new();
        count_tags.insert("endpoint", endpoint);
        metrics.counter("record_count", records.len() as u64, &count_tags);
        info!("Query returned {} records", format_count(records.len()));

        let schema = schema_json(MELDEFONDS_FIELDS)?;
        let mut writer = SingerWriter::new(out);
        writer.write_schema(STREAM, &schema, KEY_PROPERTIES)?;
        let written = writer.write_records(STREAM, &records)?;
        writer.flush()?;

        Ok(written)
    }
    .instrument(span)
    .await
}

/// Renders a count with `,` between thousands, e.g. `12,345`.
fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ingestion::test_support::{local_source, serve_once};
    use crate::data::TIMESTAMP_FIELD;
    use crate::error::TapError;
    use crate::singer::metrics::recording::{Recorded, RecordingMetrics};
    use crate::singer::NoopMetrics;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    const SAMPLE: &str = include_str!("../tests/data/sample_meldefonds.csv");

    struct CannedSource {
        body: &'static str,
    }

    #[async_trait]
    impl MeldefondsSource for CannedSource {
        fn endpoint(&self) -> &str {
            "canned://meldefonds"
        }

        async fn fetch(&self) -> Result<String> {
            Ok(self.body.to_string())
        }
    }

    fn parse_output(buf: &[u8]) -> Vec<Value> {
        std::str::from_utf8(buf)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    async fn run_canned(body: &'static str) -> (usize, Vec<Value>) {
        let mut out = Vec::new();
        let written = run(&CannedSource { body }, &mut out, &NoopMetrics, Span::none())
            .await
            .unwrap();
        (written, parse_output(&out))
    }

    #[tokio::test]
    async fn test_schema_then_one_record_per_row() {
        let (written, messages) = run_canned(SAMPLE).await;

        assert_eq!(written, 3);
        assert_eq!(messages.len(), 4);

        let schema = &messages[0];
        assert_eq!(schema["type"], "SCHEMA");
        assert_eq!(schema["stream"], "Meldefonds");
        assert_eq!(schema["key_properties"], json!(["ISIN"]));
        assert_eq!(schema["schema"]["properties"]["ISIN"]["maxLength"], 12);

        let header: Vec<&str> = SAMPLE.lines().next().unwrap().split(';').collect();
        for message in &messages[1..] {
            assert_eq!(message["type"], "RECORD");
            assert_eq!(message["stream"], "Meldefonds");
            let record = message["record"].as_object().unwrap();
            assert_eq!(record.len(), header.len() + 1);
            for column in &header {
                assert!(record.contains_key(*column), "missing column {column}");
            }
            assert!(record.contains_key(TIMESTAMP_FIELD));
        }
    }

    #[tokio::test]
    async fn test_records_share_timestamp() {
        let (_, messages) = run_canned(SAMPLE).await;
        let stamps: Vec<&Value> = messages[1..]
            .iter()
            .map(|m| &m["record"][TIMESTAMP_FIELD])
            .collect();

        assert!(stamps[0].as_str().unwrap().ends_with('Z'));
        assert!(stamps.iter().all(|s| *s == stamps[0]));
    }

    #[tokio::test]
    async fn test_fields_reproduced_verbatim() {
        let (_, messages) = run_canned(SAMPLE).await;
        let record = &messages[2]["record"];

        assert_eq!(record["ISIN"], "ATXXXXXXXXX9");
        assert_eq!(record["Bezeichnung"], "Test Fund, Tranche A");
        assert_eq!(record["KEst-Meldefonds seit"], "15.7.2019");
        assert_eq!(record["Währung"], "USD");
        assert_eq!(record["Fondsende"], "");
    }

    #[tokio::test]
    async fn test_short_row_keeps_every_header_column() {
        let (written, messages) = run_canned("ISIN;Bezeichnung;Währung\nAT0000000001;Kurz\n").await;

        assert_eq!(written, 1);
        let record = messages[1]["record"].as_object().unwrap();
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["ISIN", "Bezeichnung", "Währung", TIMESTAMP_FIELD]);
        assert_eq!(record["ISIN"], "AT0000000001");
        assert_eq!(record["Bezeichnung"], "Kurz");
        assert_eq!(record["Währung"], Value::Null);
    }

    #[test]
    fn test_format_count_groups_thousands() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(12345), "12,345");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[tokio::test]
    async fn test_header_only_emits_schema_alone() {
        let (written, messages) = run_canned("ISIN;Bezeichnung;Währung\n").await;

        assert_eq!(written, 0);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["type"], "SCHEMA");
    }

    #[tokio::test]
    async fn test_fetch_failure_writes_nothing() {
        let (url, server) = serve_once("500 Internal Server Error", "").await;
        let source = local_source(url);
        let metrics = RecordingMetrics::default();
        let mut out = Vec::new();

        let result = run(&source, &mut out, &metrics, Span::none()).await;
        server.await.unwrap();

        assert!(matches!(result, Err(TapError::Http { .. })));
        assert!(out.is_empty());

        let recorded = metrics.recorded.borrow();
        assert_eq!(recorded.len(), 1);
        match &recorded[0] {
            Recorded::Timer { metric, tags } => {
                assert_eq!(metric, "request_duration");
                assert_eq!(tags["status"], "failed");
            }
            other => panic!("unexpected metric: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_metrics_on_success() {
        let metrics = RecordingMetrics::default();
        let mut out = Vec::new();
        run(&CannedSource { body: SAMPLE }, &mut out, &metrics, Span::none())
            .await
            .unwrap();

        let recorded = metrics.recorded.borrow();
        assert_eq!(recorded.len(), 2);
        assert!(matches!(
            &recorded[0],
            Recorded::Timer { metric, tags }
                if metric == "request_duration" && tags["status"] == "succeeded"
        ));
        assert!(matches!(
            &recorded[1],
            Recorded::Counter { metric, value: 3, tags }
                if metric == "record_count" && tags["endpoint"] == "canned://meldefonds"
        ));
    }

    #[tokio::test]
    async fn test_rerun_has_same_shape() {
        let (first_count, first) = run_canned(SAMPLE).await;
        let (second_count, second) = run_canned(SAMPLE).await;

        assert_eq!(first_count, second_count);
        assert_eq!(first[0], second[0]);

        let strip = |messages: &[Value]| -> Vec<Value> {
            messages[1..]
                .iter()
                .map(|m| {
                    let mut record = m["record"].clone();
                    record.as_object_mut().unwrap().remove(TIMESTAMP_FIELD);
                    record
                })
                .collect()
        };
        assert_eq!(strip(&first), strip(&second));
    }
}
