pub mod messages;
pub mod metrics;
pub mod schema;

pub use messages::SingerWriter;
pub use metrics::{LogMetrics, MetricsSink, NoopMetrics, Tags};
pub use schema::{schema_json, MELDEFONDS_FIELDS};

/// Stream name every message is tagged with.
pub const STREAM: &str = "Meldefonds";

/// Downstream targets upsert on these fields.
pub const KEY_PROPERTIES: &[&str] = &["ISIN"];
