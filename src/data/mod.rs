pub mod ingestion;
pub mod processing;

pub use ingestion::{MeldefondsSource, OekbSource};
pub use processing::{parse_meldefonds_csv, stamp_records, Record};

// Re-export for tests
#[cfg(test)]
pub use processing::TIMESTAMP_FIELD;
