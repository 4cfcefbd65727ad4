mod config;
mod data;
mod error;
mod singer;
mod tap;

use config::{Config, MetricsMode};
use data::OekbSource;
use dotenv::dotenv;
use singer::{LogMetrics, MetricsSink, NoopMetrics, STREAM};
use tracing::{error, info_span};
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the log subscriber.
///
/// Logs go to stderr because stdout carries the Singer message stream.
/// `RUST_LOG` overrides the default `info` filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Maps the outcome of a run to the process exit status, logging failures as fatal.
fn exit_code(result: &error::Result<usize>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(e) => {
            let causes: Vec<String> = anyhow::Chain::new(e).map(|c| c.to_string()).collect();
            error!("Meldefonds extraction failed: {}", causes.join(": "));
            1
        }
    }
}

/// Entry point of the Meldefonds tap.
///
/// 1. Load `.env` and initialize logging
/// 2. Download the OeKB export
/// 3. Write one SCHEMA message and one RECORD message per fund to stdout
///
/// Any failure is logged as fatal and the process exits with status 1, before
/// anything reaches stdout if the download is what failed.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenv().ok();
    init_logging();

    let config = Config::from_env();
    let metrics: Box<dyn MetricsSink> = match config.metrics {
        MetricsMode::Log => Box::new(LogMetrics),
        MetricsMode::Off => Box::new(NoopMetrics),
    };

    let source = OekbSource::new();
    let stdout = std::io::stdout().lock();
    let span = info_span!("tap", stream = STREAM);

    let result = tap::run(&source, stdout, metrics.as_ref(), span).await;
    drop(source);

    let code = exit_code(&result);
    if code != 0 {
        std::process::exit(code);
    }
}
