use std::env;

/// Which metrics sink the binary wires into a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricsMode {
    #[default]
    Off,
    Log,
}

impl MetricsMode {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("log") {
            Self::Log
        } else {
            Self::Off
        }
    }
}

/// Process-level settings. The extraction itself reads none of these.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub metrics: MetricsMode,
}

impl Config {
    /// Reads settings from the environment; call after loading `.env`.
    ///
    /// `TAP_METRICS=log` turns on metric log lines. Anything else, or nothing,
    /// leaves them off.
    pub fn from_env() -> Self {
        Self {
            metrics: env::var("TAP_METRICS")
                .map(|v| MetricsMode::parse(&v))
                .unwrap_or_default(),
        }
    }
}
