use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;

use super::{RegistryError, RegistryResult};

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "RELAUDIT_LOG";

/// JSON events go to the run's `logs.ndjson`, filtered by `RELAUDIT_LOG`
/// (default `info`). Warnings are echoed to stderr as well.
pub fn init_run_logging(path: &Path) -> RegistryResult<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let run_log = tracing_subscriber::fmt::layer()
        .json()
        .with_timer(UtcTime::rfc_3339())
        .with_writer(Mutex::new(file));
    let console = tracing_subscriber::fmt::layer()
        .compact()
        .without_time()
        .with_target(false)
        .with_writer(io::stderr)
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(filter)
        .with(run_log)
        .with(console)
        .try_init()
        .map_err(|err| RegistryError::Logging(err.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_land_in_the_run_log_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.ndjson");

        init_run_logging(&path).unwrap();
        tracing::info!(event = "run_started", command = "fk-audit");

        let content = std::fs::read_to_string(&path).unwrap();
        let line = content.lines().last().unwrap();
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["fields"]["event"], "run_started");
        assert_eq!(value["fields"]["command"], "fk-audit");
        assert_eq!(value["level"], "INFO");
        assert!(init_run_logging(&path).is_err());
    }
}
