use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use relaudit_audit::AuditOptions;
use relaudit_core::RedactedConnection;

use super::{RegistryError, RegistryResult};

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub engine: String,
    pub command: String,
    pub run_dir: PathBuf,
    pub options: AuditOptions,
    pub connection: RedactedConnection,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig {
    pub run_id: String,
    pub started_at: String,
    pub engine: String,
    pub command: String,
    pub options: AuditOptions,
    pub connection: RedactedConnection,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub logs_path: PathBuf,
    pub result_path: PathBuf,
}

/// Create `<run_dir>/<timestamp>__run_<id>/` with `config.json` and an empty
/// `logs.ndjson`.
pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx.run_dir.join(format!("{timestamp}__run_{}", ctx.run_id));

    create_dir_all(&root)?;

    let config_path = root.join("config.json");
    let logs_path = root.join("logs.ndjson");
    let result_path = root.join("result.json");

    let config = RunConfig {
        run_id: ctx.run_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        engine: ctx.engine.clone(),
        command: ctx.command.clone(),
        options: ctx.options.clone(),
        connection: ctx.connection.clone(),
        git: collect_git_info(),
    };

    write_json(&config_path, &config)?;

    OpenOptions::new().create(true).append(true).open(&logs_path)?;

    Ok(RunPaths {
        root,
        logs_path,
        result_path,
    })
}

pub fn write_result<T: Serialize>(paths: &RunPaths, result: &T) -> RegistryResult<()> {
    write_json(&paths.result_path, result)
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use relaudit_core::redact_connection_string;

    use super::*;

    #[test]
    fn run_directory_holds_redacted_config() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext {
            run_id: "abc".to_string(),
            started_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            engine: "postgres".to_string(),
            command: "fk-audit".to_string(),
            run_dir: dir.path().to_path_buf(),
            options: AuditOptions::default(),
            connection: redact_connection_string("postgres://app:hunter2@db:5432/shop"),
        };

        let paths = start_run(&ctx).unwrap();
        write_result(&paths, &serde_json::json!({"items": []})).unwrap();

        assert_eq!(
            paths.root.file_name().and_then(|name| name.to_str()),
            Some("2024-05-01T12-30-00Z__run_abc")
        );
        assert!(paths.logs_path.exists());
        let config = std::fs::read_to_string(paths.root.join("config.json")).unwrap();
        assert!(!config.contains("hunter2"));
        assert!(config.contains("\"command\": \"fk-audit\""));
        let result = std::fs::read_to_string(&paths.result_path).unwrap();
        assert!(result.contains("items"));
    }
}
