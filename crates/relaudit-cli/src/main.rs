mod config;
mod output;
mod registry;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use config::{ConfigError, DEFAULT_CONFIG_FILE, Overrides, load_config};
use output::{Format, RenderText, render};
use registry::{RunContext, RunPaths, init_run_logging, start_run, write_result};
use relaudit_audit::{Auditor, CancellationToken, suggest_default};
use relaudit_core::{Error as CoreError, redact_connection_string};
use relaudit_introspect::{PostgresCatalog, connect};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),
    #[error("{0} table(s) could not be processed; see the output for details")]
    Incomplete(usize),
}

#[derive(Parser, Debug)]
#[command(name = "relaudit", version, about = "Relational schema auditor for PostgreSQL")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Database connection string.
    #[arg(
        long,
        env = "DATABASE_URL",
        hide_env_values = true,
        value_name = "CONNECTION_STRING",
        global = true
    )]
    conn: Option<String>,
    /// Config file; defaults to ./relaudit.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Schema to audit.
    #[arg(long, global = true)]
    schema: Option<String>,
    #[arg(long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,
    /// Output directory for runs.
    #[arg(long, default_value = "runs", global = true)]
    run_dir: PathBuf,
    /// Maximum per-table tasks in flight.
    #[arg(long, global = true)]
    max_parallelism: Option<usize>,
    /// Stop starting new per-table work after this many seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Suggested default for a declared column type.
    SuggestDefault(SuggestDefaultArgs),
    #[command(flatten)]
    Audit(AuditCommand),
}

/// Subcommands that read the database.
#[derive(Subcommand, Debug)]
enum AuditCommand {
    /// Columns, constraints, indexes and triggers of a table.
    Describe(TableArgs),
    /// Distinct-ratio scoring of every column.
    Uniqueness(TableArgs),
    /// Undeclared foreign keys inferred from value overlap.
    Relationships(RelationshipArgs),
    /// Convention-named columns and their declared foreign keys.
    FkAudit,
    /// Convention-column values without a parent row.
    Orphans,
    /// Missing foreign keys and orphaned values together.
    Integrity,
    /// Install the update-stamping trigger where it is missing.
    EnsureTriggers(TriggerArgs),
    /// Merged per-table report.
    Report(TableArgs),
}

#[derive(Args, Debug)]
struct TableArgs {
    table: String,
}

#[derive(Args, Debug)]
struct RelationshipArgs {
    table: String,
    /// Compare only against these tables (repeatable).
    #[arg(long = "candidate", value_name = "TABLE")]
    candidates: Vec<String>,
}

#[derive(Args, Debug)]
struct SuggestDefaultArgs {
    column_type: String,
}

#[derive(Args, Debug)]
struct TriggerArgs {
    /// Column stamped on update.
    #[arg(long)]
    audit_column: Option<String>,
    /// Trigger name; defaults to set_<audit column>.
    #[arg(long)]
    trigger_name: Option<String>,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::SuggestDefault(_) => "suggest-default",
            Self::Audit(command) => command.name(),
        }
    }
}

impl AuditCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::Describe(_) => "describe",
            Self::Uniqueness(_) => "uniqueness",
            Self::Relationships(_) => "relationships",
            Self::FkAudit => "fk-audit",
            Self::Orphans => "orphans",
            Self::Integrity => "integrity",
            Self::EnsureTriggers(_) => "ensure-triggers",
            Self::Report(_) => "report",
        }
    }
}

/// Rendered output plus the number of tables that failed.
struct Finished {
    output: String,
    failures: usize,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let Cli { global, command } = Cli::parse();

    match command {
        Command::SuggestDefault(args) => {
            print!("{}", render(&suggest_default(&args.column_type), global.format)?);
            Ok(())
        }
        Command::Audit(command) => run_audit(global, command).await,
    }
}

async fn run_audit(global: GlobalArgs, command: AuditCommand) -> Result<(), CliError> {
    let mut config = load_config(global.config.as_deref(), Path::new(DEFAULT_CONFIG_FILE))?;
    let mut overrides = Overrides {
        schema: global.schema,
        max_parallelism: global.max_parallelism,
        timeout_secs: global.timeout_secs,
        ..Overrides::default()
    };
    match &command {
        AuditCommand::EnsureTriggers(args) => {
            overrides.audit_column = args.audit_column.clone();
            overrides.trigger_name = args.trigger_name.clone();
        }
        AuditCommand::Relationships(args) => overrides.candidate_tables = args.candidates.clone(),
        _ => {}
    }
    config.apply(overrides);

    let conn = global.conn.ok_or_else(|| {
        CliError::InvalidConfig(
            "connection string is required: pass --conn or set DATABASE_URL".to_string(),
        )
    })?;
    let engine = detect_engine(&conn)?;

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        engine: engine.to_string(),
        command: command.name().to_string(),
        run_dir: global.run_dir,
        options: config.audit.clone(),
        connection: redact_connection_string(&conn),
    };

    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(
        event = "run_started",
        run_id = %run_id,
        engine = %engine,
        command = command.name(),
        schema = %config.audit.schema,
        run_dir = %run_paths.root.display()
    );
    let timer = Instant::now();

    let catalog = connect(&conn, &config.pool.connect_options()).await?;
    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());
    let auditor = Auditor::new(catalog, config.audit.clone()).with_cancellation(cancel);

    let finished = execute(&auditor, &command, &run_paths, global.format).await;
    let status = match &finished {
        Ok(done) if done.failures == 0 => "success",
        Ok(_) => "partial",
        Err(_) => "failed",
    };
    tracing::info!(
        event = "run_finished",
        status = status,
        duration_ms = timer.elapsed().as_millis()
    );

    let finished = finished?;
    print!("{}", finished.output);
    if finished.failures > 0 {
        return Err(CliError::Incomplete(finished.failures));
    }
    Ok(())
}

async fn execute(
    auditor: &Auditor<PostgresCatalog>,
    command: &AuditCommand,
    paths: &RunPaths,
    format: Format,
) -> Result<Finished, CliError> {
    match command {
        AuditCommand::Describe(args) => {
            let description = auditor.describe_table(&args.table).await?;
            finish(paths, format, &description, 0)
        }
        AuditCommand::Uniqueness(args) => {
            let report = auditor.analyze_uniqueness(&args.table).await?;
            finish(paths, format, &report, 0)
        }
        AuditCommand::Relationships(args) => {
            let candidates = auditor.detect_foreign_key_candidates(&args.table).await?;
            finish(paths, format, &candidates, 0)
        }
        AuditCommand::FkAudit => {
            let outcome = auditor.find_columns_needing_foreign_key().await?;
            let failures = outcome.failures.len();
            finish(paths, format, &outcome, failures)
        }
        AuditCommand::Orphans => {
            let outcome = auditor.find_orphaned_references().await?;
            let failures = outcome.failures.len();
            finish(paths, format, &outcome, failures)
        }
        AuditCommand::Integrity => {
            let outcome = auditor.audit_integrity().await?;
            let failures = outcome.failures.len();
            finish(paths, format, &outcome, failures)
        }
        AuditCommand::EnsureTriggers(_) => {
            let outcome = auditor.ensure_update_triggers().await?;
            let failures = outcome.failures.len();
            finish(paths, format, &outcome, failures)
        }
        AuditCommand::Report(args) => {
            let report = auditor.compose_report(&args.table).await?;
            finish(paths, format, &report, 0)
        }
    }
}

fn finish<T: Serialize + RenderText>(
    paths: &RunPaths,
    format: Format,
    value: &T,
    failures: usize,
) -> Result<Finished, CliError> {
    write_result(paths, value)?;
    tracing::info!(event = "result_written", path = %paths.result_path.display());

    Ok(Finished {
        output: render(value, format)?,
        failures,
    })
}

/// Ctrl-C stops new per-table work; statements already running finish.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(event = "cancel_requested");
            cancel.cancel();
        }
    });
}

fn detect_engine(conn: &str) -> Result<&'static str, CliError> {
    if conn.starts_with("postgres://") || conn.starts_with("postgresql://") {
        Ok("postgres")
    } else {
        Err(CliError::UnsupportedEngine(
            redact_connection_string(conn).redacted,
        ))
    }
}
