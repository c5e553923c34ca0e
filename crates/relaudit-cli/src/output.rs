use clap::ValueEnum;
use serde::Serialize;

use relaudit_core::{
    AuditOutcome, DefaultSuggestion, ForeignKeyAudit, IntegrityFinding, OrphanedReference,
    RelationshipCandidate, TableDescription, TableFailure, TableReport, TriggerAction,
    TriggerOutcome, UniquenessReport, Verdict,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

/// Plain-text rendering of a command result.
pub trait RenderText {
    fn render_text(&self) -> String;
}

/// One line of an [`AuditOutcome`] listing.
pub trait RenderLine {
    fn render_line(&self) -> String;
}

pub fn render<T: Serialize + RenderText>(value: &T, format: Format) -> serde_json::Result<String> {
    match format {
        Format::Text => Ok(value.render_text()),
        Format::Json => serde_json::to_string_pretty(value).map(|json| json + "\n"),
    }
}

fn join(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn failure_line(failure: &TableFailure) -> String {
    let target = match &failure.column {
        Some(column) => format!("{}.{column}", failure.table),
        None => failure.table.clone(),
    };
    let kind = serde_json::to_value(failure.kind)
        .ok()
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_default();
    format!("! {target} [{kind}]: {}", failure.message)
}

impl RenderText for TableDescription {
    fn render_text(&self) -> String {
        if !self.exists() {
            return join(vec![format!("table {}.{} not found", self.schema, self.table)]);
        }

        let mut lines = vec![format!("{}.{}", self.schema, self.table)];
        for column in &self.columns {
            let nullable = if column.nullable { "null" } else { "not null" };
            let default = column
                .default_expr
                .as_deref()
                .map(|expr| format!(" default {expr}"))
                .unwrap_or_default();
            let keys = if column.key_constraints.is_empty() {
                String::new()
            } else {
                format!(" [{}]", column.key_constraints.join(", "))
            };
            lines.push(format!(
                "  {:>3} {} {} {nullable}{default}{keys}",
                column.ordinal, column.name, column.declared_type
            ));
        }
        for constraint in &self.constraints {
            let target = match (&constraint.referenced_table, &constraint.referenced_columns) {
                (Some(table), Some(columns)) => format!(" -> {table}({})", columns.join(", ")),
                _ => String::new(),
            };
            lines.push(format!(
                "  constraint {} {:?} ({}){target}",
                constraint.name,
                constraint.kind,
                constraint.columns.join(", ")
            ));
        }
        for index in &self.indexes {
            lines.push(format!(
                "  index {} ({}){}",
                index.name,
                index.columns.join(", "),
                if index.is_unique { " unique" } else { "" }
            ));
        }
        for trigger in &self.triggers {
            lines.push(format!("  trigger {}", trigger.name));
        }
        join(lines)
    }
}

impl RenderText for UniquenessReport {
    fn render_text(&self) -> String {
        let mut lines: Vec<String> = self
            .recommendations
            .iter()
            .map(|item| {
                let verdict = match item.verdict {
                    Verdict::Strong => "strong",
                    Verdict::Moderate => "moderate",
                    Verdict::None => "none",
                };
                let enforced = if item.already_enforced { " (enforced)" } else { "" };
                format!("{}: {:.4} {verdict}{enforced}", item.column, item.distinct_ratio)
            })
            .collect();
        if lines.is_empty() {
            lines.push("no columns".to_string());
        }
        lines.extend(self.diagnostics.iter().map(failure_line));
        join(lines)
    }
}

impl RenderText for Vec<RelationshipCandidate> {
    fn render_text(&self) -> String {
        if self.is_empty() {
            return join(vec!["no candidates above threshold".to_string()]);
        }
        join(
            self.iter()
                .map(|item| {
                    format!(
                        "{} -> {}.{} ({:.2}%)",
                        item.source_column,
                        item.target_table,
                        item.target_column,
                        item.match_percentage
                    )
                })
                .collect(),
        )
    }
}

impl RenderText for TableReport {
    fn render_text(&self) -> String {
        TableReport::render_text(self)
    }
}

impl RenderText for DefaultSuggestion {
    fn render_text(&self) -> String {
        join(vec![self.to_string()])
    }
}

impl<T: RenderLine> RenderText for AuditOutcome<T> {
    fn render_text(&self) -> String {
        let mut lines: Vec<String> = self.items.iter().map(RenderLine::render_line).collect();
        if lines.is_empty() {
            lines.push("nothing found".to_string());
        }
        lines.extend(self.failures.iter().map(failure_line));
        join(lines)
    }
}

impl RenderLine for ForeignKeyAudit {
    fn render_line(&self) -> String {
        let line = format!(
            "{}.{} -> {}: column {}, foreign key {}, constraint {}, on delete {}",
            self.table,
            self.column,
            self.parent_table,
            if self.has_column { "present" } else { "absent" },
            if self.has_declared_foreign_key {
                "declared"
            } else {
                "missing"
            },
            self.constraint_label(),
            self.on_delete_label()
        );
        match &self.sql {
            Some(sql) => format!("{line}\n    fix: {sql}"),
            None => line,
        }
    }
}

impl RenderLine for OrphanedReference {
    fn render_line(&self) -> String {
        format!(
            "{}.{} = {} ({} rows)",
            self.table, self.column, self.offending_value, self.occurrence_count
        )
    }
}

impl RenderLine for IntegrityFinding {
    fn render_line(&self) -> String {
        match self {
            Self::MissingForeignKey { table, column } => {
                format!("missing foreign key: {table}.{column}")
            }
            Self::OrphanedReference {
                table,
                column,
                offending_value,
                occurrence_count,
            } => format!("orphaned value: {table}.{column} = {offending_value} ({occurrence_count} rows)"),
        }
    }
}

impl RenderLine for TriggerOutcome {
    fn render_line(&self) -> String {
        let action = match self.action {
            TriggerAction::Installed => "installed",
            TriggerAction::AlreadyPresent => "already present",
        };
        format!("{}: {action}", self.table)
    }
}
