use serde::{Deserialize, Serialize};

use crate::conventions::ParentRef;
use crate::ident::{qualified, quote_ident};
use crate::schema::{ColumnDescriptor, TableDescription};

/// Column name fragments that usually deserve a NOT NULL constraint.
const IMPORTANT_FRAGMENTS: &[&str] = &["name", "email", "phone", "address", "status"];

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$";

/// Lifecycle columns every table is expected to carry, with the column
/// definition suggested when one is absent.
const LIFECYCLE_COLUMNS: &[(&str, &str)] = &[
    ("created_at", "timestamptz NOT NULL DEFAULT CURRENT_TIMESTAMP"),
    ("updated_at", "timestamptz"),
    ("deleted_at", "timestamptz"),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    MissingIndex,
    NotNull,
    EmailFormatCheck,
    DateRangeCheck,
    /// `created_at`, `updated_at` or soft-delete `deleted_at` is absent.
    LifecycleColumn,
}

/// Schema change suggested from catalog structure alone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConstraintSuggestion {
    pub column: String,
    pub kind: SuggestionKind,
    pub sql: String,
}

/// `ALTER TABLE … ADD CONSTRAINT fk_<table>_<column>` declaring the foreign
/// key a convention column implies.
pub fn foreign_key_sql(schema: &str, table: &str, column: &str, parent: &ParentRef) -> String {
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({});",
        qualified(schema, table),
        quote_ident(&format!("fk_{table}_{column}")),
        quote_ident(column),
        qualified(schema, &parent.table),
        quote_ident(&parent.column)
    )
}

/// Suggestions derived from catalog structure alone, in this order:
/// indexes for unindexed single-column foreign keys; per column, CHECK
/// constraints for email-named and date/timestamp columns and NOT NULL for
/// nullable columns whose names look important; then missing lifecycle
/// columns.
pub fn suggest_constraints(description: &TableDescription) -> Vec<ConstraintSuggestion> {
    let mut suggestions = Vec::new();
    let table = qualified(&description.schema, &description.table);

    for fk in description.foreign_keys() {
        let [column] = fk.columns.as_slice() else {
            continue;
        };
        let indexed = description.indexes.iter().any(|index| index.leads_with(column));
        if indexed {
            continue;
        }
        suggestions.push(ConstraintSuggestion {
            column: column.clone(),
            kind: SuggestionKind::MissingIndex,
            sql: format!(
                "CREATE INDEX {} ON {table} ({});",
                quote_ident(&format!("idx_{}_{}", description.table, column)),
                quote_ident(column)
            ),
        });
    }

    for column in &description.columns {
        let lowered = column.name.to_lowercase();

        if lowered.contains("email") {
            suggestions.push(ConstraintSuggestion {
                column: column.name.clone(),
                kind: SuggestionKind::EmailFormatCheck,
                sql: format!(
                    "ALTER TABLE {table} ADD CONSTRAINT {} CHECK ({} ~* '{EMAIL_PATTERN}');",
                    quote_ident(&format!("check_{}_email_format", column.name)),
                    quote_ident(&column.name)
                ),
            });
        }

        if is_date_like(column) {
            suggestions.push(ConstraintSuggestion {
                column: column.name.clone(),
                kind: SuggestionKind::DateRangeCheck,
                sql: format!(
                    "ALTER TABLE {table} ADD CONSTRAINT {} CHECK ({} >= '1900-01-01'::date);",
                    quote_ident(&format!("check_{}_reasonable_date", column.name)),
                    quote_ident(&column.name)
                ),
            });
        }

        if column.nullable
            && IMPORTANT_FRAGMENTS
                .iter()
                .any(|fragment| lowered.contains(fragment))
        {
            suggestions.push(ConstraintSuggestion {
                column: column.name.clone(),
                kind: SuggestionKind::NotNull,
                sql: format!(
                    "ALTER TABLE {table} ALTER COLUMN {} SET NOT NULL;",
                    quote_ident(&column.name)
                ),
            });
        }
    }

    if description.exists() {
        for (name, definition) in LIFECYCLE_COLUMNS {
            if description.column(name).is_some() {
                continue;
            }
            suggestions.push(ConstraintSuggestion {
                column: name.to_string(),
                kind: SuggestionKind::LifecycleColumn,
                sql: format!(
                    "ALTER TABLE {table} ADD COLUMN {} {definition};",
                    quote_ident(name)
                ),
            });
        }
    }

    suggestions
}

fn is_date_like(column: &ColumnDescriptor) -> bool {
    let declared = column.declared_type.to_lowercase();
    declared == "date" || declared.starts_with("timestamp")
}
