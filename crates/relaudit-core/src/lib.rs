//! Core contracts and heuristics for relaudit.
//!
//! This crate defines the catalog value objects, the pure advisors
//! (uniqueness, relationships, defaults, constraint suggestions), naming
//! conventions, and the report renderer shared by the engine and the CLI.

pub mod constraints;
pub mod conventions;
pub mod defaults;
pub mod error;
pub mod findings;
pub mod ident;
pub mod redaction;
pub mod relationships;
pub mod report;
pub mod schema;
pub mod statistics;
pub mod suggestions;
pub mod uniqueness;
pub mod validation;

pub use constraints::{
    ConstraintInfo, ConstraintKind, FkAction, IndexInfo, TriggerInfo, TriggerSummary,
};
pub use conventions::{ForeignKeyConvention, ParentRef, resolve_parent};
pub use defaults::{DefaultSuggestion, suggest_default};
pub use error::{Error, Result};
pub use findings::{
    AuditOutcome, FailureKind, ForeignKeyAudit, IntegrityFinding, OrphanedReference,
    TableFailure, TriggerAction, TriggerOutcome,
};
pub use ident::{ensure_discovered, qualified, quote_ident};
pub use redaction::{RedactedConnection, redact_connection_string};
pub use relationships::{
    MATCH_THRESHOLD, RelationshipCandidate, ValueSet, match_percentage, rank_candidates,
};
pub use report::{ColumnDefault, ReportSection, TableReport, column_defaults};
pub use schema::{ColumnDescriptor, TableColumn, TableDescription};
pub use statistics::{ColumnStatistic, distinct_ratio};
pub use suggestions::{
    ConstraintSuggestion, SuggestionKind, foreign_key_sql, suggest_constraints,
};
pub use uniqueness::{
    MODERATE_THRESHOLD, Recommendation, STRONG_THRESHOLD, UniquenessReport, Verdict,
    score_columns,
};
pub use validation::validate_description;
