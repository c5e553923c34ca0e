use serde::{Deserialize, Serialize};

/// Kind of a declared key constraint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    ForeignKey,
}

impl ConstraintKind {
    /// Map a `pg_constraint.contype` code; check and exclusion constraints
    /// are not key constraints.
    pub fn from_contype(code: &str) -> Option<Self> {
        match code {
            "p" => Some(Self::PrimaryKey),
            "u" => Some(Self::Unique),
            "f" => Some(Self::ForeignKey),
            _ => None,
        }
    }
}

/// Foreign key delete action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FkAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl FkAction {
    /// Map a `pg_constraint.confdeltype` code.
    pub fn from_action_code(code: &str) -> Option<Self> {
        match code {
            "a" => Some(Self::NoAction),
            "r" => Some(Self::Restrict),
            "c" => Some(Self::Cascade),
            "n" => Some(Self::SetNull),
            "d" => Some(Self::SetDefault),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// Declared key constraint preserving column order.
///
/// Composite keys list every member column; `referenced_*` and `on_delete`
/// are only populated for foreign keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstraintInfo {
    pub kind: ConstraintKind,
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: Option<String>,
    pub referenced_columns: Option<Vec<String>>,
    pub on_delete: Option<FkAction>,
}

impl ConstraintInfo {
    /// True when the constraint covers exactly this single column.
    pub fn is_single_column(&self, column: &str) -> bool {
        self.columns.len() == 1 && self.columns[0] == column
    }

    pub fn involves(&self, column: &str) -> bool {
        self.columns.iter().any(|item| item == column)
    }
}

/// Index definition, reduced to what the advisors need.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
}

impl IndexInfo {
    pub fn leads_with(&self, column: &str) -> bool {
        self.columns.first().is_some_and(|first| first == column)
    }
}

/// Trigger attached to a table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerInfo {
    pub name: String,
    pub table: String,
}

/// Trigger name surfaced in the merged report.
///
/// The report shows one name per table; when several triggers exist the pick
/// is arbitrary and flagged as such. Use the full trigger list from the table
/// description when every trigger matters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum TriggerSummary {
    None,
    Exactly(String),
    AmbiguousPickedArbitrarily(String),
}

impl TriggerSummary {
    pub fn from_triggers(triggers: &[TriggerInfo]) -> Self {
        match triggers {
            [] => Self::None,
            [only] => Self::Exactly(only.name.clone()),
            [first, ..] => Self::AmbiguousPickedArbitrarily(first.name.clone()),
        }
    }
}
