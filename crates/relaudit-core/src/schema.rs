use serde::{Deserialize, Serialize};

use crate::constraints::{ConstraintInfo, ConstraintKind, IndexInfo, TriggerInfo, TriggerSummary};

/// Column metadata captured from the catalog at read time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnDescriptor {
    /// 1-based position, contiguous within one snapshot.
    pub ordinal: i32,
    pub name: String,
    pub declared_type: String,
    pub nullable: bool,
    pub default_expr: Option<String>,
    /// Names of the declared key constraints this column belongs to.
    pub key_constraints: Vec<String>,
}

/// Column reference used by catalog-wide scans.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct TableColumn {
    pub table: String,
    pub column: String,
    pub declared_type: String,
}

/// Unified per-table schema snapshot.
///
/// An empty `columns` list means the table was not found.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableDescription {
    pub schema: String,
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
    pub constraints: Vec<ConstraintInfo>,
    pub triggers: Vec<TriggerInfo>,
    pub indexes: Vec<IndexInfo>,
    pub trigger_summary: TriggerSummary,
}

impl TableDescription {
    pub fn empty(schema: &str, table: &str) -> Self {
        Self {
            schema: schema.to_string(),
            table: table.to_string(),
            columns: Vec::new(),
            constraints: Vec::new(),
            triggers: Vec::new(),
            indexes: Vec::new(),
            trigger_summary: TriggerSummary::None,
        }
    }

    pub fn exists(&self) -> bool {
        !self.columns.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &ConstraintInfo> {
        self.constraints
            .iter()
            .filter(|constraint| constraint.kind == ConstraintKind::ForeignKey)
    }

    /// True when a PK or UNIQUE constraint covers exactly this column.
    pub fn is_unique_enforced(&self, column: &str) -> bool {
        self.constraints.iter().any(|constraint| {
            matches!(
                constraint.kind,
                ConstraintKind::PrimaryKey | ConstraintKind::Unique
            ) && constraint.is_single_column(column)
        })
    }
}
