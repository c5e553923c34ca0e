use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Naming rule marking a column as an implied foreign key.
///
/// Configured as `[[audit.conventions]]` entries, e.g.
///
/// ```toml
/// [[audit.conventions]]
/// kind = "column"
/// column = "user_id"
/// parent_table = "users"
///
/// [[audit.conventions]]
/// kind = "id_suffix"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForeignKeyConvention {
    /// An exact column name with an explicit parent.
    Column {
        column: String,
        parent_table: String,
        #[serde(default = "default_parent_column")]
        parent_column: String,
    },
    /// `<stem><suffix>` refers to the table named `<stem>` (or its plural).
    IdSuffix {
        #[serde(default = "default_suffix")]
        suffix: String,
        #[serde(default = "default_parent_column")]
        parent_column: String,
    },
}

fn default_parent_column() -> String {
    "id".to_string()
}

fn default_suffix() -> String {
    "_id".to_string()
}

impl ForeignKeyConvention {
    pub fn id_suffix() -> Self {
        Self::IdSuffix {
            suffix: default_suffix(),
            parent_column: default_parent_column(),
        }
    }
}

/// Parent row location implied by a convention column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct ParentRef {
    pub table: String,
    pub column: String,
}

/// Resolve `column` against the conventions, first match wins.
///
/// `known_tables` is the discovered table list; a parent that is not in it
/// never resolves.
pub fn resolve_parent(
    conventions: &[ForeignKeyConvention],
    column: &str,
    known_tables: &BTreeSet<String>,
) -> Option<ParentRef> {
    conventions.iter().find_map(|convention| match convention {
        ForeignKeyConvention::Column {
            column: name,
            parent_table,
            parent_column,
        } => (name == column && known_tables.contains(parent_table)).then(|| ParentRef {
            table: parent_table.clone(),
            column: parent_column.clone(),
        }),
        ForeignKeyConvention::IdSuffix {
            suffix,
            parent_column,
        } => {
            let stem = column.strip_suffix(suffix.as_str())?;
            if stem.is_empty() {
                return None;
            }
            [stem.to_string(), format!("{stem}s"), format!("{stem}es")]
                .into_iter()
                .find(|candidate| known_tables.contains(candidate))
                .map(|table| ParentRef {
                    table,
                    column: parent_column.clone(),
                })
        }
    })
}
