use std::time::Duration;

use serde::{Deserialize, Serialize};

use relaudit_core::ForeignKeyConvention;
use relaudit_introspect::TriggerSpec;

/// Options that control how audits behave.
///
/// Deserializes from the `[audit]` table of `relaudit.toml`; every field is
/// optional there.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuditOptions {
    pub schema: String,
    /// Naming rules marking implied foreign-key columns.
    pub conventions: Vec<ForeignKeyConvention>,
    /// Column stamped by the maintenance trigger.
    pub audit_column: String,
    /// Trigger name override; defaults to `set_<audit_column>`.
    pub trigger_name: Option<String>,
    /// Maximum per-table tasks in flight.
    pub max_parallelism: usize,
    /// Stop issuing new per-table work after this many seconds.
    pub timeout_secs: Option<u64>,
    /// Restrict relationship detection to these target tables.
    pub candidate_tables: Option<Vec<String>>,
    /// Cap on target tables when no restriction is given.
    pub max_candidate_tables: usize,
    /// Columns with more distinct values are left out of relationship detection.
    pub max_distinct_values: usize,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            conventions: vec![ForeignKeyConvention::id_suffix()],
            audit_column: "updated_at".to_string(),
            trigger_name: None,
            max_parallelism: 4,
            timeout_secs: None,
            candidate_tables: None,
            max_candidate_tables: 50,
            max_distinct_values: 100_000,
        }
    }
}

impl AuditOptions {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn parallelism(&self) -> usize {
        self.max_parallelism.max(1)
    }

    pub fn trigger_spec(&self) -> TriggerSpec {
        let mut spec = TriggerSpec::for_column(&self.schema, &self.audit_column);
        if let Some(name) = &self.trigger_name {
            spec.trigger_name = name.clone();
        }
        spec
    }
}
