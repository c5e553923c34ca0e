use serde::{Deserialize, Serialize};

use crate::findings::TableFailure;
use crate::schema::TableDescription;
use crate::statistics::{ColumnStatistic, clamp_ratio};

/// Ratio above which a column is recommended for a UNIQUE constraint.
pub const STRONG_THRESHOLD: f64 = 0.95;
/// Ratio above which a column is reported as nearly unique.
pub const MODERATE_THRESHOLD: f64 = 0.80;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Strong,
    Moderate,
    None,
}

impl Verdict {
    /// Both thresholds are strict: a ratio of exactly 0.95 is not `Strong`.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio > STRONG_THRESHOLD {
            Self::Strong
        } else if ratio > MODERATE_THRESHOLD {
            Self::Moderate
        } else {
            Self::None
        }
    }

    /// Only `Strong` counts as a recommendation.
    pub fn is_recommended(&self) -> bool {
        matches!(self, Self::Strong)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub column: String,
    pub distinct_ratio: f64,
    pub verdict: Verdict,
    /// A PK or UNIQUE constraint already covers this column alone.
    pub already_enforced: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UniquenessReport {
    pub recommendations: Vec<Recommendation>,
    /// Columns without planner statistics, scored as ratio 0.
    pub diagnostics: Vec<TableFailure>,
}

impl UniquenessReport {
    pub fn recommended(&self) -> impl Iterator<Item = &Recommendation> {
        self.recommendations
            .iter()
            .filter(|item| item.verdict.is_recommended())
    }
}

/// Score every column of `description` using `statistics`.
///
/// Columns follow catalog order. A column missing from `statistics` is scored
/// as if it had never been analyzed.
pub fn score_columns(
    description: &TableDescription,
    statistics: &[ColumnStatistic],
) -> UniquenessReport {
    let mut report = UniquenessReport::default();

    for column in &description.columns {
        let stat = statistics.iter().find(|stat| stat.column == column.name);
        let ratio = match stat {
            Some(stat) if stat.is_available() => stat.distinct_ratio(),
            _ => {
                report.diagnostics.push(TableFailure::statistics_unavailable(
                    &description.table,
                    &column.name,
                ));
                0.0
            }
        };
        let ratio = clamp_ratio(ratio);

        report.recommendations.push(Recommendation {
            column: column.name.clone(),
            distinct_ratio: ratio,
            verdict: Verdict::from_ratio(ratio),
            already_enforced: description.is_unique_enforced(&column.name),
        });
    }

    report
}
