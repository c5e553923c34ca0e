use serde::{Deserialize, Serialize};

/// Planner statistics for one column.
///
/// These are sampled estimates and may be stale; anything derived from them
/// is advisory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnStatistic {
    pub column: String,
    /// Raw `n_distinct`, `None` when the column was never analyzed.
    pub distinct_estimate: Option<f64>,
    pub null_fraction: f64,
    pub total_rows_estimate: f64,
}

impl ColumnStatistic {
    /// Estimated fraction of rows holding distinct values.
    pub fn distinct_ratio(&self) -> f64 {
        distinct_ratio(self.distinct_estimate, self.total_rows_estimate)
    }

    pub fn is_available(&self) -> bool {
        self.distinct_estimate.is_some()
    }
}

/// Normalize a raw planner distinct estimate into a ratio in `[0, 1]`.
///
/// A negative estimate is already a fraction of total rows. A positive one is
/// an absolute count and is divided by the row estimate. Missing statistics
/// and an empty (or never analyzed) table yield `0`.
pub fn distinct_ratio(distinct_estimate: Option<f64>, total_rows_estimate: f64) -> f64 {
    let Some(raw) = distinct_estimate else {
        return 0.0;
    };

    let ratio = if raw < 0.0 {
        raw.abs()
    } else if total_rows_estimate <= 0.0 {
        0.0
    } else {
        raw / total_rows_estimate
    };

    clamp_ratio(ratio)
}

pub(crate) fn clamp_ratio(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
