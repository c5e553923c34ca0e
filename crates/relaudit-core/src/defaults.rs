use std::fmt;

use serde::{Deserialize, Serialize};

/// Default value suggested for a declared column type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DefaultSuggestion {
    CurrentTimestamp,
    False,
    Zero,
    EmptyString,
    NoSuggestion,
}

impl DefaultSuggestion {
    /// SQL literal for the suggestion, `None` when there is nothing to suggest.
    pub fn as_sql(&self) -> Option<&'static str> {
        match self {
            Self::CurrentTimestamp => Some("CURRENT_TIMESTAMP"),
            Self::False => Some("false"),
            Self::Zero => Some("0"),
            Self::EmptyString => Some("''"),
            Self::NoSuggestion => None,
        }
    }
}

impl fmt::Display for DefaultSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql().unwrap_or("no suggestion"))
    }
}

/// Suggest a default from the declared type only; data is never inspected.
pub fn suggest_default(column_type: &str) -> DefaultSuggestion {
    let normalized = normalize_type(column_type);

    match normalized.as_str() {
        "timestamp"
        | "timestamp without time zone"
        | "timestamp with time zone"
        | "timestamptz"
        | "date"
        | "time"
        | "time without time zone"
        | "time with time zone"
        | "timetz" => DefaultSuggestion::CurrentTimestamp,
        "boolean" | "bool" => DefaultSuggestion::False,
        "smallint" | "integer" | "int" | "bigint" | "int2" | "int4" | "int8" | "smallserial"
        | "serial" | "bigserial" | "serial2" | "serial4" | "serial8" => DefaultSuggestion::Zero,
        "text" | "varchar" | "character varying" | "char" | "character" | "bpchar" | "citext" => {
            DefaultSuggestion::EmptyString
        }
        _ => DefaultSuggestion::NoSuggestion,
    }
}

/// Lowercase, drop type modifiers such as `(255)` and collapse whitespace.
///
/// Array types are left untouched so `integer[]` gets no scalar suggestion.
fn normalize_type(column_type: &str) -> String {
    let lowered = column_type.trim().to_lowercase();
    let mut stripped = String::with_capacity(lowered.len());
    let mut depth = 0usize;

    for ch in lowered.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => stripped.push(ch),
            _ => {}
        }
    }

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
