use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// Quote an identifier for interpolation into SQL text.
///
/// Identifiers cannot be bound as parameters, so dynamic per-table queries
/// quote them instead. Embedded double quotes are doubled.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `"schema"."table"` form.
pub fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// Reject identifiers that were not discovered from the catalog.
pub fn ensure_discovered(name: &str, discovered: &BTreeSet<String>) -> Result<()> {
    if discovered.contains(name) {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier(format!(
            "{name} is not present in the discovered catalog"
        )))
    }
}
