use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::schema::TableDescription;

/// Validate internal consistency of a table snapshot.
///
/// This checks:
/// - ordinals are unique and contiguous starting at 1
/// - column names are unique
/// - constraint columns exist in the table
///
/// A failing snapshot must be re-read, not patched.
pub fn validate_description(description: &TableDescription) -> Result<()> {
    let table = format!("{}.{}", description.schema, description.table);

    let mut names = BTreeSet::new();
    for (index, column) in description.columns.iter().enumerate() {
        let expected = index as i32 + 1;
        if column.ordinal != expected {
            return Err(Error::InvalidSchema(format!(
                "non-contiguous ordinal in {table}: column {} has {} (expected {expected})",
                column.name, column.ordinal
            )));
        }

        if !names.insert(column.name.as_str()) {
            return Err(Error::InvalidSchema(format!(
                "duplicate column name: {table}.{}",
                column.name
            )));
        }
    }

    for constraint in &description.constraints {
        for column in &constraint.columns {
            if !names.contains(column.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "constraint {} references missing column {table}.{column}",
                    constraint.name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{ConstraintInfo, ConstraintKind};
    use crate::schema::ColumnDescriptor;

    fn column(ordinal: i32, name: &str) -> ColumnDescriptor {
        ColumnDescriptor {
            ordinal,
            name: name.to_string(),
            declared_type: "integer".to_string(),
            nullable: false,
            default_expr: None,
            key_constraints: Vec::new(),
        }
    }

    #[test]
    fn accepts_contiguous_snapshot() {
        let mut description = TableDescription::empty("public", "orders");
        description.columns = vec![column(1, "id"), column(2, "customer_id")];
        assert!(validate_description(&description).is_ok());
    }

    #[test]
    fn rejects_gaps_and_duplicates() {
        let mut gapped = TableDescription::empty("public", "orders");
        gapped.columns = vec![column(1, "id"), column(3, "customer_id")];
        assert!(matches!(
            validate_description(&gapped),
            Err(Error::InvalidSchema(message)) if message.contains("non-contiguous")
        ));

        let mut duplicated = TableDescription::empty("public", "orders");
        duplicated.columns = vec![column(1, "id"), column(2, "id")];
        assert!(validate_description(&duplicated).is_err());
    }

    #[test]
    fn rejects_constraint_on_unknown_column() {
        let mut description = TableDescription::empty("public", "orders");
        description.columns = vec![column(1, "id")];
        description.constraints = vec![ConstraintInfo {
            kind: ConstraintKind::Unique,
            name: "orders_code_key".to_string(),
            columns: vec!["code".to_string()],
            referenced_table: None,
            referenced_columns: None,
            on_delete: None,
        }];
        assert!(validate_description(&description).is_err());
    }
}
