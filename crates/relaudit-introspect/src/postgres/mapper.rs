use relaudit_core::{
    ColumnDescriptor, ColumnStatistic, ConstraintInfo, ConstraintKind, FkAction, IndexInfo,
    TableColumn, TriggerInfo,
};

use super::queries::{
    RawColumn, RawColumnStatistic, RawConstraintColumn, RawIndex, RawSchemaColumn,
};

/// Group membership rows into one descriptor per column identity.
///
/// Rows arrive ordered by ordinal, so grouping only looks at the last entry.
pub fn map_columns(raw: Vec<RawColumn>) -> Vec<ColumnDescriptor> {
    let mut columns: Vec<ColumnDescriptor> = Vec::new();

    for row in raw {
        let same_column = columns
            .last()
            .is_some_and(|last| last.ordinal == row.ordinal && last.name == row.name);

        if !same_column {
            columns.push(ColumnDescriptor {
                ordinal: row.ordinal,
                name: row.name,
                declared_type: row.declared_type,
                nullable: row.nullable,
                default_expr: row.default_expr,
                key_constraints: Vec::new(),
            });
        }

        if let (Some(name), Some(column)) = (row.constraint_name, columns.last_mut()) {
            if !column.key_constraints.contains(&name) {
                column.key_constraints.push(name);
            }
        }
    }

    columns
}

/// Fold per-column constraint rows into constraints, keeping first-seen
/// order and column order within each constraint.
pub fn map_constraints(raw: Vec<RawConstraintColumn>) -> Vec<ConstraintInfo> {
    let mut constraints: Vec<ConstraintInfo> = Vec::new();

    for row in raw {
        let Some(kind) = ConstraintKind::from_contype(&row.constraint_type) else {
            continue;
        };

        let index = match constraints
            .iter()
            .position(|item| item.name == row.constraint_name)
        {
            Some(index) => index,
            None => {
                let is_fk = kind == ConstraintKind::ForeignKey;
                constraints.push(ConstraintInfo {
                    kind,
                    name: row.constraint_name,
                    columns: Vec::new(),
                    referenced_table: if is_fk { row.referenced_table.clone() } else { None },
                    referenced_columns: is_fk.then(Vec::new),
                    on_delete: if is_fk {
                        row.delete_action.as_deref().and_then(FkAction::from_action_code)
                    } else {
                        None
                    },
                });
                constraints.len() - 1
            }
        };

        let constraint = &mut constraints[index];
        constraint.columns.push(row.column_name);
        if let (Some(referenced), Some(column)) =
            (constraint.referenced_columns.as_mut(), row.referenced_column)
        {
            referenced.push(column);
        }
    }

    constraints
}

pub fn map_triggers(raw: Vec<String>, table: &str) -> Vec<TriggerInfo> {
    raw.into_iter()
        .map(|name| TriggerInfo {
            name,
            table: table.to_string(),
        })
        .collect()
}

pub fn map_indexes(raw: Vec<RawIndex>) -> Vec<IndexInfo> {
    raw.into_iter()
        .map(|idx| IndexInfo {
            name: idx.name,
            columns: idx.columns,
            is_unique: idx.is_unique,
            is_primary: idx.is_primary,
        })
        .collect()
}

pub fn map_statistics(raw: Vec<RawColumnStatistic>) -> Vec<ColumnStatistic> {
    raw.into_iter()
        .map(|stat| ColumnStatistic {
            column: stat.column_name,
            distinct_estimate: stat.distinct_estimate,
            null_fraction: stat.null_fraction.clamp(0.0, 1.0),
            total_rows_estimate: stat.total_rows_estimate.max(0.0),
        })
        .collect()
}

pub fn map_schema_columns(raw: Vec<RawSchemaColumn>) -> Vec<TableColumn> {
    raw.into_iter()
        .map(|col| TableColumn {
            table: col.table_name,
            column: col.column_name,
            declared_type: col.declared_type,
        })
        .collect()
}
