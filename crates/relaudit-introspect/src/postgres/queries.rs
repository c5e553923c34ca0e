use std::collections::BTreeSet;

use sqlx::PgPool;

use relaudit_core::{OrphanedReference, Result, TriggerAction, qualified, quote_ident};

use crate::adapter::{OrphanProbe, TriggerSpec};

fn db_err(err: sqlx::Error) -> relaudit_core::Error {
    relaudit_core::Error::Db(err.to_string())
}

pub async fn list_tables(pool: &PgPool, schema: &str) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
        select c.relname::text
        from pg_class c
        join pg_namespace n on n.oid = c.relnamespace
        where n.nspname = $1
          and c.relkind in ('r', 'p')
        order by c.relname
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await
    .map_err(db_err)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawSchemaColumn {
    pub table_name: String,
    pub column_name: String,
    pub declared_type: String,
}

pub async fn list_schema_columns(pool: &PgPool, schema: &str) -> Result<Vec<RawSchemaColumn>> {
    sqlx::query_as::<_, RawSchemaColumn>(
        r#"
        select
          c.relname::text as table_name,
          a.attname::text as column_name,
          pg_catalog.format_type(a.atttypid, a.atttypmod) as declared_type
        from pg_attribute a
        join pg_class c on c.oid = a.attrelid
        join pg_namespace n on n.oid = c.relnamespace
        where n.nspname = $1
          and c.relkind in ('r', 'p')
          and a.attnum > 0
          and not a.attisdropped
        order by c.relname, a.attnum
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await
    .map_err(db_err)
}

/// One row per (column, key-constraint membership); columns outside any key
/// constraint appear once with `constraint_name = null`.
#[derive(Debug, sqlx::FromRow)]
pub struct RawColumn {
    pub ordinal: i32,
    pub name: String,
    pub declared_type: String,
    pub nullable: bool,
    pub default_expr: Option<String>,
    pub constraint_name: Option<String>,
}

pub async fn list_columns(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<RawColumn>> {
    sqlx::query_as::<_, RawColumn>(
        r#"
        with cols as (
          select
            (row_number() over (order by a.attnum))::int4 as ordinal,
            a.attnum,
            a.attname::text as name,
            pg_catalog.format_type(a.atttypid, a.atttypmod) as declared_type,
            (not a.attnotnull) as nullable,
            pg_get_expr(ad.adbin, ad.adrelid) as default_expr
          from pg_attribute a
          join pg_class c on c.oid = a.attrelid
          join pg_namespace n on n.oid = c.relnamespace
          left join pg_attrdef ad on ad.adrelid = a.attrelid and ad.adnum = a.attnum
          where n.nspname = $1
            and c.relname = $2
            and a.attnum > 0
            and not a.attisdropped
        ),
        keys as (
          select con.conname::text as constraint_name, k.attnum
          from pg_constraint con
          join pg_class c on c.oid = con.conrelid
          join pg_namespace n on n.oid = c.relnamespace
          cross join lateral unnest(con.conkey) as k(attnum)
          where n.nspname = $1
            and c.relname = $2
            and con.contype in ('p', 'u', 'f')
        )
        select
          cols.ordinal,
          cols.name,
          cols.declared_type,
          cols.nullable,
          cols.default_expr,
          keys.constraint_name
        from cols
        left join keys on keys.attnum = cols.attnum
        order by cols.ordinal, keys.constraint_name
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_err)
}

/// One row per constraint member column, in key order. Foreign key rows carry
/// the referenced column at the same key position.
/// Reads `pg_constraint` directly; `information_schema` hides tables the
/// role only holds SELECT on.
#[derive(Debug, sqlx::FromRow)]
pub struct RawConstraintColumn {
    pub constraint_name: String,
    pub constraint_type: String,
    pub column_name: String,
    pub referenced_table: Option<String>,
    pub referenced_column: Option<String>,
    pub delete_action: Option<String>,
}

pub async fn list_constraint_columns(
    pool: &PgPool,
    schema: &str,
    table: &str,
) -> Result<Vec<RawConstraintColumn>> {
    sqlx::query_as::<_, RawConstraintColumn>(
        r#"
        select
          con.conname::text as constraint_name,
          con.contype::text as constraint_type,
          att.attname::text as column_name,
          ref_cls.relname::text as referenced_table,
          ref_att.attname::text as referenced_column,
          case when con.contype = 'f' then con.confdeltype::text end as delete_action
        from pg_constraint con
        join pg_class c on c.oid = con.conrelid
        join pg_namespace n on n.oid = c.relnamespace
        cross join lateral unnest(con.conkey) with ordinality as k(attnum, ord)
        join pg_attribute att on att.attrelid = con.conrelid and att.attnum = k.attnum
        left join pg_class ref_cls on ref_cls.oid = con.confrelid
        left join pg_attribute ref_att
          on ref_att.attrelid = con.confrelid
         and ref_att.attnum = con.confkey[k.ord::int4]
        where n.nspname = $1
          and c.relname = $2
          and con.contype in ('p', 'u', 'f')
        order by con.contype, con.conname, k.ord
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_err)
}

pub async fn list_triggers(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
        select t.tgname::text
        from pg_trigger t
        join pg_class c on c.oid = t.tgrelid
        join pg_namespace n on n.oid = c.relnamespace
        where n.nspname = $1
          and c.relname = $2
          and not t.tgisinternal
        order by t.tgname
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_err)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawIndex {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
}

pub async fn list_indexes(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<RawIndex>> {
    sqlx::query_as::<_, RawIndex>(
        r#"
        select
          idx.relname::text as name,
          array(
            select att.attname::text
            from unnest(i.indkey::int2[]) with ordinality as k(attnum, ord)
            join pg_attribute att on att.attrelid = i.indrelid and att.attnum = k.attnum
            order by k.ord
          ) as columns,
          i.indisunique as is_unique,
          i.indisprimary as is_primary
        from pg_index i
        join pg_class tbl on tbl.oid = i.indrelid
        join pg_namespace nsp on nsp.oid = tbl.relnamespace
        join pg_class idx on idx.oid = i.indexrelid
        where nsp.nspname = $1
          and tbl.relname = $2
        order by idx.relname
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_err)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawColumnStatistic {
    pub column_name: String,
    pub distinct_estimate: Option<f64>,
    pub null_fraction: f64,
    pub total_rows_estimate: f64,
}

/// Planner statistics; `reltuples` is `-1` on never-analyzed tables (PG 14+)
/// and is floored at zero here.
pub async fn list_column_statistics(
    pool: &PgPool,
    schema: &str,
    table: &str,
) -> Result<Vec<RawColumnStatistic>> {
    sqlx::query_as::<_, RawColumnStatistic>(
        r#"
        select
          a.attname::text as column_name,
          s.n_distinct::float8 as distinct_estimate,
          coalesce(s.null_frac, 0)::float8 as null_fraction,
          greatest(c.reltuples, 0)::float8 as total_rows_estimate
        from pg_attribute a
        join pg_class c on c.oid = a.attrelid
        join pg_namespace n on n.oid = c.relnamespace
        left join pg_stats s
          on s.schemaname = n.nspname
         and s.tablename = c.relname
         and s.attname = a.attname
         and s.inherited = (c.relkind = 'p')
        where n.nspname = $1
          and c.relname = $2
          and a.attnum > 0
          and not a.attisdropped
        order by a.attnum
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_err)
}

pub async fn fetch_distinct_values(
    pool: &PgPool,
    schema: &str,
    table: &str,
    column: &str,
    limit: usize,
) -> Result<Option<BTreeSet<String>>> {
    let column = quote_ident(column);
    let sql = format!(
        "select distinct {column}::text from {} where {column} is not null limit $1",
        qualified(schema, table)
    );
    let fetch_limit = i64::try_from(limit).unwrap_or(i64::MAX).saturating_add(1);

    let values = sqlx::query_scalar::<_, String>(&sql)
        .bind(fetch_limit)
        .fetch_all(pool)
        .await
        .map_err(db_err)?;

    if values.len() > limit {
        return Ok(None);
    }
    Ok(Some(values.into_iter().collect()))
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawOrphan {
    pub offending_value: String,
    pub occurrence_count: i64,
}

pub async fn fetch_orphaned_values(
    pool: &PgPool,
    probe: &OrphanProbe,
) -> Result<Vec<OrphanedReference>> {
    let column = quote_ident(&probe.column);
    let sql = format!(
        r#"
        select c.{column}::text as offending_value, count(*)::int8 as occurrence_count
        from {child} c
        where c.{column} is not null
          and not exists (
            select 1 from {parent} p where p.{parent_column} = c.{column}
          )
        group by c.{column}
        order by count(*) desc, 1
        "#,
        child = qualified(&probe.schema, &probe.table),
        parent = qualified(&probe.schema, &probe.parent_table),
        parent_column = quote_ident(&probe.parent_column),
    );

    let rows = sqlx::query_as::<_, RawOrphan>(&sql)
        .fetch_all(pool)
        .await
        .map_err(db_err)?;

    Ok(rows
        .into_iter()
        .map(|row| OrphanedReference {
            table: probe.table.clone(),
            column: probe.column.clone(),
            offending_value: row.offending_value,
            occurrence_count: row.occurrence_count,
        })
        .collect())
}

pub async fn create_trigger_function(pool: &PgPool, spec: &TriggerSpec) -> Result<()> {
    let sql = format!(
        r#"
        create or replace function {}.{}() returns trigger
        language plpgsql as $relaudit$
        begin
          new.{} := now();
          return new;
        end;
        $relaudit$
        "#,
        quote_ident(&spec.schema),
        quote_ident(&spec.function_name),
        quote_ident(&spec.column),
    );

    sqlx::query(&sql).execute(pool).await.map_err(db_err)?;
    Ok(())
}

/// Check-then-install inside one transaction, serialized per table by a
/// transaction-scoped advisory lock so concurrent runs cannot both create.
pub async fn install_trigger(
    pool: &PgPool,
    spec: &TriggerSpec,
    table: &str,
) -> Result<TriggerAction> {
    let mut tx = pool.begin().await.map_err(db_err)?;

    sqlx::query("select pg_advisory_xact_lock(hashtext($1))")
        .bind(format!("relaudit:{}.{}", spec.schema, table))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

    // Names are unique per table including internal (cloned partition) triggers.
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        select exists (
          select 1
          from pg_trigger t
          join pg_class c on c.oid = t.tgrelid
          join pg_namespace n on n.oid = c.relnamespace
          where n.nspname = $1
            and c.relname = $2
            and t.tgname = $3
        )
        "#,
    )
    .bind(&spec.schema)
    .bind(table)
    .bind(&spec.trigger_name)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_err)?;

    if exists {
        tx.commit().await.map_err(db_err)?;
        return Ok(TriggerAction::AlreadyPresent);
    }

    let sql = format!(
        "create trigger {} before update on {} for each row execute function {}.{}()",
        quote_ident(&spec.trigger_name),
        qualified(&spec.schema, table),
        quote_ident(&spec.schema),
        quote_ident(&spec.function_name),
    );
    sqlx::query(&sql).execute(&mut *tx).await.map_err(db_err)?;
    tx.commit().await.map_err(db_err)?;

    Ok(TriggerAction::Installed)
}
