use anyhow::{Context, Result};
use relaudit_core::{ConstraintKind, FkAction, TriggerAction};
use relaudit_introspect::{
    Catalog, ConnectOptions, OrphanProbe, PostgresCatalog, TriggerSpec, connect,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use std::{env, fs};

const SCHEMA: &str = "relaudit_fixture";
const NAMES_SCHEMA: &str = "relaudit_fixture_names";
const READER_ROLE: &str = "relaudit_reader";

const FIXTURE_PATHS: &[&str] = &[
    concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/sql/postgres/001_schema.sql"),
    concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/sql/postgres/002_data.sql"),
    concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/fixtures/sql/postgres/003_shared_constraint_names.sql"
    ),
];

fn database_url() -> Option<String> {
    env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .ok()
}

async fn run_fixture(catalog: &PostgresCatalog, path: &str) -> Result<()> {
    let script = fs::read_to_string(path).with_context(|| format!("reading fixture {path}"))?;

    for statement in script.split(';') {
        let sql = statement.trim();
        if sql.is_empty() {
            continue;
        }

        sqlx::query(sql)
            .execute(catalog.pool())
            .await
            .with_context(|| format!("executing fixture {path}"))?;
    }

    Ok(())
}

async fn fixture_catalog(url: &str) -> Result<PostgresCatalog> {
    let catalog = connect(url, &ConnectOptions::default())
        .await
        .context("connecting to Postgres")?;

    for path in FIXTURE_PATHS {
        run_fixture(&catalog, path).await?;
    }
    Ok(catalog)
}

/// Catalog whose sessions run as a role holding only USAGE and SELECT.
async fn reader_catalog(owner: &PostgresCatalog, url: &str) -> Result<PostgresCatalog> {
    let exists: bool =
        sqlx::query_scalar("select exists (select 1 from pg_roles where rolname = $1)")
            .bind(READER_ROLE)
            .fetch_one(owner.pool())
            .await?;
    if !exists {
        sqlx::query(&format!("create role {READER_ROLE} nologin"))
            .execute(owner.pool())
            .await
            .context("creating read-only role")?;
    }
    for statement in [
        format!("grant usage on schema {SCHEMA} to {READER_ROLE}"),
        format!("grant select on all tables in schema {SCHEMA} to {READER_ROLE}"),
    ] {
        sqlx::query(&statement).execute(owner.pool()).await?;
    }

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute(format!("set role {READER_ROLE}").as_str()).await?;
                Ok(())
            })
        })
        .connect(url)
        .await
        .context("connecting as read-only role")?;
    Ok(PostgresCatalog::new(pool))
}

// Setup drops and recreates the fixture schema, so everything runs in one test.
#[tokio::test]
async fn audits_fixture_schema() -> Result<()> {
    let Some(url) = database_url() else {
        eprintln!("skipping: set TEST_DATABASE_URL or DATABASE_URL for integration tests");
        return Ok(());
    };
    let catalog = fixture_catalog(&url).await?;

    reads_columns_constraints_and_values(&catalog).await?;
    keeps_constraint_names_scoped_to_their_table(&catalog).await?;
    select_only_role_sees_declared_keys(&catalog, &url).await?;
    installs_update_trigger_once(&catalog).await?;
    partition_with_cloned_trigger_is_already_present(&catalog).await?;
    Ok(())
}

async fn reads_columns_constraints_and_values(catalog: &PostgresCatalog) -> Result<()> {
    assert_eq!(
        catalog.list_tables(SCHEMA).await?,
        vec!["customers", "invoices", "orders"]
    );

    let columns = catalog.columns(SCHEMA, "orders").await?;
    let names: Vec<&str> = columns.iter().map(|column| column.name.as_str()).collect();
    assert_eq!(names, vec!["id", "customer_id", "status", "total", "updated_at"]);
    let ordinals: Vec<i32> = columns.iter().map(|column| column.ordinal).collect();
    assert_eq!(ordinals, vec![1, 2, 3, 4, 5]);
    assert_eq!(columns[3].declared_type, "numeric(10,2)");
    assert!(!columns[3].nullable);
    assert!(columns[3].default_expr.is_some());

    assert!(catalog.columns(SCHEMA, "missing").await?.is_empty());

    let constraints = catalog.constraints(SCHEMA, "invoices").await?;
    let fk = constraints
        .iter()
        .find(|constraint| constraint.kind == ConstraintKind::ForeignKey)
        .context("invoices should declare a foreign key")?;
    assert_eq!(fk.columns, vec!["order_id"]);
    assert_eq!(fk.referenced_table.as_deref(), Some("orders"));
    assert_eq!(fk.referenced_columns, Some(vec!["id".to_string()]));
    assert_eq!(fk.on_delete, Some(FkAction::Cascade));

    let indexes = catalog.indexes(SCHEMA, "invoices").await?;
    assert!(indexes.iter().any(|index| index.leads_with("order_id") && index.is_unique));

    let statistics = catalog.column_statistics(SCHEMA, "orders").await?;
    assert!(statistics.iter().any(|stat| stat.column == "customer_id"));

    let values = catalog
        .distinct_values(SCHEMA, "orders", "customer_id", 10)
        .await?
        .context("three values fit under the limit")?;
    assert_eq!(values.into_iter().collect::<Vec<_>>(), vec!["1", "2", "3"]);
    assert!(
        catalog
            .distinct_values(SCHEMA, "orders", "customer_id", 2)
            .await?
            .is_none()
    );

    let orphans = catalog
        .orphaned_values(&OrphanProbe {
            schema: SCHEMA.to_string(),
            table: "orders".to_string(),
            column: "customer_id".to_string(),
            parent_table: "customers".to_string(),
            parent_column: "id".to_string(),
        })
        .await?;
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].offending_value, "3");
    assert_eq!(orphans[0].occurrence_count, 1);

    Ok(())
}

async fn keeps_constraint_names_scoped_to_their_table(catalog: &PostgresCatalog) -> Result<()> {
    for (table, column, parent, on_delete) in [
        ("orders", "customer_id", "customers", FkAction::SetNull),
        ("invoices", "order_id", "orders", FkAction::Cascade),
    ] {
        let constraints = catalog.constraints(NAMES_SCHEMA, table).await?;
        let fk = constraints
            .iter()
            .find(|constraint| constraint.name == "fk_parent")
            .with_context(|| format!("{table} should declare fk_parent"))?;
        assert_eq!(fk.columns, vec![column]);
        assert_eq!(fk.referenced_table.as_deref(), Some(parent));
        assert_eq!(fk.referenced_columns, Some(vec!["id".to_string()]));
        assert_eq!(fk.on_delete, Some(on_delete));
        assert_eq!(constraints.len(), 2);
    }

    let columns = catalog.columns(NAMES_SCHEMA, "orders").await?;
    assert_eq!(columns[1].key_constraints, vec!["fk_parent"]);
    Ok(())
}

async fn select_only_role_sees_declared_keys(owner: &PostgresCatalog, url: &str) -> Result<()> {
    let reader = reader_catalog(owner, url).await?;

    assert_eq!(
        reader.constraints(SCHEMA, "invoices").await?,
        owner.constraints(SCHEMA, "invoices").await?
    );
    let fk = reader
        .constraints(SCHEMA, "invoices")
        .await?
        .into_iter()
        .find(|constraint| constraint.kind == ConstraintKind::ForeignKey)
        .context("read-only role should see the invoices foreign key")?;
    assert_eq!(fk.columns, vec!["order_id"]);

    let columns = reader.columns(SCHEMA, "orders").await?;
    assert_eq!(columns[0].key_constraints, vec!["orders_pkey"]);

    reader.pool().close().await;
    Ok(())
}

async fn installs_update_trigger_once(catalog: &PostgresCatalog) -> Result<()> {
    let spec = TriggerSpec::for_column(SCHEMA, "updated_at");

    catalog.ensure_trigger_function(&spec).await?;
    assert_eq!(
        catalog.install_trigger(&spec, "customers").await?,
        TriggerAction::Installed
    );
    assert_eq!(
        catalog.install_trigger(&spec, "customers").await?,
        TriggerAction::AlreadyPresent
    );

    let triggers = catalog.triggers(SCHEMA, "customers").await?;
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].name, "set_updated_at");

    let stamped: bool = sqlx::query_scalar(
        "update relaudit_fixture.customers set full_name = 'Ada L.' where id = 1 \
         returning updated_at is not null",
    )
    .fetch_one(catalog.pool())
    .await?;
    assert!(stamped);

    Ok(())
}

async fn partition_with_cloned_trigger_is_already_present(catalog: &PostgresCatalog) -> Result<()> {
    let spec = TriggerSpec::for_column(NAMES_SCHEMA, "updated_at");

    catalog.ensure_trigger_function(&spec).await?;
    assert_eq!(
        catalog.install_trigger(&spec, "events").await?,
        TriggerAction::Installed
    );
    assert_eq!(
        catalog.install_trigger(&spec, "events_low").await?,
        TriggerAction::AlreadyPresent
    );

    Ok(())
}
