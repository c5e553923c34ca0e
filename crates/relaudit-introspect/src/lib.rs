//! Catalog access for relaudit.
//!
//! [`Catalog`] is the seam between the audit engine and the database;
//! [`PostgresCatalog`] implements it over `sqlx`.

pub mod adapter;
pub mod options;
pub mod postgres;

pub use adapter::{Catalog, OrphanProbe, TriggerSpec};
pub use options::ConnectOptions;
pub use postgres::{PostgresCatalog, connect};
