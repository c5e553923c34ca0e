use std::time::Duration;

/// Options that control the connection pool behind [`crate::PostgresCatalog`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Upper bound on concurrent connections; per-table work never exceeds it.
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Applied to every session as `statement_timeout`.
    pub statement_timeout: Option<Duration>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(10),
            statement_timeout: None,
        }
    }
}
