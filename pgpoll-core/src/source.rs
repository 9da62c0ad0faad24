//! Statistics sources.
//!
//! [`StatSource`] is the seam between the poll loop and the database so the
//! loop can be driven by a scripted source in tests. [`PgStatSource`] is the
//! real implementation over a single exclusive `PgConnection`.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Row};
use tracing::{debug, info};

use crate::config::QueryShape;
use crate::error::{PollError, Result};

/// Backend count of one database. `numbackends` is `integer`, widened so
/// both shapes decode into `i64`.
const BACKENDS_SQL: &str =
    "SELECT numbackends::int8 AS numbackends FROM pg_stat_database WHERE datname = $1";

const ACTIVITY_SQL: &str = "SELECT s.numbackends, a.activity_count
FROM (
    SELECT numbackends::int8 AS numbackends FROM pg_stat_database WHERE datname = $1
) s
CROSS JOIN (
    SELECT COUNT(*) AS activity_count FROM pg_stat_activity
) a";

impl QueryShape {
    /// Statement for this shape; the database name is always bound as `$1`.
    pub fn sql(self) -> &'static str {
        match self {
            QueryShape::Backends => BACKENDS_SQL,
            QueryShape::Activity => ACTIVITY_SQL,
        }
    }
}

/// One tick's worth of statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSample {
    pub num_backends: i64,
    /// Present only for [`QueryShape::Activity`].
    pub activity_count: Option<i64>,
}

impl PollSample {
    /// Emit the poll record. Field names are part of the log contract.
    pub fn log(&self) {
        match self.activity_count {
            Some(activity_count) => {
                info!(numBackends = self.num_backends, activityCount = activity_count)
            }
            None => info!(numBackends = self.num_backends),
        }
    }
}

#[async_trait]
pub trait StatSource: Send {
    /// Run the statistics query once for `database_name`.
    async fn fetch(&mut self, database_name: &str) -> Result<PollSample>;

    /// Release the underlying connection.
    async fn close(self) -> Result<()>;
}

/// Statistics read from `pg_stat_database` / `pg_stat_activity`.
pub struct PgStatSource {
    conn: PgConnection,
    shape: QueryShape,
}

impl PgStatSource {
    /// Open the connection.
    ///
    /// An empty `database_url` falls back to the libpq `PG*` environment
    /// variables (`PGHOST`, `PGUSER`, ...).
    pub async fn connect(database_url: &str, shape: QueryShape) -> Result<Self> {
        let options = if database_url.is_empty() {
            PgConnectOptions::new()
        } else {
            database_url
                .parse::<PgConnectOptions>()
                .map_err(PollError::Connect)?
        };

        let conn = PgConnection::connect_with(&options)
            .await
            .map_err(PollError::Connect)?;
        debug!(shape = ?shape, "database connection established");

        Ok(Self { conn, shape })
    }
}

#[async_trait]
impl StatSource for PgStatSource {
    async fn fetch(&mut self, database_name: &str) -> Result<PollSample> {
        let row = sqlx::query(self.shape.sql())
            .bind(database_name)
            .fetch_optional(&mut self.conn)
            .await
            .map_err(PollError::Query)?
            .ok_or_else(|| PollError::no_row(database_name))?;

        let num_backends: i64 = row
            .try_get(0)
            .map_err(|err| PollError::scan("numbackends", err))?;

        let activity_count = match self.shape {
            QueryShape::Backends => None,
            QueryShape::Activity => Some(
                row.try_get::<i64, _>(1)
                    .map_err(|err| PollError::scan("activity_count", err))?,
            ),
        };

        Ok(PollSample {
            num_backends,
            activity_count,
        })
    }

    async fn close(self) -> Result<()> {
        self.conn.close().await.map_err(PollError::Close)?;
        debug!("database connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{capture::CaptureWriter, dispatch};
    use crate::LogFormat;
    use tracing_subscriber::EnvFilter;

    #[test]
    fn database_name_is_a_bound_parameter() {
        for shape in [QueryShape::Backends, QueryShape::Activity] {
            let sql = shape.sql();
            assert!(sql.contains("datname = $1"));
            assert!(sql.contains("numbackends::int8"));
        }
        assert!(QueryShape::Activity.sql().contains("pg_stat_activity"));
        assert!(!QueryShape::Backends.sql().contains("pg_stat_activity"));
    }

    #[test]
    fn sample_log_field_names() {
        let writer = CaptureWriter::default();
        let dispatch = dispatch(LogFormat::Ltsv, EnvFilter::new("info"), writer.clone());
        tracing::dispatcher::with_default(&dispatch, || {
            PollSample {
                num_backends: 5,
                activity_count: Some(9),
            }
            .log();
            PollSample {
                num_backends: 4,
                activity_count: None,
            }
            .log();
        });

        let lines = writer.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("\tlevel:Info\tnumBackends:5\tactivityCount:9"));
        assert!(lines[1].ends_with("\tlevel:Info\tnumBackends:4"));
    }

    // Integration tests require a real database
    // Run with: DATABASE_URL=postgres://... cargo test -p pgpoll-core -- --ignored

    async fn current_database(url: &str) -> String {
        let mut conn = PgConnection::connect(url).await.expect("connect failed");
        let (name,): (String,) = sqlx::query_as("SELECT current_database()")
            .fetch_one(&mut conn)
            .await
            .expect("query failed");
        conn.close().await.expect("close failed");
        name
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn fetches_both_columns() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let name = current_database(&url).await;

        let mut source = PgStatSource::connect(&url, QueryShape::Activity)
            .await
            .expect("connect failed");
        let sample = source.fetch(&name).await.expect("fetch failed");
        source.close().await.expect("close failed");

        assert!(sample.num_backends >= 1);
        assert!(sample.activity_count.expect("activity column") >= 1);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn backends_shape_has_no_activity() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let name = current_database(&url).await;

        let mut source = PgStatSource::connect(&url, QueryShape::Backends)
            .await
            .expect("connect failed");
        let sample = source.fetch(&name).await.expect("fetch failed");
        source.close().await.expect("close failed");

        assert!(sample.num_backends >= 1);
        assert_eq!(sample.activity_count, None);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn unknown_database_has_no_row() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let mut source = PgStatSource::connect(&url, QueryShape::Activity)
            .await
            .expect("connect failed");

        let err = source
            .fetch("pgpoll-no-such-database")
            .await
            .expect_err("fetch should fail");
        assert!(matches!(err, PollError::NoRow { .. }));
        source.close().await.expect("close failed");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connect_error() {
        let result =
            PgStatSource::connect("postgres://pgpoll@127.0.0.1:1/app", QueryShape::Backends)
                .await;
        assert!(matches!(result, Err(PollError::Connect(_))));
    }
}
