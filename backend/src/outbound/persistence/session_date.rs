//! Runtime schema probe for drifted column names.
//!
//! The booking table's date column was renamed twice across migration
//! generations (`arr_date`, `class_date`, `date`), and older deployments may
//! expose any subset of those names. The probe asks the information schema
//! once per process which columns actually exist and builds a single
//! `COALESCE` expression the rest of the engine uses wherever it reads the
//! session date. Participant `status` columns are probed the same way so the
//! eligibility check can be skipped on schemas that never grew one.
//!
//! The probe result is lazily initialized, immutable-after-first-use state
//! owned by [`SchemaProbe`]; if the probe query itself fails, booking
//! operations fall back to the canonical column instead of being blocked by
//! a metadata outage.

use diesel::sql_query;
use diesel::sql_types::{Array, Text};
use diesel_async::RunQueryDsl;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::models::ColumnNameRow;
use super::pool::DbPool;

/// Candidate date column names in coalescing preference order.
pub const SESSION_DATE_CANDIDATES: [&str; 3] = ["arr_date", "class_date", "date"];

/// Canonical date column written by this repository's migrations.
pub const DEFAULT_DATE_COLUMN: &str = "class_date";

/// Fixed literal used when no candidate column exists at all.
const MISSING_DATE_LITERAL: &str = "DATE '1970-01-01'";

/// What the live schema turned out to support.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaCapabilities {
    date_columns: Vec<String>,
    /// Whether `teachers.status` exists and must be checked.
    pub teachers_have_status: bool,
    /// Whether `students.status` exists and must be checked.
    pub students_have_status: bool,
}

impl SchemaCapabilities {
    /// Capabilities for an explicit set of present date columns.
    ///
    /// `present` is filtered against the candidate list and re-ordered into
    /// coalescing preference order, so callers can pass raw probe output.
    pub(crate) fn from_probe(
        present: &[String],
        teachers_have_status: bool,
        students_have_status: bool,
    ) -> Self {
        let date_columns = SESSION_DATE_CANDIDATES
            .iter()
            .filter(|candidate| present.iter().any(|name| name == *candidate))
            .map(|candidate| (*candidate).to_owned())
            .collect();

        Self {
            date_columns,
            teachers_have_status,
            students_have_status,
        }
    }

    /// Capabilities assumed when the probe itself fails.
    ///
    /// Assumes the canonical column and keeps participant checks on; a wrong
    /// guess here fails loudly on first use instead of silently skipping
    /// validation.
    fn fallback() -> Self {
        Self {
            date_columns: vec![DEFAULT_DATE_COLUMN.to_owned()],
            teachers_have_status: true,
            students_have_status: true,
        }
    }

    /// The SQL expression reading the logical session date.
    ///
    /// Emits a plain column reference when exactly one candidate exists, a
    /// `COALESCE` across all present candidates otherwise, and a fixed date
    /// literal when none exist.
    pub fn session_date_expression(&self, table_alias: Option<&str>) -> String {
        let qualify = |column: &str| match table_alias {
            Some(alias) => format!("{alias}.\"{column}\""),
            None => format!("\"{column}\""),
        };

        match self.date_columns.as_slice() {
            [] => MISSING_DATE_LITERAL.to_owned(),
            [only] => qualify(only),
            many => {
                let joined = many
                    .iter()
                    .map(|column| qualify(column))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("COALESCE({joined})")
            }
        }
    }
}

/// Lazily probed, process-cached schema capabilities.
///
/// Safe to cache for the process lifetime because the schema does not change
/// at runtime.
pub struct SchemaProbe {
    pool: DbPool,
    cell: OnceCell<SchemaCapabilities>,
}

impl SchemaProbe {
    /// Create a probe over `pool`; nothing is queried until first use.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            cell: OnceCell::new(),
        }
    }

    /// Resolve the capabilities, probing the information schema on first use.
    pub async fn capabilities(&self) -> &SchemaCapabilities {
        self.cell
            .get_or_init(|| async {
                match probe_schema(&self.pool).await {
                    Ok(capabilities) => {
                        debug!(?capabilities, "schema probe resolved");
                        capabilities
                    }
                    Err(message) => {
                        warn!(
                            error = %message,
                            fallback_column = DEFAULT_DATE_COLUMN,
                            "schema probe failed, using canonical column"
                        );
                        SchemaCapabilities::fallback()
                    }
                }
            })
            .await
    }
}

/// One round-trip per probed table against `information_schema.columns`.
async fn probe_schema(pool: &DbPool) -> Result<SchemaCapabilities, String> {
    let mut conn = pool.get().await.map_err(|err| err.to_string())?;

    let candidates: Vec<String> = SESSION_DATE_CANDIDATES
        .iter()
        .map(|name| (*name).to_owned())
        .collect();
    let date_columns: Vec<ColumnNameRow> = sql_query(
        "SELECT column_name FROM information_schema.columns \
         WHERE table_schema = 'public' AND table_name = $1 AND column_name = ANY($2)",
    )
    .bind::<Text, _>("bookings")
    .bind::<Array<Text>, _>(&candidates)
    .load(&mut conn)
    .await
    .map_err(|err| err.to_string())?;

    let teachers_have_status = column_exists(&mut conn, "teachers", "status").await?;
    let students_have_status = column_exists(&mut conn, "students", "status").await?;

    let present: Vec<String> = date_columns.into_iter().map(|row| row.column_name).collect();
    Ok(SchemaCapabilities::from_probe(
        &present,
        teachers_have_status,
        students_have_status,
    ))
}

async fn column_exists(
    conn: &mut diesel_async::pooled_connection::bb8::PooledConnection<
        '_,
        diesel_async::AsyncPgConnection,
    >,
    table: &str,
    column: &str,
) -> Result<bool, String> {
    let rows: Vec<ColumnNameRow> = sql_query(
        "SELECT column_name FROM information_schema.columns \
         WHERE table_schema = 'public' AND table_name = $1 AND column_name = $2",
    )
    .bind::<Text, _>(table)
    .bind::<Text, _>(column)
    .load(conn)
    .await
    .map_err(|err| err.to_string())?;

    Ok(!rows.is_empty())
}
