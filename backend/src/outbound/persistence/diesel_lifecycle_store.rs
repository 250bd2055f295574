//! PostgreSQL-backed `LifecycleStore` implementation using Diesel.
//!
//! One batch claim is one transaction: a single `UPDATE ... RETURNING` that
//! re-checks the due predicate in its `WHERE` clause (so a concurrent run
//! cannot double-claim rows already tombstoned), followed by the bulk audit
//! insert for exactly the rows the update returned.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::sql_query;
use diesel::sql_types::{Date, Int8, Time};
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, RunQueryDsl};
use uuid::Uuid;

use crate::domain::BookingStatus;
use crate::domain::ports::{CompletedTransition, DueCutoff, LifecycleStore, LifecycleStoreError};

use super::error_mapping::{map_lifecycle_diesel_error, map_lifecycle_pool_error};
use super::models::{NewAutoUpdateRow, TransitionSqlRow};
use super::pool::DbPool;
use super::schema::booking_auto_updates;
use super::session_date::{SchemaCapabilities, SchemaProbe};

/// Audit note attached to every automatic completion.
const AUTO_COMPLETE_NOTE: &str = "status auto-completed after scheduled session end";

/// Diesel-backed implementation of the lifecycle store port.
#[derive(Clone)]
pub struct DieselLifecycleStore {
    pool: DbPool,
    probe: Arc<SchemaProbe>,
}

impl DieselLifecycleStore {
    /// Create a store over the given pool and schema probe.
    pub fn new(pool: DbPool, probe: Arc<SchemaProbe>) -> Self {
        Self { pool, probe }
    }
}

/// The claiming `UPDATE`, built around the resolved date expression.
///
/// The subquery orders by session date so batches drain the oldest backlog
/// first; the outer `WHERE` re-asserts the status and tombstone guards
/// against rows another process claimed between the select and the update.
fn claim_sql(capabilities: &SchemaCapabilities) -> String {
    let expr = capabilities.session_date_expression(None);
    format!(
        "UPDATE bookings \
         SET status = 'completed', last_auto_update = NOW(), updated_at = NOW() \
         FROM (\
           SELECT id, status AS previous_status FROM bookings \
           WHERE status IN ('pending', 'confirmed') \
             AND last_auto_update IS NULL \
             AND ({expr} < $1 OR ({expr} = $1 AND end_time < $2)) \
           ORDER BY {expr} ASC \
           LIMIT $3 \
           FOR UPDATE\
         ) due \
         WHERE bookings.id = due.id \
           AND bookings.status IN ('pending', 'confirmed') \
           AND bookings.last_auto_update IS NULL \
         RETURNING bookings.id AS booking_id, due.previous_status AS previous_status"
    )
}

/// Map the returned rows into domain transitions.
fn rows_to_transitions(
    rows: &[TransitionSqlRow],
) -> Result<Vec<CompletedTransition>, LifecycleStoreError> {
    rows.iter()
        .map(|row| {
            let previous_status = BookingStatus::parse(&row.previous_status).map_err(|err| {
                LifecycleStoreError::query(format!(
                    "transitioned booking {}: {err}",
                    row.booking_id
                ))
            })?;
            Ok(CompletedTransition {
                booking_id: row.booking_id,
                previous_status,
            })
        })
        .collect()
}

#[async_trait]
impl LifecycleStore for DieselLifecycleStore {
    async fn claim_due_batch(
        &self,
        cutoff: DueCutoff,
        run_id: Uuid,
        limit: i64,
    ) -> Result<Vec<CompletedTransition>, LifecycleStoreError> {
        let capabilities = self.probe.capabilities().await.clone();
        let mut conn = self.pool.get().await.map_err(map_lifecycle_pool_error)?;

        let rows = conn
            .transaction(|conn| {
                async move {
                    let rows: Vec<TransitionSqlRow> = sql_query(claim_sql(&capabilities))
                        .bind::<Date, _>(cutoff.today)
                        .bind::<Time, _>(cutoff.now)
                        .bind::<Int8, _>(limit)
                        .load(conn)
                        .await?;

                    if !rows.is_empty() {
                        let audit: Vec<NewAutoUpdateRow<'_>> = rows
                            .iter()
                            .map(|row| NewAutoUpdateRow {
                                id: Uuid::new_v4(),
                                booking_id: row.booking_id,
                                previous_status: &row.previous_status,
                                new_status: BookingStatus::Completed.as_str(),
                                run_id,
                                note: AUTO_COMPLETE_NOTE,
                            })
                            .collect();

                        diesel::insert_into(booking_auto_updates::table)
                            .values(&audit)
                            .execute(conn)
                            .await?;
                    }

                    Ok::<_, diesel::result::Error>(rows)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_lifecycle_diesel_error)?;

        rows_to_transitions(&rows)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for SQL assembly and row mapping.

    use rstest::rstest;

    use super::*;

    fn capabilities(present: &[&str]) -> SchemaCapabilities {
        let present: Vec<String> = present.iter().map(|name| (*name).to_owned()).collect();
        SchemaCapabilities::from_probe(&present, true, true)
    }

    #[rstest]
    fn claim_sql_guards_on_the_tombstone_twice() {
        let sql = claim_sql(&capabilities(&["class_date"]));
        assert_eq!(sql.matches("last_auto_update IS NULL").count(), 2);
        assert_eq!(sql.matches("status IN ('pending', 'confirmed')").count(), 2);
    }

    #[rstest]
    fn claim_sql_orders_batches_by_session_date() {
        let sql = claim_sql(&capabilities(&["arr_date", "class_date"]));
        assert!(sql.contains("ORDER BY COALESCE(\"arr_date\", \"class_date\") ASC"));
        assert!(sql.contains("LIMIT $3"));
    }

    #[rstest]
    fn claim_sql_treats_today_with_elapsed_end_time_as_due() {
        let sql = claim_sql(&capabilities(&["class_date"]));
        assert!(sql.contains("\"class_date\" < $1 OR (\"class_date\" = $1 AND end_time < $2)"));
    }

    #[rstest]
    fn returned_rows_parse_into_transitions() {
        let rows = vec![TransitionSqlRow {
            booking_id: Uuid::new_v4(),
            previous_status: "pending".to_owned(),
        }];

        let transitions = rows_to_transitions(&rows).expect("rows parse");
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].previous_status, BookingStatus::Pending);
    }

    #[rstest]
    fn corrupted_status_strings_surface_as_query_errors() {
        let rows = vec![TransitionSqlRow {
            booking_id: Uuid::new_v4(),
            previous_status: "limbo".to_owned(),
        }];

        let error = rows_to_transitions(&rows).expect_err("unknown status must fail");
        assert!(matches!(error, LifecycleStoreError::Query { .. }));
        assert!(!error.is_transient());
    }
}
