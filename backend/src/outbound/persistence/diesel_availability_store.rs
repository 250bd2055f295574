//! PostgreSQL-backed `AvailabilityStore` implementation using Diesel.
//!
//! Teachers and students have structurally identical availability tables, so
//! the typed DSL paths are stamped per table by a macro and dispatched on
//! [`Role`]. Discovery joins against the bookings table through the resolved
//! session-date expression.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{Bool, Date, Time, Uuid as SqlUuid};
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{
    AvailabilityStore, AvailabilityStoreError, AvailabilityWriteOutcome,
};
use crate::domain::{DayAvailability, Role, SessionWindow, SlotSelector, TimeSlot, slots_spanning};

use super::error_mapping::{map_availability_diesel_error, map_availability_pool_error};
use super::models::{
    AvailablePersonRow, NewStudentAvailabilityRow, NewTeacherAvailabilityRow,
    StudentAvailabilityChangeset, StudentAvailabilityRow, TeacherAvailabilityChangeset,
    TeacherAvailabilityRow,
};
use super::pool::DbPool;
use super::session_date::{SchemaCapabilities, SchemaProbe};

/// Diesel-backed implementation of the availability store port.
#[derive(Clone)]
pub struct DieselAvailabilityStore {
    pool: DbPool,
    probe: Arc<SchemaProbe>,
}

impl DieselAvailabilityStore {
    /// Create a store over the given pool and schema probe.
    pub fn new(pool: DbPool, probe: Arc<SchemaProbe>) -> Self {
        Self { pool, probe }
    }
}

/// Physical names behind a role.
fn role_tables(role: Role) -> (&'static str, &'static str) {
    match role {
        Role::Teacher => ("teacher_availability", "teacher_id"),
        Role::Student => ("student_availability", "student_id"),
    }
}

/// Stamp the typed-DSL list and upsert paths for one availability table.
macro_rules! availability_dsl {
    ($list:ident, $upsert:ident, $table:ident, $row:ident, $new_row:ident, $changeset:ident) => {
        async fn $list(
            conn: &mut AsyncPgConnection,
            person: Uuid,
            from: NaiveDate,
            to: NaiveDate,
        ) -> Result<Vec<DayAvailability>, diesel::result::Error> {
            use super::schema::$table::dsl;

            let rows: Vec<$row> = dsl::$table
                .filter(dsl::person_id.eq(person))
                .filter(dsl::day.between(from, to))
                .order(dsl::day.asc())
                .select($row::as_select())
                .load(conn)
                .await?;

            Ok(rows
                .into_iter()
                .map(|row| DayAvailability {
                    day: row.day,
                    morning: row.morning,
                    afternoon: row.afternoon,
                    evening: row.evening,
                })
                .collect())
        }

        async fn $upsert(
            conn: &mut AsyncPgConnection,
            person: Uuid,
            resolved: DayAvailability,
        ) -> Result<AvailabilityWriteOutcome, diesel::result::Error> {
            use super::schema::$table::dsl;

            // A day with no remaining slot is deleted, not stored zeroed.
            if !resolved.has_any_slot() {
                diesel::delete(
                    dsl::$table
                        .filter(dsl::person_id.eq(person))
                        .filter(dsl::day.eq(resolved.day)),
                )
                .execute(conn)
                .await?;
                return Ok(AvailabilityWriteOutcome::Removed);
            }

            diesel::insert_into(dsl::$table)
                .values(&$new_row {
                    person_id: person,
                    day: resolved.day,
                    morning: resolved.morning,
                    afternoon: resolved.afternoon,
                    evening: resolved.evening,
                })
                .on_conflict((dsl::person_id, dsl::day))
                .do_update()
                .set(&$changeset {
                    morning: resolved.morning,
                    afternoon: resolved.afternoon,
                    evening: resolved.evening,
                })
                .execute(conn)
                .await?;
            Ok(AvailabilityWriteOutcome::Stored)
        }
    };
}

availability_dsl!(
    list_teacher_days,
    upsert_teacher_day,
    teacher_availability,
    TeacherAvailabilityRow,
    NewTeacherAvailabilityRow,
    TeacherAvailabilityChangeset
);
availability_dsl!(
    list_student_days,
    upsert_student_day,
    student_availability,
    StudentAvailabilityRow,
    NewStudentAvailabilityRow,
    StudentAvailabilityChangeset
);

/// SQL switching the selected slots off across a range.
fn clear_slots_sql(table: &str) -> String {
    format!(
        "UPDATE {table} SET \
           morning = morning AND NOT $4, \
           afternoon = afternoon AND NOT $5, \
           evening = evening AND NOT $6 \
         WHERE person_id = $1 AND day BETWEEN $2 AND $3"
    )
}

/// SQL deleting rows left with no true slot.
fn prune_empty_rows_sql(table: &str) -> String {
    format!(
        "DELETE FROM {table} \
         WHERE person_id = $1 AND day BETWEEN $2 AND $3 \
           AND NOT (morning OR afternoon OR evening)"
    )
}

/// SQL selecting persons free for a window on a day.
///
/// A person qualifies when their availability row covers every slot the
/// window spans and no active booking of theirs intersects the window.
fn find_available_sql(capabilities: &SchemaCapabilities, role: Role) -> String {
    let (table, person_column) = role_tables(role);
    let expr = capabilities.session_date_expression(Some("b"));
    format!(
        "SELECT a.person_id FROM {table} a \
         WHERE a.day = $1 \
           AND (NOT $2 OR a.morning) \
           AND (NOT $3 OR a.afternoon) \
           AND (NOT $4 OR a.evening) \
           AND NOT EXISTS (\
             SELECT 1 FROM bookings b \
             WHERE b.{person_column} = a.person_id \
               AND {expr} = $1 \
               AND b.status <> 'cancelled' \
               AND b.start_time < $6 AND b.end_time > $5\
           ) \
         ORDER BY a.person_id ASC"
    )
}

#[async_trait]
impl AvailabilityStore for DieselAvailabilityStore {
    async fn list(
        &self,
        role: Role,
        person_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DayAvailability>, AvailabilityStoreError> {
        let mut conn = self.pool.get().await.map_err(map_availability_pool_error)?;

        let days = match role {
            Role::Teacher => list_teacher_days(&mut conn, person_id, from, to).await,
            Role::Student => list_student_days(&mut conn, person_id, from, to).await,
        };
        days.map_err(map_availability_diesel_error)
    }

    async fn upsert_day(
        &self,
        role: Role,
        person_id: Uuid,
        day: DayAvailability,
    ) -> Result<AvailabilityWriteOutcome, AvailabilityStoreError> {
        let mut conn = self.pool.get().await.map_err(map_availability_pool_error)?;

        let outcome = match role {
            Role::Teacher => upsert_teacher_day(&mut conn, person_id, day).await,
            Role::Student => upsert_student_day(&mut conn, person_id, day).await,
        };
        outcome.map_err(map_availability_diesel_error)
    }

    async fn clear_range(
        &self,
        role: Role,
        person_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        slots: SlotSelector,
    ) -> Result<u64, AvailabilityStoreError> {
        let (table, _) = role_tables(role);
        let mut conn = self.pool.get().await.map_err(map_availability_pool_error)?;

        // Clear and prune inside one transaction so a reader never observes
        // the intermediate zeroed rows.
        let cleared = conn
            .transaction(|conn| {
                async move {
                    let cleared = sql_query(clear_slots_sql(table))
                        .bind::<SqlUuid, _>(person_id)
                        .bind::<Date, _>(from)
                        .bind::<Date, _>(to)
                        .bind::<Bool, _>(slots.morning)
                        .bind::<Bool, _>(slots.afternoon)
                        .bind::<Bool, _>(slots.evening)
                        .execute(conn)
                        .await?;

                    sql_query(prune_empty_rows_sql(table))
                        .bind::<SqlUuid, _>(person_id)
                        .bind::<Date, _>(from)
                        .bind::<Date, _>(to)
                        .execute(conn)
                        .await?;

                    Ok::<_, diesel::result::Error>(cleared)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_availability_diesel_error)?;

        Ok(u64::try_from(cleared).unwrap_or(u64::MAX))
    }

    async fn find_available(
        &self,
        role: Role,
        day: NaiveDate,
        window: SessionWindow,
    ) -> Result<Vec<Uuid>, AvailabilityStoreError> {
        let capabilities = self.probe.capabilities().await.clone();
        let mut conn = self.pool.get().await.map_err(map_availability_pool_error)?;

        let required = slots_spanning(window);
        let rows: Vec<AvailablePersonRow> = sql_query(find_available_sql(&capabilities, role))
            .bind::<Date, _>(day)
            .bind::<Bool, _>(required.contains(&TimeSlot::Morning))
            .bind::<Bool, _>(required.contains(&TimeSlot::Afternoon))
            .bind::<Bool, _>(required.contains(&TimeSlot::Evening))
            .bind::<Time, _>(window.start())
            .bind::<Time, _>(window.end())
            .load(&mut conn)
            .await
            .map_err(map_availability_diesel_error)?;

        Ok(rows.into_iter().map(|row| row.person_id).collect())
    }
}
