//! Server wiring for the lifecycle job's supervisory loop.
//!
//! The job runs three ways, all driving the same idempotent `run_once`: an
//! immediate run at process start, a daily run at a configured UTC time, and
//! a coarser interval poll that catches up after clock drift or missed daily
//! windows.

mod config;

pub use config::BookingSettings;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::domain::{JobRunFailure, JobRunSummary, LifecycleJob};

/// When the scheduler fires the lifecycle job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSchedule {
    /// Time of day of the daily run (UTC).
    pub daily_at: NaiveTime,
    /// Interval of the supervisory poll.
    pub poll_interval: Duration,
}

/// Drive the lifecycle job until a shutdown signal arrives.
///
/// Runs once immediately, then loops on the poll interval and the daily
/// timer. Individual run failures are logged and do not stop the loop; the
/// job's own retry and notification policy already handled them.
pub async fn run_lifecycle_scheduler(job: Arc<LifecycleJob>, schedule: LifecycleSchedule) {
    run_and_log(&job).await;

    let mut poll = tokio::time::interval(schedule.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // An interval's first tick fires immediately; the startup run covered it.
    poll.tick().await;

    loop {
        let daily = tokio::time::sleep(until_next_daily(Utc::now(), schedule.daily_at));

        tokio::select! {
            _ = poll.tick() => run_and_log(&job).await,
            () = daily => run_and_log(&job).await,
            result = tokio::signal::ctrl_c() => {
                if let Err(error) = result {
                    warn!(error = %error, "shutdown signal handler failed, stopping anyway");
                }
                info!("shutdown signal received, stopping lifecycle scheduler");
                break;
            }
        }
    }
}

/// Time remaining until the next daily occurrence of `at`.
fn until_next_daily(now: DateTime<Utc>, at: NaiveTime) -> Duration {
    let today = now.date_naive();
    let candidate = today.and_time(at).and_utc();
    let next = if candidate > now {
        candidate
    } else {
        match today.succ_opt() {
            Some(tomorrow) => tomorrow.and_time(at).and_utc(),
            None => return Duration::from_secs(86_400),
        }
    };

    (next - now).to_std().unwrap_or(Duration::ZERO)
}

async fn run_and_log(job: &LifecycleJob) {
    match job.run_once().await {
        Ok(JobRunSummary { run_id, updated }) => {
            info!(run_id = %run_id, updated, "scheduled lifecycle run completed");
        }
        Err(JobRunFailure {
            run_id,
            updated,
            error,
        }) => {
            warn!(run_id = %run_id, updated, error = %error, "scheduled lifecycle run failed");
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for schedule arithmetic.

    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).expect("valid test time")
    }

    #[rstest]
    fn a_later_time_today_is_scheduled_today() {
        let now = Utc
            .with_ymd_and_hms(2026, 3, 9, 1, 0, 0)
            .single()
            .expect("valid test instant");

        let wait = until_next_daily(now, time(2, 30));
        assert_eq!(wait, Duration::from_secs(90 * 60));
    }

    #[rstest]
    fn an_elapsed_time_rolls_over_to_tomorrow() {
        let now = Utc
            .with_ymd_and_hms(2026, 3, 9, 3, 0, 0)
            .single()
            .expect("valid test instant");

        let wait = until_next_daily(now, time(2, 30));
        assert_eq!(wait, Duration::from_secs(23 * 3_600 + 30 * 60));
    }

    #[rstest]
    fn the_exact_scheduled_instant_waits_a_full_day() {
        let now = Utc
            .with_ymd_and_hms(2026, 3, 9, 2, 30, 0)
            .single()
            .expect("valid test instant");

        let wait = until_next_daily(now, time(2, 30));
        assert_eq!(wait, Duration::from_secs(24 * 3_600));
    }
}
