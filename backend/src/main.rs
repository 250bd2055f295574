//! Lifecycle runner entry-point: wires the pool, adapters, and scheduler.

use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr as _};
use mockable::DefaultClock;
use ortho_config::OrthoConfig as _;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use backend::domain::ports::{DiscardRunFailureNotifier, RunFailureNotifier};
use backend::domain::{LifecycleJob, LifecycleJobPorts};
use backend::outbound::notify::WebhookRunFailureNotifier;
use backend::outbound::persistence::{DbPool, DieselLifecycleStore, SchemaProbe};
use backend::server::{BookingSettings, LifecycleSchedule, run_lifecycle_scheduler};

/// Application bootstrap.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = BookingSettings::load_from_iter(std::env::args_os())
        .wrap_err("failed to load configuration")?;

    let pool = DbPool::connect(settings.pool_settings())
        .await
        .wrap_err("failed to build database pool")?;
    let probe = Arc::new(SchemaProbe::new(pool.clone()));

    let notifier: Arc<dyn RunFailureNotifier> = match settings.failure_webhook_url.as_deref() {
        Some(endpoint) => Arc::new(WebhookRunFailureNotifier::new(endpoint)),
        None => Arc::new(DiscardRunFailureNotifier),
    };

    let job = Arc::new(LifecycleJob::new(
        LifecycleJobPorts::new(
            Arc::new(DieselLifecycleStore::new(pool, probe)),
            notifier,
        ),
        Arc::new(DefaultClock),
        settings.job_config(),
    ));

    let schedule = LifecycleSchedule {
        daily_at: settings
            .daily_run_at()
            .wrap_err("failed to parse daily run time")?,
        poll_interval: settings.poll_interval(),
    };

    info!(
        daily_at = %schedule.daily_at,
        poll_interval_secs = schedule.poll_interval.as_secs(),
        "lifecycle runner starting"
    );
    run_lifecycle_scheduler(job, schedule).await;
    Ok(())
}
