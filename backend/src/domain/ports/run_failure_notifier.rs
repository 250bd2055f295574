//! Port for announcing total lifecycle job failure to an external hook.

use async_trait::async_trait;
use uuid::Uuid;

use super::define_port_error;

define_port_error! {
    /// Errors raised by run failure notifier adapters.
    pub enum RunFailureNotifierError {
        /// The notification could not be delivered.
        Delivery { message: String } =>
            "run failure notification delivery failed: {message}",
    }
}

/// Port for delivering a best-effort "job run failed" notification.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RunFailureNotifier: Send + Sync {
    /// Announce that run `run_id` failed with `error`.
    async fn notify_failure(
        &self,
        run_id: Uuid,
        error: &str,
    ) -> Result<(), RunFailureNotifierError>;
}

/// Notifier that swallows notifications, for deployments without a hook.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardRunFailureNotifier;

#[async_trait]
impl RunFailureNotifier for DiscardRunFailureNotifier {
    async fn notify_failure(
        &self,
        _run_id: Uuid,
        _error: &str,
    ) -> Result<(), RunFailureNotifierError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn discard_notifier_always_succeeds() {
        let notifier = DiscardRunFailureNotifier;
        notifier
            .notify_failure(Uuid::new_v4(), "run aborted")
            .await
            .expect("discard notifier succeeds");
    }
}
