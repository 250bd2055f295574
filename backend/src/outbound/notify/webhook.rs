//! Webhook adapter announcing lifecycle run failures.
//!
//! Delivery is best-effort by contract: the job logs a warning when the hook
//! is unreachable and carries on, so a flaky receiver can never make a
//! failed run look worse than it was.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{RunFailureNotifier, RunFailureNotifierError};

/// Upper bound on one delivery attempt.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Body posted to the failure hook.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct FailurePayload<'a> {
    success: bool,
    run_id: Uuid,
    error: &'a str,
}

impl<'a> FailurePayload<'a> {
    fn new(run_id: Uuid, error: &'a str) -> Self {
        Self {
            success: false,
            run_id,
            error,
        }
    }
}

/// HTTP webhook implementation of the run failure notifier port.
#[derive(Debug, Clone)]
pub struct WebhookRunFailureNotifier {
    client: Client,
    endpoint: String,
}

impl WebhookRunFailureNotifier {
    /// Create a notifier posting to `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl RunFailureNotifier for WebhookRunFailureNotifier {
    async fn notify_failure(
        &self,
        run_id: Uuid,
        error: &str,
    ) -> Result<(), RunFailureNotifierError> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(DELIVERY_TIMEOUT)
            .json(&FailurePayload::new(run_id, error))
            .send()
            .await
            .map_err(|err| RunFailureNotifierError::delivery(err.to_string()))?;

        let status = response
            .error_for_status()
            .map_err(|err| RunFailureNotifierError::delivery(err.to_string()))?
            .status();

        debug!(run_id = %run_id, status = %status, "run failure notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for the payload contract.

    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    fn payload_serialises_camel_case_with_success_false() {
        let run_id = Uuid::new_v4();
        let payload = FailurePayload::new(run_id, "run aborted");

        let value = serde_json::to_value(&payload).expect("payload serialises");
        assert_eq!(value.get("success"), Some(&json!(false)));
        assert_eq!(value.get("runId"), Some(&json!(run_id)));
        assert_eq!(value.get("error"), Some(&json!("run aborted")));
    }
}
