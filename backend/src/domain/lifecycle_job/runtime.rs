//! Port and runtime dependency bundles for the lifecycle job.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::ports::{LifecycleStore, RunFailureNotifier};

use super::LifecycleSleeper;

/// Port bundle required by the lifecycle job.
pub struct LifecycleJobPorts {
    /// Batch transition persistence adapter.
    pub store: Arc<dyn LifecycleStore>,
    /// Total-failure notification adapter.
    pub notifier: Arc<dyn RunFailureNotifier>,
}

impl LifecycleJobPorts {
    /// Build a strongly-typed job port bundle.
    pub fn new(store: Arc<dyn LifecycleStore>, notifier: Arc<dyn RunFailureNotifier>) -> Self {
        Self { store, notifier }
    }
}

/// Runtime helpers used by the retry policy.
pub struct LifecycleJobRuntime {
    /// Async sleep implementation.
    pub sleeper: Arc<dyn LifecycleSleeper>,
}

impl Default for LifecycleJobRuntime {
    fn default() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
        }
    }
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl LifecycleSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
