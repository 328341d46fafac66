use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::JobId;

/// Notifies a caller-supplied callback target about a job's terminal outcome.
/// Implementations never fail: every problem is folded into the outcome.
#[async_trait]
pub trait CallbackDispatcher: Send + Sync {
    async fn send_completion(
        &self,
        url: &str,
        job_id: &JobId,
        text: &str,
        metadata: Map<String, Value>,
    ) -> DeliveryOutcome;

    async fn send_failure(
        &self,
        url: &str,
        job_id: &JobId,
        error_message: &str,
        metadata: Map<String, Value>,
    ) -> DeliveryOutcome;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered {
        status: u16,
        attempts: u32,
    },
    Failed {
        error: String,
        status: Option<u16>,
        attempts: u32,
    },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryOutcome::Delivered { attempts, .. } | DeliveryOutcome::Failed { attempts, .. } => {
                *attempts
            }
        }
    }
}
