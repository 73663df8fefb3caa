//! In-memory view of in-flight workflow executions

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::workflow::{ExecutionTracker, WorkflowId};
use crate::domain::DomainError;

/// Tracker whose counts are set by the embedding engine (or by tests)
#[derive(Debug, Clone, Default)]
pub struct InMemoryExecutionTracker {
    in_flight: Arc<RwLock<HashMap<WorkflowId, usize>>>,
}

impl InMemoryExecutionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_in_flight(&self, workflow_id: &WorkflowId, count: usize) {
        let mut in_flight = self.in_flight.write().await;
        if count == 0 {
            in_flight.remove(workflow_id);
        } else {
            in_flight.insert(workflow_id.clone(), count);
        }
    }
}

#[async_trait]
impl ExecutionTracker for InMemoryExecutionTracker {
    async fn count_in_flight(&self, workflow_id: &WorkflowId) -> Result<usize, DomainError> {
        let in_flight = self.in_flight.read().await;
        Ok(in_flight.get(workflow_id).copied().unwrap_or(0))
    }
}
