//! Sequential migration plan executor

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

use crate::domain::migration::{
    ActionHandler, MigrationConfig, MigrationContext, MigrationError, MigrationExecution,
    MigrationExecutionRepository, MigrationPlan, MigrationStep, StepResult,
};
use crate::domain::validation::Validator;
use crate::domain::error::REJECTED_PLAN_FIELD;
use crate::domain::DomainError;
use crate::infrastructure::observability::record_migration;

use super::registry::HandlerRegistry;

/// Runs plans step by step, persisting the execution record as it goes
pub struct MigrationExecutor {
    registry: Arc<HandlerRegistry>,
    validator: Validator,
    executions: Arc<dyn MigrationExecutionRepository>,
    retry_delay: Duration,
}

impl std::fmt::Debug for MigrationExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationExecutor")
            .field("registry", &self.registry)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

impl MigrationExecutor {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        validator: Validator,
        executions: Arc<dyn MigrationExecutionRepository>,
        config: &MigrationConfig,
    ) -> Self {
        Self {
            registry,
            validator,
            executions,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Execute the plan's migration steps in order.
    ///
    /// The first failing step stops the run; the failed execution is persisted
    /// before the error is returned. An invalid plan is cancelled without
    /// running any step. A record that cannot be saved on these paths is
    /// logged and the original error is still returned.
    #[instrument(skip(self, plan, context), fields(plan_id = %plan.id, workflow_id = %plan.workflow_id))]
    pub async fn execute(
        &self,
        plan: &MigrationPlan,
        context: &MigrationContext,
    ) -> Result<MigrationExecution, DomainError> {
        let started = Instant::now();
        let mut execution = self.executions.create(MigrationExecution::new(plan)).await?;

        if let Err(e) = self.validator.validate_migration_plan(plan) {
            warn!(execution_id = %execution.id(), error = %e, "Migration plan rejected");
            match execution.cancel(e.to_string()) {
                Ok(()) => self.persist_quietly(execution).await,
                Err(transition) => {
                    warn!(error = %transition, "Could not cancel migration execution")
                }
            }
            let field = e.field().unwrap_or_else(|| REJECTED_PLAN_FIELD.to_string());
            return Err(DomainError::rejected_plan(format!("{}: {}", field, e)));
        }

        if let Err(e) = execution.mark_running() {
            return Err(self.fail(execution, plan, started, None, e.to_string()).await);
        }
        let mut execution = self.executions.update(execution).await?;

        for step in &plan.migration_steps {
            let result = self.run_step(step, context).await;
            let failure = result.error.clone();

            if let Err(e) = execution.record_step(result) {
                return Err(self.fail(execution, plan, started, Some(step.order), e.to_string()).await);
            }
            if let Some(error) = failure {
                return Err(self.fail(execution, plan, started, Some(step.order), error).await);
            }
        }

        if let Err(e) = execution.mark_succeeded() {
            return Err(self.fail(execution, plan, started, None, e.to_string()).await);
        }
        let execution = self.executions.update(execution).await?;
        record_migration(plan.direction, execution.status(), started.elapsed());

        info!(
            execution_id = %execution.id(),
            status = %execution.status(),
            steps = execution.step_results().len(),
            duration_ms = execution.duration_ms().unwrap_or_default(),
            "Migration finished"
        );
        Ok(execution)
    }

    /// Mark the execution failed, save it, and build the error to return
    async fn fail(
        &self,
        mut execution: MigrationExecution,
        plan: &MigrationPlan,
        started: Instant,
        step: Option<u32>,
        error: String,
    ) -> DomainError {
        if let Err(e) = execution.mark_failed(error.clone(), step) {
            warn!(execution_id = %execution.id(), error = %e, "Could not mark migration execution failed");
        }
        let execution_id = execution.id().clone();
        record_migration(plan.direction, execution.status(), started.elapsed());
        self.persist_quietly(execution).await;

        warn!(
            execution_id = %execution_id,
            step = ?step,
            error = %error,
            "Migration failed"
        );
        DomainError::migration(execution_id.as_str(), step, error)
    }

    async fn persist_quietly(&self, execution: MigrationExecution) {
        let execution_id = execution.id().clone();
        if let Err(e) = self.executions.update(execution).await {
            warn!(execution_id = %execution_id, error = %e, "Failed to save migration execution");
        }
    }

    async fn run_step(&self, step: &MigrationStep, context: &MigrationContext) -> StepResult {
        let started_at = Utc::now();
        let action = step.action.identifier();
        debug!(order = step.order, action = %action, "Executing migration step");

        let Some(handler) = self.registry.resolve(&step.action) else {
            return StepResult::failure(step, MigrationError::UnknownAction(action).to_string(), 0, started_at);
        };

        let attempts = AtomicU32::new(0);
        let outcome = timeout(
            step.timeout(),
            self.attempt(handler.as_ref(), context, step, &attempts),
        )
        .await;
        let attempts = attempts.load(Ordering::SeqCst);

        match outcome {
            Ok(Ok(output)) => StepResult::success(step, output, attempts, started_at),
            Ok(Err(e)) => StepResult::failure(step, e.to_string(), attempts, started_at),
            Err(_) => {
                let error = MigrationError::Timeout {
                    order: step.order,
                    action,
                    timeout_ms: step.timeout_ms,
                };
                StepResult::failure(step, error.to_string(), attempts, started_at)
            }
        }
    }

    /// Invoke the handler up to `retry_count + 1` times
    async fn attempt(
        &self,
        handler: &dyn ActionHandler,
        context: &MigrationContext,
        step: &MigrationStep,
        attempts: &AtomicU32,
    ) -> Result<Value, MigrationError> {
        let max_attempts = step.retry_count + 1;
        let mut last_error = None;

        for attempt in 0..max_attempts {
            if attempt > 0 && !self.retry_delay.is_zero() {
                sleep(self.retry_delay).await;
            }

            attempts.fetch_add(1, Ordering::SeqCst);
            match handler.execute(context, step).await {
                Ok(output) => return Ok(output),
                Err(e @ MigrationError::UnknownAction(_)) => return Err(e),
                Err(e) => {
                    debug!(order = step.order, attempt = attempt + 1, error = %e, "Migration step attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            MigrationError::step_failed(step.order, step.action.identifier(), "no attempt was made")
        }))
    }
}
