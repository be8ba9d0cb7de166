//! Hook dispatcher: runs the handler pipeline for one hook point.
//!
//! - Handlers run strictly sequentially in (priority, sequence) order.
//! - Each handler's output becomes the next handler's input.
//! - A handler that calls `ctx.cancel()` is the last one to run; its output
//!   is the pipeline result.
//! - A handler that errors, panics, or exceeds the optional timeout is
//!   logged and treated as an identity transform.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, info, warn};

use super::definitions::{HookContext, HookPoint};
use super::registry::{HookRegistration, HookRegistry};
use crate::error::HookExecutionError;

/// Result of running a pipeline, including recovered failures.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Final pipeline value.
    pub data: serde_json::Value,
    /// Number of handlers that were invoked.
    pub invoked: usize,
    /// Plugin whose handler cancelled the pipeline, if any.
    pub cancelled_by: Option<String>,
    /// Recovered handler failures, in execution order.
    pub failures: Vec<HookExecutionError>,
}

/// Dispatches hooks to all registered handlers.
#[derive(Debug)]
pub struct HookDispatcher {
    /// Hook registry.
    registry: Arc<HookRegistry>,
    /// Optional per-handler timeout.
    timeout: Option<Duration>,
}

impl HookDispatcher {
    /// Creates a new hook dispatcher without a handler timeout.
    pub fn new(registry: Arc<HookRegistry>) -> Self {
        Self {
            registry,
            timeout: None,
        }
    }

    /// Sets a per-handler timeout; an expired handler counts as failed.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs the pipeline for `event` with a fresh context and returns the final value.
    pub async fn execute(
        &self,
        event: impl Into<HookPoint>,
        data: serde_json::Value,
    ) -> serde_json::Value {
        let ctx = HookContext::new(event);
        self.run(&ctx, data).await.data
    }

    /// Runs the pipeline for `ctx.event()` and returns the final value.
    pub async fn execute_with(
        &self,
        ctx: &HookContext,
        data: serde_json::Value,
    ) -> serde_json::Value {
        self.run(ctx, data).await.data
    }

    /// Runs the pipeline and reports what happened along the way.
    pub async fn run(&self, ctx: &HookContext, data: serde_json::Value) -> PipelineOutcome {
        let handlers = self.registry.get_handlers(ctx.event()).await;

        let mut outcome = PipelineOutcome {
            data,
            invoked: 0,
            cancelled_by: None,
            failures: Vec::new(),
        };

        if handlers.is_empty() || ctx.is_cancelled() {
            return outcome;
        }

        debug!(
            hook = %ctx.event(),
            handler_count = handlers.len(),
            "Dispatching hook"
        );

        for registration in &handlers {
            outcome.invoked += 1;

            match self.invoke(registration, ctx, outcome.data.clone()).await {
                Ok(next) => {
                    debug!(
                        hook = %ctx.event(),
                        plugin_id = %registration.owner,
                        priority = registration.priority,
                        "Handler completed"
                    );
                    outcome.data = next;
                }
                Err(failure) => {
                    warn!(
                        hook = %ctx.event(),
                        plugin_id = %registration.owner,
                        error = %failure,
                        "Hook handler failed, continuing with unchanged data"
                    );
                    outcome.failures.push(failure);
                }
            }

            if ctx.is_cancelled() {
                info!(
                    hook = %ctx.event(),
                    plugin_id = %registration.owner,
                    "Handler cancelled the pipeline"
                );
                outcome.cancelled_by = Some(registration.owner.clone());
                break;
            }
        }

        outcome
    }

    async fn invoke(
        &self,
        registration: &HookRegistration,
        ctx: &HookContext,
        data: serde_json::Value,
    ) -> Result<serde_json::Value, HookExecutionError> {
        let event = ctx.event().to_string();
        let call = AssertUnwindSafe(registration.handler.handle(ctx, data)).catch_unwind();

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(r) => r,
                Err(_) => {
                    return Err(HookExecutionError::TimedOut {
                        plugin_id: registration.owner.clone(),
                        event,
                        timeout_ms: limit.as_millis() as u64,
                    });
                }
            },
            None => call.await,
        };

        match result {
            Ok(Ok(next)) => Ok(next),
            Ok(Err(e)) => Err(HookExecutionError::Failed {
                plugin_id: registration.owner.clone(),
                event,
                message: e.to_string(),
            }),
            Err(_) => Err(HookExecutionError::Panicked {
                plugin_id: registration.owner.clone(),
                event,
            }),
        }
    }

    /// Returns a reference to the hook registry.
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }
}
