//! Observer surface for agent run lifecycle events
//!
//! This module defines the capability interface an agent framework must
//! expose for observers to attach: run-start, tool-invoked, step-complete
//! and run-end subscription points. The design replaces duck-typed handler
//! registration with an explicit trait, so the callback works against any
//! agent whose run loop dispatches through an [`ObserverRegistry`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::core_types::{AgentStep, RunId, ToolInvocation};
use crate::errors::AnnologError;

/// An observer of agent run lifecycle events.
///
/// Methods take `&self`; implementations keep per-run state behind interior
/// mutability, keyed by [`RunId`]. Events for one run arrive in order on the
/// agent's own task: run-start, then any number of tool-invoked and
/// step-complete events, then run-end. A run that fails inside the agent
/// never produces a run-end event.
#[async_trait]
pub trait AgentRunObserver: Send + Sync {
    /// Stable identity used to deduplicate registrations.
    fn observer_id(&self) -> &str;

    async fn on_run_start(&self, run_id: RunId, query: &str);

    async fn on_tool_invoked(&self, run_id: RunId, invocation: &ToolInvocation);

    async fn on_step_complete(&self, _run_id: RunId, _step: &AgentStep) {}

    async fn on_tool_error(&self, _run_id: RunId, _tool_name: &str, _message: &str) {}

    /// Called once when the run produced its final answer. Errors returned
    /// here are reported by the dispatching registry but never reach the
    /// agent's own control flow.
    async fn on_run_end(&self, run_id: RunId, final_answer: &str) -> Result<(), AnnologError>;
}

/// Anything that accepts observer registrations: an agent, an agent wrapper,
/// or a bare [`ObserverRegistry`] in tests.
pub trait ObserverHost {
    fn register_observer(&mut self, observer: Arc<dyn AgentRunObserver>);
}

/// Order-preserving set of observers, deduplicated by observer id.
///
/// Agent run loops hold one of these and call the `notify_*` methods at the
/// matching points of their step loop. Registering the same observer twice
/// is a no-op, which keeps record submission at most-once per run-end even
/// when attachment code runs more than once.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<Arc<dyn AgentRunObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Arc<dyn AgentRunObserver>) {
        if self
            .observers
            .iter()
            .any(|o| o.observer_id() == observer.observer_id())
        {
            log::debug!(
                "Observer '{}' is already registered, skipping",
                observer.observer_id()
            );
            return;
        }
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub async fn notify_run_start(&self, run_id: RunId, query: &str) {
        for observer in &self.observers {
            observer.on_run_start(run_id, query).await;
        }
    }

    pub async fn notify_tool_invoked(&self, run_id: RunId, invocation: &ToolInvocation) {
        for observer in &self.observers {
            observer.on_tool_invoked(run_id, invocation).await;
        }
    }

    pub async fn notify_step_complete(&self, run_id: RunId, step: &AgentStep) {
        for observer in &self.observers {
            observer.on_step_complete(run_id, step).await;
        }
    }

    pub async fn notify_tool_error(&self, run_id: RunId, tool_name: &str, message: &str) {
        for observer in &self.observers {
            observer.on_tool_error(run_id, tool_name, message).await;
        }
    }

    /// Forwards run-end to every observer. Failures are logged per observer
    /// and swallowed: the agent's result has already been produced and must
    /// still reach its caller.
    pub async fn notify_run_end(&self, run_id: RunId, final_answer: &str) {
        for observer in &self.observers {
            if let Err(e) = observer.on_run_end(run_id, final_answer).await {
                log::error!(
                    "Run {}: observer '{}' failed to record run end: {}",
                    run_id,
                    observer.observer_id(),
                    e
                );
            }
        }
    }
}

impl ObserverHost for ObserverRegistry {
    fn register_observer(&mut self, observer: Arc<dyn AgentRunObserver>) {
        self.register(observer);
    }
}
