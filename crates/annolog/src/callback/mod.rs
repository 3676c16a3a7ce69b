//! Event-logging callback that submits agent runs to an annotation dataset
//!
//! The callback observes an agent's lifecycle events, accumulates everything
//! needed to describe one complete interaction, and submits a single
//! [`FeedbackRecord`] when the run ends. The remote dataset is resolved (or
//! created) exactly once at construction; nothing is registered on the agent
//! until that network step has succeeded, so the agent never runs with a
//! half-configured logger.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::client::{
    AnnotationClient, DatasetHandle, DatasetSchema, FeedbackRecord, RecordFields, RecordMetadata,
    ToolUse,
};
use crate::config::AnnologConfig;
use crate::core_types::{AgentStep, RunId, ToolInvocation};
use crate::errors::AnnologError;
use crate::observer::{AgentRunObserver, ObserverHost};

/// Per-run state collected between run-start and run-end.
#[derive(Debug)]
struct RunAccumulator {
    query: String,
    started_at: DateTime<Utc>,
    invocations: Vec<ToolInvocation>,
    transcript: Vec<String>,
}

impl RunAccumulator {
    fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            started_at: Utc::now(),
            invocations: Vec::new(),
            transcript: Vec::new(),
        }
    }
}

/// Observer that logs completed agent runs to a remote annotation dataset.
///
/// Accumulators are keyed by [`RunId`], so a shared callback instance keeps
/// concurrent runs separate. The map lock is never held across a network
/// await.
#[derive(Debug)]
pub struct AnnotationCallback {
    observer_id: String,
    client: AnnotationClient,
    dataset: DatasetHandle,
    config: AnnologConfig,
    runs: Mutex<HashMap<RunId, RunAccumulator>>,
}

impl AnnotationCallback {
    /// Resolves the remote dataset and builds the callback. Fails with
    /// `Configuration` before any network call when the config is invalid,
    /// `Connection` when the server is unreachable, and `SchemaConflict`
    /// when a dataset of the same name exists with different fields.
    pub async fn new(config: AnnologConfig) -> Result<Self, AnnologError> {
        config.validate()?;

        let client = AnnotationClient::new(&config.api_url, &config.api_key)
            .with_timeout(Duration::from_secs(config.timeout_secs));
        let schema = DatasetSchema::feedback_default(config.log_transcript, &config.guidelines);
        let dataset = client
            .resolve_or_create_dataset(&config.dataset_name, &schema)
            .await?;

        // Identity is derived from the submission target, not the instance:
        // two callbacks pointed at the same dataset still count as one
        // registration, keeping submission at most-once per run-end.
        let observer_id = format!("annolog:{}/{}", client.api_url(), dataset.name);

        Ok(Self {
            observer_id,
            client,
            dataset,
            config,
            runs: Mutex::new(HashMap::new()),
        })
    }

    /// Builds the callback and registers it on `host`. Setup errors abort
    /// before registration; registering the returned callback again is a
    /// no-op thanks to observer-id deduplication.
    pub async fn attach(
        host: &mut dyn ObserverHost,
        config: AnnologConfig,
    ) -> Result<Arc<Self>, AnnologError> {
        let callback = Arc::new(Self::new(config).await?);
        host.register_observer(callback.clone());
        Ok(callback)
    }

    pub fn dataset(&self) -> &DatasetHandle {
        &self.dataset
    }

    fn build_record(&self, accumulator: RunAccumulator, final_answer: &str) -> FeedbackRecord {
        let transcript = if self.config.log_transcript && !accumulator.transcript.is_empty() {
            Some(accumulator.transcript.join("\n"))
        } else {
            None
        };
        let agent_duration_ms = (Utc::now() - accumulator.started_at).num_milliseconds();

        FeedbackRecord {
            fields: RecordFields {
                prompt: accumulator.query,
                response: final_answer.to_string(),
                transcript,
            },
            metadata: RecordMetadata {
                tools: accumulator
                    .invocations
                    .into_iter()
                    .map(|invocation| ToolUse {
                        tool: invocation.tool_name,
                        output: invocation.tool_output,
                    })
                    .collect(),
                agent_duration_ms: Some(agent_duration_ms),
            },
        }
    }
}

#[async_trait]
impl AgentRunObserver for AnnotationCallback {
    fn observer_id(&self) -> &str {
        &self.observer_id
    }

    async fn on_run_start(&self, run_id: RunId, query: &str) {
        let mut runs = self.runs.lock().await;
        if runs.insert(run_id, RunAccumulator::new(query)).is_some() {
            // A stale accumulator means the previous run with this id never
            // reached run-end; it is discarded without a submission.
            log::warn!("Run {}: replacing unfinished accumulator", run_id);
        }
    }

    async fn on_tool_invoked(&self, run_id: RunId, invocation: &ToolInvocation) {
        let mut runs = self.runs.lock().await;
        match runs.get_mut(&run_id) {
            Some(accumulator) => accumulator.invocations.push(invocation.clone()),
            None => log::warn!(
                "Run {}: tool '{}' invoked before run start, ignoring",
                run_id,
                invocation.tool_name
            ),
        }
    }

    async fn on_step_complete(&self, run_id: RunId, step: &AgentStep) {
        if !self.config.log_transcript {
            return;
        }
        let Some(fragment) = &step.transcript else {
            return;
        };
        let mut runs = self.runs.lock().await;
        if let Some(accumulator) = runs.get_mut(&run_id) {
            accumulator.transcript.push(fragment.clone());
        }
    }

    async fn on_run_end(&self, run_id: RunId, final_answer: &str) -> Result<(), AnnologError> {
        let accumulator = {
            let mut runs = self.runs.lock().await;
            runs.remove(&run_id)
        };
        let Some(accumulator) = accumulator else {
            log::warn!("Run {}: run end without a matching run start, ignoring", run_id);
            return Ok(());
        };

        let record = self.build_record(accumulator, final_answer);
        let record_id = self.client.submit_record(&self.dataset, &record).await?;
        log::info!(
            "Run {}: record {} submitted to dataset '{}'",
            run_id,
            record_id,
            self.dataset.name
        );
        Ok(())
    }
}
