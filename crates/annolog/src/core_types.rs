//! Event payload types shared between the observer surface and the callback
//!
//! These types form the contract between an agent framework and any observer
//! attached to it. They deliberately carry plain text rather than
//! framework-specific structures so the callback works against any agent
//! implementation that exposes the run/step/tool event surface.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for one agent run. Observers key all per-run state by it so
/// concurrent runs through a shared observer never mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        RunId(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One tool call made during a run: name, textual input, textual output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub tool_input: String,
    pub tool_output: String,
}

/// One completed reasoning step. The transcript fragment is diagnostic
/// detail; observers may ignore it entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStep {
    pub step_number: usize,
    pub transcript: Option<String>,
}
