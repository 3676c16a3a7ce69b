//! Annotation-platform feedback callback for agent frameworks.
//!
//! This crate connects an agent's run lifecycle to a remote annotation
//! server: attach an [`AnnotationCallback`] to anything implementing
//! [`ObserverHost`] and every completed run is submitted as one feedback
//! record (prompt, response, ordered tool metadata) to a named dataset,
//! creating the dataset with a fixed schema on first use.
//!
//! The crate deliberately stays out of the agent's way: setup errors abort
//! attachment before the agent runs, while submission errors after a run are
//! logged and never reach the agent's caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use annolog::{AnnologConfig, AnnotationCallback};
//!
//! let config = AnnologConfig::new("conversational-ai", "http://localhost:6900", api_key);
//! let callback = AnnotationCallback::attach(&mut agent, config).await?;
//! let answer = agent.run("What is another name for Artemis?").await?;
//! // One record with the query, the answer and the tools used is now on the server.
//! ```

pub mod callback;
pub mod client;
pub mod config;
pub mod core_types;
pub mod errors;
pub mod observer;

pub use callback::AnnotationCallback;
pub use client::{AnnotationClient, DatasetHandle, DatasetSchema, FeedbackRecord, RecordId};
pub use config::AnnologConfig;
pub use core_types::{AgentStep, RunId, ToolInvocation};
pub use errors::AnnologError;
pub use observer::{AgentRunObserver, ObserverHost, ObserverRegistry};

#[cfg(test)]
pub mod test_utils;
