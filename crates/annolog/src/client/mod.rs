//! HTTP client for the remote annotation server
//!
//! Thin reqwest wrapper over the three endpoints the callback needs: list
//! datasets, create a dataset, submit a record. Dataset resolution happens
//! once at callback construction; the resulting [`DatasetHandle`] is reused
//! for every submission. The client performs no retries: a failed submission
//! surfaces once as an error and delivery is at-most-once per run.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::AnnologError;

const API_KEY_HEADER: &str = "X-API-Key";

/// A text field in a dataset schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextField {
    pub name: String,
}

impl TextField {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// An annotation question attached to a dataset on creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Question {
    Rating {
        name: String,
        title: String,
        description: String,
        values: Vec<u8>,
        required: bool,
    },
    Text {
        name: String,
        title: String,
        description: String,
        required: bool,
    },
}

/// Schema a dataset is created with. Once created on the server, the schema
/// is never mutated by this client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSchema {
    pub fields: Vec<TextField>,
    pub questions: Vec<Question>,
    pub guidelines: String,
    pub allow_extra_metadata: bool,
}

impl DatasetSchema {
    /// Default feedback schema: `prompt` and `response` text fields, plus a
    /// `transcript` field when transcript logging is enabled, with a rating
    /// question and a free-text feedback question.
    pub fn feedback_default(log_transcript: bool, guidelines: &str) -> Self {
        let mut fields = vec![TextField::new("prompt"), TextField::new("response")];
        if log_transcript {
            fields.push(TextField::new("transcript"));
        }
        Self {
            fields,
            questions: vec![
                Question::Rating {
                    name: "response-rating".to_string(),
                    title: "How would you rate the quality of the response?".to_string(),
                    description: "Rate the quality of the response on a scale of 1-7."
                        .to_string(),
                    values: vec![1, 2, 3, 4, 5, 6, 7],
                    required: true,
                },
                Question::Text {
                    name: "response-feedback".to_string(),
                    title: "Provide your feedback for the response.".to_string(),
                    description: "Provide feedback for the response.".to_string(),
                    required: false,
                },
            ],
            guidelines: guidelines.to_string(),
            allow_extra_metadata: true,
        }
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}

/// A dataset as the server reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteDataset {
    pub id: String,
    pub name: String,
    pub fields: Vec<TextField>,
}

/// Resolved reference to the remote dataset records are submitted to.
#[derive(Debug, Clone)]
pub struct DatasetHandle {
    pub id: String,
    pub name: String,
}

/// Server-assigned identifier of a submitted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordId(pub String);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The text fields of one feedback record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordFields {
    pub prompt: String,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

/// One tool use, in invocation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUse {
    pub tool: String,
    pub output: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Ordered list of tool invocations made during the run.
    pub tools: Vec<ToolUse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_duration_ms: Option<i64>,
}

/// The unit persisted to the remote dataset: one completed interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub fields: RecordFields,
    pub metadata: RecordMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DatasetListResponse {
    pub items: Vec<RemoteDataset>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CreateDatasetRequest {
    pub name: String,
    #[serde(flatten)]
    pub schema: DatasetSchema,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CreateDatasetResponse {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SubmitRecordResponse {
    pub id: String,
}

/// Client for the annotation server's dataset and record endpoints.
#[derive(Debug)]
pub struct AnnotationClient {
    client: Client,
    api_url: String,
    api_key: String,
    timeout: Duration,
}

impl AnnotationClient {
    pub fn new(api_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn list_datasets(&self) -> Result<Vec<RemoteDataset>, AnnologError> {
        let list_url = format!("{}/api/v1/datasets", self.api_url);
        let response = self
            .client
            .get(&list_url)
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AnnologError::Connection {
                url: list_url,
                message: format!("listing datasets failed with status {}", response.status()),
            });
        }

        let body: DatasetListResponse =
            response
                .json()
                .await
                .map_err(|e| AnnologError::Connection {
                    url: list_url,
                    message: format!("failed to parse dataset list: {}", e),
                })?;
        Ok(body.items)
    }

    /// Looks a dataset up by name. `None` when the server has no dataset
    /// with that name.
    pub async fn get_dataset(&self, name: &str) -> Result<Option<RemoteDataset>, AnnologError> {
        let datasets = self.list_datasets().await?;
        Ok(datasets.into_iter().find(|d| d.name == name))
    }

    pub async fn create_dataset(
        &self,
        name: &str,
        schema: &DatasetSchema,
    ) -> Result<DatasetHandle, AnnologError> {
        let create_url = format!("{}/api/v1/datasets", self.api_url);
        let request = CreateDatasetRequest {
            name: name.to_string(),
            schema: schema.clone(),
        };

        let response = self
            .client
            .post(&create_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AnnologError::Connection {
                url: create_url,
                message: format!(
                    "creating dataset '{}' failed with status {}",
                    name,
                    response.status()
                ),
            });
        }

        let body: CreateDatasetResponse =
            response
                .json()
                .await
                .map_err(|e| AnnologError::Connection {
                    url: create_url,
                    message: format!("failed to parse create-dataset response: {}", e),
                })?;
        Ok(DatasetHandle {
            id: body.id,
            name: body.name,
        })
    }

    /// Resolves the named dataset, creating it with `schema` when absent.
    /// An existing dataset must carry exactly the expected field names;
    /// anything else is a schema conflict and the caller must not submit.
    pub async fn resolve_or_create_dataset(
        &self,
        name: &str,
        schema: &DatasetSchema,
    ) -> Result<DatasetHandle, AnnologError> {
        match self.get_dataset(name).await? {
            Some(existing) => {
                let expected = schema.field_names();
                let found: Vec<String> =
                    existing.fields.iter().map(|f| f.name.clone()).collect();
                if found != expected {
                    return Err(AnnologError::SchemaConflict {
                        dataset: name.to_string(),
                        expected,
                        found,
                    });
                }
                log::info!(
                    "Dataset '{}' retrieved from annotation server with fields {:?}",
                    name,
                    found
                );
                Ok(DatasetHandle {
                    id: existing.id,
                    name: existing.name,
                })
            }
            None => {
                let handle = self.create_dataset(name, schema).await?;
                log::info!(
                    "Dataset '{}' created on annotation server with fields {:?}",
                    name,
                    schema.field_names()
                );
                Ok(handle)
            }
        }
    }

    pub async fn submit_record(
        &self,
        handle: &DatasetHandle,
        record: &FeedbackRecord,
    ) -> Result<RecordId, AnnologError> {
        let records_url = format!("{}/api/v1/datasets/{}/records", self.api_url, handle.id);
        let response = self
            .client
            .post(&records_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(record)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AnnologError::Submission(format!(
                "submitting record to dataset '{}' failed with status {}",
                handle.name,
                response.status()
            )));
        }

        let body: SubmitRecordResponse =
            response
                .json()
                .await
                .map_err(|e| AnnologError::Submission(format!(
                    "failed to parse submit-record response: {}",
                    e
                )))?;
        Ok(RecordId(body.id))
    }
}
