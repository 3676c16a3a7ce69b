//! In-process annotation server for tests
//!
//! Binds an axum router to an ephemeral port and implements the three
//! endpoints the client uses. Stored datasets and records are shared out as
//! `Arc<Mutex<..>>` so tests can seed state and assert on what was
//! submitted. Submissions can be forced to fail to exercise the
//! at-most-once error path.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::client::{
    CreateDatasetRequest, CreateDatasetResponse, DatasetListResponse, FeedbackRecord,
    RemoteDataset, SubmitRecordResponse, TextField,
};

#[derive(Clone)]
struct MockServerState {
    datasets: Arc<Mutex<Vec<RemoteDataset>>>,
    records: Arc<Mutex<Vec<(String, FeedbackRecord)>>>,
    fail_submissions: Arc<AtomicBool>,
}

async fn list_datasets_handler(
    State(state): State<MockServerState>,
) -> Json<DatasetListResponse> {
    let items = state.datasets.lock().unwrap().clone();
    Json(DatasetListResponse { items })
}

async fn create_dataset_handler(
    State(state): State<MockServerState>,
    Json(request): Json<CreateDatasetRequest>,
) -> Result<Json<CreateDatasetResponse>, StatusCode> {
    let mut datasets = state.datasets.lock().unwrap();
    if datasets.iter().any(|d| d.name == request.name) {
        return Err(StatusCode::CONFLICT);
    }
    let dataset = RemoteDataset {
        id: Uuid::new_v4().to_string(),
        name: request.name.clone(),
        fields: request.schema.fields.clone(),
    };
    datasets.push(dataset.clone());
    Ok(Json(CreateDatasetResponse {
        id: dataset.id,
        name: dataset.name,
    }))
}

async fn submit_record_handler(
    State(state): State<MockServerState>,
    Path(dataset_id): Path<String>,
    Json(record): Json<FeedbackRecord>,
) -> Result<Json<SubmitRecordResponse>, StatusCode> {
    if state.fail_submissions.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    if !state
        .datasets
        .lock()
        .unwrap()
        .iter()
        .any(|d| d.id == dataset_id)
    {
        return Err(StatusCode::NOT_FOUND);
    }
    state
        .records
        .lock()
        .unwrap()
        .push((dataset_id, record));
    Ok(Json(SubmitRecordResponse {
        id: Uuid::new_v4().to_string(),
    }))
}

pub struct MockAnnotationServer {
    addr: SocketAddr,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    pub datasets: Arc<Mutex<Vec<RemoteDataset>>>,
    pub records: Arc<Mutex<Vec<(String, FeedbackRecord)>>>,
    fail_submissions: Arc<AtomicBool>,
}

impl MockAnnotationServer {
    pub async fn start() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let state = MockServerState {
            datasets: Arc::new(Mutex::new(Vec::new())),
            records: Arc::new(Mutex::new(Vec::new())),
            fail_submissions: Arc::new(AtomicBool::new(false)),
        };
        let datasets = state.datasets.clone();
        let records = state.records.clone();
        let fail_submissions = state.fail_submissions.clone();

        let app = Router::new()
            .route(
                "/api/v1/datasets",
                get(list_datasets_handler).post(create_dataset_handler),
            )
            .route(
                "/api/v1/datasets/{dataset_id}/records",
                post(submit_record_handler),
            )
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap_or_else(|e| {
            panic!("Failed to bind mock annotation server to 127.0.0.1:0: {}", e);
        });
        let addr = listener.local_addr().unwrap();
        log::info!("Mock annotation server listening on {}", addr);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap_or_else(|e| {
                    log::error!("Mock annotation server error: {}", e);
                });
        });

        MockAnnotationServer {
            addr,
            shutdown_tx,
            datasets,
            records,
            fail_submissions,
        }
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Pre-creates a dataset with the given field names, as if an earlier
    /// (possibly incompatible) integration had created it.
    pub fn seed_dataset(&self, name: &str, field_names: &[&str]) -> String {
        let dataset = RemoteDataset {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            fields: field_names.iter().map(|n| TextField::new(n)).collect(),
        };
        let id = dataset.id.clone();
        self.datasets.lock().unwrap().push(dataset);
        id
    }

    pub fn set_fail_submissions(&self, fail: bool) {
        self.fail_submissions.store(fail, Ordering::SeqCst);
    }

    pub fn submitted_records(&self) -> Vec<FeedbackRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|(_, record)| record.clone())
            .collect()
    }

    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).is_err() {
            log::warn!("Mock annotation server shutdown signal already sent.");
        }
    }
}
