//! HTTP API for the settlement engine
//!
//! Provides endpoints for:
//! - Work submission (multipart, adjudicate + settle)
//! - Job indexing and browsing
//! - Applicant / assignment updates
//! - Settlement retry for unpaid PASS verdicts

use crate::store::JobStore;
use crate::types::{JobRecord, JobStatus, SubmissionPart};
use crate::workflow::{SettlementOrchestrator, SubmitOutcome, WorkflowError};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const JOBS_PAGE_LIMIT: usize = 50;
const SUBMISSIONS_PAGE_LIMIT: usize = 100;

/// RPC Configuration
#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// RPC Server State
pub struct RpcState {
    pub store: Arc<dyn JobStore>,
    pub orchestrator: Arc<SettlementOrchestrator>,
}

/// Settlement RPC Server
pub struct SettlementRpc {
    config: RpcConfig,
    state: Arc<RpcState>,
}

impl SettlementRpc {
    pub fn new(
        config: RpcConfig,
        store: Arc<dyn JobStore>,
        orchestrator: Arc<SettlementOrchestrator>,
    ) -> Self {
        Self {
            config,
            state: Arc::new(RpcState {
                store,
                orchestrator,
            }),
        }
    }

    /// Create the router
    pub fn router(&self) -> Router {
        Router::new()
            // Submission + settlement
            .route("/submit", post(submit_work))
            .route("/jobs/:job_id/settle", post(retry_settlement))
            // Jobs
            .route("/jobs", post(index_job).get(list_jobs))
            .route("/jobs/:job_id", get(get_job))
            .route("/jobs/:job_id/apply", post(apply_to_job))
            .route("/jobs/:job_id/assign", post(assign_freelancer))
            // Submissions
            .route("/submissions", get(list_submissions))
            // Info
            .route("/health", get(health))
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(self.state.clone())
    }

    /// Start the RPC server
    pub async fn start(&self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!("Settlement RPC server listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

// ==================== Request/Response Types ====================

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub verdict: String,
    pub reason: String,
    pub tx_hash: Option<String>,
}

impl From<SubmitOutcome> for SubmitResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        Self {
            verdict: outcome.verdict.as_str().to_string(),
            reason: outcome.reason,
            tx_hash: outcome.tx_hash,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct IndexJobRequest {
    pub chain_job_id: u64,
    pub title: String,
    pub description: String,
    pub amount_mnee: f64,
    pub client_address: String,
    pub client_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct IndexJobResponse {
    pub chain_job_id: u64,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub applicant: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub freelancer_name: String,
    #[serde(default)]
    pub freelancer_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionsQuery {
    pub job_id: Option<u64>,
}

fn workflow_error_response(err: WorkflowError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        WorkflowError::JobNotIndexed(_) | WorkflowError::JobNotOnLedger(_) => {
            StatusCode::NOT_FOUND
        }
        WorkflowError::AlreadySettled(_) | WorkflowError::NoPassingSubmission(_) => {
            StatusCode::CONFLICT
        }
        WorkflowError::Ledger(_) | WorkflowError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn store_error_response(err: crate::store::StoreError) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

// ==================== Handlers ====================

async fn submit_work(
    State(state): State<Arc<RpcState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut job_id: Option<u64> = None;
    let mut freelancer_name: Option<String> = None;
    let mut notes = String::new();
    let mut artifacts: Vec<SubmissionPart> = Vec::new();

    loop {
        // A read error means a truncated or malformed upload; refuse it
        // rather than adjudicating a partial artifact set.
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: format!("malformed multipart request: {}", e),
                    }),
                )
                    .into_response();
            }
        };
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "job_id" => {
                let raw = field.text().await.unwrap_or_default();
                match raw.parse() {
                    Ok(id) => job_id = Some(id),
                    Err(_) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(ErrorResponse {
                                error: format!("invalid job_id: {:?}", raw),
                            }),
                        )
                            .into_response();
                    }
                }
            }
            "freelancer_name" => {
                freelancer_name = Some(field.text().await.unwrap_or_default());
            }
            "notes" => {
                notes = field.text().await.unwrap_or_default();
            }
            "files" => {
                let name = field.file_name().unwrap_or("unnamed").to_string();
                let mime_hint = field.content_type().map(str::to_string);
                let bytes = match field.bytes().await {
                    Ok(b) => b.to_vec(),
                    Err(e) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(ErrorResponse {
                                error: format!("failed to read file {}: {}", name, e),
                            }),
                        )
                            .into_response();
                    }
                };
                artifacts.push(SubmissionPart::Artifact {
                    name,
                    bytes,
                    mime_hint,
                });
            }
            other => {
                warn!("Ignoring unknown submit field: {:?}", other);
            }
        }
    }

    let Some(job_id) = job_id else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "missing job_id field".to_string(),
            }),
        )
            .into_response();
    };

    match state
        .orchestrator
        .submit_work(job_id, freelancer_name.as_deref(), &notes, artifacts)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(SubmitResponse::from(outcome))).into_response(),
        Err(e) => workflow_error_response(e).into_response(),
    }
}

async fn retry_settlement(
    State(state): State<Arc<RpcState>>,
    Path(job_id): Path<u64>,
) -> impl IntoResponse {
    match state.orchestrator.retry_settlement(job_id).await {
        Ok(outcome) => (StatusCode::OK, Json(SubmitResponse::from(outcome))).into_response(),
        Err(e) => workflow_error_response(e).into_response(),
    }
}

async fn index_job(
    State(state): State<Arc<RpcState>>,
    Json(req): Json<IndexJobRequest>,
) -> impl IntoResponse {
    let job = JobRecord {
        chain_job_id: req.chain_job_id,
        title: req.title,
        description: req.description,
        amount_mnee: req.amount_mnee,
        client_address: req.client_address,
        client_name: req.client_name,
        tags: req.tags,
        freelancer_address: None,
        freelancer_name: None,
        status: JobStatus::Open,
        applicants: Vec::new(),
        settlement_tx: None,
        created_at: Utc::now(),
    };

    match state.store.insert_job(job).await {
        Ok(true) => (
            StatusCode::OK,
            Json(IndexJobResponse {
                chain_job_id: req.chain_job_id,
                status: "Indexed".to_string(),
            }),
        )
            .into_response(),
        Ok(false) => (
            StatusCode::OK,
            Json(IndexJobResponse {
                chain_job_id: req.chain_job_id,
                status: "Job already indexed".to_string(),
            }),
        )
            .into_response(),
        Err(e) => store_error_response(e).into_response(),
    }
}

async fn list_jobs(State(state): State<Arc<RpcState>>) -> impl IntoResponse {
    match state.store.list_jobs(JOBS_PAGE_LIMIT).await {
        Ok(jobs) => (StatusCode::OK, Json(jobs)).into_response(),
        Err(e) => store_error_response(e).into_response(),
    }
}

async fn get_job(
    State(state): State<Arc<RpcState>>,
    Path(job_id): Path<u64>,
) -> impl IntoResponse {
    match state.store.get_job(job_id).await {
        Ok(Some(job)) => (StatusCode::OK, Json(Some(job))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("job {} is not indexed", job_id),
            }),
        )
            .into_response(),
        Err(e) => store_error_response(e).into_response(),
    }
}

async fn apply_to_job(
    State(state): State<Arc<RpcState>>,
    Path(job_id): Path<u64>,
    Json(req): Json<ApplyRequest>,
) -> impl IntoResponse {
    match state.store.add_applicant(job_id, &req.applicant).await {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("job {} is not indexed", job_id),
            }),
        )
            .into_response(),
        Err(e) => store_error_response(e).into_response(),
    }
}

async fn assign_freelancer(
    State(state): State<Arc<RpcState>>,
    Path(job_id): Path<u64>,
    Json(req): Json<AssignRequest>,
) -> impl IntoResponse {
    // Distinguish missing from terminal before the conditional update.
    match state.store.get_job(job_id).await {
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("job {} is not indexed", job_id),
                }),
            )
                .into_response();
        }
        Ok(Some(job)) if job.status == JobStatus::Paid => {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: format!("job {} is already settled", job_id),
                }),
            )
                .into_response();
        }
        Ok(Some(_)) => {}
        Err(e) => return store_error_response(e).into_response(),
    }

    match state
        .store
        .assign_freelancer(job_id, &req.freelancer_name, req.freelancer_address.as_deref())
        .await
    {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: format!("job {} cannot be assigned", job_id),
            }),
        )
            .into_response(),
        Err(e) => store_error_response(e).into_response(),
    }
}

async fn list_submissions(
    State(state): State<Arc<RpcState>>,
    Query(query): Query<SubmissionsQuery>,
) -> impl IntoResponse {
    let result = match query.job_id {
        Some(job_id) => {
            state
                .store
                .submissions_for_job(job_id, SUBMISSIONS_PAGE_LIMIT)
                .await
        }
        None => state.store.list_submissions(SUBMISSIONS_PAGE_LIMIT).await,
    };
    match result {
        Ok(subs) => (StatusCode::OK, Json(subs)).into_response(),
        Err(e) => store_error_response(e).into_response(),
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
