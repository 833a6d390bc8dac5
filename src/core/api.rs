//! HTTP + WebSocket API for abscore
//!
//! Endpoints:
//! - GET /health - Health check
//! - POST /session/new - Create new session
//! - GET /session/{id} - Get session status
//! - POST /session/{id}/frame - Feed one joint frame
//! - POST /session/{id}/angle - Feed one precomputed hinge angle
//! - POST /session/{id}/finalize - Stop session, advisory score + receipt
//! - POST /session/{id}/submit - Gate + ledger submission
//! - GET|PUT /bonus - Read or replace the bonus context
//! - GET /leaderboard - Lifetime rows ordered by best score
//! - WS /ws/{id} - Live frame outputs

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use crate::config::Config;
use crate::core::{CompositeScorer, ExerciseSession, InMemoryLedger, Ledger, LedgerError, SubmissionGate};
use crate::types::{
    BonusContext, ExerciseState, FrameOutput, GateError, GeometryError, HingeAngle, JointFrame,
    LedgerEntry, LifetimeStats, ScoreBreakdown, SessionStats, SessionSummary,
};

/// Default number of leaderboard rows
const LEADERBOARD_LIMIT: usize = 10;

/// Live session
#[derive(Debug)]
pub struct SessionEntry {
    pub session: ExerciseSession,
    /// Advisory score computed at finalize
    pub estimate: Option<(ScoreBreakdown, String)>,
    /// Set once the ledger accepted this session
    pub submitted: bool,
    pub update_tx: broadcast::Sender<FrameOutput>,
}

/// App state
pub struct AppState {
    pub sessions: RwLock<HashMap<String, SessionEntry>>,
    pub gate: SubmissionGate,
    pub ledger: RwLock<InMemoryLedger>,
    pub config: Config,
    next_id: AtomicU64,
}

impl AppState {
    pub fn new(config: Config, bonus: BonusContext) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            gate: SubmissionGate::new(config.gate),
            ledger: RwLock::new(InMemoryLedger::with_config(&config, bonus)),
            config,
            next_id: AtomicU64::new(1),
        }
    }
}

/// Create new session request
#[derive(Debug, Deserialize)]
pub struct NewSessionRequest {
    pub user: String,
    #[serde(default)]
    pub region: String,
}

/// Create new session response
#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub websocket_url: String,
}

/// Session status response
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub user: String,
    pub region: String,
    pub state: ExerciseState,
    pub stats: SessionStats,
    pub average_form_accuracy: u8,
    pub rejected_frames: u64,
    pub finalized: bool,
}

/// Feed angle request
#[derive(Debug, Deserialize)]
pub struct AngleRequest {
    pub angle: f64,
}

/// Per-frame response. Rejected frames carry the error code instead of an output.
#[derive(Debug, Serialize)]
pub struct FrameResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<FrameOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

/// Finalize response
#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub session_id: String,
    pub summary: SessionSummary,
    /// Advisory; the ledger's recomputation is authoritative
    pub estimate: ScoreBreakdown,
    pub receipt_hex: String,
    pub bonus_stale: bool,
}

/// Submit response
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub entry: LedgerEntry,
    pub receipt_hex: String,
    /// Ledger receipt equals the finalize estimate
    pub receipt_matches: bool,
    pub lifetime: Option<LifetimeStats>,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions_active: usize,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

/// Error body
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_secs: Option<u64>,
}

/// Handler error: status + JSON body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                code: code.to_string(),
                message: message.into(),
                remaining_secs: None,
            },
        }
    }

    fn not_found(id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "A404_NOT_FOUND", format!("session {} not found", id))
    }
}

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        let status = match e {
            GateError::CooldownActive { .. } => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        };
        let remaining_secs = match e {
            GateError::CooldownActive { remaining_secs } => Some(remaining_secs),
            _ => None,
        };
        Self {
            status,
            body: ErrorResponse {
                code: e.code().to_string(),
                message: e.to_string(),
                remaining_secs,
            },
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Rejected(gate) => gate.into(),
            LedgerError::InvalidUser => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, e.code(), e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session/new", post(create_session))
        .route("/session/:id", get(get_session))
        .route("/session/:id/frame", post(add_frame))
        .route("/session/:id/angle", post(add_angle))
        .route("/session/:id/finalize", post(finalize_session))
        .route("/session/:id/submit", post(submit_session))
        .route("/bonus", get(get_bonus).put(put_bonus))
        .route("/leaderboard", get(leaderboard))
        .route("/ws/:id", get(websocket_handler))
        .with_state(Arc::new(state))
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let sessions = state.sessions.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        sessions_active: sessions.len(),
    })
}

/// Create new session
async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewSessionRequest>,
) -> Result<Json<NewSessionResponse>, ApiError> {
    if req.user.trim().is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "A400_INVALID_USER",
            "user must not be empty",
        ));
    }

    let seq = state.next_id.fetch_add(1, Ordering::Relaxed);
    let session_id = generate_session_id(seq);
    let (tx, _) = broadcast::channel(100);
    let session = ExerciseSession::with_config(&req.user, &req.region, &state.config, Utc::now());

    let mut sessions = state.sessions.write().await;
    sessions.insert(
        session_id.clone(),
        SessionEntry {
            session,
            estimate: None,
            submitted: false,
            update_tx: tx,
        },
    );
    info!(session = %session_id, user = %req.user, "session created");

    Ok(Json(NewSessionResponse {
        websocket_url: format!("/ws/{}", session_id),
        session_id,
    }))
}

/// Get session status
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    let sessions = state.sessions.read().await;
    let entry = sessions.get(&id).ok_or_else(|| ApiError::not_found(&id))?;
    let session = &entry.session;

    Ok(Json(SessionStatusResponse {
        session_id: id.clone(),
        user: session.user().to_string(),
        region: session.region().to_string(),
        state: session.state(),
        stats: session.stats().clone(),
        average_form_accuracy: session.average_form_accuracy(),
        rejected_frames: session.rejected_frames(),
        finalized: session.is_finalized(),
    }))
}

/// Feed one joint frame
async fn add_frame(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(frame): Json<JointFrame>,
) -> Result<Json<FrameResponse>, ApiError> {
    let mut sessions = state.sessions.write().await;
    let entry = sessions.get_mut(&id).ok_or_else(|| ApiError::not_found(&id))?;

    let result = entry.session.process_frame(&frame);
    Ok(Json(frame_response(entry, result)))
}

/// Broadcast accepted outputs; rejected inputs answer with their code
fn frame_response(
    entry: &SessionEntry,
    result: Result<FrameOutput, GeometryError>,
) -> FrameResponse {
    match result {
        Ok(output) => {
            let _ = entry.update_tx.send(output.clone());
            FrameResponse {
                accepted: true,
                output: Some(output),
                error: None,
            }
        }
        Err(e) => FrameResponse {
            accepted: false,
            output: None,
            error: Some(ErrorResponse {
                code: e.code().to_string(),
                message: e.to_string(),
                remaining_secs: None,
            }),
        },
    }
}

/// Feed one precomputed angle
async fn add_angle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AngleRequest>,
) -> Result<Json<FrameResponse>, ApiError> {
    if !req.angle.is_finite() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "A400_INVALID_ANGLE",
            "angle must be finite",
        ));
    }

    let mut sessions = state.sessions.write().await;
    let entry = sessions.get_mut(&id).ok_or_else(|| ApiError::not_found(&id))?;

    let result = entry.session.process_angle(HingeAngle::new(req.angle));
    Ok(Json(frame_response(entry, result)))
}

/// Stop the session and return the advisory score
async fn finalize_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FinalizeResponse>, ApiError> {
    let now = Utc::now();
    let mut sessions = state.sessions.write().await;
    let entry = sessions.get_mut(&id).ok_or_else(|| ApiError::not_found(&id))?;

    let summary = entry.session.finalize(now);
    let ctx = state.ledger.read().await.context_for(entry.session.user());
    let scorer = CompositeScorer::new(state.config.scoring);
    let (breakdown, receipt) = scorer.score_with_receipt(&summary, &ctx, now);
    let receipt_hex = receipt.to_hex();
    entry.estimate = Some((breakdown, receipt_hex.clone()));

    Ok(Json(FinalizeResponse {
        session_id: id,
        summary,
        estimate: breakdown,
        receipt_hex,
        bonus_stale: ctx.is_stale(now),
    }))
}

/// Run the gate, then the ledger
async fn submit_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let now = Utc::now();
    let mut sessions = state.sessions.write().await;
    let entry = sessions.get_mut(&id).ok_or_else(|| ApiError::not_found(&id))?;

    if !entry.session.is_finalized() {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "A409_NOT_FINALIZED",
            "finalize the session before submitting",
        ));
    }
    if entry.submitted {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "A409_ALREADY_SUBMITTED",
            "session was already submitted",
        ));
    }
    let summary = entry.session.finalize(now);
    let user = entry.session.user().to_string();
    let record = entry.session.submission_record(&summary);

    let record = state.gate.try_submit(&user, record, now)?;

    let mut ledger = state.ledger.write().await;
    let ledger_entry = ledger.submit(&user, record, now)?;
    entry.submitted = true;
    let receipt_hex = ledger_entry.receipt.to_hex();
    let receipt_matches = entry
        .estimate
        .as_ref()
        .map(|(_, hex)| *hex == receipt_hex)
        .unwrap_or(false);
    if !receipt_matches {
        warn!(user = %user, "ledger receipt differs from the finalize estimate");
    }

    Ok(Json(SubmitResponse {
        lifetime: ledger.lifetime(&user),
        entry: ledger_entry,
        receipt_hex,
        receipt_matches,
    }))
}

async fn get_bonus(State(state): State<Arc<AppState>>) -> Json<BonusContext> {
    Json(state.ledger.read().await.bonus_context().clone())
}

/// Replace the bonus context. A missing `refreshed_at` is stamped with now.
async fn put_bonus(
    State(state): State<Arc<AppState>>,
    Json(mut bonus): Json<BonusContext>,
) -> Json<BonusContext> {
    if bonus.refreshed_at.is_none() {
        bonus.refreshed_at = Some(Utc::now());
    }
    info!(
        seasonal = bonus.seasonal_bonus_bps,
        regional = bonus.regional_bonus_bps,
        challenge = bonus.challenge.is_some(),
        "bonus context replaced"
    );
    state.ledger.write().await.set_bonus_context(bonus.clone());
    Json(bonus)
}

async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Json<Vec<LifetimeStats>> {
    let limit = query.limit.unwrap_or(LEADERBOARD_LIMIT);
    Json(state.ledger.read().await.leaderboard(limit))
}

/// WebSocket handler for live updates
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state.sessions.read().await;
    let entry = sessions.get(&id).ok_or_else(|| ApiError::not_found(&id))?;
    let rx = entry.update_tx.subscribe();
    drop(sessions);

    Ok(ws.on_upgrade(move |socket| handle_websocket(socket, rx)))
}

/// Forward frame outputs until either side goes away
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<FrameOutput>) {
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(output) => {
                    let Ok(json) = serde_json::to_string(&output) else {
                        continue;
                    };
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket client lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

/// Generate session ID
fn generate_session_id(seq: u64) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    format!("session_{:x}_{}", nanos, seq)
}

/// Run the API server
pub async fn run_server(
    addr: &str,
    config: Config,
    bonus: BonusContext,
) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router(AppState::new(config, bonus));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "abscore API listening");
    println!("abscore API running on {}", addr);
    println!("  POST /session/new           - Create session");
    println!("  GET  /session/:id           - Get status");
    println!("  POST /session/:id/frame     - Feed joint frame");
    println!("  POST /session/:id/angle     - Feed hinge angle");
    println!("  POST /session/:id/finalize  - Stop and estimate score");
    println!("  POST /session/:id/submit    - Submit to ledger");
    println!("  GET  /bonus, PUT /bonus     - Bonus context");
    println!("  GET  /leaderboard           - Lifetime rankings");
    println!("  WS   /ws/:id                - Live updates");
    println!("  GET  /health                - Health check");
    axum::serve(listener, router).await?;
    Ok(())
}
