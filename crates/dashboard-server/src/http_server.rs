//! HTTP Dashboard Server
//!
//! JSON endpoints over the leaderboard view and participant profiles.

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chain_reader::{Address, ChainReader, ParticipantProfile, TxHash};
use chrono::{DateTime, Utc};
use factions::Faction;
use leaderboard::{DisplaySnapshot, LeaderboardView, RefreshOutcome, ViewState};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::error::ApiError;

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub view: LeaderboardView,
    pub reader: Arc<dyn ChainReader>,
}

/// One leaderboard row
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionRow {
    #[serde(flatten)]
    pub faction: Faction,
    pub is_chancellor: bool,
}

/// Leaderboard as rendered to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionsView {
    pub state: ViewState,
    pub factions: Vec<FactionRow>,
    pub chancellor: Option<Address>,
    pub last_updated: Option<DateTime<Utc>>,
    pub is_refreshing: bool,
}

impl From<DisplaySnapshot> for FactionsView {
    fn from(snapshot: DisplaySnapshot) -> Self {
        let factions = snapshot
            .factions
            .iter()
            .map(|faction| FactionRow {
                is_chancellor: snapshot.is_chancellor(faction),
                faction: faction.clone(),
            })
            .collect();

        Self {
            state: snapshot.state,
            factions,
            chancellor: snapshot.chancellor,
            last_updated: snapshot.last_updated,
            is_refreshing: snapshot.is_refreshing,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub outcome: RefreshOutcome,
    pub snapshot: FactionsView,
}

#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    pub hash: String,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

/// HTTP dashboard server
pub struct DashboardServer {
    state: AppState,
}

impl DashboardServer {
    pub fn new(view: LeaderboardView, reader: Arc<dyn ChainReader>) -> Self {
        Self {
            state: AppState { view, reader },
        }
    }

    /// Create the Axum router
    pub fn router(self) -> Router {
        // CORS layer to allow browser clients
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

        Router::new()
            .route("/health", get(handle_health))
            .route("/factions", get(handle_factions))
            .route("/factions/refresh", post(handle_refresh))
            .route("/transactions", post(handle_transaction))
            .route("/visibility", post(handle_visibility))
            .route("/participants/:address", get(handle_participant))
            .layer(cors)
            .with_state(self.state)
    }

    /// Serve until `shutdown` resolves
    pub async fn run<F>(self, addr: &str, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Dashboard server listening on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Dashboard server stopped");
        Ok(())
    }
}

async fn handle_health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn handle_factions(State(state): State<AppState>) -> Json<FactionsView> {
    Json(state.view.snapshot().into())
}

async fn handle_refresh(State(state): State<AppState>) -> Json<RefreshResponse> {
    let outcome = state.view.manual_refresh().await;
    tracing::info!(?outcome, "Manual refresh requested");
    Json(RefreshResponse {
        outcome,
        snapshot: state.view.snapshot().into(),
    })
}

async fn handle_transaction(
    State(state): State<AppState>,
    Json(request): Json<TransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let hash: TxHash = request
        .hash
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("transaction hash: {}", e)))?;

    let scheduled = state.view.on_transaction(hash).is_some();
    tracing::info!(%hash, scheduled, "Transaction reported");

    Ok((StatusCode::ACCEPTED, Json(json!({ "scheduled": scheduled }))))
}

async fn handle_visibility(
    State(state): State<AppState>,
    Json(request): Json<VisibilityRequest>,
) -> Json<RefreshResponse> {
    let outcome = state.view.on_visibility(request.visible).await;
    Json(RefreshResponse {
        outcome,
        snapshot: state.view.snapshot().into(),
    })
}

async fn handle_participant(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ParticipantProfile>, ApiError> {
    let address: Address = address
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("address: {}", e)))?;

    let profile = ParticipantProfile::fetch(state.reader.as_ref(), &address).await?;
    Ok(Json(profile))
}
