//! JSON API over a shared `SportCalendar`.

use crate::ledger::{odds_in_range, MAX_ODDS};
use crate::models::{Bet, BetChoice, Event, League};
use crate::utils::merge::EventFilter;
use crate::{EventSource, Placement, SimulatedResult, SportCalendar};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Every handler goes through this lock, so each read-modify-persist is atomic
pub type SharedCalendar<S> = Arc<RwLock<SportCalendar<S>>>;

#[derive(Debug, Deserialize)]
pub struct PlaceBetRequest {
    pub event_id: String,
    pub choice: BetChoice,
    pub odds: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub home_score: u32,
    pub away_score: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletResponse {
    pub balance: i64,
    pub open_bets: usize,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(err: anyhow::Error) -> Self {
        error!("Request failed: {:#}", err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

pub fn router<S: EventSource + 'static>(calendar: SharedCalendar<S>) -> Router {
    Router::new()
        .route("/api/events", get(list_events::<S>))
        .route("/api/events/:id", get(get_event::<S>))
        .route("/api/events/:id/simulate", post(simulate::<S>))
        .route("/api/leagues", get(list_leagues::<S>))
        .route("/api/leagues/:id/next", get(next_events::<S>))
        .route("/api/wallet", get(wallet::<S>))
        .route("/api/bets", get(list_bets::<S>).post(place_bet::<S>))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(calendar)
}

async fn list_events<S: EventSource>(
    State(calendar): State<SharedCalendar<S>>,
    Query(filter): Query<EventFilter>,
) -> Json<Vec<Event>> {
    let mut calendar = calendar.write().await;
    let events = if filter.is_empty() {
        calendar.get_all_events().await
    } else {
        calendar.filter(&filter).await
    };
    Json(events)
}

/// Loaded collection first (it carries simulated scores), then the feed
async fn get_event<S: EventSource>(
    State(calendar): State<SharedCalendar<S>>,
    Path(id): Path<String>,
) -> Result<Json<Event>, ApiError> {
    let calendar = calendar.read().await;
    if let Some(event) = calendar.events().iter().find(|e| e.id == id) {
        return Ok(Json(event.clone()));
    }
    calendar
        .lookup_event(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("Event {} not found", id)))
}

/// An empty body draws random scores; a body must be a valid `SimulateRequest`
async fn simulate<S: EventSource>(
    State(calendar): State<SharedCalendar<S>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<SimulatedResult>, ApiError> {
    let scores = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        let request = serde_json::from_slice::<SimulateRequest>(&body).map_err(|e| {
            ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid scores: {}", e))
        })?;
        Some(request)
    };

    let mut calendar = calendar.write().await;
    let result = match scores {
        Some(scores) => {
            calendar
                .record_simulated_result(&id, scores.home_score, scores.away_score)
                .await
        }
        None => calendar.simulate_result(&id).await,
    }
    .map_err(ApiError::internal)?;

    result
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("Event {} not loaded", id)))
}

async fn list_leagues<S: EventSource>(State(calendar): State<SharedCalendar<S>>) -> Json<Vec<League>> {
    Json(calendar.read().await.leagues().to_vec())
}

async fn next_events<S: EventSource>(
    State(calendar): State<SharedCalendar<S>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Event>>, ApiError> {
    calendar
        .read()
        .await
        .next_preview(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("Unknown league {}", id)))
}

async fn wallet<S: EventSource>(State(calendar): State<SharedCalendar<S>>) -> Json<WalletResponse> {
    let calendar = calendar.read().await;
    Json(WalletResponse {
        balance: calendar.balance(),
        open_bets: calendar.ledger().open_bets().count(),
    })
}

async fn list_bets<S: EventSource>(State(calendar): State<SharedCalendar<S>>) -> Json<Vec<Bet>> {
    Json(calendar.read().await.ledger().bets().to_vec())
}

async fn place_bet<S: EventSource>(
    State(calendar): State<SharedCalendar<S>>,
    Json(request): Json<PlaceBetRequest>,
) -> Result<(StatusCode, Json<Bet>), ApiError> {
    if let Some(odds) = request.odds {
        if !odds_in_range(odds) {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                format!("Odds must be greater than 0 and at most {}", MAX_ODDS),
            ));
        }
    }

    let mut calendar = calendar.write().await;
    // One bet per event, as the calendar UI has always offered
    if calendar.has_bet_on(&request.event_id) {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            format!("A bet on event {} already exists", request.event_id),
        ));
    }

    match calendar
        .place_bet(&request.event_id, request.choice, request.odds)
        .map_err(ApiError::internal)?
    {
        Placement::Accepted(bet) => Ok((StatusCode::CREATED, Json(bet))),
        Placement::InsufficientFunds { balance, stake } => Err(ApiError::new(
            StatusCode::PAYMENT_REQUIRED,
            format!("Insufficient balance: {} available, {} needed", balance, stake),
        )),
    }
}
