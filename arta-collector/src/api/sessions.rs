//! Conversation endpoints
//!
//! POST /sessions/:user/commands/:command, POST /sessions/:user/messages,
//! GET /sessions/:user, GET /sessions/:user/charts/:chart

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{ApiError, ApiResult},
    frontend::{ChartUnavailable, Command, Reply, SESSION_EXPIRED},
    models::analysis_session::SessionView,
    report::ChartChoice,
    AppState,
};

/// POST /sessions/:user/messages request
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// Replies to one input, followed by anything the background run queued
#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    pub user_id: String,
    pub replies: Vec<Reply>,
    pub pending: Vec<Reply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
}

/// GET /sessions/:user response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: String,
    pub session: Option<SessionView>,
    pub pending: Vec<Reply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
}

fn exchange(state: &AppState, user_id: String, replies: Vec<Reply>) -> ExchangeResponse {
    let pending = state.outbox.drain(&user_id);
    let progress = state.outbox.latest_progress(&user_id);
    ExchangeResponse {
        user_id,
        replies,
        pending,
        progress,
    }
}

/// POST /sessions/:user/commands/:command
pub async fn post_command(
    State(state): State<AppState>,
    Path((user_id, command)): Path<(String, String)>,
) -> ApiResult<Json<ExchangeResponse>> {
    let command: Command = command.parse().map_err(ApiError::BadRequest)?;
    debug!(user_id = %user_id, command = %command, "Command received");

    if command == Command::End {
        state.outbox.clear(&user_id);
    }
    let replies = state.conversation.handle_command(&user_id, command).await;

    Ok(Json(exchange(&state, user_id, replies)))
}

/// POST /sessions/:user/messages
pub async fn post_message(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<MessageRequest>,
) -> ApiResult<Json<ExchangeResponse>> {
    debug!(user_id = %user_id, "Message received");
    let replies = state.conversation.handle_text(&user_id, &request.text).await;

    Ok(Json(exchange(&state, user_id, replies)))
}

/// GET /sessions/:user
///
/// Session snapshot plus queued replies. The session is `null` when it
/// never existed, ended or expired.
pub async fn get_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<SessionResponse> {
    let session = state.conversation.session_view(&user_id).await;
    let pending = state.outbox.drain(&user_id);
    let progress = state.outbox.latest_progress(&user_id);

    Json(SessionResponse {
        user_id,
        session,
        pending,
        progress,
    })
}

/// GET /sessions/:user/charts/:chart
///
/// A single chart is returned as the image itself; `all` returns the image
/// replies as JSON.
pub async fn get_chart(
    State(state): State<AppState>,
    Path((user_id, chart)): Path<(String, String)>,
) -> ApiResult<Response> {
    let choice: ChartChoice = chart
        .parse()
        .map_err(|e: crate::report::UnknownChart| ApiError::BadRequest(e.to_string()))?;

    let charts = state
        .conversation
        .charts(&user_id, choice)
        .await
        .map_err(|ChartUnavailable::SessionExpired| ApiError::Conflict(SESSION_EXPIRED.to_string()))?;

    match choice {
        ChartChoice::Single(kind) => {
            let rendered = charts
                .into_iter()
                .next()
                .ok_or_else(|| ApiError::Internal(format!("chart {} was not rendered", kind)))?;
            Ok((
                [(header::CONTENT_TYPE, rendered.content_type)],
                rendered.bytes,
            )
                .into_response())
        }
        ChartChoice::All => {
            let replies: Vec<Reply> = charts.into_iter().map(Reply::from).collect();
            Ok(Json(replies).into_response())
        }
    }
}

/// Build conversation routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions/:user", get(get_session))
        .route("/sessions/:user/commands/:command", post(post_command))
        .route("/sessions/:user/messages", post(post_message))
        .route("/sessions/:user/charts/:chart", get(get_chart))
}
