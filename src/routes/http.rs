//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;

use axum::{
  extract::{Query, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
  Json,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, instrument};

use crate::activities::{picker, reflection, CATALOG};
use crate::domain::Difficulty;
use crate::protocol::*;
use crate::sequencer::build_session;
use crate::state::AppState;

type HttpError = (StatusCode, Json<ErrorOut>);

fn bad_request(message: String) -> HttpError {
  (StatusCode::BAD_REQUEST, Json(ErrorOut { message }))
}

/// Optional identity attached to moment records.
pub fn user_id_from(headers: &HeaderMap) -> Option<String> {
  headers
    .get("x-user-id")
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(str::to_string)
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info")]
pub async fn http_get_activities() -> impl IntoResponse { Json(CATALOG) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_difficulties(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(state.difficulties.clone())
}

#[instrument(level = "info", skip(state), fields(difficulty = ?q.difficulty, seed = ?q.seed))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SessionQuery>,
) -> Result<Json<SessionPreviewOut>, HttpError> {
  let raw = q.difficulty.unwrap_or_else(|| "easy".into());
  let difficulty = Difficulty::parse(&raw).ok_or_else(|| bad_request(format!("Unknown difficulty: {}", raw)))?;
  let seed = q.seed.unwrap_or_else(|| rand::thread_rng().gen());
  let config = state.difficulties.get(difficulty).clone();
  let rounds = build_session(&state.bank, difficulty, &config, &mut StdRng::seed_from_u64(seed));
  info!(target: "attention", difficulty = difficulty.as_str(), seed, rounds = rounds.len(), "HTTP session preview served");
  Ok(Json(SessionPreviewOut { difficulty, seed, config, rounds }))
}

#[instrument(level = "info", skip(state, headers, body), fields(choice = ?body.choice))]
pub async fn http_post_reflection(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(body): Json<ReflectionIn>,
) -> impl IntoResponse {
  state.tracker.record(reflection::moment(body.choice), user_id_from(&headers));
  Json(ReflectionOut { question: reflection::QUESTION, reflection: reflection::respond(body.choice) })
}

#[instrument(level = "info")]
pub async fn http_get_actions() -> impl IntoResponse { Json(picker::ACTIONS) }

#[instrument(level = "info", skip(state, headers, body), fields(action = %body.action))]
pub async fn http_post_pick(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(body): Json<PickIn>,
) -> Result<Json<PickOut>, HttpError> {
  let action = picker::find(&body.action).ok_or_else(|| {
    (StatusCode::NOT_FOUND, Json(ErrorOut { message: format!("Unknown action: {}", body.action) }))
  })?;
  state.tracker.record(picker::moment(action), user_id_from(&headers));
  info!(target: "activity", action = action.id, "Micro-action picked");
  Ok(Json(PickOut { action: *action }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  #[test]
  fn user_id_header_is_optional() {
    let mut headers = HeaderMap::new();
    assert_eq!(user_id_from(&headers), None);
    headers.insert("x-user-id", HeaderValue::from_static("  "));
    assert_eq!(user_id_from(&headers), None);
    headers.insert("x-user-id", HeaderValue::from_static("user-7"));
    assert_eq!(user_id_from(&headers).as_deref(), Some("user-7"));
  }
}
