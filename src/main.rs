//! Calm Space · Wellness Activities Backend
//!
//! - Attention Switch: seeded puzzle rounds with a per-connection round state machine
//! - Stillness, noise labelling, loop reflection and micro-action picker activities
//! - Axum HTTP + WebSocket API, static SPA fallback (./static/index.html)
//! - Optional moment tracking against a REST store (demo mode when unset)
//!
//! Important env variables:
//!   PORT              : u16 (default 3000)
//!   CALM_CONFIG_PATH  : path to TOML config (difficulty overrides, extra templates, timing, tracker)
//!   TRACKER_BASE_URL  : moment store base URL; enables tracking when set with TRACKER_API_KEY
//!   TRACKER_API_KEY   : moment store API key
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod domain;
mod config;
mod bank;
mod generator;
mod sequencer;
mod effect;
mod session;
mod activities;
mod tracker;
mod state;
mod protocol;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Validate the template bank up front; a broken built-in template is fatal.
  let state = Arc::new(AppState::new()?);

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "calm_space", %addr, tracking = state.tracker.is_enabled(), "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
