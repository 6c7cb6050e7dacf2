//! WebSocket upgrade + activity runner. Each connection hosts at most one
//! activity at a time and acts as its clock: it owns the one-second ticker and
//! the deferred events the state machines ask for, and tears all of them down
//! on exit, activity switch or disconnect.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    Query, State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::activities::label::{self, NoiseSorter};
use crate::activities::stillness::{self, StillnessTimer, STILLNESS_SECS};
use crate::domain::Difficulty;
use crate::effect::{Deferred, Effect};
use crate::protocol::{attention_snapshot, ClientWsMessage, ServerWsMessage};
use crate::session::{AttentionSession, ACTIVITY_SESSION};
use crate::state::AppState;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
pub struct WsParams {
  #[serde(rename = "userId")]
  pub user_id: Option<String>,
}

#[instrument(level = "info", skip(state, ws), fields(has_user = params.user_id.is_some()))]
pub async fn ws_upgrade(
  ws: WebSocketUpgrade,
  State(state): State<Arc<AppState>>,
  Query(params): Query<WsParams>,
) -> impl IntoResponse {
  info!(target: "calm_space", "WebSocket upgrade requested");
  let user_id = params.user_id.filter(|u| !u.trim().is_empty());
  ws.on_upgrade(move |socket| handle_ws(socket, state, user_id))
}

enum Active {
  Idle,
  Attention(AttentionSession),
  Stillness(StillnessTimer),
  Label { sorter: NoiseSorter, started: Instant },
}

struct Runner {
  state: Arc<AppState>,
  user_id: Option<String>,
  active: Active,
  ticker: Option<Interval>,
  deferred: JoinSet<()>,
  // Bumped whenever pending deferred events are cancelled; older deliveries are dropped.
  epoch: u64,
  tx: mpsc::UnboundedSender<(u64, Deferred)>,
}

async fn next_tick(ticker: &mut Option<Interval>) {
  match ticker {
    Some(t) => {
      t.tick().await;
    }
    None => pending::<()>().await,
  }
}

#[instrument(level = "info", skip(socket, state, user_id), fields(conn = %Uuid::new_v4()))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, user_id: Option<String>) {
  info!(target: "calm_space", "WebSocket connected");
  let (tx, mut rx) = mpsc::unbounded_channel();
  let mut runner = Runner::new(state, user_id, tx);

  loop {
    let replies = tokio::select! {
      msg = socket.recv() => match msg {
        Some(Ok(Message::Text(txt))) => match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "calm_space", "WS received: {:?}", &incoming);
            runner.handle_client(incoming)
          }
          Err(e) => vec![ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }],
        },
        Some(Ok(Message::Ping(payload))) => {
          let _ = socket.send(Message::Pong(payload)).await;
          Vec::new()
        }
        Some(Ok(Message::Close(_))) | None => break,
        Some(Err(e)) => {
          error!(target: "calm_space", error = %e, "WS receive error");
          break;
        }
        Some(Ok(_)) => Vec::new(),
      },
      _ = next_tick(&mut runner.ticker) => runner.on_tick(),
      Some((epoch, event)) = rx.recv() => runner.on_deferred(epoch, event),
      Some(_) = runner.deferred.join_next(), if !runner.deferred.is_empty() => Vec::new(),
    };

    let mut failed = false;
    for reply in replies {
      let out = serde_json::to_string(&reply).unwrap_or_else(|e| {
        serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
      });
      if let Err(e) = socket.send(Message::Text(out)).await {
        error!(target: "calm_space", error = %e, "WS send error");
        failed = true;
        break;
      }
    }
    if failed {
      break;
    }
  }

  runner.reset();
  info!(target: "calm_space", "WebSocket disconnected");
}

impl Runner {
  fn new(state: Arc<AppState>, user_id: Option<String>, tx: mpsc::UnboundedSender<(u64, Deferred)>) -> Self {
    Self { state, user_id, active: Active::Idle, ticker: None, deferred: JoinSet::new(), epoch: 0, tx }
  }

  /// Stop the clock and forget the current activity.
  fn reset(&mut self) {
    self.ticker = None;
    self.deferred.abort_all();
    self.epoch += 1;
    self.active = Active::Idle;
  }

  fn activity_name(&self) -> &'static str {
    match self.active {
      Active::Idle => "none",
      Active::Attention(_) => ACTIVITY_SESSION,
      Active::Stillness(_) => stillness::ACTIVITY,
      Active::Label { .. } => label::ACTIVITY,
    }
  }

  fn snapshot(&self) -> Option<ServerWsMessage> {
    match &self.active {
      Active::Idle => None,
      Active::Attention(s) => Some(ServerWsMessage::AttentionState { state: attention_snapshot(s) }),
      Active::Stillness(t) => Some(ServerWsMessage::StillnessState { state: t.clone(), progress: t.progress() }),
      Active::Label { sorter, .. } => Some(ServerWsMessage::LabelState { state: sorter.clone(), sorted: sorter.sorted_count() }),
    }
  }

  fn apply(&mut self, effects: Vec<Effect>, out: &mut Vec<ServerWsMessage>) {
    for effect in effects {
      match effect {
        Effect::StartTicker => {
          let mut ticker = interval_at(Instant::now() + TICK, TICK);
          ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
          self.ticker = Some(ticker);
        }
        Effect::StopTicker => self.ticker = None,
        Effect::Schedule { after, event } => {
          let tx = self.tx.clone();
          let epoch = self.epoch;
          self.deferred.spawn(async move {
            sleep(after).await;
            let _ = tx.send((epoch, event));
          });
        }
        Effect::CancelDeferred => {
          self.deferred.abort_all();
          self.epoch += 1;
        }
        Effect::Record(draft) => self.state.tracker.record(draft, self.user_id.clone()),
        Effect::Completed => out.push(ServerWsMessage::SessionCompleted { activity: self.activity_name() }),
        Effect::Navigate => out.push(ServerWsMessage::Navigate),
      }
    }
  }

  /// Apply effects, then report the activity's new state ahead of any events.
  fn respond(&mut self, effects: Vec<Effect>) -> Vec<ServerWsMessage> {
    let mut events = Vec::new();
    self.apply(effects, &mut events);
    let mut out: Vec<ServerWsMessage> = self.snapshot().into_iter().collect();
    out.extend(events);
    out
  }

  fn no_activity(&self, wanted: &str) -> Vec<ServerWsMessage> {
    vec![ServerWsMessage::Error { message: format!("No active {} activity", wanted) }]
  }

  fn handle_client(&mut self, msg: ClientWsMessage) -> Vec<ServerWsMessage> {
    match msg {
      ClientWsMessage::Ping => vec![ServerWsMessage::Pong],

      ClientWsMessage::StartAttention { difficulty, seed } => {
        let Some(difficulty) = Difficulty::parse(&difficulty) else {
          return vec![ServerWsMessage::Error { message: format!("Unknown difficulty: {}", difficulty) }];
        };
        self.reset();
        let timing = self.state.timing.clone();
        let mut session = match seed {
          Some(seed) => AttentionSession::new(seed, timing),
          None => AttentionSession::from_entropy(timing),
        };
        let config = self.state.difficulties.get(difficulty);
        let effects = session.start(&self.state.bank, difficulty, config);
        info!(target: "attention", difficulty = difficulty.as_str(), ?seed, "WS attention session started");
        self.active = Active::Attention(session);
        self.respond(effects)
      }

      ClientWsMessage::Tap { item_id } => match &mut self.active {
        Active::Attention(s) => {
          let effects = s.tap(item_id);
          self.respond(effects)
        }
        _ => self.no_activity("attention"),
      },

      ClientWsMessage::Retry => match &mut self.active {
        Active::Attention(s) => {
          let effects = s.retry();
          self.respond(effects)
        }
        _ => self.no_activity("attention"),
      },

      ClientWsMessage::Advance => match &mut self.active {
        Active::Attention(s) => {
          let effects = s.advance();
          self.respond(effects)
        }
        _ => self.no_activity("attention"),
      },

      ClientWsMessage::StartStillness => {
        self.reset();
        let mut timer = StillnessTimer::new(STILLNESS_SECS, self.state.timing.feedback());
        let effects = timer.start();
        info!(target: "activity", activity = stillness::ACTIVITY, "WS stillness started");
        self.active = Active::Stillness(timer);
        self.respond(effects)
      }

      ClientWsMessage::Interact => match &mut self.active {
        Active::Stillness(t) => {
          let effects = t.interact();
          self.respond(effects)
        }
        _ => self.no_activity("stillness"),
      },

      ClientWsMessage::StartLabel => {
        self.reset();
        let sorter = NoiseSorter::new(
          &mut rand::thread_rng(),
          self.state.timing.feedback(),
          self.state.timing.sort_complete(),
        );
        info!(target: "activity", activity = label::ACTIVITY, "WS label session started");
        self.active = Active::Label { sorter, started: Instant::now() };
        self.respond(Vec::new())
      }

      ClientWsMessage::Place { card_id, category } => match &mut self.active {
        Active::Label { sorter, .. } => {
          let effects = sorter.place(card_id, category, &mut rand::thread_rng());
          self.respond(effects)
        }
        _ => self.no_activity("label"),
      },

      ClientWsMessage::Exit => {
        let effects = match &mut self.active {
          Active::Attention(s) => s.exit(),
          _ => vec![Effect::StopTicker, Effect::CancelDeferred, Effect::Navigate],
        };
        let mut out = Vec::new();
        self.apply(effects, &mut out);
        self.reset();
        out
      }
    }
  }

  fn on_tick(&mut self) -> Vec<ServerWsMessage> {
    let effects = match &mut self.active {
      Active::Attention(s) => s.tick(),
      Active::Stillness(t) => t.tick(),
      _ => {
        self.ticker = None;
        return Vec::new();
      }
    };
    self.respond(effects)
  }

  /// A deferred event came due. Events scheduled before the last cancellation are dropped.
  fn on_deferred(&mut self, epoch: u64, event: Deferred) -> Vec<ServerWsMessage> {
    if epoch != self.epoch {
      debug!(target: "calm_space", epoch, current = self.epoch, ?event, "Dropping stale deferred event");
      return Vec::new();
    }
    let (changed, effects) = match (&mut self.active, event) {
      (Active::Attention(s), Deferred::ClearMarker(token)) => (s.clear_marker(token), Vec::new()),
      (Active::Attention(s), Deferred::AdvanceRound(round)) => {
        let effects = s.on_success_delay(round);
        (!effects.is_empty(), effects)
      }
      (Active::Stillness(t), Deferred::ClearMarker(token)) => (t.clear_reminder(token), Vec::new()),
      (Active::Label { sorter, .. }, Deferred::ClearMarker(token)) => (sorter.clear_feedback(token), Vec::new()),
      (Active::Label { sorter, started }, Deferred::FinishSort) => {
        let effects = sorter.finish(started.elapsed().as_secs() as u32);
        (!effects.is_empty(), effects)
      }
      _ => (false, Vec::new()),
    };
    if !changed {
      return Vec::new();
    }
    self.respond(effects)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AppConfig;
  use crate::session::Phase;

  fn runner() -> (Runner, mpsc::UnboundedReceiver<(u64, Deferred)>) {
    let state = Arc::new(AppState::from_config(AppConfig::default()).unwrap());
    let (tx, rx) = mpsc::unbounded_channel();
    (Runner::new(state, None, tx), rx)
  }

  fn start(runner: &mut Runner, seed: u64) {
    let replies = runner.handle_client(ClientWsMessage::StartAttention { difficulty: "easy".into(), seed: Some(seed) });
    assert!(matches!(replies.as_slice(), [ServerWsMessage::AttentionState { .. }]));
  }

  fn session(runner: &Runner) -> &AttentionSession {
    match &runner.active {
      Active::Attention(s) => s,
      _ => panic!("no attention session"),
    }
  }

  fn target_ids(runner: &Runner) -> Vec<usize> {
    let round = session(runner).current_round().unwrap();
    round.items.iter().filter(|i| i.is_target).map(|i| i.id).collect()
  }

  #[tokio::test]
  async fn marker_clear_only_applies_in_its_own_epoch() {
    let (mut r, _rx) = runner();
    start(&mut r, 5);
    let target = target_ids(&r)[0];
    r.handle_client(ClientWsMessage::Tap { item_id: target });
    let token = session(&r).runtime().glow.unwrap().token;

    assert!(r.on_deferred(r.epoch.wrapping_sub(1), Deferred::ClearMarker(token)).is_empty());
    assert!(session(&r).runtime().glow.is_some());

    assert_eq!(r.on_deferred(r.epoch, Deferred::ClearMarker(token)).len(), 1);
    assert!(session(&r).runtime().glow.is_none());
  }

  #[tokio::test]
  async fn restart_drops_events_from_the_previous_session() {
    let (mut r, _rx) = runner();
    start(&mut r, 5);
    let old_epoch = r.epoch;
    r.handle_client(ClientWsMessage::Tap { item_id: target_ids(&r)[0] });
    let old_token = session(&r).runtime().glow.unwrap().token;

    // Same seed, so the new session hands out the same marker token.
    start(&mut r, 5);
    assert_ne!(r.epoch, old_epoch);
    r.handle_client(ClientWsMessage::Tap { item_id: target_ids(&r)[0] });
    assert_eq!(session(&r).runtime().glow.unwrap().token, old_token);

    assert!(r.on_deferred(old_epoch, Deferred::ClearMarker(old_token)).is_empty());
    assert!(session(&r).runtime().glow.is_some());
  }

  #[tokio::test]
  async fn success_stops_ticker_and_stale_advance_after_exit_is_dropped() {
    let (mut r, _rx) = runner();
    start(&mut r, 9);
    assert!(r.ticker.is_some());
    for id in target_ids(&r) {
      r.handle_client(ClientWsMessage::Tap { item_id: id });
    }
    assert_eq!(session(&r).phase(), Phase::RoundSucceeded);
    assert!(r.ticker.is_none());

    let epoch = r.epoch;
    let replies = r.handle_client(ClientWsMessage::Exit);
    assert!(matches!(replies.as_slice(), [ServerWsMessage::Navigate]));
    assert!(r.ticker.is_none());
    assert!(r.on_deferred(epoch, Deferred::AdvanceRound(0)).is_empty());
    assert!(matches!(r.active, Active::Idle));
  }

  #[tokio::test]
  async fn success_delay_advances_within_the_same_epoch() {
    let (mut r, _rx) = runner();
    start(&mut r, 9);
    for id in target_ids(&r) {
      r.handle_client(ClientWsMessage::Tap { item_id: id });
    }
    let replies = r.on_deferred(r.epoch, Deferred::AdvanceRound(0));
    assert!(!replies.is_empty());
    assert_eq!(session(&r).round_index(), 1);
    assert_eq!(session(&r).phase(), Phase::RoundActive);
    assert!(r.ticker.is_some());
  }

  #[tokio::test]
  async fn timeout_stops_ticker_and_retry_restarts_it() {
    let (mut r, _rx) = runner();
    start(&mut r, 3);
    let limit = session(&r).runtime().time_left;
    for _ in 0..limit {
      r.on_tick();
    }
    assert_eq!(session(&r).phase(), Phase::RoundTimedOut);
    assert!(r.ticker.is_none());
    r.on_tick();
    assert_eq!(session(&r).phase(), Phase::RoundTimedOut);
    assert_eq!(session(&r).runtime().time_left, 0);

    r.handle_client(ClientWsMessage::Retry);
    assert_eq!(session(&r).phase(), Phase::RoundActive);
    assert_eq!(r.ticker.as_ref().map(Interval::period), Some(TICK));
    assert_eq!(session(&r).runtime().time_left, limit);
  }

  #[tokio::test]
  async fn inputs_for_inactive_activities_are_errors() {
    let (mut r, _rx) = runner();
    let replies = r.handle_client(ClientWsMessage::Tap { item_id: 0 });
    assert!(matches!(replies.as_slice(), [ServerWsMessage::Error { .. }]));
    let replies = r.handle_client(ClientWsMessage::StartAttention { difficulty: "brutal".into(), seed: None });
    assert!(matches!(replies.as_slice(), [ServerWsMessage::Error { .. }]));
    assert!(matches!(r.active, Active::Idle));
  }
}
