//! Attention Switch round state machine.
//!
//! ```text
//! SelectingDifficulty -> RoundActive -> RoundSucceeded -> RoundActive[next] | SessionCompleted
//!                                   \-> RoundTimedOut  -> RoundActive[retry] | RoundActive[next] | SessionCompleted
//! ```
//!
//! All state lives in `AttentionSession` and changes only through the named
//! transitions below. Every transition is total: inputs that make no sense in
//! the current phase are no-ops that return no effects.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::bank::{TemplateBank, ENCOURAGEMENTS};
use crate::config::TimingCfg;
use crate::domain::{Difficulty, DifficultyConfig, Round};
use crate::effect::{Deferred, Effect};
use crate::sequencer::build_session;
use crate::tracker::MomentDraft;

pub const ACTIVITY_ROUND: &str = "attention_switch_round";
pub const ACTIVITY_SESSION: &str = "attention_switch";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  SelectingDifficulty,
  RoundActive,
  RoundSucceeded,
  RoundTimedOut,
  SessionCompleted,
}

/// Transient highlight on one item. Cleared only by the deferred event carrying its token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Marker {
  pub item_id: usize,
  #[serde(skip)]
  pub token: u64,
}

/// Per-attempt state; rebuilt on every round entry, including retries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RoundRuntime {
  pub time_left: u32,
  pub timer_active: bool,
  pub shake: Option<Marker>,
  pub glow: Option<Marker>,
  pub timed_out: bool,
  pub encouragement: Option<&'static str>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum RoundOutcome {
  Completed,
  Skipped,
}

pub struct AttentionSession {
  rng: StdRng,
  timing: TimingCfg,
  difficulty: Option<Difficulty>,
  rounds: Vec<Round>,
  index: usize,
  phase: Phase,
  runtime: RoundRuntime,
  next_token: u64,
  round_elapsed: u32,
  elapsed: u32,
  completed_rounds: usize,
  skipped_rounds: usize,
}

impl AttentionSession {
  pub fn new(seed: u64, timing: TimingCfg) -> Self {
    Self::with_rng(StdRng::seed_from_u64(seed), timing)
  }

  pub fn from_entropy(timing: TimingCfg) -> Self {
    Self::with_rng(StdRng::from_entropy(), timing)
  }

  fn with_rng(rng: StdRng, timing: TimingCfg) -> Self {
    Self {
      rng,
      timing,
      difficulty: None,
      rounds: Vec::new(),
      index: 0,
      phase: Phase::SelectingDifficulty,
      runtime: RoundRuntime::default(),
      next_token: 0,
      round_elapsed: 0,
      elapsed: 0,
      completed_rounds: 0,
      skipped_rounds: 0,
    }
  }

  pub fn phase(&self) -> Phase { self.phase }
  pub fn difficulty(&self) -> Option<Difficulty> { self.difficulty }
  pub fn runtime(&self) -> &RoundRuntime { &self.runtime }
  pub fn round_index(&self) -> usize { self.index }
  pub fn round_count(&self) -> usize { self.rounds.len() }
  pub fn elapsed_secs(&self) -> u32 { self.elapsed }

  pub fn current_round(&self) -> Option<&Round> {
    match self.phase {
      Phase::SelectingDifficulty | Phase::SessionCompleted => None,
      _ => self.rounds.get(self.index),
    }
  }

  /// Choose a difficulty: build the round list and enter round 0.
  /// Only valid on the selection screen or after a finished session.
  pub fn start(&mut self, bank: &TemplateBank, difficulty: Difficulty, config: &DifficultyConfig) -> Vec<Effect> {
    let rounds = build_session(bank, difficulty, config, &mut self.rng);
    self.start_with_rounds(difficulty, rounds)
  }

  pub fn start_with_rounds(&mut self, difficulty: Difficulty, rounds: Vec<Round>) -> Vec<Effect> {
    if !matches!(self.phase, Phase::SelectingDifficulty | Phase::SessionCompleted) {
      debug!(target: "attention", phase = ?self.phase, "Ignoring start outside selection");
      return Vec::new();
    }
    if rounds.is_empty() {
      debug!(target: "attention", "Ignoring start with no rounds");
      return Vec::new();
    }
    info!(target: "attention", difficulty = difficulty.as_str(), rounds = rounds.len(), "Session started");
    self.difficulty = Some(difficulty);
    self.rounds = rounds;
    self.index = 0;
    self.elapsed = 0;
    self.completed_rounds = 0;
    self.skipped_rounds = 0;
    self.round_elapsed = 0;
    vec![self.enter_round()]
  }

  fn enter_round(&mut self) -> Effect {
    let time_left = self.rounds.get(self.index).map_or(0, |r| r.time_limit_secs);
    self.runtime = RoundRuntime { time_left, timer_active: true, ..RoundRuntime::default() };
    self.phase = Phase::RoundActive;
    Effect::StartTicker
  }

  fn token(&mut self) -> u64 {
    self.next_token += 1;
    self.next_token
  }

  /// One elapsed second.
  pub fn tick(&mut self) -> Vec<Effect> {
    if self.phase != Phase::RoundActive || !self.runtime.timer_active || self.runtime.time_left == 0 {
      return Vec::new();
    }
    self.runtime.time_left -= 1;
    self.round_elapsed += 1;
    self.elapsed += 1;
    if self.runtime.time_left > 0 {
      return Vec::new();
    }

    self.phase = Phase::RoundTimedOut;
    self.runtime.timer_active = false;
    self.runtime.timed_out = true;
    self.runtime.encouragement = ENCOURAGEMENTS.choose(&mut self.rng).copied();
    info!(target: "attention", round = self.index, found = self.current_found(), "Round timed out");
    vec![Effect::StopTicker]
  }

  fn current_found(&self) -> usize {
    self.rounds.get(self.index).map_or(0, Round::found_count)
  }

  pub fn tap(&mut self, item_id: usize) -> Vec<Effect> {
    if self.phase != Phase::RoundActive {
      return Vec::new();
    }
    let Some(item) = self.rounds.get(self.index).and_then(|r| r.items.get(item_id)) else { return Vec::new() };
    if item.found {
      return Vec::new();
    }
    let is_target = item.is_target;

    let token = self.token();
    let marker = Marker { item_id, token };
    let clear = Effect::Schedule { after: self.timing.marker(), event: Deferred::ClearMarker(token) };
    if !is_target {
      self.runtime.shake = Some(marker);
      return vec![clear];
    }

    let all_found = match self.rounds.get_mut(self.index) {
      Some(round) => {
        if let Some(item) = round.items.get_mut(item_id) {
          item.found = true;
        }
        round.all_found()
      }
      None => false,
    };
    self.runtime.glow = Some(marker);
    if !all_found {
      return vec![clear];
    }

    self.phase = Phase::RoundSucceeded;
    self.runtime.timer_active = false;
    self.completed_rounds += 1;
    info!(target: "attention", round = self.index, time_left = self.runtime.time_left, "Round succeeded");
    vec![
      clear,
      Effect::StopTicker,
      Effect::Record(self.round_draft(RoundOutcome::Completed)),
      Effect::Schedule { after: self.timing.success_delay(), event: Deferred::AdvanceRound(self.index) },
    ]
  }

  /// Deferred marker clear. Only the newest marker's token clears it.
  pub fn clear_marker(&mut self, token: u64) -> bool {
    let mut changed = false;
    if self.runtime.shake.is_some_and(|m| m.token == token) {
      self.runtime.shake = None;
      changed = true;
    }
    if self.runtime.glow.is_some_and(|m| m.token == token) {
      self.runtime.glow = None;
      changed = true;
    }
    changed
  }

  /// Deferred advance after the success delay; stale or repeated calls do nothing.
  pub fn on_success_delay(&mut self, round: usize) -> Vec<Effect> {
    if self.phase != Phase::RoundSucceeded || self.index != round {
      return Vec::new();
    }
    self.next_round()
  }

  /// Replay the timed-out round with fresh flags and a full timer.
  pub fn retry(&mut self) -> Vec<Effect> {
    if self.phase != Phase::RoundTimedOut {
      return Vec::new();
    }
    if let Some(round) = self.rounds.get_mut(self.index) {
      round.reset_found();
    }
    info!(target: "attention", round = self.index, "Round retried");
    vec![self.enter_round()]
  }

  /// Move on from a finished round. From a timeout the round counts as skipped.
  pub fn advance(&mut self) -> Vec<Effect> {
    match self.phase {
      Phase::RoundSucceeded => self.next_round(),
      Phase::RoundTimedOut => {
        self.skipped_rounds += 1;
        let mut effects = vec![Effect::Record(self.round_draft(RoundOutcome::Skipped))];
        effects.extend(self.next_round());
        effects
      }
      _ => Vec::new(),
    }
  }

  fn next_round(&mut self) -> Vec<Effect> {
    if self.index + 1 < self.rounds.len() {
      self.index += 1;
      self.round_elapsed = 0;
      return vec![self.enter_round()];
    }

    self.phase = Phase::SessionCompleted;
    self.runtime = RoundRuntime::default();
    info!(target: "attention", completed = self.completed_rounds, skipped = self.skipped_rounds, elapsed = self.elapsed, "Session completed");
    vec![
      Effect::StopTicker,
      Effect::CancelDeferred,
      Effect::Record(self.session_draft()),
      Effect::Completed,
      Effect::Navigate,
    ]
  }

  /// Leave the activity from any phase and return to the selection screen.
  pub fn exit(&mut self) -> Vec<Effect> {
    if self.phase != Phase::SelectingDifficulty {
      info!(target: "attention", phase = ?self.phase, round = self.index, "Session exited");
    }
    self.phase = Phase::SelectingDifficulty;
    self.difficulty = None;
    self.rounds.clear();
    self.index = 0;
    self.runtime = RoundRuntime::default();
    vec![Effect::StopTicker, Effect::CancelDeferred, Effect::Navigate]
  }

  fn round_draft(&self, outcome: RoundOutcome) -> MomentDraft {
    let round = self.rounds.get(self.index);
    MomentDraft {
      activity_type: ACTIVITY_ROUND,
      duration_seconds: self.round_elapsed,
      metadata: json!({
        "difficulty": self.difficulty.map(Difficulty::as_str),
        "round": self.index,
        "kind": round.map(|r| r.kind),
        "outcome": outcome,
        "found": self.current_found(),
        "targets": round.map_or(0, |r| r.target_count),
      }),
    }
  }

  fn session_draft(&self) -> MomentDraft {
    MomentDraft {
      activity_type: ACTIVITY_SESSION,
      duration_seconds: self.elapsed,
      metadata: json!({
        "difficulty": self.difficulty.map(Difficulty::as_str),
        "rounds": self.rounds.len(),
        "completed": self.completed_rounds,
        "skipped": self.skipped_rounds,
      }),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bank::Template;
  use crate::domain::{Color, Shape, ShapePattern, TargetSpec};
  use crate::generator::generate_round;
  use std::time::Duration;

  fn easy_rounds(n: usize) -> Vec<Round> {
    let config = DifficultyConfig::defaults(Difficulty::Easy);
    let template = Template::new(TargetSpec::Shape(ShapePattern {
      shape: Some(Shape::Circle),
      color: Some(Color::Blue),
      size: None,
    }))
    .unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    (0..n).map(|id| generate_round(&template, &config, id, &mut rng)).collect()
  }

  fn started(n: usize) -> AttentionSession {
    let mut s = AttentionSession::new(1, TimingCfg::default());
    let effects = s.start_with_rounds(Difficulty::Easy, easy_rounds(n));
    assert_eq!(effects, vec![Effect::StartTicker]);
    s
  }

  fn ids(s: &AttentionSession, targets: bool) -> Vec<usize> {
    s.current_round().unwrap().items.iter().filter(|i| i.is_target == targets).map(|i| i.id).collect()
  }

  #[test]
  fn starts_in_selection() {
    let s = AttentionSession::new(0, TimingCfg::default());
    assert_eq!(s.phase(), Phase::SelectingDifficulty);
    assert!(s.current_round().is_none());
  }

  #[test]
  fn finding_both_targets_succeeds_then_advances() {
    let mut s = started(2);
    let targets = ids(&s, true);
    assert_eq!(targets.len(), 2);
    for _ in 0..5 {
      s.tick();
    }

    let first = s.tap(targets[0]);
    assert_eq!(first, vec![Effect::Schedule { after: Duration::from_millis(400), event: Deferred::ClearMarker(1) }]);
    assert_eq!(s.runtime().glow, Some(Marker { item_id: targets[0], token: 1 }));
    assert_eq!(s.phase(), Phase::RoundActive);

    let second = s.tap(targets[1]);
    assert_eq!(s.phase(), Phase::RoundSucceeded);
    assert!(!s.runtime().timer_active);
    assert!(second.contains(&Effect::StopTicker));
    assert!(second.contains(&Effect::Schedule { after: Duration::from_millis(700), event: Deferred::AdvanceRound(0) }));
    assert!(second.iter().any(|e| matches!(e, Effect::Record(d) if d.activity_type == ACTIVITY_ROUND)));

    assert_eq!(s.on_success_delay(0), vec![Effect::StartTicker]);
    assert_eq!(s.phase(), Phase::RoundActive);
    assert_eq!(s.round_index(), 1);
    assert_eq!(s.runtime().time_left, 20);
    // A second delivery of the same deferred event is stale.
    assert!(s.on_success_delay(0).is_empty());
  }

  #[test]
  fn succeeded_round_is_sealed() {
    let mut s = started(2);
    let targets = ids(&s, true);
    let distractors = ids(&s, false);
    s.tap(targets[0]);
    s.tap(targets[1]);
    let before = s.runtime().clone();
    assert!(s.tap(distractors[0]).is_empty());
    assert!(s.tap(targets[0]).is_empty());
    assert!(s.tick().is_empty());
    assert_eq!(s.runtime(), &before);
  }

  #[test]
  fn tapping_found_item_is_a_noop() {
    let mut s = started(1);
    let targets = ids(&s, true);
    s.tap(targets[0]);
    s.tick();
    let before = s.runtime().clone();
    assert!(s.tap(targets[0]).is_empty());
    assert_eq!(s.runtime(), &before);
  }

  #[test]
  fn distractor_tap_shakes_and_newest_marker_wins() {
    let mut s = started(1);
    let distractors = ids(&s, false);
    s.tap(distractors[0]);
    s.tap(distractors[1]);
    assert_eq!(s.runtime().shake, Some(Marker { item_id: distractors[1], token: 2 }));
    assert!(!s.clear_marker(1));
    assert!(s.runtime().shake.is_some());
    assert!(s.clear_marker(2));
    assert!(s.runtime().shake.is_none());
    assert!(!s.clear_marker(2));
    assert_eq!(s.phase(), Phase::RoundActive);
  }

  #[test]
  fn out_of_range_tap_is_ignored() {
    let mut s = started(1);
    assert!(s.tap(99).is_empty());
  }

  #[test]
  fn timeout_happens_once_and_timer_floors_at_zero() {
    let mut s = started(2);
    let targets = ids(&s, true);
    s.tap(targets[0]);
    let mut stops = 0;
    for _ in 0..25 {
      stops += s.tick().iter().filter(|e| **e == Effect::StopTicker).count();
    }
    assert_eq!(stops, 1);
    assert_eq!(s.phase(), Phase::RoundTimedOut);
    assert_eq!(s.runtime().time_left, 0);
    assert!(s.runtime().timed_out);
    assert!(s.runtime().encouragement.is_some_and(|m| ENCOURAGEMENTS.contains(&m)));
    assert!(s.tap(targets[1]).is_empty());
  }

  #[test]
  fn retry_resets_found_and_timer() {
    let mut s = started(2);
    let targets = ids(&s, true);
    s.tap(targets[0]);
    for _ in 0..20 {
      s.tick();
    }
    assert_eq!(s.retry(), vec![Effect::StartTicker]);
    assert_eq!(s.phase(), Phase::RoundActive);
    assert_eq!(s.round_index(), 0);
    assert_eq!(s.runtime().time_left, 20);
    assert!(s.runtime().glow.is_none());
    assert!(!s.runtime().timed_out);
    assert_eq!(s.current_round().unwrap().found_count(), 0);
  }

  #[test]
  fn advance_from_timeout_skips_round() {
    let mut s = started(2);
    for _ in 0..20 {
      s.tick();
    }
    let effects = s.advance();
    assert!(effects.iter().any(|e| matches!(e, Effect::Record(d) if d.metadata["outcome"] == "skipped")));
    assert!(effects.contains(&Effect::StartTicker));
    assert_eq!(s.round_index(), 1);
    assert_eq!(s.phase(), Phase::RoundActive);
  }

  #[test]
  fn advancing_from_last_round_completes() {
    let mut s = started(1);
    for _ in 0..20 {
      s.tick();
    }
    let effects = s.advance();
    assert_eq!(s.phase(), Phase::SessionCompleted);
    assert!(effects.contains(&Effect::Completed));
    assert!(effects.contains(&Effect::Navigate));
    let session = effects.iter().find_map(|e| match e {
      Effect::Record(d) if d.activity_type == ACTIVITY_SESSION => Some(d.clone()),
      _ => None,
    });
    let session = session.unwrap();
    assert_eq!(session.duration_seconds, 20);
    assert_eq!(session.metadata["skipped"], 1);
    // Terminal until a new start.
    assert!(s.advance().is_empty());
    assert!(s.retry().is_empty());
    assert!(s.tick().is_empty());
  }

  #[test]
  fn restart_after_completion() {
    let mut s = started(1);
    let targets = ids(&s, true);
    s.tap(targets[0]);
    s.tap(targets[1]);
    s.on_success_delay(0);
    assert_eq!(s.phase(), Phase::SessionCompleted);
    assert_eq!(s.start_with_rounds(Difficulty::Easy, easy_rounds(1)), vec![Effect::StartTicker]);
    assert_eq!(s.phase(), Phase::RoundActive);
  }

  #[test]
  fn start_is_ignored_mid_session() {
    let mut s = started(2);
    assert!(s.start_with_rounds(Difficulty::Hard, easy_rounds(1)).is_empty());
    assert_eq!(s.difficulty(), Some(Difficulty::Easy));
  }

  #[test]
  fn exit_returns_to_selection() {
    let mut s = started(2);
    let effects = s.exit();
    assert_eq!(effects, vec![Effect::StopTicker, Effect::CancelDeferred, Effect::Navigate]);
    assert_eq!(s.phase(), Phase::SelectingDifficulty);
    assert!(s.tick().is_empty());
  }

  #[test]
  fn seeded_sessions_build_identical_rounds() {
    let bank = TemplateBank::builtin().unwrap();
    let config = DifficultyConfig::defaults(Difficulty::Hard);
    let mut a = AttentionSession::new(9, TimingCfg::default());
    let mut b = AttentionSession::new(9, TimingCfg::default());
    a.start(&bank, Difficulty::Hard, &config);
    b.start(&bank, Difficulty::Hard, &config);
    assert_eq!(a.round_count(), 10);
    assert_eq!(a.current_round(), b.current_round());
  }
}
