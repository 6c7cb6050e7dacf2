//! "Do Nothing": one minute of stillness. Touching the screen while the timer
//! runs shows a short reminder instead of doing anything.

use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::effect::{Deferred, Effect};
use crate::tracker::MomentDraft;

pub const ACTIVITY: &str = "do_nothing";
pub const STILLNESS_SECS: u32 = 60;
pub const REMINDER: &str = "Just be still. You're doing great.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StillnessTimer {
  pub duration_secs: u32,
  pub time_left: u32,
  pub running: bool,
  pub completed: bool,
  pub reminder: Option<&'static str>,
  pub interruptions: u32,
  #[serde(skip)]
  reminder_token: u64,
  #[serde(skip)]
  reminder_delay: Duration,
}

impl StillnessTimer {
  pub fn new(duration_secs: u32, reminder_delay: Duration) -> Self {
    Self {
      duration_secs,
      time_left: duration_secs,
      running: false,
      completed: false,
      reminder: None,
      interruptions: 0,
      reminder_token: 0,
      reminder_delay,
    }
  }

  pub fn start(&mut self) -> Vec<Effect> {
    if self.running || self.completed {
      return Vec::new();
    }
    self.running = true;
    vec![Effect::StartTicker]
  }

  pub fn tick(&mut self) -> Vec<Effect> {
    if !self.running || self.time_left == 0 {
      return Vec::new();
    }
    self.time_left -= 1;
    if self.time_left > 0 {
      return Vec::new();
    }
    self.running = false;
    self.completed = true;
    self.reminder = None;
    info!(target: "activity", activity = ACTIVITY, interruptions = self.interruptions, "Stillness completed");
    vec![
      Effect::StopTicker,
      Effect::CancelDeferred,
      Effect::Record(MomentDraft {
        activity_type: ACTIVITY,
        duration_seconds: self.duration_secs,
        metadata: json!({ "interruptions": self.interruptions }),
      }),
      Effect::Completed,
    ]
  }

  pub fn interact(&mut self) -> Vec<Effect> {
    if !self.running {
      return Vec::new();
    }
    self.interruptions += 1;
    self.reminder_token += 1;
    self.reminder = Some(REMINDER);
    vec![Effect::Schedule { after: self.reminder_delay, event: Deferred::ClearMarker(self.reminder_token) }]
  }

  pub fn clear_reminder(&mut self, token: u64) -> bool {
    if token == self.reminder_token && self.reminder.is_some() {
      self.reminder = None;
      return true;
    }
    false
  }

  /// Fraction of the minute already spent, 0.0..=1.0.
  pub fn progress(&self) -> f32 {
    if self.duration_secs == 0 {
      return 1.0;
    }
    (self.duration_secs - self.time_left) as f32 / self.duration_secs as f32
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn timer() -> StillnessTimer {
    StillnessTimer::new(3, Duration::from_millis(2500))
  }

  #[test]
  fn counts_down_and_completes_once() {
    let mut t = timer();
    assert_eq!(t.start(), vec![Effect::StartTicker]);
    assert!(t.tick().is_empty());
    assert!(t.tick().is_empty());
    let done = t.tick();
    assert!(done.contains(&Effect::Completed));
    assert!(t.completed);
    assert_eq!(t.progress(), 1.0);
    assert!(t.tick().is_empty());
    assert!(t.start().is_empty());
  }

  #[test]
  fn newest_reminder_wins() {
    let mut t = timer();
    t.start();
    t.interact();
    t.interact();
    assert_eq!(t.interruptions, 2);
    assert!(!t.clear_reminder(1));
    assert_eq!(t.reminder, Some(REMINDER));
    assert!(t.clear_reminder(2));
    assert_eq!(t.reminder, None);
  }

  #[test]
  fn interaction_before_start_is_ignored() {
    let mut t = timer();
    assert!(t.interact().is_empty());
    assert_eq!(t.interruptions, 0);
  }
}
