//! Side effects requested by the activity state machines.
//!
//! The machines never touch clocks or IO themselves. Each transition returns a
//! list of effects and the WebSocket runner performs them: it owns the 1 s
//! ticker, sleeps for deferred events, and forwards records to the tracker.

use std::time::Duration;

use crate::tracker::MomentDraft;

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
  /// Start (or restart) the one-second ticker.
  StartTicker,
  StopTicker,
  /// Feed `event` back into the machine once `after` has elapsed.
  Schedule { after: Duration, event: Deferred },
  /// Drop every pending deferred event.
  CancelDeferred,
  Record(MomentDraft),
  Completed,
  /// Return to the parent screen.
  Navigate,
}

/// Events the runner feeds back after a delay. Stale ones are ignored by the machines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deferred {
  ClearMarker(u64),
  AdvanceRound(usize),
  FinishSort,
}
