//! "End the Loop": a single binary reflection with a fixed response per answer.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::tracker::MomentDraft;

pub const ACTIVITY: &str = "end_the_loop";
pub const QUESTION: &str = "Does this feel like the same loop?";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopChoice {
  New,
  Same,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Reflection {
  pub title: &'static str,
  pub message: &'static str,
}

pub fn respond(choice: LoopChoice) -> Reflection {
  match choice {
    LoopChoice::New => Reflection {
      title: "Something new",
      message: "This awareness is progress. Noticing something different means you're paying attention to your patterns.",
    },
    LoopChoice::Same => Reflection {
      title: "The same loop",
      message: "Recognition is the first step out. You've been here before, and you can choose differently this time.",
    },
  }
}

pub fn moment(choice: LoopChoice) -> MomentDraft {
  MomentDraft { activity_type: ACTIVITY, duration_seconds: 0, metadata: json!({ "choice": choice }) }
}
