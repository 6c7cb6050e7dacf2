//! "Compulsion Picker": four gentle micro-actions to do instead.

use serde::Serialize;
use serde_json::json;

use crate::tracker::MomentDraft;

pub const ACTIVITY: &str = "compulsion_picker";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MicroAction {
  pub id: &'static str,
  pub title: &'static str,
  pub encouragement: &'static str,
}

pub const ACTIONS: &[MicroAction] = &[
  MicroAction {
    id: "breathe",
    title: "Take 3 deep breaths",
    encouragement: "Inhale calm, exhale tension. You're resetting your nervous system.",
  },
  MicroAction {
    id: "stretch",
    title: "Stretch your hands",
    encouragement: "Release the grip. Your body holds onto stress, so let it go.",
  },
  MicroAction {
    id: "window",
    title: "Look out a window",
    encouragement: "Give your eyes distance. The world is bigger than this moment.",
  },
  MicroAction {
    id: "water",
    title: "Drink some water",
    encouragement: "Nourish yourself. Small acts of care add up.",
  },
];

pub fn find(id: &str) -> Option<&'static MicroAction> {
  ACTIONS.iter().find(|a| a.id == id)
}

pub fn moment(action: &MicroAction) -> MomentDraft {
  MomentDraft { activity_type: ACTIVITY, duration_seconds: 0, metadata: json!({ "action": action.id }) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn finds_known_actions_only() {
    assert_eq!(find("water").map(|a| a.title), Some("Drink some water"));
    assert!(find("scroll").is_none());
  }
}
