//! "Label the Noise": sort six common intrusive experiences into
//! thought / feeling / urge.

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::effect::{Deferred, Effect};
use crate::tracker::MomentDraft;
use crate::util::fill_template;

pub const ACTIVITY: &str = "label_the_noise";
pub const CARDS_PER_CATEGORY: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseCategory {
  Thought,
  Feeling,
  Urge,
}

impl NoiseCategory {
  pub const ALL: [NoiseCategory; 3] = [NoiseCategory::Thought, NoiseCategory::Feeling, NoiseCategory::Urge];

  pub fn label(self) -> &'static str {
    match self {
      NoiseCategory::Thought => "Thought",
      NoiseCategory::Feeling => "Feeling",
      NoiseCategory::Urge => "Urge",
    }
  }
}

const CARD_POOL: &[(&str, NoiseCategory)] = &[
  ("I should check my phone", NoiseCategory::Urge),
  ("I need to do something", NoiseCategory::Urge),
  ("I want to wash my hands again", NoiseCategory::Urge),
  ("I should double-check the door", NoiseCategory::Urge),
  ("I need to fix this right now", NoiseCategory::Urge),
  ("I have to count this again", NoiseCategory::Urge),
  ("I should look this up online", NoiseCategory::Urge),
  ("I need reassurance from someone", NoiseCategory::Urge),
  ("I feel restless", NoiseCategory::Feeling),
  ("I'm anxious about tomorrow", NoiseCategory::Feeling),
  ("I feel uncertain", NoiseCategory::Feeling),
  ("I'm uncomfortable with this", NoiseCategory::Feeling),
  ("I feel overwhelmed", NoiseCategory::Feeling),
  ("I'm frustrated with myself", NoiseCategory::Feeling),
  ("I feel on edge", NoiseCategory::Feeling),
  ("I'm scared something bad will happen", NoiseCategory::Feeling),
  ("What if I forget something?", NoiseCategory::Thought),
  ("This is taking too long", NoiseCategory::Thought),
  ("Did I do that correctly?", NoiseCategory::Thought),
  ("Something doesn't feel right", NoiseCategory::Thought),
  ("Maybe I should start over", NoiseCategory::Thought),
  ("What if this isn't good enough?", NoiseCategory::Thought),
  ("I can't stop thinking about this", NoiseCategory::Thought),
  ("Am I sure I turned that off?", NoiseCategory::Thought),
];

const APPRECIATIONS: &[&str] = &[
  "Well noticed! 🌟",
  "That's right! ✨",
  "Great awareness! 💫",
  "You got it! 🌿",
  "Exactly right! 💙",
];

const REDIRECT: &str = "This belongs in \"{label}\" 💙";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NoiseCard {
  pub id: usize,
  pub text: &'static str,
  #[serde(skip)]
  pub category: NoiseCategory,
  pub placed_in: Option<NoiseCategory>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Feedback {
  pub card_id: usize,
  pub correct: bool,
  pub message: String,
  #[serde(skip)]
  token: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct NoiseSorter {
  pub cards: Vec<NoiseCard>,
  pub feedback: Option<Feedback>,
  pub completed: bool,
  pub mistakes: u32,
  #[serde(skip)]
  finishing: bool,
  #[serde(skip)]
  next_token: u64,
  #[serde(skip)]
  feedback_delay: Duration,
  #[serde(skip)]
  finish_delay: Duration,
}

/// Two random cards from each category, shuffled, ids renumbered from 1.
pub fn deal<R: Rng + ?Sized>(rng: &mut R) -> Vec<NoiseCard> {
  let mut hand: Vec<(&'static str, NoiseCategory)> = Vec::with_capacity(CARDS_PER_CATEGORY * 3);
  for category in NoiseCategory::ALL {
    let mut pool: Vec<_> = CARD_POOL.iter().copied().filter(|(_, c)| *c == category).collect();
    pool.shuffle(rng);
    hand.extend(pool.into_iter().take(CARDS_PER_CATEGORY));
  }
  hand.shuffle(rng);
  hand
    .into_iter()
    .enumerate()
    .map(|(idx, (text, category))| NoiseCard { id: idx + 1, text, category, placed_in: None })
    .collect()
}

impl NoiseSorter {
  pub fn new<R: Rng + ?Sized>(rng: &mut R, feedback_delay: Duration, finish_delay: Duration) -> Self {
    Self {
      cards: deal(rng),
      feedback: None,
      completed: false,
      mistakes: 0,
      finishing: false,
      next_token: 0,
      feedback_delay,
      finish_delay,
    }
  }

  pub fn sorted_count(&self) -> usize {
    self.cards.iter().filter(|c| c.placed_in.is_some()).count()
  }

  pub fn place<R: Rng + ?Sized>(&mut self, card_id: usize, category: NoiseCategory, rng: &mut R) -> Vec<Effect> {
    if self.finishing || self.completed {
      return Vec::new();
    }
    let Some(card) = self.cards.iter_mut().find(|c| c.id == card_id) else { return Vec::new() };
    if card.placed_in.is_some() {
      return Vec::new();
    }

    let correct = card.category == category;
    let message = if correct {
      card.placed_in = Some(category);
      APPRECIATIONS.choose(rng).copied().unwrap_or("Well noticed!").to_string()
    } else {
      fill_template(REDIRECT, &[("label", card.category.label())])
    };
    if !correct {
      self.mistakes += 1;
    }

    self.next_token += 1;
    let token = self.next_token;
    self.feedback = Some(Feedback { card_id, correct, message, token });
    let mut effects = vec![Effect::Schedule { after: self.feedback_delay, event: Deferred::ClearMarker(token) }];

    if correct && self.cards.iter().all(|c| c.placed_in.is_some()) {
      self.finishing = true;
      effects.push(Effect::Schedule { after: self.finish_delay, event: Deferred::FinishSort });
    }
    effects
  }

  pub fn clear_feedback(&mut self, token: u64) -> bool {
    if self.feedback.as_ref().is_some_and(|f| f.token == token) {
      self.feedback = None;
      return true;
    }
    false
  }

  pub fn finish(&mut self, elapsed_secs: u32) -> Vec<Effect> {
    if !self.finishing || self.completed {
      return Vec::new();
    }
    self.completed = true;
    // The pending clear is cancelled below, so drop the last toast now.
    self.feedback = None;
    info!(target: "activity", activity = ACTIVITY, mistakes = self.mistakes, "Sorting completed");
    vec![
      Effect::CancelDeferred,
      Effect::Record(MomentDraft {
        activity_type: ACTIVITY,
        duration_seconds: elapsed_secs,
        metadata: json!({ "cards": self.cards.len(), "mistakes": self.mistakes }),
      }),
      Effect::Completed,
    ]
  }
}
