//! Round generator: realize a template into a shuffled item grid.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::bank::Template;
use crate::domain::{domain, DifficultyConfig, Item, ItemAttrs, Round};

/// Draws per distractor before falling back to the template's known non-match.
pub const MAX_DISTRACTOR_ATTEMPTS: usize = 100;

/// Rejection-sample a full attribute combination that does NOT satisfy the template.
pub fn sample_distractor<R: Rng + ?Sized>(template: &Template, all: &[ItemAttrs], rng: &mut R) -> ItemAttrs {
  for _ in 0..MAX_DISTRACTOR_ATTEMPTS {
    if let Some(candidate) = all.choose(rng) {
      if !template.spec().matches(candidate) {
        return *candidate;
      }
    }
  }
  debug!(target: "attention", template = %template.spec().description(), "Distractor sampling exhausted; using fallback");
  template.fallback_distractor()
}

/// `count` targets from the matching set, distinct while the set is large enough.
/// A set smaller than `count` is used in full and topped up with uniform repeats.
pub fn draw_targets<R: Rng + ?Sized>(matching: &[ItemAttrs], count: usize, rng: &mut R) -> Vec<ItemAttrs> {
  let mut targets: Vec<ItemAttrs> = matching.choose_multiple(rng, count).copied().collect();
  while targets.len() < count {
    match matching.choose(rng) {
      Some(attrs) => targets.push(*attrs),
      None => break,
    }
  }
  targets
}

/// Build one round: `targets` matching items, `grid_size - targets` distractors,
/// shuffled, with ids reassigned `0..grid_size` after the shuffle.
pub fn generate_round<R: Rng + ?Sized>(
  template: &Template,
  config: &DifficultyConfig,
  round_id: usize,
  rng: &mut R,
) -> Round {
  let spec = template.spec();
  let all = domain(spec.kind());
  let matching = template.matching();

  let mut items = Vec::with_capacity(config.grid_size);
  for attrs in draw_targets(matching, config.targets, rng) {
    items.push(Item { id: 0, attrs, is_target: true, found: false });
  }
  for _ in config.targets..config.grid_size {
    let attrs = sample_distractor(template, &all, rng);
    items.push(Item { id: 0, attrs, is_target: false, found: false });
  }

  items.shuffle(rng);
  for (idx, item) in items.iter_mut().enumerate() {
    item.id = idx;
  }

  Round {
    id: round_id,
    kind: spec.kind(),
    instruction: spec.instruction(),
    target_description: spec.description(),
    items,
    target_count: config.targets,
    time_limit_secs: config.time_limit_secs,
  }
}
