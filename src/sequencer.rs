//! Challenge sequencer: turn a difficulty into the session's fixed list of rounds.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, instrument};

use crate::bank::TemplateBank;
use crate::domain::{Difficulty, DifficultyConfig, Round};
use crate::generator::generate_round;

/// Template indices for `n` rounds: shuffle the tier once and slice it.
/// When `n` exceeds the tier, continue with freshly shuffled decks, never
/// putting the same template on both sides of a deck boundary when avoidable.
pub fn pick_template_indices<R: Rng + ?Sized>(tier_len: usize, n: usize, rng: &mut R) -> Vec<usize> {
  let mut order = Vec::with_capacity(n);
  if tier_len == 0 {
    return order;
  }
  while order.len() < n {
    let mut deck: Vec<usize> = (0..tier_len).collect();
    deck.shuffle(rng);
    if tier_len > 1 && order.last() == deck.first() {
      let swap_with = rng.gen_range(1..tier_len);
      deck.swap(0, swap_with);
    }
    let take = (n - order.len()).min(tier_len);
    order.extend_from_slice(&deck[..take]);
  }
  order
}

/// Generate every round of a session, in play order, with ids `0..config.rounds`.
#[instrument(level = "debug", skip(bank, config, rng), fields(difficulty = difficulty.as_str(), rounds = config.rounds))]
pub fn build_session<R: Rng + ?Sized>(
  bank: &TemplateBank,
  difficulty: Difficulty,
  config: &DifficultyConfig,
  rng: &mut R,
) -> Vec<Round> {
  let templates = bank.templates(difficulty);
  let order = pick_template_indices(templates.len(), config.rounds, rng);
  debug!(target: "attention", ?order, tier = templates.len(), "Selected templates");
  order
    .into_iter()
    .enumerate()
    .map(|(round_id, idx)| generate_round(&templates[idx], config, round_id, rng))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use std::collections::HashSet;

  #[test]
  fn first_deck_has_no_repeats() {
    let mut rng = StdRng::seed_from_u64(5);
    let order = pick_template_indices(10, 10, &mut rng);
    let unique: HashSet<_> = order.iter().collect();
    assert_eq!(unique.len(), 10);
  }

  #[test]
  fn wraps_around_without_adjacent_repeats() {
    for seed in 0..200 {
      let mut rng = StdRng::seed_from_u64(seed);
      let order = pick_template_indices(3, 10, &mut rng);
      assert_eq!(order.len(), 10);
      assert!(order.windows(2).all(|w| w[0] != w[1]), "seed {seed}: {order:?}");
      for deck in order.chunks(3).filter(|c| c.len() == 3) {
        assert_eq!(deck.iter().collect::<HashSet<_>>().len(), 3);
      }
    }
  }

  #[test]
  fn single_template_tier_repeats() {
    let mut rng = StdRng::seed_from_u64(0);
    assert_eq!(pick_template_indices(1, 3, &mut rng), vec![0, 0, 0]);
    assert!(pick_template_indices(0, 3, &mut rng).is_empty());
  }

  #[test]
  fn session_rounds_are_ordered_and_reproducible() {
    let bank = TemplateBank::builtin().unwrap();
    let config = DifficultyConfig::defaults(Difficulty::Medium);
    let a = build_session(&bank, Difficulty::Medium, &config, &mut StdRng::seed_from_u64(11));
    let b = build_session(&bank, Difficulty::Medium, &config, &mut StdRng::seed_from_u64(11));
    assert_eq!(a.len(), config.rounds);
    assert_eq!(a.iter().map(|r| r.id).collect::<Vec<_>>(), (0..config.rounds).collect::<Vec<_>>());
    assert_eq!(a, b);
  }
}
