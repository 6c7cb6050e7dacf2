//! Domain models for the Attention Switch engine: difficulty tiers, attribute
//! domains, target specs, items and rounds.

use serde::{Deserialize, Serialize};

/// Difficulty tier chosen on the selection screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

  pub fn as_str(self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    }
  }

  pub fn parse(value: &str) -> Option<Self> {
    match value.trim().to_ascii_lowercase().as_str() {
      "easy" => Some(Difficulty::Easy),
      "medium" => Some(Difficulty::Medium),
      "hard" => Some(Difficulty::Hard),
      _ => None,
    }
  }
}

/// Everything a difficulty decides. Immutable once a session has started.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DifficultyConfig {
  pub rounds: usize,
  pub grid_size: usize,
  pub targets: usize,
  pub time_limit_secs: u32,
  pub theme: String,
}

impl DifficultyConfig {
  pub fn defaults(difficulty: Difficulty) -> Self {
    let (rounds, grid_size, targets, time_limit_secs, theme) = match difficulty {
      Difficulty::Easy => (10, 6, 2, 20, "mint"),
      Difficulty::Medium => (10, 9, 3, 25, "lavender"),
      Difficulty::Hard => (10, 12, 4, 30, "peach"),
    };
    Self { rounds, grid_size, targets, time_limit_secs, theme: theme.into() }
  }

  /// `1 <= targets < grid_size`, at least one round, non-zero time limit.
  pub fn is_valid(&self) -> bool {
    self.rounds >= 1 && self.targets >= 1 && self.targets < self.grid_size && self.time_limit_secs > 0
  }
}

/// One configuration record per difficulty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DifficultyTable {
  pub easy: DifficultyConfig,
  pub medium: DifficultyConfig,
  pub hard: DifficultyConfig,
}

impl Default for DifficultyTable {
  fn default() -> Self {
    Self {
      easy: DifficultyConfig::defaults(Difficulty::Easy),
      medium: DifficultyConfig::defaults(Difficulty::Medium),
      hard: DifficultyConfig::defaults(Difficulty::Hard),
    }
  }
}

impl DifficultyTable {
  pub fn get(&self, difficulty: Difficulty) -> &DifficultyConfig {
    match difficulty {
      Difficulty::Easy => &self.easy,
      Difficulty::Medium => &self.medium,
      Difficulty::Hard => &self.hard,
    }
  }

  pub fn get_mut(&mut self, difficulty: Difficulty) -> &mut DifficultyConfig {
    match difficulty {
      Difficulty::Easy => &mut self.easy,
      Difficulty::Medium => &mut self.medium,
      Difficulty::Hard => &mut self.hard,
    }
  }
}

/// A closed attribute domain with a stable lowercase name per value.
pub trait Attribute: Copy + Eq + 'static {
  const ALL: &'static [Self];

  fn as_str(self) -> &'static str;

  fn parse(value: &str) -> Option<Self> {
    let wanted = value.trim().to_ascii_lowercase();
    Self::ALL.iter().copied().find(|v| v.as_str() == wanted)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
  Circle,
  Square,
  Triangle,
  Star,
  Heart,
}

impl Attribute for Shape {
  const ALL: &'static [Self] = &[Shape::Circle, Shape::Square, Shape::Triangle, Shape::Star, Shape::Heart];

  fn as_str(self) -> &'static str {
    match self {
      Shape::Circle => "circle",
      Shape::Square => "square",
      Shape::Triangle => "triangle",
      Shape::Star => "star",
      Shape::Heart => "heart",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
  Blue,
  Mint,
  Lavender,
  Peach,
  Rose,
}

impl Attribute for Color {
  const ALL: &'static [Self] = &[Color::Blue, Color::Mint, Color::Lavender, Color::Peach, Color::Rose];

  fn as_str(self) -> &'static str {
    match self {
      Color::Blue => "blue",
      Color::Mint => "mint",
      Color::Lavender => "lavender",
      Color::Peach => "peach",
      Color::Rose => "rose",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Size {
  Small,
  Medium,
  Large,
}

impl Attribute for Size {
  const ALL: &'static [Self] = &[Size::Small, Size::Medium, Size::Large];

  fn as_str(self) -> &'static str {
    match self {
      Size::Small => "small",
      Size::Medium => "medium",
      Size::Large => "large",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MathOp {
  Add,
  Sub,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WordCategory {
  Animal,
  Food,
  Nature,
  Feeling,
}

impl Attribute for WordCategory {
  const ALL: &'static [Self] = &[WordCategory::Animal, WordCategory::Food, WordCategory::Nature, WordCategory::Feeling];

  fn as_str(self) -> &'static str {
    match self {
      WordCategory::Animal => "animal",
      WordCategory::Food => "food",
      WordCategory::Nature => "nature",
      WordCategory::Feeling => "feeling",
    }
  }
}

impl WordCategory {
  fn noun(self) -> &'static str {
    match self {
      WordCategory::Animal => "an animal",
      WordCategory::Food => "a food",
      WordCategory::Nature => "something in nature",
      WordCategory::Feeling => "a feeling",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Emoji {
  Star,
  Leaf,
  Heart,
  Sun,
  Drop,
}

impl Attribute for Emoji {
  const ALL: &'static [Self] = &[Emoji::Star, Emoji::Leaf, Emoji::Heart, Emoji::Sun, Emoji::Drop];

  fn as_str(self) -> &'static str {
    match self {
      Emoji::Star => "star",
      Emoji::Leaf => "leaf",
      Emoji::Heart => "heart",
      Emoji::Sun => "sun",
      Emoji::Drop => "drop",
    }
  }
}

impl Emoji {
  pub fn glyph(self) -> &'static str {
    match self {
      Emoji::Star => "⭐",
      Emoji::Leaf => "🌿",
      Emoji::Heart => "💙",
      Emoji::Sun => "☀️",
      Emoji::Drop => "💧",
    }
  }
}

const LEXICON: &[(&str, WordCategory)] = &[
  ("otter", WordCategory::Animal),
  ("sparrow", WordCategory::Animal),
  ("rabbit", WordCategory::Animal),
  ("turtle", WordCategory::Animal),
  ("dolphin", WordCategory::Animal),
  ("fox", WordCategory::Animal),
  ("owl", WordCategory::Animal),
  ("deer", WordCategory::Animal),
  ("apple", WordCategory::Food),
  ("bread", WordCategory::Food),
  ("honey", WordCategory::Food),
  ("rice", WordCategory::Food),
  ("soup", WordCategory::Food),
  ("mango", WordCategory::Food),
  ("cheese", WordCategory::Food),
  ("carrot", WordCategory::Food),
  ("river", WordCategory::Nature),
  ("cloud", WordCategory::Nature),
  ("forest", WordCategory::Nature),
  ("pebble", WordCategory::Nature),
  ("meadow", WordCategory::Nature),
  ("ocean", WordCategory::Nature),
  ("breeze", WordCategory::Nature),
  ("moss", WordCategory::Nature),
  ("calm", WordCategory::Feeling),
  ("joy", WordCategory::Feeling),
  ("worry", WordCategory::Feeling),
  ("hope", WordCategory::Feeling),
  ("relief", WordCategory::Feeling),
  ("pride", WordCategory::Feeling),
  ("doubt", WordCategory::Feeling),
  ("awe", WordCategory::Feeling),
];

const MATH_A: std::ops::RangeInclusive<u8> = 1..=12;
const MATH_B: std::ops::RangeInclusive<u8> = 1..=9;
const COUNT_RANGE: std::ops::RangeInclusive<u8> = 1..=6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ShapeAttrs {
  pub shape: Shape,
  pub color: Color,
  pub size: Size,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MathProblem {
  pub a: u8,
  pub b: u8,
  pub op: MathOp,
}

impl MathProblem {
  pub fn answer(&self) -> u8 {
    match self.op {
      MathOp::Add => self.a + self.b,
      MathOp::Sub => self.a - self.b,
    }
  }

  pub fn question(&self) -> String {
    let sign = match self.op {
      MathOp::Add => '+',
      MathOp::Sub => '−',
    };
    format!("{} {} {}", self.a, sign, self.b)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct WordCard {
  pub word: &'static str,
  #[serde(skip)]
  pub category: WordCategory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct CountCard {
  pub emoji: Emoji,
  pub count: u8,
}

/// Kind of puzzle a round presents; decides which attribute domain items come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundKind {
  Shape,
  Math,
  Word,
  Count,
}

impl RoundKind {
  pub fn parse(value: &str) -> Option<Self> {
    match value.trim().to_ascii_lowercase().as_str() {
      "shape" => Some(RoundKind::Shape),
      "math" => Some(RoundKind::Math),
      "word" => Some(RoundKind::Word),
      "count" | "counting" => Some(RoundKind::Count),
      _ => None,
    }
  }
}

/// Intrinsic attributes of one item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemAttrs {
  Shape(ShapeAttrs),
  Math(MathProblem),
  Word(WordCard),
  Count(CountCard),
}

/// Full attribute domain of a round kind, in a fixed order.
pub fn domain(kind: RoundKind) -> Vec<ItemAttrs> {
  match kind {
    RoundKind::Shape => {
      let mut out = Vec::with_capacity(Shape::ALL.len() * Color::ALL.len() * Size::ALL.len());
      for &shape in Shape::ALL {
        for &color in Color::ALL {
          for &size in Size::ALL {
            out.push(ItemAttrs::Shape(ShapeAttrs { shape, color, size }));
          }
        }
      }
      out
    }
    RoundKind::Math => {
      let mut out = Vec::new();
      for a in MATH_A {
        for b in MATH_B {
          out.push(ItemAttrs::Math(MathProblem { a, b, op: MathOp::Add }));
          if b <= a {
            out.push(ItemAttrs::Math(MathProblem { a, b, op: MathOp::Sub }));
          }
        }
      }
      out
    }
    RoundKind::Word => LEXICON
      .iter()
      .map(|&(word, category)| ItemAttrs::Word(WordCard { word, category }))
      .collect(),
    RoundKind::Count => {
      let mut out = Vec::new();
      for &emoji in Emoji::ALL {
        for count in COUNT_RANGE {
          out.push(ItemAttrs::Count(CountCard { emoji, count }));
        }
      }
      out
    }
  }
}

/// Partial predicate over shape attributes; `None` leaves the attribute free.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ShapePattern {
  pub shape: Option<Shape>,
  pub color: Option<Color>,
  pub size: Option<Size>,
}

impl ShapePattern {
  pub fn matches(&self, attrs: &ShapeAttrs) -> bool {
    self.shape.map_or(true, |s| s == attrs.shape)
      && self.color.map_or(true, |c| c == attrs.color)
      && self.size.map_or(true, |s| s == attrs.size)
  }

  fn describe(&self) -> String {
    let mut parts = Vec::new();
    if let Some(size) = self.size {
      parts.push(size.as_str());
    }
    if let Some(color) = self.color {
      parts.push(color.as_str());
    }
    parts.push(self.shape.map_or("shape", |s| s.as_str()));
    parts.join(" ")
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", content = "value", rename_all = "snake_case")]
pub enum MathRule {
  Equals(u8),
  Even,
  GreaterThan(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CountRule {
  pub count: u8,
  pub emoji: Option<Emoji>,
}

/// What counts as a target in a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "spec", rename_all = "snake_case")]
pub enum TargetSpec {
  Shape(ShapePattern),
  Math(MathRule),
  Word(WordCategory),
  Count(CountRule),
}

impl TargetSpec {
  pub fn kind(&self) -> RoundKind {
    match self {
      TargetSpec::Shape(_) => RoundKind::Shape,
      TargetSpec::Math(_) => RoundKind::Math,
      TargetSpec::Word(_) => RoundKind::Word,
      TargetSpec::Count(_) => RoundKind::Count,
    }
  }

  /// Attributes of another kind never match.
  pub fn matches(&self, attrs: &ItemAttrs) -> bool {
    match (self, attrs) {
      (TargetSpec::Shape(p), ItemAttrs::Shape(a)) => p.matches(a),
      (TargetSpec::Math(rule), ItemAttrs::Math(m)) => {
        let answer = m.answer();
        match *rule {
          MathRule::Equals(n) => answer == n,
          MathRule::Even => answer % 2 == 0,
          MathRule::GreaterThan(n) => answer > n,
        }
      }
      (TargetSpec::Word(category), ItemAttrs::Word(w)) => w.category == *category,
      (TargetSpec::Count(rule), ItemAttrs::Count(c)) => {
        c.count == rule.count && rule.emoji.map_or(true, |e| e == c.emoji)
      }
      _ => false,
    }
  }

  /// Short label shown next to the progress counter.
  pub fn description(&self) -> String {
    match self {
      TargetSpec::Shape(p) => p.describe(),
      TargetSpec::Math(MathRule::Equals(n)) => format!("answer = {n}"),
      TargetSpec::Math(MathRule::Even) => "even answer".into(),
      TargetSpec::Math(MathRule::GreaterThan(n)) => format!("answer > {n}"),
      TargetSpec::Word(category) => category.as_str().into(),
      TargetSpec::Count(CountRule { count, emoji: Some(e) }) => format!("{count} × {}", e.glyph()),
      TargetSpec::Count(CountRule { count, emoji: None }) => format!("{count} items"),
    }
  }

  pub fn instruction(&self) -> String {
    match self {
      TargetSpec::Shape(p) => format!("Tap every {}", p.describe()),
      TargetSpec::Math(MathRule::Equals(n)) => format!("Tap every problem that equals {n}"),
      TargetSpec::Math(MathRule::Even) => "Tap every problem with an even answer".into(),
      TargetSpec::Math(MathRule::GreaterThan(n)) => format!("Tap every problem greater than {n}"),
      TargetSpec::Word(category) => format!("Tap every word that names {}", category.noun()),
      TargetSpec::Count(CountRule { count, emoji: Some(e) }) => {
        format!("Tap every card with exactly {count} {}", e.glyph())
      }
      TargetSpec::Count(CountRule { count, emoji: None }) => {
        format!("Tap every card with exactly {count} symbols")
      }
    }
  }
}

/// One tappable unit in a round's grid.
///
/// `is_target` is fixed at generation time; only `found` changes while playing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Item {
  pub id: usize,
  pub attrs: ItemAttrs,
  pub is_target: bool,
  pub found: bool,
}

/// A template realized into a concrete item grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Round {
  pub id: usize,
  pub kind: RoundKind,
  pub instruction: String,
  pub target_description: String,
  pub items: Vec<Item>,
  pub target_count: usize,
  pub time_limit_secs: u32,
}

impl Round {
  pub fn found_count(&self) -> usize {
    self.items.iter().filter(|i| i.is_target && i.found).count()
  }

  pub fn all_found(&self) -> bool {
    self.items.iter().filter(|i| i.is_target).all(|i| i.found)
  }

  pub fn reset_found(&mut self) {
    for item in &mut self.items {
      item.found = false;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn shape_domain_is_full_product() {
    assert_eq!(domain(RoundKind::Shape).len(), 5 * 5 * 3);
  }

  #[test]
  fn math_domain_has_no_negative_answers() {
    let all = domain(RoundKind::Math);
    assert!(all.iter().all(|a| matches!(a, ItemAttrs::Math(m) if m.op == MathOp::Add || m.b <= m.a)));
  }

  #[test]
  fn partial_pattern_leaves_free_attributes_open() {
    let spec = TargetSpec::Shape(ShapePattern { shape: Some(Shape::Circle), color: Some(Color::Blue), size: None });
    let small = ItemAttrs::Shape(ShapeAttrs { shape: Shape::Circle, color: Color::Blue, size: Size::Small });
    let large = ItemAttrs::Shape(ShapeAttrs { shape: Shape::Circle, color: Color::Blue, size: Size::Large });
    let mint = ItemAttrs::Shape(ShapeAttrs { shape: Shape::Circle, color: Color::Mint, size: Size::Small });
    assert!(spec.matches(&small));
    assert!(spec.matches(&large));
    assert!(!spec.matches(&mint));
    assert_eq!(spec.instruction(), "Tap every blue circle");
  }

  #[test]
  fn spec_never_matches_other_kind() {
    let spec = TargetSpec::Word(WordCategory::Animal);
    let attrs = ItemAttrs::Count(CountCard { emoji: Emoji::Star, count: 2 });
    assert!(!spec.matches(&attrs));
  }

  #[test]
  fn difficulty_parse_is_case_insensitive() {
    assert_eq!(Difficulty::parse(" Hard "), Some(Difficulty::Hard));
    assert_eq!(Difficulty::parse("extreme"), None);
    assert_eq!(Color::parse("LAVENDER"), Some(Color::Lavender));
  }

  #[test]
  fn default_configs_keep_a_distractor() {
    let table = DifficultyTable::default();
    for d in Difficulty::ALL {
      assert!(table.get(d).is_valid());
    }
    assert_eq!(table.easy.grid_size, 6);
    assert_eq!(table.easy.targets, 2);
    assert_eq!(table.easy.time_limit_secs, 20);
  }
}
