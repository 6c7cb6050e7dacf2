//! Template bank: the static catalog of target specs per difficulty, plus any
//! extra templates from configuration. Every template is validated against its
//! attribute domain when the bank is built, so rounds never see a degenerate one.

use std::collections::HashMap;

use tracing::{error, info};

use crate::config::TemplateCfg;
use crate::domain::{
  domain, Attribute, Color, CountRule, Difficulty, Emoji, ItemAttrs, MathRule, RoundKind, Shape,
  ShapePattern, Size, TargetSpec, WordCategory,
};
use crate::error::BankError;

/// Messages shown when a round times out.
pub const ENCOURAGEMENTS: &[&str] = &[
  "That's okay. Noticing is what matters.",
  "Take a breath. You can try again.",
  "Focus comes and goes. You're practicing.",
  "No rush. Every attempt trains your attention.",
  "Gently return. That's the whole exercise.",
];

/// A target spec proven satisfiable (and not trivially satisfied) in its domain.
///
/// Keeps the matching combinations for target draws and one known non-match
/// for the distractor sampler's fallback.
#[derive(Clone, Debug)]
pub struct Template {
  spec: TargetSpec,
  matching: Vec<ItemAttrs>,
  fallback_distractor: ItemAttrs,
}

impl Template {
  pub fn new(spec: TargetSpec) -> Result<Self, BankError> {
    let all = domain(spec.kind());
    let (matching, rest): (Vec<ItemAttrs>, Vec<ItemAttrs>) = all.into_iter().partition(|a| spec.matches(a));
    if matching.is_empty() {
      return Err(BankError::Unsatisfiable { description: spec.description() });
    }
    let Some(&fallback_distractor) = rest.first() else {
      return Err(BankError::NoDistractors { description: spec.description() });
    };
    Ok(Self { spec, matching, fallback_distractor })
  }

  pub fn spec(&self) -> &TargetSpec { &self.spec }

  /// Never empty.
  pub fn matching(&self) -> &[ItemAttrs] { &self.matching }

  pub fn fallback_distractor(&self) -> ItemAttrs { self.fallback_distractor }
}

fn shape(shape: Option<Shape>, color: Option<Color>, size: Option<Size>) -> TargetSpec {
  TargetSpec::Shape(ShapePattern { shape, color, size })
}

/// Built-in catalog. Harder tiers constrain more attributes and mix in math.
pub fn builtin_specs() -> Vec<(Difficulty, TargetSpec)> {
  use Color::*;
  use Difficulty::*;
  use Shape::*;

  vec![
    (Easy, shape(Some(Circle), Some(Blue), None)),
    (Easy, shape(Some(Square), Some(Mint), None)),
    (Easy, shape(Some(Triangle), Some(Peach), None)),
    (Easy, shape(Some(Star), Some(Lavender), None)),
    (Easy, shape(Some(Heart), Some(Rose), None)),
    (Easy, shape(Some(Circle), Some(Rose), None)),
    (Easy, shape(Some(Square), Some(Blue), None)),
    (Easy, TargetSpec::Word(WordCategory::Animal)),
    (Easy, TargetSpec::Word(WordCategory::Food)),
    (Easy, TargetSpec::Count(CountRule { count: 1, emoji: None })),
    (Medium, shape(None, Some(Lavender), Some(Size::Large))),
    (Medium, shape(None, Some(Blue), Some(Size::Small))),
    (Medium, shape(Some(Star), None, Some(Size::Large))),
    (Medium, shape(Some(Heart), None, Some(Size::Small))),
    (Medium, shape(Some(Triangle), Some(Mint), None)),
    (Medium, TargetSpec::Math(MathRule::Even)),
    (Medium, TargetSpec::Math(MathRule::GreaterThan(10))),
    (Medium, TargetSpec::Word(WordCategory::Nature)),
    (Medium, TargetSpec::Word(WordCategory::Feeling)),
    (Medium, TargetSpec::Count(CountRule { count: 3, emoji: None })),
    (Hard, shape(Some(Circle), Some(Blue), Some(Size::Small))),
    (Hard, shape(Some(Square), Some(Peach), Some(Size::Large))),
    (Hard, shape(Some(Triangle), Some(Lavender), Some(Size::Medium))),
    (Hard, shape(Some(Star), Some(Mint), Some(Size::Small))),
    (Hard, shape(Some(Heart), Some(Blue), Some(Size::Large))),
    (Hard, TargetSpec::Math(MathRule::Equals(10))),
    (Hard, TargetSpec::Math(MathRule::Equals(7))),
    (Hard, TargetSpec::Math(MathRule::GreaterThan(15))),
    (Hard, TargetSpec::Count(CountRule { count: 4, emoji: Some(Emoji::Star) })),
    (Hard, TargetSpec::Count(CountRule { count: 2, emoji: Some(Emoji::Leaf) })),
  ]
}

fn parse_attr<T: Attribute>(field: &'static str, value: &Option<String>) -> Result<Option<T>, BankError> {
  match value {
    None => Ok(None),
    Some(v) => T::parse(v)
      .map(Some)
      .ok_or_else(|| BankError::UnknownValue { field, value: v.clone() }),
  }
}

/// Turn a configuration entry into a (difficulty, spec) pair. Does not validate satisfiability.
pub fn parse_template(cfg: &TemplateCfg) -> Result<(Difficulty, TargetSpec), BankError> {
  let difficulty = Difficulty::parse(&cfg.difficulty)
    .ok_or_else(|| BankError::UnknownValue { field: "difficulty", value: cfg.difficulty.clone() })?;

  let kind = RoundKind::parse(&cfg.kind)
    .ok_or_else(|| BankError::UnknownValue { field: "kind", value: cfg.kind.clone() })?;
  let spec = match kind {
    RoundKind::Shape => TargetSpec::Shape(ShapePattern {
      shape: parse_attr("shape", &cfg.shape)?,
      color: parse_attr("color", &cfg.color)?,
      size: parse_attr("size", &cfg.size)?,
    }),
    RoundKind::Math => {
      let rule = cfg.rule.as_deref().ok_or(BankError::MissingField { kind: "math", field: "rule" })?;
      let value = || cfg.value.ok_or(BankError::MissingField { kind: "math", field: "value" });
      match rule.trim().to_ascii_lowercase().as_str() {
        "equals" => TargetSpec::Math(MathRule::Equals(value()?)),
        "even" => TargetSpec::Math(MathRule::Even),
        "greater_than" => TargetSpec::Math(MathRule::GreaterThan(value()?)),
        other => return Err(BankError::UnknownValue { field: "rule", value: other.into() }),
      }
    }
    RoundKind::Word => {
      let category = parse_attr::<WordCategory>("category", &cfg.category)?
        .ok_or(BankError::MissingField { kind: "word", field: "category" })?;
      TargetSpec::Word(category)
    }
    RoundKind::Count => TargetSpec::Count(CountRule {
      count: cfg.count.ok_or(BankError::MissingField { kind: "count", field: "count" })?,
      emoji: parse_attr("emoji", &cfg.emoji)?,
    }),
  };
  Ok((difficulty, spec))
}

/// Read-only catalog: difficulty -> non-empty list of templates.
#[derive(Clone, Debug)]
pub struct TemplateBank {
  tiers: HashMap<Difficulty, Vec<Template>>,
}

impl TemplateBank {
  /// Validate every spec and require every difficulty to have at least one.
  pub fn from_specs<I>(specs: I) -> Result<Self, BankError>
  where
    I: IntoIterator<Item = (Difficulty, TargetSpec)>,
  {
    let mut tiers: HashMap<Difficulty, Vec<Template>> = HashMap::new();
    for (difficulty, spec) in specs {
      tiers.entry(difficulty).or_default().push(Template::new(spec)?);
    }
    let bank = Self { tiers };
    bank.check_tiers()?;
    Ok(bank)
  }

  pub fn builtin() -> Result<Self, BankError> {
    Self::from_specs(builtin_specs())
  }

  /// Built-ins plus configured templates. A bad built-in fails startup;
  /// a bad configured template is logged and skipped.
  pub fn with_config(extra: &[TemplateCfg]) -> Result<Self, BankError> {
    let mut bank = Self::builtin()?;
    for (idx, cfg) in extra.iter().enumerate() {
      match parse_template(cfg).and_then(|(d, spec)| Template::new(spec).map(|t| (d, t))) {
        Ok((difficulty, template)) => {
          info!(target: "attention", idx, difficulty = difficulty.as_str(), template = %template.spec().description(), "Added configured template");
          bank.tiers.entry(difficulty).or_default().push(template);
        }
        Err(e) => {
          error!(target: "attention", idx, difficulty = %cfg.difficulty, kind = %cfg.kind, error = %e, "Skipping configured template");
        }
      }
    }
    for difficulty in Difficulty::ALL {
      info!(target: "attention", difficulty = difficulty.as_str(), templates = bank.templates(difficulty).len(), "Template bank inventory");
    }
    Ok(bank)
  }

  fn check_tiers(&self) -> Result<(), BankError> {
    for difficulty in Difficulty::ALL {
      if self.templates(difficulty).is_empty() {
        return Err(BankError::EmptyTier(difficulty));
      }
    }
    Ok(())
  }

  pub fn templates(&self, difficulty: Difficulty) -> &[Template] {
    self.tiers.get(&difficulty).map(Vec::as_slice).unwrap_or(&[])
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn builtin_bank_is_valid_and_fills_a_session() {
    let bank = TemplateBank::builtin().unwrap();
    for difficulty in Difficulty::ALL {
      assert_eq!(bank.templates(difficulty).len(), 10);
    }
  }

  #[test]
  fn rejects_unsatisfiable_template() {
    let spec = TargetSpec::Math(MathRule::Equals(200));
    assert!(matches!(Template::new(spec), Err(BankError::Unsatisfiable { .. })));
  }

  #[test]
  fn rejects_template_without_distractors() {
    let spec = TargetSpec::Shape(ShapePattern::default());
    assert!(matches!(Template::new(spec), Err(BankError::NoDistractors { .. })));
  }

  #[test]
  fn fallback_distractor_does_not_match() {
    for (_, spec) in builtin_specs() {
      let t = Template::new(spec).unwrap();
      assert!(!t.spec().matches(&t.fallback_distractor()));
      assert!(t.matching().iter().all(|a| t.spec().matches(a)));
    }
  }

  #[test]
  fn empty_tier_fails_fast() {
    let specs = vec![(Difficulty::Easy, TargetSpec::Word(WordCategory::Animal))];
    assert_eq!(TemplateBank::from_specs(specs).unwrap_err(), BankError::EmptyTier(Difficulty::Medium));
  }

  #[test]
  fn parses_configured_templates() {
    let cfg = TemplateCfg {
      difficulty: "Hard".into(),
      kind: "math".into(),
      rule: Some("greater_than".into()),
      value: Some(12),
      ..Default::default()
    };
    assert_eq!(parse_template(&cfg).unwrap(), (Difficulty::Hard, TargetSpec::Math(MathRule::GreaterThan(12))));

    let bad = TemplateCfg { difficulty: "easy".into(), kind: "shape".into(), color: Some("teal".into()), ..Default::default() };
    assert_eq!(
      parse_template(&bad).unwrap_err(),
      BankError::UnknownValue { field: "color", value: "teal".into() }
    );

    let counting = TemplateCfg { difficulty: "medium".into(), kind: " Counting ".into(), count: Some(3), ..Default::default() };
    assert_eq!(
      parse_template(&counting).unwrap(),
      (Difficulty::Medium, TargetSpec::Count(CountRule { count: 3, emoji: None }))
    );

    let unknown = TemplateCfg { difficulty: "easy".into(), kind: "riddle".into(), ..Default::default() };
    assert_eq!(
      parse_template(&unknown).unwrap_err(),
      BankError::UnknownValue { field: "kind", value: "riddle".into() }
    );
  }

  #[test]
  fn config_skips_degenerate_templates() {
    let extra = vec![
      TemplateCfg { difficulty: "easy".into(), kind: "count".into(), count: Some(9), ..Default::default() },
      TemplateCfg { difficulty: "easy".into(), kind: "word".into(), category: Some("nature".into()), ..Default::default() },
    ];
    let bank = TemplateBank::with_config(&extra).unwrap();
    assert_eq!(bank.templates(Difficulty::Easy).len(), 11);
  }
}
