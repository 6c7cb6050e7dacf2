//! The home screen's activities other than Attention Switch, plus the catalog itself.

use serde::Serialize;

pub mod label;
pub mod picker;
pub mod reflection;
pub mod stillness;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ActivityInfo {
  pub id: &'static str,
  pub title: &'static str,
  pub description: &'static str,
}

pub const CATALOG: &[ActivityInfo] = &[
  ActivityInfo { id: "attention-switch", title: "Attention Switch", description: "Redirect scattered thoughts" },
  ActivityInfo { id: "do-nothing", title: "Do Nothing", description: "One minute of peace" },
  ActivityInfo { id: "label-the-noise", title: "Label the Noise", description: "Categorize your thoughts" },
  ActivityInfo { id: "compulsion-picker", title: "Compulsion Picker", description: "Choose a healthy action" },
  ActivityInfo { id: "end-the-loop", title: "End the Loop", description: "Recognize your patterns" },
];
