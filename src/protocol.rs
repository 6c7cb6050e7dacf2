//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::activities::label::{NoiseCategory, NoiseSorter};
use crate::activities::picker::MicroAction;
use crate::activities::reflection::{LoopChoice, Reflection};
use crate::activities::stillness::StillnessTimer;
use crate::domain::{Attribute, Difficulty, DifficultyConfig, ItemAttrs, Round, RoundKind};
use crate::session::{AttentionSession, Phase, RoundRuntime};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    StartAttention {
        difficulty: String,
        #[serde(default)]
        seed: Option<u64>,
    },
    Tap {
        #[serde(rename = "itemId")]
        item_id: usize,
    },
    Retry,
    Advance,
    StartStillness,
    Interact,
    StartLabel,
    Place {
        #[serde(rename = "cardId")]
        card_id: usize,
        category: NoiseCategory,
    },
    Exit,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    AttentionState {
        state: AttentionSnapshot,
    },
    StillnessState {
        state: StillnessTimer,
        progress: f32,
    },
    LabelState {
        state: NoiseSorter,
        sorted: usize,
    },
    SessionCompleted {
        activity: &'static str,
    },
    Navigate,
    Error {
        message: String,
    },
}

/// Item as the client renders it. Whether it is a target is not revealed.
#[derive(Debug, Serialize)]
pub struct ItemView {
    pub id: usize,
    pub label: String,
    pub attrs: ItemAttrs,
    pub found: bool,
}

#[derive(Debug, Serialize)]
pub struct RoundView {
    pub id: usize,
    pub kind: RoundKind,
    pub instruction: String,
    pub target_description: String,
    pub target_count: usize,
    pub found_count: usize,
    pub time_limit_secs: u32,
    pub items: Vec<ItemView>,
}

#[derive(Debug, Serialize)]
pub struct AttentionSnapshot {
    pub phase: Phase,
    pub difficulty: Option<Difficulty>,
    pub round_index: usize,
    pub round_count: usize,
    pub elapsed_secs: u32,
    pub round: Option<RoundView>,
    pub runtime: RoundRuntime,
}

/// Display text for an item.
pub fn item_label(attrs: &ItemAttrs) -> String {
    match attrs {
        ItemAttrs::Shape(s) => format!("{} {} {}", s.size.as_str(), s.color.as_str(), s.shape.as_str()),
        ItemAttrs::Math(m) => m.question(),
        ItemAttrs::Word(w) => w.word.to_string(),
        ItemAttrs::Count(c) => c.emoji.glyph().repeat(c.count as usize),
    }
}

pub fn round_view(round: &Round) -> RoundView {
    RoundView {
        id: round.id,
        kind: round.kind,
        instruction: round.instruction.clone(),
        target_description: round.target_description.clone(),
        target_count: round.target_count,
        found_count: round.found_count(),
        time_limit_secs: round.time_limit_secs,
        items: round
            .items
            .iter()
            .map(|i| ItemView { id: i.id, label: item_label(&i.attrs), attrs: i.attrs, found: i.found })
            .collect(),
    }
}

pub fn attention_snapshot(s: &AttentionSession) -> AttentionSnapshot {
    AttentionSnapshot {
        phase: s.phase(),
        difficulty: s.difficulty(),
        round_index: s.round_index(),
        round_count: s.round_count(),
        elapsed_secs: s.elapsed_secs(),
        round: s.current_round().map(round_view),
        runtime: s.runtime().clone(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub difficulty: Option<String>,
    pub seed: Option<u64>,
}

/// Full round list including target flags; meant for previews and reproduction.
#[derive(Serialize)]
pub struct SessionPreviewOut {
    pub difficulty: Difficulty,
    pub seed: u64,
    pub config: DifficultyConfig,
    pub rounds: Vec<Round>,
}

#[derive(Deserialize)]
pub struct ReflectionIn {
    pub choice: LoopChoice,
}

#[derive(Serialize)]
pub struct ReflectionOut {
    pub question: &'static str,
    pub reflection: Reflection,
}

#[derive(Deserialize)]
pub struct PickIn {
    pub action: String,
}

#[derive(Serialize)]
pub struct PickOut {
    pub action: MicroAction,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Color, Shape, ShapeAttrs, Size};

    #[test]
    fn parses_client_messages() {
        let tap: ClientWsMessage = serde_json::from_str(r#"{"type":"tap","itemId":3}"#).unwrap();
        assert_eq!(tap, ClientWsMessage::Tap { item_id: 3 });

        let start: ClientWsMessage = serde_json::from_str(r#"{"type":"start_attention","difficulty":"easy"}"#).unwrap();
        assert_eq!(start, ClientWsMessage::StartAttention { difficulty: "easy".into(), seed: None });

        let place: ClientWsMessage =
            serde_json::from_str(r#"{"type":"place","cardId":2,"category":"feeling"}"#).unwrap();
        assert_eq!(place, ClientWsMessage::Place { card_id: 2, category: NoiseCategory::Feeling });

        assert!(serde_json::from_str::<ClientWsMessage>(r#"{"type":"dance"}"#).is_err());
    }

    #[test]
    fn server_messages_are_tagged() {
        let v = serde_json::to_value(ServerWsMessage::SessionCompleted { activity: "do_nothing" }).unwrap();
        assert_eq!(v["type"], "session_completed");
        assert_eq!(v["activity"], "do_nothing");
        let v = serde_json::to_value(ServerWsMessage::Navigate).unwrap();
        assert_eq!(v["type"], "navigate");
    }

    #[test]
    fn item_view_hides_target_flag() {
        let attrs = ItemAttrs::Shape(ShapeAttrs { shape: Shape::Star, color: Color::Rose, size: Size::Large });
        let view = ItemView { id: 0, label: item_label(&attrs), attrs, found: false };
        let v = serde_json::to_value(&view).unwrap();
        assert_eq!(v["label"], "large rose star");
        assert_eq!(v["attrs"]["kind"], "shape");
        assert!(v.get("is_target").is_none());
    }
}
