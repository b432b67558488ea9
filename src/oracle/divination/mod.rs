// SPDX-License-Identifier: MIT

//! Symbolic divination generators
//!
//! Each generator is a pure function of `(question, seed_key)`: identical
//! input always yields the identical reading.

mod lenormand;
mod liuyao;
pub mod seed;
mod tarot;

use serde::{Deserialize, Serialize};

use crate::oracle::workflow::state::Tool;

pub use lenormand::draw_lenormand;
pub use liuyao::cast_liuyao;
pub use tarot::draw_tarot;

/// One drawn card
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub name: String,
    pub meaning: String,
    pub position: String,
    /// 正位 or 逆位; tarot only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineValue {
    Yang,
    Yin,
}

/// One hexagram line, numbered bottom-up from 1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub line: u8,
    pub value: LineValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hexagram {
    pub upper: String,
    pub lower: String,
    pub lines: Vec<Line>,
    pub pattern: String,
}

/// Structured divination output; the shape depends on the tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Symbols {
    Cards(Vec<Card>),
    Hexagram(Hexagram),
}

impl Default for Symbols {
    fn default() -> Self {
        Symbols::Cards(Vec::new())
    }
}

impl Symbols {
    pub fn is_empty(&self) -> bool {
        match self {
            Symbols::Cards(cards) => cards.is_empty(),
            Symbols::Hexagram(hex) => hex.lines.is_empty(),
        }
    }

    /// Number of cards, or lines for a hexagram
    pub fn len(&self) -> usize {
        match self {
            Symbols::Cards(cards) => cards.len(),
            Symbols::Hexagram(hex) => hex.lines.len(),
        }
    }
}

/// Output of a generator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub symbols: Symbols,
    pub verdict: String,
    pub advice: Vec<String>,
}

/// Run the generator for `tool`. The chat tool has no generator.
pub fn draw(tool: Tool, question: &str, seed_key: &str) -> Option<Reading> {
    match tool {
        Tool::Tarot => Some(draw_tarot(question, seed_key)),
        Tool::Lenormand => Some(draw_lenormand(question, seed_key)),
        Tool::Liuyao => Some(cast_liuyao(question, seed_key)),
        Tool::Chat => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_draw_dispatches_by_tool() {
        assert!(draw(Tool::Chat, "q", "s").is_none());
        for tool in Tool::DIVINATION {
            let reading = draw(tool, "q", "s").unwrap();
            assert!(!reading.symbols.is_empty());
            assert!(!reading.verdict.is_empty());
            assert!(!reading.advice.is_empty());
        }
    }

    #[test]
    fn test_draw_is_deterministic() {
        for tool in Tool::DIVINATION {
            assert_eq!(draw(tool, "同一个问题", "s1"), draw(tool, "同一个问题", "s1"));
        }
    }

    #[test]
    fn test_symbols_serialize_untagged() {
        let cards = Symbols::Cards(vec![Card {
            name: "骑士".to_string(),
            meaning: "消息与行动".to_string(),
            position: "起因".to_string(),
            orientation: None,
        }]);
        assert_eq!(
            serde_json::to_value(&cards).unwrap(),
            json!([{"name": "骑士", "meaning": "消息与行动", "position": "起因"}])
        );

        let hex = cast_liuyao("q", "s").symbols;
        let value = serde_json::to_value(&hex).unwrap();
        assert!(value["pattern"].as_str().unwrap().starts_with('上'));
        assert_eq!(serde_json::from_value::<Symbols>(value).unwrap(), hex);
    }

    #[test]
    fn test_default_symbols_are_empty_cards() {
        assert_eq!(Symbols::default(), Symbols::Cards(vec![]));
        assert_eq!(serde_json::to_value(Symbols::default()).unwrap(), json!([]));
    }
}
