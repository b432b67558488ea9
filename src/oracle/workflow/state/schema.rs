// SPDX-License-Identifier: MIT

//! Value types carried by workflow state fields

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Life area a question is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Love,
    Career,
    #[default]
    General,
}

/// How the reply should be phrased
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Gentle,
    #[default]
    Direct,
}

/// Whether the user wants a reading or a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    #[default]
    Chat,
    Divination,
}

/// Tool chosen by the route stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Chat,
    Tarot,
    Lenormand,
    Liuyao,
}

impl Tool {
    /// Divination tools, in the order offered to the router
    pub const DIVINATION: [Tool; 3] = [Tool::Tarot, Tool::Lenormand, Tool::Liuyao];

    pub fn is_divination(&self) -> bool {
        !matches!(self, Tool::Chat)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Chat => "chat",
            Tool::Tarot => "tarot",
            Tool::Lenormand => "lenormand",
            Tool::Liuyao => "liuyao",
        }
    }

    /// Display name used in replies
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Chat => "聊天",
            Tool::Tarot => "塔罗",
            Tool::Lenormand => "雷诺曼",
            Tool::Liuyao => "六爻",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Domain::Love => "love",
            Domain::Career => "career",
            Domain::General => "general",
        })
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tone::Gentle => "gentle",
            Tone::Direct => "direct",
        })
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Intent::Chat => "chat",
            Intent::Divination => "divination",
        })
    }
}

/// One prior message of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
