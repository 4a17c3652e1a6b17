use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Time a player has to submit a prompt for one round.
pub const ROUND_TIME_LIMIT: Duration = Duration::from_secs(300);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Image,
}

impl ContentKind {
    pub fn label(&self) -> &str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Image => "image",
        }
    }
}

/// A single challenge: reproduce `target_content` with one prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Round {
    pub id: u32,
    pub title: &'static str,
    pub description: &'static str,
    pub kind: ContentKind,
    /// Target text, or an image URL for image rounds.
    pub target_content: &'static str,
    /// Pretty-printed version of the target when the raw form is compact.
    pub display_target: Option<&'static str>,
}

impl Round {
    pub fn display(&self) -> &str {
        self.display_target.unwrap_or(self.target_content)
    }
}

static ROUNDS: [Round; 4] = [
    Round {
        id: 1,
        title: "The Polite Robot",
        description: "Reverse engineer the prompt to get this exact polite refusal.",
        kind: ContentKind::Text,
        target_content: "I apologize, but I cannot fulfill that request as it goes against my safety guidelines. Is there anything else I can help you with today?",
        display_target: None,
    },
    Round {
        id: 2,
        title: "JSON Architect",
        description: "Make the model output this exact JSON structure for a user profile.",
        kind: ContentKind::Text,
        target_content: r#"{"id":101,"active":true,"roles":["admin","editor"]}"#,
        display_target: Some(
            "{\n  \"id\": 101,\n  \"active\": true,\n  \"roles\": [\"admin\", \"editor\"]\n}",
        ),
    },
    Round {
        id: 3,
        title: "Pixel Perfect: The Coffee",
        description: "Generate an image that matches this target visual description: A minimal latte art heart in a white ceramic cup on a wooden table, top-down view.",
        kind: ContentKind::Image,
        target_content: "https://picsum.photos/id/425/512/512",
        display_target: None,
    },
    Round {
        id: 4,
        title: "Cyberpunk City",
        description: "Generate a futuristic cyberpunk city street at night with neon blue and pink lights, rain on pavement, and no people.",
        kind: ContentKind::Image,
        target_content: "https://picsum.photos/id/203/512/512",
        display_target: None,
    },
];

/// All rounds in play order.
pub fn all() -> &'static [Round] {
    &ROUNDS
}

pub fn find(id: u32) -> Option<&'static Round> {
    all().iter().find(|r| r.id == id)
}
