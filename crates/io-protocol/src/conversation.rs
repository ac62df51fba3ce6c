use serde::{Deserialize, Serialize};

/// Who said a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

/// Append-only history of one interactive session. Lives in memory only.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.turns.push(Turn {
            speaker,
            text: text.into(),
        });
    }

    /// Record a user request and the agent's answer.
    pub fn push_exchange(&mut self, user: impl Into<String>, agent: impl Into<String>) {
        self.push(Speaker::User, user);
        self.push(Speaker::Agent, agent);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// History lines in the `Human: ...` / `AI: ...` form handed to the reasoner.
    pub fn history_lines(&self) -> Vec<String> {
        self.turns
            .iter()
            .map(|t| match t.speaker {
                Speaker::User => format!("Human: {}", t.text),
                Speaker::Agent => format!("AI: {}", t.text),
            })
            .collect()
    }
}
