#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW: usize = 5;

/// One completed question/answer exchange. Ordering is chronological.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

/// Bounded record of prior turns, windowed to the most recent N.
///
/// Purely in-memory and owned by a single session; it is never shared
/// across threads. Persistence, where wanted, is the shell's concern.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    turns: Vec<ConversationTurn>,
    window: usize,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl ConversationMemory {
    #[inline]
    pub fn new(window: usize) -> Self {
        Self {
            turns: Vec::with_capacity(window),
            window,
        }
    }

    /// Record a completed turn, evicting the oldest once the window is full.
    #[inline]
    pub fn append(&mut self, question: &str, answer: &str) {
        if self.window == 0 {
            return;
        }
        if self.turns.len() == self.window {
            self.turns.remove(0);
        }
        self.turns.push(ConversationTurn {
            question: question.to_string(),
            answer: answer.to_string(),
        });
    }

    /// The retained turns, oldest first.
    #[inline]
    pub fn as_pairs(&self) -> &[ConversationTurn] {
        &self.turns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
