//! Final answer selection over a finished transcript.
//!
//! Candidates are agent messages with non-empty text and no tool calls, in
//! transcript order. Selection, most recent first:
//!
//! 1. a worker message longer than the substantive-length threshold, or a
//!    Supervisor message that is not delegation narration;
//! 2. otherwise any candidate that is not delegation narration;
//! 3. otherwise the fixed fallback.
//!
//! Worker substance outranks Supervisor routing chatter, and recency outranks
//! earlier attempts.

use crate::agents::AgentNode;
use crate::transcript::{AgentMessage, Message, Transcript};

/// Returned when no candidate survives selection.
pub const FALLBACK_ANSWER: &str = "I'm sorry, I couldn't generate a response.";

/// Default substantive-length threshold for worker answers, in characters.
pub const DEFAULT_MIN_WORKER_CHARS: usize = 100;

/// Vocabulary that marks a message as describing a routing action. Only
/// consulted for messages the orchestrator never classified, such as those
/// loaded from a prior transcript.
const DELEGATION_VOCABULARY: [&str; 9] = [
    "delegat",
    "hand off",
    "handing off",
    "handoff",
    "hand this",
    "transfer to",
    "routing to",
    "forwarding to",
    "passing this to",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub agent: AgentNode,
    pub text: &'a str,
    pub narration: bool,
}

pub fn is_delegation_narration(message: &AgentMessage, text: &str) -> bool {
    if message.handoff.is_some() {
        return true;
    }
    match message.delegation_narration {
        Some(flagged) => flagged,
        None => {
            let lower = text.to_lowercase();
            DELEGATION_VOCABULARY.iter().any(|w| lower.contains(w))
        }
    }
}

pub fn candidates(messages: &[Message]) -> Vec<Candidate<'_>> {
    messages
        .iter()
        .filter_map(|m| m.as_agent())
        .filter_map(|m| {
            let text = m.plain_text()?;
            Some(Candidate {
                agent: m.agent,
                text,
                narration: is_delegation_narration(m, text),
            })
        })
        .collect()
}

pub struct Synthesizer {
    min_worker_chars: usize,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_WORKER_CHARS)
    }
}

impl Synthesizer {
    pub fn new(min_worker_chars: usize) -> Self {
        Self { min_worker_chars }
    }

    fn preferred(&self, c: &Candidate<'_>) -> bool {
        if c.agent.is_worker() {
            c.text.chars().count() > self.min_worker_chars
        } else {
            !c.narration
        }
    }

    /// Pick the user-facing answer. Never fails.
    pub fn select<'a>(&self, transcript: &'a Transcript) -> &'a str {
        self.select_since(transcript, 0)
    }

    /// Like [`Self::select`], considering only messages from index `start`
    /// on. A continued conversation passes the index of its new user message
    /// so earlier turns cannot answer this one.
    pub fn select_since<'a>(&self, transcript: &'a Transcript, start: usize) -> &'a str {
        let messages = transcript.messages();
        let candidates = candidates(&messages[start.min(messages.len())..]);
        candidates
            .iter()
            .rev()
            .find(|c| self.preferred(c))
            .or_else(|| candidates.iter().rev().find(|c| !c.narration))
            .map(|c| c.text)
            .unwrap_or(FALLBACK_ANSWER)
    }
}
