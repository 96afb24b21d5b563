//! Transcript assembly.
//!
//! Renders the recent history of a channel, plus the message being handled,
//! as a bounded plain-text transcript:
//!
//! ```text
//! alice: the moon landing was in 1972
//! bob: no it wasn't
//! alice: 2+2=5
//! ```
//!
//! # Bounds
//!
//! - at most `history_count` prior lines, then the target message's line
//! - every body is cut to `truncate_length` characters plus one `…` marker
//!
//! A transport failure while fetching history degrades to a transcript of
//! the target line alone.

use std::sync::Arc;

use snoid_core::channel::Transport;
use snoid_core::message::InboundMessage;
use tracing::{debug, warn};

/// Appended to a body that was cut short.
pub const TRUNCATION_MARKER: char = '…';

/// Default maximum characters kept per body.
pub const DEFAULT_TRUNCATE_LENGTH: usize = 500;

/// Flatten a body to one line and cut it to `max_chars` characters.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let mut chars = text
        .trim()
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c });
    let mut out: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        out.push(TRUNCATION_MARKER);
    }
    out
}

/// One `speaker: text` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub speaker: String,
    pub text: String,
}

impl TranscriptLine {
    fn from_message(message: &InboundMessage, max_chars: usize) -> Self {
        Self {
            speaker: message.author_name.clone(),
            text: truncate_text(&message.content, max_chars),
        }
    }
}

impl std::fmt::Display for TranscriptLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.speaker, self.text)
    }
}

/// Oldest-to-newest lines ending with the handled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub lines: Vec<TranscriptLine>,
}

impl Transcript {
    /// Number of lines, including the final one.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The line being judged.
    pub fn last(&self) -> Option<&TranscriptLine> {
        self.lines.last()
    }

    /// Newline-joined rendering passed to the completion service.
    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Builds transcripts from a transport's channel history.
#[derive(Clone)]
pub struct ContextAssembler {
    transport: Arc<dyn Transport>,
    truncate_length: usize,
}

impl ContextAssembler {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            truncate_length: DEFAULT_TRUNCATE_LENGTH,
        }
    }

    /// Set the per-body character limit.
    pub fn with_truncate_length(mut self, truncate_length: usize) -> Self {
        self.truncate_length = truncate_length;
        self
    }

    /// Assemble the structured transcript for `message`.
    pub async fn assemble(&self, message: &InboundMessage, history_count: usize) -> Transcript {
        let target = TranscriptLine::from_message(message, self.truncate_length);
        if history_count == 0 {
            return Transcript {
                lines: vec![target],
            };
        }

        let history = match self
            .transport
            .fetch_history(&message.channel_id, &message.id, history_count)
            .await
        {
            Ok(history) => history,
            Err(e) => {
                warn!(
                    message_id = %message.id,
                    channel = %message.channel_id,
                    error = %e,
                    "History unavailable, using the message alone"
                );
                return Transcript {
                    lines: vec![target],
                };
            }
        };

        // Transport order is newest first.
        let mut lines: Vec<TranscriptLine> = history
            .iter()
            .filter(|m| m.id != message.id)
            .take(history_count)
            .map(|m| TranscriptLine::from_message(m, self.truncate_length))
            .collect();
        lines.reverse();
        lines.push(target);

        debug!(
            message_id = %message.id,
            lines = lines.len(),
            "Transcript assembled"
        );
        Transcript { lines }
    }

    /// Rendered transcript for `message` with up to `history_count` prior lines.
    pub async fn build_context(&self, message: &InboundMessage, history_count: usize) -> String {
        self.assemble(message, history_count).await.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{RecordingTransport, human};

    fn history(n: usize) -> Vec<InboundMessage> {
        // newest first, as transports deliver it
        (0..n)
            .rev()
            .map(|i| human(&format!("h{i}"), "bob", &format!("line {i}")))
            .collect()
    }

    #[test]
    fn truncation_adds_single_marker() {
        assert_eq!(truncate_text("abcdef", 3), "abc…");
        assert_eq!(truncate_text("abc", 3), "abc");
        assert_eq!(truncate_text("", 3), "");
        let long = "x".repeat(800);
        let cut = truncate_text(&long, 500);
        assert_eq!(cut.chars().count(), 501);
        assert!(cut.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let cut = truncate_text("ééééé", 2);
        assert_eq!(cut, "éé…");
    }

    #[test]
    fn bodies_are_flattened_to_one_line() {
        assert_eq!(truncate_text("one\ntwo\r\nthree", 100), "one two  three");
    }

    #[tokio::test]
    async fn zero_history_is_target_only_and_skips_transport() {
        let transport = Arc::new(RecordingTransport::with_history(history(5)));
        let assembler = ContextAssembler::new(transport.clone());
        let target = human("t", "alice", "2+2=5");

        let context = assembler.build_context(&target, 0).await;
        assert_eq!(context, "alice: 2+2=5");
        assert!(transport.history_requests().is_empty());
    }

    #[tokio::test]
    async fn history_is_chronological_and_ends_with_target() {
        let transport = Arc::new(RecordingTransport::with_history(history(3)));
        let assembler = ContextAssembler::new(transport.clone());
        let target = human("t", "alice", "2+2=5");

        let context = assembler.build_context(&target, 9).await;
        assert_eq!(context, "bob: line 0\nbob: line 1\nbob: line 2\nalice: 2+2=5");
        assert_eq!(transport.history_requests(), vec![("t".to_string(), 9)]);
    }

    #[tokio::test]
    async fn never_more_than_history_count_plus_one_lines() {
        let transport = Arc::new(RecordingTransport::with_history(history(30)).ignoring_limit());
        let assembler = ContextAssembler::new(transport);
        let target = human("t", "alice", "hello");

        for count in [0, 1, 4, 9, 25] {
            let transcript = assembler.assemble(&target, count).await;
            assert!(transcript.len() <= count + 1, "count {count}");
            assert_eq!(transcript.last().unwrap().text, "hello");
        }
        // The newest prior messages are the ones kept.
        let transcript = assembler.assemble(&target, 2).await;
        assert_eq!(transcript.lines[0].text, "line 28");
        assert_eq!(transcript.lines[1].text, "line 29");
    }

    #[tokio::test]
    async fn long_bodies_are_truncated_everywhere() {
        let long = "y".repeat(40);
        let transport = Arc::new(RecordingTransport::with_history(vec![human("h", "bob", &long)]));
        let assembler = ContextAssembler::new(transport).with_truncate_length(10);
        let target = human("t", "alice", &long);

        let transcript = assembler.assemble(&target, 5).await;
        for line in &transcript.lines {
            assert!(line.text.chars().count() <= 11);
            assert!(line.text.ends_with(TRUNCATION_MARKER));
        }
    }

    #[tokio::test]
    async fn transport_failure_falls_back_to_target_line() {
        let transport = Arc::new(RecordingTransport::failing_history());
        let assembler = ContextAssembler::new(transport).with_truncate_length(5);
        let target = human("t", "alice", "pineapple belongs on pizza");

        let context = assembler.build_context(&target, 9).await;
        assert_eq!(context, "alice: pinea…");
    }
}
