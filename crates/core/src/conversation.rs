//! Conversation-related types.

use std::fmt::{self, Display};

use toolbridge_model::{ContentPart, ModelMessage, Role};

/// The message history of a query, as sent to the completion service.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<ModelMessage>,
}

impl Conversation {
    /// Starts a conversation with a user query.
    #[inline]
    pub fn with_query<S: Into<String>>(query: S) -> Self {
        Self {
            messages: vec![ModelMessage::user_text(query)],
        }
    }

    /// Appends a message.
    #[inline]
    pub fn push(&mut self, msg: ModelMessage) {
        self.messages.push(msg);
    }

    /// Returns the messages in order.
    #[inline]
    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns whether the conversation has no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Counts the tool uses requested by the assistant.
    pub fn tool_use_count(&self) -> usize {
        self.count_parts(|part| matches!(part, ContentPart::ToolUse(_)))
    }

    /// Counts the tool results fed back to the assistant.
    pub fn tool_result_count(&self) -> usize {
        self.count_parts(|part| matches!(part, ContentPart::ToolResult(_)))
    }

    /// Returns whether the history starts with the user and roles
    /// alternate from there on.
    pub fn roles_alternate(&self) -> bool {
        let mut expected = Role::User;
        for msg in &self.messages {
            if msg.role != expected {
                return false;
            }
            expected = match expected {
                Role::User => Role::Assistant,
                Role::Assistant => Role::User,
            };
        }
        true
    }

    fn count_parts(&self, f: impl Fn(&ContentPart) -> bool) -> usize {
        self.messages
            .iter()
            .flat_map(|msg| &msg.content)
            .filter(|part| f(part))
            .count()
    }
}

/// Where a transcript line comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TranscriptSource {
    /// Text generated by the assistant.
    Assistant,
    /// A trace of a tool invocation.
    Tool,
}

/// A line of the transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptLine {
    /// The line's text.
    pub text: String,
    /// Where the line comes from.
    pub source: TranscriptSource,
}

/// The human-readable output of a query.
///
/// The transcript is what the user gets to see, it's not enough to
/// reconstruct the conversation.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Transcript {
    lines: Vec<TranscriptLine>,
}

impl Transcript {
    /// Appends a line.
    #[inline]
    pub fn push<S: Into<String>>(&mut self, source: TranscriptSource, text: S) {
        self.lines.push(TranscriptLine {
            text: text.into(),
            source,
        });
    }

    /// Returns the lines in order.
    #[inline]
    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }
}

impl Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, line) in self.lines.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            f.write_str(&line.text)?;
        }
        Ok(())
    }
}
