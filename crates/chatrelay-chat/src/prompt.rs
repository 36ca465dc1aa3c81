//! Turn splitting and history flattening.
//!
//! The provider never sees the raw message sequence: the latest user message
//! is separated out as the current turn and everything before it is flattened
//! into one formatted history string for the template.

use chatrelay_core::{Error, Result};

use crate::types::ChatMessage;

/// Split a transcript into (prior messages, current turn).
///
/// An empty transcript is a `BadRequest`; the current turn of an empty
/// sequence does not exist and must never be indexed blindly.
pub fn split_turn(messages: &[ChatMessage]) -> Result<(&[ChatMessage], &ChatMessage)> {
    match messages.split_last() {
        Some((current, history)) => Ok((history, current)),
        None => Err(Error::BadRequest(
            "messages must be a non-empty array".into(),
        )),
    }
}

/// Flatten messages into a single `"{role}: {content}"` string, one line per
/// message, in original order.
pub fn format_history(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_separates_current_turn() {
        let messages = vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("reply"),
            ChatMessage::user("second"),
        ];
        let (history, current) = split_turn(&messages).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(current.content, "second");
    }

    #[test]
    fn split_rejects_empty_transcript() {
        let err = split_turn(&[]).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn single_message_has_empty_history() {
        let messages = vec![ChatMessage::user("Hello")];
        let (history, current) = split_turn(&messages).unwrap();
        assert!(history.is_empty());
        assert_eq!(format_history(history), "");
        assert_eq!(current.content, "Hello");
    }

    #[test]
    fn history_is_newline_joined_in_order() {
        let messages = vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
            ChatMessage::user("how are you?"),
        ];
        let (history, _) = split_turn(&messages).unwrap();
        assert_eq!(
            format_history(history),
            "user: hi\nassistant: hello"
        );
    }
}
