pub mod telegram;

/// An event received from the messaging platform, already stripped of
/// platform-specific types.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// A `/name arg arg` message
    Command {
        sender_id: u64,
        name: String,
        args: Vec<String>,
    },
    /// Any non-command message
    PlainMessage {
        sender_id: u64,
        text: String,
        /// Phone number the platform attached to the sender, if known
        sender_phone: Option<String>,
    },
    InlineQuery { sender_id: u64, query: String },
}

impl InboundEvent {
    /// Identity that originated the event, whatever its shape
    pub fn sender_id(&self) -> u64 {
        match self {
            InboundEvent::Command { sender_id, .. }
            | InboundEvent::PlainMessage { sender_id, .. }
            | InboundEvent::InlineQuery { sender_id, .. } => *sender_id,
        }
    }

    /// Build an event from message text. Text starting with `/` is a command;
    /// `None` means the command was addressed to another bot.
    pub fn from_text(
        sender_id: u64,
        text: &str,
        bot_username: Option<&str>,
        sender_phone: Option<String>,
    ) -> Option<Self> {
        match parse_command(text, bot_username) {
            Some(Some((name, args))) => Some(InboundEvent::Command {
                sender_id,
                name,
                args,
            }),
            Some(None) => None,
            None => Some(InboundEvent::PlainMessage {
                sender_id,
                text: text.to_string(),
                sender_phone,
            }),
        }
    }
}

/// A reply to deliver back through the platform
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundResponse {
    Text { body: String, markdown: bool },
    Photo { url: String },
    Inline { id: String, title: String, body: String },
}

impl OutboundResponse {
    pub fn markdown(body: impl Into<String>) -> Self {
        OutboundResponse::Text {
            body: body.into(),
            markdown: true,
        }
    }

    pub fn plain(body: impl Into<String>) -> Self {
        OutboundResponse::Text {
            body: body.into(),
            markdown: false,
        }
    }
}

/// Split a command message into a lowercase name and whitespace tokens.
///
/// Returns `None` for non-command text and `Some(None)` when the command
/// carries an `@mention` for a different bot.
fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Option<(String, Vec<String>)>> {
    let rest = text.strip_prefix('/')?;
    // Telegram only tags `/name` as a command when a name follows the slash
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        return None;
    }
    let mut tokens = rest.split_whitespace();
    let head = tokens.next().unwrap_or("");

    let (name, mention) = match head.split_once('@') {
        Some((name, mention)) => (name, Some(mention)),
        None => (head, None),
    };

    if let (Some(mention), Some(own)) = (mention, bot_username) {
        if !mention.eq_ignore_ascii_case(own) {
            return Some(None);
        }
    }

    let args = tokens.map(str::to_string).collect();
    Some(Some((name.to_lowercase(), args)))
}

/// Split long messages for Telegram's 4096 char limit
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_with_args() {
        let event = InboundEvent::from_text(1, "/chat  ciao   come va", None, None).unwrap();
        assert_eq!(
            event,
            InboundEvent::Command {
                sender_id: 1,
                name: "chat".to_string(),
                args: vec!["ciao".into(), "come".into(), "va".into()],
            }
        );
    }

    #[test]
    fn test_command_name_is_lowercased() {
        let event = InboundEvent::from_text(1, "/SkyToday", None, None).unwrap();
        assert!(matches!(event, InboundEvent::Command { ref name, ref args, .. }
            if name == "skytoday" && args.is_empty()));
    }

    #[test]
    fn test_command_mention_for_this_bot() {
        let event = InboundEvent::from_text(1, "/image@MyBot a cat", Some("mybot"), None).unwrap();
        assert!(matches!(event, InboundEvent::Command { ref name, .. } if name == "image"));
    }

    #[test]
    fn test_command_mention_for_other_bot_is_dropped() {
        assert!(InboundEvent::from_text(1, "/chat@OtherBot hi", Some("mybot"), None).is_none());
    }

    #[test]
    fn test_slash_without_name_is_plain_text() {
        for text in ["/", "/ chat ciao", "/\tsky"] {
            let event = InboundEvent::from_text(1, text, None, None).unwrap();
            assert!(
                matches!(event, InboundEvent::PlainMessage { .. }),
                "{:?} should be plain text",
                text
            );
        }
    }

    #[test]
    fn test_plain_text_keeps_phone() {
        let event =
            InboundEvent::from_text(9, "qualsiasi", None, Some("+391234567".to_string())).unwrap();
        assert_eq!(event.sender_id(), 9);
        assert!(matches!(event, InboundEvent::PlainMessage { sender_phone: Some(ref p), .. }
            if p == "+391234567"));
    }

    #[test]
    fn test_split_message_short_text_untouched() {
        assert_eq!(split_message("hello", 10), vec!["hello".to_string()]);
    }

    #[test]
    fn test_split_message_prefers_newlines() {
        let chunks = split_message("aaaa\nbbbb\ncccc", 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb\n".to_string(), "cccc".to_string()]);
        assert_eq!(chunks.concat(), "aaaa\nbbbb\ncccc");
    }

    #[test]
    fn test_split_message_respects_char_boundaries() {
        let text = "è".repeat(10);
        let chunks = split_message(&text, 5);
        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| c.len() <= 5));
    }
}
