// ABOUTME: Decides which chat messages reach an agent and what text they carry.
// ABOUTME: Skips bot authors and unaddressed messages, strips mentions, checks the allow-list.

use crate::traits::IncomingMessage;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Reply sent to senders outside the allow-list
pub const UNAUTHORIZED_REPLY: &str = "Sorry, you are not authorized to use this bot.";

// Literal pattern, always compiles
static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@!?\d+>").expect("mention pattern is valid"));

/// Why a message was not forwarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Authored by a bot, including this one
    FromBot,
    /// Neither a direct message nor a mention of the bot
    NotAddressed,
    /// Nothing left after removing mentions and whitespace
    Empty,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::FromBot => "from_bot",
            IgnoreReason::NotAddressed => "not_addressed",
            IgnoreReason::Empty => "empty",
        }
    }
}

/// Outcome of reading the text out of an admitted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Ignore(IgnoreReason),
    /// Forward this text to the sender's agent
    Forward(String),
}

/// Remove every `<@id>` and `<@!id>` mention token, then trim
pub fn strip_mentions(text: &str) -> String {
    MENTION_RE.replace_all(text, "").trim().to_string()
}

/// Bot-author and addressing rules. `None` means the message is for us.
///
/// Runs before the allow-list so unaddressed chatter never gets a rejection.
pub fn screen_message(msg: &IncomingMessage, bot_user_id: &str) -> Option<IgnoreReason> {
    if msg.sender.is_bot || (!bot_user_id.is_empty() && msg.sender.id == bot_user_id) {
        return Some(IgnoreReason::FromBot);
    }
    if !msg.is_direct && !msg.mentions_bot {
        return Some(IgnoreReason::NotAddressed);
    }
    None
}

/// Text to forward: mentions stripped when the bot was mentioned, then trimmed
pub fn extract_text(msg: &IncomingMessage) -> Disposition {
    let text = if msg.mentions_bot {
        strip_mentions(&msg.body)
    } else {
        msg.body.trim().to_string()
    };

    if text.is_empty() {
        Disposition::Ignore(IgnoreReason::Empty)
    } else {
        Disposition::Forward(text)
    }
}

/// Sender allow-list. Empty means everyone is allowed.
#[derive(Debug, Clone, Default)]
pub struct Authorizer {
    allowed: HashSet<String>,
}

impl Authorizer {
    pub fn new<I, S>(user_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: user_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// True when no allow-list is configured
    pub fn is_open(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn is_authorized(&self, user_id: &str) -> bool {
        self.is_open() || self.allowed.contains(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ChatUser;

    fn message(body: &str, is_direct: bool, mentions_bot: bool) -> IncomingMessage {
        IncomingMessage {
            mentions_bot,
            is_direct,
            ..IncomingMessage::direct("discord", "c1", "u1", body)
        }
    }

    #[test]
    fn test_strip_mentions() {
        assert_eq!(strip_mentions("<@123> hello"), "hello");
        assert_eq!(strip_mentions("hey <@!456> there <@789>"), "hey  there");
        assert_eq!(strip_mentions("<@!123>  "), "");
        assert_eq!(strip_mentions("no mentions"), "no mentions");
    }

    #[test]
    fn test_strip_mentions_keeps_non_user_tokens() {
        assert_eq!(strip_mentions("<#123> channel"), "<#123> channel");
        assert_eq!(strip_mentions("<@abc> not an id"), "<@abc> not an id");
    }

    #[test]
    fn test_mention_is_stripped_and_forwarded() {
        let msg = message("<@123> hello", false, true);
        assert_eq!(screen_message(&msg, "123"), None);
        assert_eq!(extract_text(&msg), Disposition::Forward("hello".to_string()));
    }

    #[test]
    fn test_mention_only_is_admitted_then_empty() {
        let msg = message("<@!123>  ", false, true);
        assert_eq!(screen_message(&msg, "123"), None);
        assert_eq!(extract_text(&msg), Disposition::Ignore(IgnoreReason::Empty));
    }

    #[test]
    fn test_direct_message_is_trimmed_only() {
        let msg = message("  hi <@999>  ", true, false);
        assert_eq!(
            extract_text(&msg),
            Disposition::Forward("hi <@999>".to_string())
        );
    }

    #[test]
    fn test_unaddressed_channel_message_is_ignored() {
        let msg = message("just chatting", false, false);
        assert_eq!(
            screen_message(&msg, "123"),
            Some(IgnoreReason::NotAddressed)
        );
    }

    #[test]
    fn test_bot_authors_are_ignored() {
        let mut msg = message("hello", true, false);
        msg.sender = ChatUser::bot("555");
        assert_eq!(screen_message(&msg, "123"), Some(IgnoreReason::FromBot));

        let mut own = message("hello", true, false);
        own.sender = ChatUser::new("123");
        assert_eq!(screen_message(&own, "123"), Some(IgnoreReason::FromBot));
    }

    #[test]
    fn test_authorizer_empty_allows_everyone() {
        let auth = Authorizer::new(Vec::<String>::new());
        assert!(auth.is_open());
        assert!(auth.is_authorized("anyone"));
    }

    #[test]
    fn test_authorizer_allow_list() {
        let auth = Authorizer::new(["1", "2"]);
        assert!(auth.is_authorized("1"));
        assert!(!auth.is_authorized("3"));
    }
}
