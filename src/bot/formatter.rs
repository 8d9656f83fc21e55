//! Response formatter: wraps reply text in the chat payload envelope

use serde::Serialize;

use crate::config::BotConfig;

/// JSON body returned to the chat platform's webhook
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatPayload {
    pub channel: String,
    pub username: String,
    pub text: String,
    pub icon_emoji: String,
    /// Lets the platform turn `@name` into real mentions
    pub link_names: bool,
}

/// Build the payload for a reply; an empty reply produces no payload
pub fn format_reply(config: &BotConfig, text: &str) -> Option<ChatPayload> {
    if text.trim().is_empty() {
        return None;
    }

    Some(ChatPayload {
        channel: config.channel.clone(),
        username: config.username.clone(),
        text: text.to_string(),
        icon_emoji: config.icon_emoji.clone(),
        link_names: true,
    })
}
