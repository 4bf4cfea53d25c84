use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use teloxide::types::{
    BotCommand, ChatAction, InlineQuery, InlineQueryResult, InlineQueryResultArticle, InputFile,
    InputMessageContent, InputMessageContentText, ParseMode,
};
use tracing::{debug, error, info, warn};

use crate::format::sign;
use crate::platform::{split_message, InboundEvent, OutboundResponse};
use crate::router::{Router, COMMANDS, REQUEST_FAILED};

/// The bot's own @username, used to tell which `/cmd@bot` mentions are ours
#[derive(Debug, Clone)]
struct BotUsername(Option<String>);

/// Run the Telegram platform until Ctrl-C
pub async fn run(router: Arc<Router>, bot_token: &str) -> Result<()> {
    let bot = Bot::new(bot_token);

    info!("Starting Telegram platform...");

    let me = bot
        .get_me()
        .await
        .context("Failed to fetch bot identity from Telegram")?;
    let username = BotUsername(me.user.username.clone());
    info!("Logged in as @{}", username.0.as_deref().unwrap_or("?"));

    let commands: Vec<BotCommand> = COMMANDS
        .iter()
        .map(|(name, description)| BotCommand::new(*name, *description))
        .collect();
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!("Failed to register command menu: {}", e);
    }

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_inline_query().endpoint(handle_inline_query));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router, username])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// Turn a Telegram message into an event. Text messages and shared contacts
/// are the only kinds the router cares about.
fn message_event(msg: &Message, bot_username: Option<&str>) -> Option<InboundEvent> {
    let user = msg.from.as_ref()?;
    let sender_id = user.id.0;

    if let Some(text) = msg.text() {
        return InboundEvent::from_text(sender_id, text, bot_username, None);
    }

    // Telegram only reveals a user's number when they share their own contact
    let contact = msg.contact()?;
    let sender_phone = (contact.user_id == Some(user.id)).then(|| contact.phone_number.clone());
    Some(InboundEvent::PlainMessage {
        sender_id,
        text: String::new(),
        sender_phone,
    })
}

fn chat_action(event: &InboundEvent) -> Option<ChatAction> {
    match event {
        InboundEvent::Command { name, .. } => match name.as_str() {
            "image" => Some(ChatAction::UploadPhoto),
            "chat" | "sky" | "skytoday" => Some(ChatAction::Typing),
            _ => None,
        },
        InboundEvent::PlainMessage { .. } => Some(ChatAction::Typing),
        InboundEvent::InlineQuery { .. } => None,
    }
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    router: Arc<Router>,
    username: BotUsername,
) -> ResponseResult<()> {
    let Some(event) = message_event(&msg, username.0.as_deref()) else {
        return Ok(());
    };
    let Some(event) = router.authorize(event) else {
        return Ok(());
    };

    info!("Telegram message in chat {}", msg.chat.id.0);

    if let Some(action) = chat_action(event.event()) {
        bot.send_chat_action(msg.chat.id, action).await.ok();
    }

    if let Some(reply) = router.handle(event).await {
        deliver(&bot, msg.chat.id, reply).await?;
    }

    Ok(())
}

async fn handle_inline_query(bot: Bot, q: InlineQuery, router: Arc<Router>) -> ResponseResult<()> {
    let event = InboundEvent::InlineQuery {
        sender_id: q.from.id.0,
        query: q.query.clone(),
    };

    if let Some(OutboundResponse::Inline { id, title, body }) = router.dispatch(event).await {
        let content = InputMessageContent::Text(InputMessageContentText::new(body));
        let article = InlineQueryResultArticle::new(id, title, content);
        bot.answer_inline_query(q.id, vec![InlineQueryResult::Article(article)])
            .cache_time(0)
            .await?;
    }

    Ok(())
}

async fn deliver(bot: &Bot, chat_id: ChatId, reply: OutboundResponse) -> ResponseResult<()> {
    match reply {
        OutboundResponse::Text { body, markdown } => {
            for chunk in split_message(&body, 4000) {
                send_text(bot, chat_id, chunk, markdown).await?;
            }
        }
        OutboundResponse::Photo { url } => {
            let sent = match reqwest::Url::parse(&url) {
                Ok(parsed) => bot
                    .send_photo(chat_id, InputFile::url(parsed))
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string()),
                Err(e) => Err(format!("invalid image URL {}: {}", url, e)),
            };
            if let Err(e) = sent {
                error!("Failed to send photo: {}", e);
                send_text(bot, chat_id, sign(REQUEST_FAILED), true).await?;
            }
        }
        OutboundResponse::Inline { .. } => {
            warn!("Dropping inline result produced for a chat message");
        }
    }
    Ok(())
}

/// Send as Markdown, falling back to plain text if Telegram rejects the markup
async fn send_text(bot: &Bot, chat_id: ChatId, text: String, markdown: bool) -> ResponseResult<()> {
    if markdown {
        // Legacy Markdown: replies are written for `_italic_`/`*bold*`, not MarkdownV2 escaping
        #[allow(deprecated)]
        let parse_mode = ParseMode::Markdown;
        match bot
            .send_message(chat_id, text.clone())
            .parse_mode(parse_mode)
            .await
        {
            Ok(_) => return Ok(()),
            Err(e) => warn!("Markdown rejected, resending as plain text: {}", e),
        }
    }

    bot.send_message(chat_id, text).await?;
    Ok(())
}
