//! Telegram adapter
//!
//! Maps incoming bot messages to form events and implements the outbound
//! collaborators (applicant replies, reviewer notification, document download)
//! over the Bot API via teloxide.

use crate::runtime::{
    ChatTransport, DocumentDownload, DocumentSource, NotifyError, ProductionManager,
    ReviewerNotifier, TransportError, UploadError,
};
use crate::state_machine::{ChatIdentity, Event, FileReference, Keyboard, OutboundMessage};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use std::path::Path;
use std::sync::Arc;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{
    FileId, KeyboardButton, KeyboardMarkup, KeyboardRemove, ParseMode, ReplyMarkup,
};

const START_COMMAND: &str = "/start";

/// Bot API implementation of the chat-facing collaborators
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Convert a keyboard instruction to Bot API reply markup
pub fn reply_markup(keyboard: &Keyboard) -> Option<ReplyMarkup> {
    match keyboard {
        Keyboard::Keep => None,
        Keyboard::Options(rows) => {
            let buttons = rows
                .iter()
                .map(|row| row.iter().map(KeyboardButton::new).collect::<Vec<_>>());
            Some(ReplyMarkup::Keyboard(KeyboardMarkup::new(buttons).resize_keyboard()))
        }
        Keyboard::Remove => Some(ReplyMarkup::KeyboardRemove(KeyboardRemove::new())),
    }
}

/// Extension of a downloaded document: the stored file path wins, then the
/// name the sender gave it.
pub fn resolve_extension(telegram_path: &str, file: &FileReference) -> Option<String> {
    Path::new(telegram_path)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{ext}"))
        .or_else(|| file.extension())
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send(
        &self,
        identity: ChatIdentity,
        message: OutboundMessage,
    ) -> Result<(), TransportError> {
        let mut request = self.bot.send_message(ChatId(identity.0), message.text);
        if let Some(markup) = reply_markup(&message.keyboard) {
            request = request.reply_markup(markup);
        }
        request
            .await
            .map(|_| ())
            .map_err(|e| TransportError::Delivery(e.to_string()))
    }
}

#[async_trait]
impl ReviewerNotifier for TelegramTransport {
    async fn notify(&self, reviewer: ChatIdentity, html: &str) -> Result<(), NotifyError> {
        self.bot
            .send_message(ChatId(reviewer.0), html)
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ())
            .map_err(|e| NotifyError::Delivery(e.to_string()))
    }
}

#[async_trait]
impl DocumentSource for TelegramTransport {
    async fn open(&self, file: &FileReference) -> Result<DocumentDownload, UploadError> {
        let tg_file = self
            .bot
            .get_file(FileId(file.file_id.clone()))
            .await
            .map_err(|e| UploadError::Source(format!("failed to get file info: {e}")))?;

        tracing::debug!(
            file_id = %file.file_id,
            path = %tg_file.path,
            "Resolved Telegram document"
        );

        let stream = self
            .bot
            .download_file_stream(&tg_file.path)
            .map_err(std::io::Error::other)
            .boxed();

        Ok(DocumentDownload {
            extension: resolve_extension(&tg_file.path, file),
            stream,
        })
    }
}

/// Whether `text` is the start command, optionally addressed to a bot
/// (`/start@intake_bot`) or carrying a deep-link payload
pub fn is_start_command(text: &str) -> bool {
    let Some(command) = text.split_whitespace().next() else {
        return false;
    };
    let name = command.split('@').next().unwrap_or(command);
    name == START_COMMAND
}

/// Map a Telegram message to a form event; other message kinds are ignored
pub fn event_from_message(msg: &Message) -> Option<Event> {
    if let Some(text) = msg.text() {
        if is_start_command(text) {
            return Some(Event::Start);
        }
        return Some(Event::text(text));
    }

    if let Some(doc) = msg.document() {
        let mut file = FileReference::new(doc.file.id.0.clone());
        if let Some(name) = &doc.file_name {
            file = file.with_file_name(name.clone());
        }
        return Some(Event::document(file));
    }

    None
}

#[allow(clippy::needless_pass_by_value)] // dptree injects handler arguments by value
async fn handle_message(msg: Message, manager: Arc<ProductionManager>) -> ResponseResult<()> {
    let identity = ChatIdentity(msg.chat.id.0);

    let Some(event) = event_from_message(&msg) else {
        tracing::debug!(
            identity = %identity,
            msg_id = msg.id.0,
            "Ignoring unsupported message type"
        );
        return Ok(());
    };

    if let Err(e) = manager.send_event(identity, event).await {
        tracing::error!(identity = %identity, error = %e, "Failed to route event");
    }
    Ok(())
}

/// Long-poll the Bot API until interrupted
pub async fn run_dispatcher(bot: Bot, manager: Arc<ProductionManager>) {
    tracing::info!("Starting Telegram long polling");

    Dispatcher::builder(bot, Update::filter_message().endpoint(handle_message))
        .dependencies(dptree::deps![manager])
        .default_handler(|_| async {})
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("Telegram dispatcher stopped");
}
