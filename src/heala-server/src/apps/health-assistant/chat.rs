// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use super::gemini::GenerativeModel;
use super::prompts::chat_prompt;
use super::reveal::{RevealHandle, CHAT_REVEAL_INTERVAL};
use super::session::SessionContext;
use super::types::GenerateContentRequest;
use crate::HealaError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Instrument};

/// Longest message the input box accepts.
pub const MAX_MESSAGE_CHARS: usize = 500;
pub const NO_REPLY_FALLBACK: &str = "⚠️ Could not fetch data.";
pub const FAILURE_FALLBACK: &str = "⚠️ Something went wrong. Try again.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    #[serde(rename = "ai")]
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Triage chat. Keeps the transcript for one screen session.
pub struct HealthChat {
    model: Arc<dyn GenerativeModel>,
    session: SessionContext,
    messages: Vec<ChatMessage>,
    typing: Option<RevealHandle>,
    reveal_interval: Duration,
}

impl HealthChat {
    pub fn new(model: Arc<dyn GenerativeModel>, session: SessionContext) -> Self {
        Self {
            model,
            session,
            messages: Vec::new(),
            typing: None,
            reveal_interval: CHAT_REVEAL_INTERVAL,
        }
    }

    pub fn with_reveal_interval(mut self, interval: Duration) -> Self {
        self.reveal_interval = interval;
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Ask the model about `message`. Remote failures come back as the
    /// fallback texts; only invalid input is an error.
    pub async fn reply(&self, message: &str) -> Result<String, HealaError> {
        let message = validate_message(message)?;
        let request = GenerateContentRequest::text(chat_prompt(message));

        let reply = match self
            .model
            .generate(&request)
            .instrument(self.session.span())
            .await
        {
            Ok(Some(text)) => text,
            Ok(None) => NO_REPLY_FALLBACK.to_string(),
            Err(e) => {
                warn!("Chat request failed: {e}");
                FAILURE_FALLBACK.to_string()
            }
        };
        Ok(reply)
    }

    /// Record the user's message, fetch the reply and start typing it out.
    pub async fn send(&mut self, message: &str) -> Result<&ChatMessage, HealaError> {
        let reply = self.reply(message).await?;
        info!("Chat reply: {} chars", reply.chars().count());

        if let Some(mut previous) = self.typing.take() {
            previous.cancel();
        }
        self.typing = Some(RevealHandle::start(reply.clone(), self.reveal_interval));

        self.messages.push(ChatMessage {
            role: ChatRole::User,
            content: message.trim().to_string(),
        });
        self.messages.push(ChatMessage {
            role: ChatRole::Assistant,
            content: reply,
        });
        Ok(&self.messages[self.messages.len() - 1])
    }

    /// Partially revealed text of the latest reply, while it is still typing.
    pub fn typing_text(&self) -> Option<String> {
        self.typing
            .as_ref()
            .map(RevealHandle::snapshot)
            .filter(|frame| !frame.complete)
            .map(|frame| frame.shown)
    }

    pub fn is_typing(&self) -> bool {
        self.typing.as_ref().is_some_and(|t| !t.is_complete())
    }

    /// Wait for the latest reply to be fully shown.
    pub async fn finish_typing(&mut self) -> Option<String> {
        match self.typing.as_mut() {
            Some(typing) => typing.finished().await,
            None => None,
        }
    }
}

fn validate_message(message: &str) -> Result<&str, HealaError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(HealaError::ValidationError("Message is empty".to_string()));
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(HealaError::ValidationError(format!(
            "Message is longer than {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(trimmed)
}
