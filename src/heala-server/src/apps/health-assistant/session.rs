// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use tracing::Span;

pub const DEFAULT_LANGUAGE: &str = "English";

/// Signed-in user context, passed explicitly to the analyzer and chat.
/// Authentication itself happens outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    /// Language the user prefers results translated into. Fresh results
    /// are always presented in English.
    pub language: String,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            user_id: None,
            display_name: None,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl SessionContext {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn is_signed_in(&self) -> bool {
        self.user_id.is_some()
    }

    /// Span that tags log lines with the user id.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "session",
            user = self.user_id.as_deref().unwrap_or("anonymous")
        )
    }
}
