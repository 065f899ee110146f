// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

// Typing reveal for text that is already fully available.
//
// A spawned task appends one character per tick and publishes the growing
// prefix on a watch channel. Dropping or cancelling the handle aborts it.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Per-character interval for analysis results.
pub const ANALYSIS_REVEAL_INTERVAL: Duration = Duration::from_millis(12);
/// Per-character interval for chat replies.
pub const CHAT_REVEAL_INTERVAL: Duration = Duration::from_millis(30);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevealFrame {
    pub shown: String,
    pub complete: bool,
}

pub struct RevealHandle {
    frames: watch::Receiver<RevealFrame>,
    task: Option<JoinHandle<()>>,
    cancelled: bool,
}

impl RevealHandle {
    /// Start revealing `text`, one character every `interval`. A zero
    /// interval shows the whole text at once.
    /// Must be called inside a tokio runtime.
    pub fn start(text: impl Into<String>, interval: Duration) -> Self {
        let text = text.into();
        if interval.is_zero() {
            return Self::instant(text);
        }
        let (tx, rx) = watch::channel(RevealFrame::default());

        let task = tokio::spawn(async move {
            let total = text.chars().count();
            if total == 0 {
                let _ = tx.send(RevealFrame {
                    shown: String::new(),
                    complete: true,
                });
                return;
            }

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            let mut shown = String::with_capacity(text.len());
            for (i, ch) in text.chars().enumerate() {
                ticker.tick().await;
                shown.push(ch);
                let frame = RevealFrame {
                    shown: shown.clone(),
                    complete: i + 1 == total,
                };
                if tx.send(frame).is_err() {
                    debug!("Reveal receiver dropped after {} chars", i + 1);
                    return;
                }
            }
        });

        Self {
            frames: rx,
            task: Some(task),
            cancelled: false,
        }
    }

    /// A reveal that is already complete. Used for notices shown at once.
    pub fn instant(text: impl Into<String>) -> Self {
        let (_tx, rx) = watch::channel(RevealFrame {
            shown: text.into(),
            complete: true,
        });
        Self {
            frames: rx,
            task: None,
            cancelled: false,
        }
    }

    /// Latest published frame.
    pub fn snapshot(&self) -> RevealFrame {
        self.frames.borrow().clone()
    }

    pub fn is_complete(&self) -> bool {
        self.frames.borrow().complete
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Wait for the full text. `None` if the reveal was cancelled first.
    pub async fn finished(&mut self) -> Option<String> {
        if self.cancelled && !self.is_complete() {
            return None;
        }
        self.frames
            .wait_for(|frame| frame.complete)
            .await
            .ok()
            .map(|frame| frame.shown.clone())
    }

    /// Stop revealing. The last published frame stays readable.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                debug!("Cancelling reveal");
                task.abort();
                self.cancelled = true;
            }
        }
    }
}

impl Drop for RevealHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
