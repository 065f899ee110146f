// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

// Document analysis workflow.
//
// Idle -> Picking -> Classifying -> Analyzing -> Presenting (-> Translating -> Presenting) -> Idle
//
// Every remote failure ends in a presentable result. The only error that
// leaves `DocumentAnalyzer::run` is a failure to obtain an image.

use super::capture::{CapturedImage, ImageSource};
use super::gemini::GenerativeModel;
use super::prompts::{
    analysis_prompt, translation_prompt, CLASSIFIER_PROMPT, LAB_REPORT_TITLE, PRESCRIPTION_TITLE,
};
use super::reveal::{RevealHandle, ANALYSIS_REVEAL_INTERVAL};
use super::session::{SessionContext, DEFAULT_LANGUAGE};
use super::types::{
    AnalysisOutcome, AnalysisResult, CallStage, DocumentKind, GenerateContentRequest,
    GenerateContentResponse, Part,
};
use crate::HealaError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

pub const PERMISSION_MESSAGE: &str = "Permission required to access your gallery.";
pub const TRANSLATION_FAILED_BODY: &str = "⚠️ Translation failed.";
pub const TRANSLATION_FAILED_NOTICE: &str = "Translation failed.";

lazy_static! {
    static ref LAB_HEADER: Regex = header_pattern(LAB_REPORT_TITLE);
    static ref PRESCRIPTION_HEADER: Regex = header_pattern(PRESCRIPTION_TITLE);
}

/// Title line, blank lines, then the first delimiter line of at least ten `=`.
fn header_pattern(title: &str) -> Regex {
    Regex::new(&format!(
        r"(?s)^.*?{}\s*[\n\r]+\s*={{10,}}\s*[\n\r]+",
        regex::escape(title)
    ))
    .expect("header pattern is valid")
}

/// Split a templated reply into its fixed header block and the trimmed body.
/// Without a recognisable header the whole text is the body.
pub fn split_header(kind: DocumentKind, text: &str) -> (&str, &str) {
    let pattern: &Regex = match kind {
        DocumentKind::Lab => &LAB_HEADER,
        DocumentKind::Prescription => &PRESCRIPTION_HEADER,
        DocumentKind::Unknown => return ("", text),
    };
    match pattern.find(text) {
        Some(m) => (&text[..m.end()], text[m.end()..].trim()),
        None => ("", text),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    Idle,
    Picking,
    Classifying,
    Analyzing,
    Presenting,
    Translating,
}

/// Which result-view controls are enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub copy: bool,
    pub translate: bool,
    pub close: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslateOutcome {
    /// Header plus translated body, now displayed.
    Translated(String),
    /// Requested language is already showing; nothing was sent.
    AlreadyActive { notice: String },
    /// Result is not translatable (failure text or reveal still running).
    Unavailable,
    Failed { notice: String },
}

pub struct DocumentAnalyzer {
    model: Arc<dyn GenerativeModel>,
    session: SessionContext,
    reveal_interval: Duration,
}

impl DocumentAnalyzer {
    pub fn new(model: Arc<dyn GenerativeModel>, session: SessionContext) -> Self {
        Self {
            model,
            session,
            reveal_interval: ANALYSIS_REVEAL_INTERVAL,
        }
    }

    pub fn with_reveal_interval(mut self, interval: Duration) -> Self {
        self.reveal_interval = interval;
        self
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Pick an image and run it through classification and analysis.
    ///
    /// `Ok(None)` when the user backed out of picking.
    pub async fn run(
        &self,
        kind: DocumentKind,
        source: &dyn ImageSource,
    ) -> Result<Option<AnalysisSession>, HealaError> {
        ensure_analyzable(kind)?;
        let span = self.session.span();
        async move {
            let history = vec![WorkflowState::Idle, WorkflowState::Picking];
            let image = match source.pick().await {
                Ok(Some(image)) => image,
                Ok(None) => {
                    info!("Image selection cancelled");
                    return Ok(None);
                }
                Err(HealaError::PermissionDenied(detail)) => {
                    warn!("Gallery access refused: {detail}");
                    return Err(HealaError::PermissionDenied(PERMISSION_MESSAGE.to_string()));
                }
                Err(e) => return Err(e),
            };
            Ok(Some(self.process(kind, image, history).await))
        }
        .instrument(span)
        .await
    }

    /// Run an already captured image through classification and analysis.
    pub async fn analyze_image(
        &self,
        kind: DocumentKind,
        image: CapturedImage,
    ) -> Result<AnalysisSession, HealaError> {
        ensure_analyzable(kind)?;
        let span = self.session.span();
        Ok(self
            .process(kind, image, vec![WorkflowState::Idle])
            .instrument(span)
            .await)
    }

    async fn process(
        &self,
        kind: DocumentKind,
        image: CapturedImage,
        mut history: Vec<WorkflowState>,
    ) -> AnalysisSession {
        history.push(WorkflowState::Classifying);
        let result = match self.classify(&image).await {
            Err(e) => {
                warn!("Classification failed: {e}");
                AnalysisResult::new(
                    DocumentKind::Unknown,
                    AnalysisOutcome::NetworkError {
                        stage: CallStage::Classification,
                    },
                )
            }
            Ok(reply) if kind.matches_reply(&reply) => {
                history.push(WorkflowState::Analyzing);
                self.analyze(kind, &image).await
            }
            Ok(reply) => {
                let detected = DocumentKind::detect(&reply);
                info!("Requested {} but classifier saw {}", kind, detected);
                AnalysisResult::new(
                    detected,
                    AnalysisOutcome::Mismatch {
                        requested: kind,
                        detected,
                    },
                )
            }
        };
        history.push(WorkflowState::Presenting);

        // Analysis prompts always answer in English.
        AnalysisSession::present(
            self.model.clone(),
            result,
            DEFAULT_LANGUAGE.to_string(),
            history,
            self.reveal_interval,
        )
    }

    /// Ask the model what kind of document the image is. Lowercased reply.
    pub async fn classify(&self, image: &CapturedImage) -> Result<String, HealaError> {
        let request = GenerateContentRequest::from_parts(vec![
            Part::Text {
                text: CLASSIFIER_PROMPT.to_string(),
            },
            image.to_part(),
        ]);
        let reply = self.model.generate(&request).await?.unwrap_or_default();
        debug!("Classifier reply: {}", reply.trim());
        Ok(reply.to_lowercase())
    }

    async fn analyze(&self, kind: DocumentKind, image: &CapturedImage) -> AnalysisResult {
        let Some(prompt) = analysis_prompt(kind) else {
            return AnalysisResult::new(kind, AnalysisOutcome::ParseError);
        };
        let request = GenerateContentRequest::from_parts(vec![
            Part::Text {
                text: prompt.to_string(),
            },
            image.to_part(),
        ]);

        let body = match self.model.generate_raw(&request).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Analysis call failed: {e}");
                return AnalysisResult::new(
                    kind,
                    AnalysisOutcome::NetworkError {
                        stage: CallStage::Analysis,
                    },
                );
            }
        };

        let outcome = match serde_json::from_str::<GenerateContentResponse>(&body) {
            Ok(response) => match response.first_text() {
                Some(text) => AnalysisOutcome::Success {
                    text: text.to_string(),
                },
                None => AnalysisOutcome::ParseError,
            },
            // Not a generateContent envelope; show whatever came back.
            Err(_) if !body.trim().is_empty() => {
                warn!("Analysis reply was not JSON, presenting raw body");
                AnalysisOutcome::Success { text: body }
            }
            Err(_) => AnalysisOutcome::ParseError,
        };

        info!("Analysis finished for {}", kind);
        AnalysisResult::new(kind, outcome)
    }
}

fn ensure_analyzable(kind: DocumentKind) -> Result<(), HealaError> {
    if kind == DocumentKind::Unknown {
        return Err(HealaError::ValidationError(
            "Choose the lab report or prescription analyzer".to_string(),
        ));
    }
    Ok(())
}

/// A result on screen. Owns the reveal task; dropping the session cancels it.
pub struct AnalysisSession {
    model: Arc<dyn GenerativeModel>,
    result: AnalysisResult,
    reveal: RevealHandle,
    translated: Option<String>,
    language: String,
    state: WorkflowState,
    history: Vec<WorkflowState>,
}

impl AnalysisSession {
    fn present(
        model: Arc<dyn GenerativeModel>,
        result: AnalysisResult,
        language: String,
        history: Vec<WorkflowState>,
        interval: Duration,
    ) -> Self {
        // Failure notices appear at once; only real results are typed out.
        let reveal = if result.is_valid() {
            RevealHandle::start(result.raw_text.clone(), interval)
        } else {
            RevealHandle::instant(result.raw_text.clone())
        };
        Self {
            model,
            result,
            reveal,
            translated: None,
            language,
            state: WorkflowState::Presenting,
            history,
        }
    }

    pub fn result(&self) -> &AnalysisResult {
        &self.result
    }

    pub fn is_valid(&self) -> bool {
        self.result.is_valid()
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Every state visited so far, in order.
    pub fn history(&self) -> &[WorkflowState] {
        &self.history
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// What the result view shows right now.
    pub fn displayed_text(&self) -> String {
        match &self.translated {
            Some(text) => text.clone(),
            None => self.reveal.snapshot().shown,
        }
    }

    pub fn is_reveal_complete(&self) -> bool {
        self.reveal.is_complete()
    }

    /// Wait until the reveal has shown the whole result.
    pub async fn wait_for_reveal(&mut self) -> Option<String> {
        self.reveal.finished().await
    }

    pub fn controls(&self) -> Controls {
        let complete = self.reveal.is_complete() && self.state != WorkflowState::Translating;
        let actionable = complete && self.result.is_valid();
        Controls {
            copy: actionable,
            translate: actionable,
            close: complete,
        }
    }

    /// Text to put on the clipboard. Always the untranslated result.
    pub fn copy_text(&self) -> Option<&str> {
        self.controls()
            .copy
            .then_some(self.result.raw_text.as_str())
    }

    /// Translate the body of the result, keeping the header block as is.
    pub async fn translate(&mut self, language: &str) -> TranslateOutcome {
        if !self.controls().translate {
            return TranslateOutcome::Unavailable;
        }
        if self.language.eq_ignore_ascii_case(language) {
            return TranslateOutcome::AlreadyActive {
                notice: format!("Already in {language}"),
            };
        }

        self.transition(WorkflowState::Translating);
        let (header, body) = split_header(self.result.kind, &self.result.raw_text);
        let request = GenerateContentRequest::text(translation_prompt(language, body));

        let outcome = match self.model.generate(&request).await {
            Ok(reply) => {
                let translated = reply.unwrap_or_else(|| TRANSLATION_FAILED_BODY.to_string());
                let full = format!("{header}{translated}");
                info!("Translated result into {}", language);
                self.translated = Some(full.clone());
                self.language = language.to_string();
                TranslateOutcome::Translated(full)
            }
            Err(e) => {
                warn!("Translation into {} failed: {e}", language);
                TranslateOutcome::Failed {
                    notice: TRANSLATION_FAILED_NOTICE.to_string(),
                }
            }
        };
        self.transition(WorkflowState::Presenting);
        outcome
    }

    /// Close the result view. Cancels a running reveal and returns the
    /// visited states, ending in `Idle`.
    pub fn close(mut self) -> Vec<WorkflowState> {
        self.reveal.cancel();
        self.transition(WorkflowState::Idle);
        std::mem::take(&mut self.history)
    }

    fn transition(&mut self, next: WorkflowState) {
        debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
    }
}
