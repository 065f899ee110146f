// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::HealaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================
// Gemini generateContent wire types
// ============================================

/// Request body for `generateContent`, also the relay's inbound schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A part is either prompt text or an inline base64 payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub data: String,
    pub mime_type: String,
}

impl GenerateContentRequest {
    /// Single-turn request from prompt parts.
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content { role: None, parts }],
        }
    }

    pub fn text(prompt: impl Into<String>) -> Self {
        Self::from_parts(vec![Part::Text {
            text: prompt.into(),
        }])
    }
}

/// Response body for `generateContent`. Parsed leniently: anything other than
/// text parts is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, if it is non-empty.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.as_deref())
            .filter(|t| !t.is_empty())
    }
}

// ============================================
// Document analysis domain types
// ============================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Lab,
    Prescription,
    Unknown,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Lab => "lab",
            DocumentKind::Prescription => "prescription",
            DocumentKind::Unknown => "unknown",
        }
    }

    /// Quoted label used in the wrong-analyzer notice.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Lab => "'Lab Report'",
            DocumentKind::Prescription => "'Prescription'",
            DocumentKind::Unknown => "'Different Document'",
        }
    }

    /// Whether a classifier reply names this kind. Case-insensitive substring.
    pub fn matches_reply(&self, reply: &str) -> bool {
        match self {
            DocumentKind::Unknown => false,
            kind => reply.to_lowercase().contains(kind.as_str()),
        }
    }

    /// Kind named by a classifier reply; `lab` wins when both appear.
    pub fn detect(reply: &str) -> Self {
        if DocumentKind::Lab.matches_reply(reply) {
            DocumentKind::Lab
        } else if DocumentKind::Prescription.matches_reply(reply) {
            DocumentKind::Prescription
        } else {
            DocumentKind::Unknown
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = HealaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lab" => Ok(DocumentKind::Lab),
            "prescription" => Ok(DocumentKind::Prescription),
            "unknown" => Ok(DocumentKind::Unknown),
            other => Err(HealaError::ValidationError(format!(
                "Unknown document kind: {other}"
            ))),
        }
    }
}

/// Remote call that failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CallStage {
    Classification,
    Analysis,
}

/// Tagged result of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Success { text: String },
    Mismatch {
        requested: DocumentKind,
        detected: DocumentKind,
    },
    NetworkError { stage: CallStage },
    /// The model answered but carried no usable text.
    ParseError,
}

pub const MISMATCH_PREFIX: &str = "⚠️ Please upload this image to the correct analyzer.";
pub const CLASSIFICATION_NETWORK_ERROR: &str = "🚫 Network error during classification.";
pub const ANALYSIS_NETWORK_ERROR: &str = "🚫 Network error.";
pub const NO_VALID_RESPONSE: &str = "⚠️ No valid response received.";

/// Lowercase phrases that mark a failure text.
const FAILURE_MARKERS: [&str; 3] = [
    "please upload this image",
    "network error",
    "no valid response",
];

/// Text-only validity check: non-empty and free of every failure marker.
pub fn is_valid_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    !text.trim().is_empty() && !FAILURE_MARKERS.iter().any(|m| lower.contains(m))
}

impl AnalysisOutcome {
    /// User-facing text for this outcome.
    pub fn text(&self) -> String {
        match self {
            AnalysisOutcome::Success { text } => text.clone(),
            AnalysisOutcome::Mismatch { detected, .. } => format!(
                "{MISMATCH_PREFIX}\n\nIt appears to be a {}.",
                detected.label()
            ),
            AnalysisOutcome::NetworkError {
                stage: CallStage::Classification,
            } => CLASSIFICATION_NETWORK_ERROR.to_string(),
            AnalysisOutcome::NetworkError {
                stage: CallStage::Analysis,
            } => ANALYSIS_NETWORK_ERROR.to_string(),
            AnalysisOutcome::ParseError => NO_VALID_RESPONSE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisResult {
    pub raw_text: String,
    pub kind: DocumentKind,
    pub outcome: AnalysisOutcome,
}

impl AnalysisResult {
    pub fn new(kind: DocumentKind, outcome: AnalysisOutcome) -> Self {
        Self {
            raw_text: outcome.text(),
            kind,
            outcome,
        }
    }

    /// Eligible for copy and translation. A successful reply that reads
    /// like one of the failure texts does not count.
    pub fn is_valid(&self) -> bool {
        matches!(self.outcome, AnalysisOutcome::Success { .. }) && is_valid_text(&self.raw_text)
    }

    /// Failure as a typed error, for callers that propagate instead of display.
    pub fn into_error(self) -> Option<HealaError> {
        match self.outcome {
            AnalysisOutcome::Success { .. } => None,
            AnalysisOutcome::Mismatch { .. } => {
                Some(HealaError::ClassificationMismatch(self.raw_text))
            }
            AnalysisOutcome::NetworkError { .. } | AnalysisOutcome::ParseError => {
                Some(HealaError::RemoteCallFailure(self.raw_text))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = GenerateContentRequest::from_parts(vec![
            Part::Text {
                text: "classify".to_string(),
            },
            Part::InlineData {
                inline_data: InlineData {
                    data: "QUJD".to_string(),
                    mime_type: "image/jpeg".to_string(),
                },
            },
        ]);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{
                    "parts": [
                        { "text": "classify" },
                        { "inlineData": { "data": "QUJD", "mimeType": "image/jpeg" } }
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_response_first_text_is_lenient() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "lab" }, { "functionCall": {} }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "totalTokenCount": 12 }
        }))
        .unwrap();
        assert_eq!(response.first_text(), Some("lab"));

        let blocked: GenerateContentResponse =
            serde_json::from_value(json!({ "promptFeedback": { "blockReason": "SAFETY" } }))
                .unwrap();
        assert_eq!(blocked.first_text(), None);
    }

    #[test]
    fn test_kind_matching() {
        assert!(DocumentKind::Lab.matches_reply("This is a LAB report."));
        assert!(!DocumentKind::Lab.matches_reply("prescription"));
        assert!(!DocumentKind::Unknown.matches_reply("unknown"));
        assert_eq!(DocumentKind::detect("Prescription"), DocumentKind::Prescription);
        assert_eq!(DocumentKind::detect("unknown"), DocumentKind::Unknown);
        assert_eq!(DocumentKind::detect(""), DocumentKind::Unknown);
        assert_eq!("LAB".parse::<DocumentKind>().unwrap(), DocumentKind::Lab);
        assert!("xray".parse::<DocumentKind>().is_err());
    }

    #[test]
    fn test_outcome_text_and_validity() {
        let mismatch = AnalysisResult::new(
            DocumentKind::Prescription,
            AnalysisOutcome::Mismatch {
                requested: DocumentKind::Lab,
                detected: DocumentKind::Prescription,
            },
        );
        assert!(mismatch.raw_text.contains("'Prescription'"));
        assert!(!mismatch.is_valid());
        assert!(matches!(
            mismatch.into_error(),
            Some(HealaError::ClassificationMismatch(_))
        ));

        let network = AnalysisResult::new(
            DocumentKind::Lab,
            AnalysisOutcome::NetworkError {
                stage: CallStage::Analysis,
            },
        );
        assert_eq!(network.raw_text, "🚫 Network error.");
        assert!(!network.is_valid());

        let ok = AnalysisResult::new(
            DocumentKind::Lab,
            AnalysisOutcome::Success {
                text: "report".to_string(),
            },
        );
        assert!(ok.is_valid());
        assert_eq!(ok.into_error(), None);
    }

    #[test]
    fn test_success_with_failure_text_is_invalid() {
        for text in ["🚫 Network error.", "", "  \n", "Sorry, NO VALID RESPONSE here"] {
            let result = AnalysisResult::new(
                DocumentKind::Lab,
                AnalysisOutcome::Success {
                    text: text.to_string(),
                },
            );
            assert!(!result.is_valid(), "{text:?} should not be valid");
            assert_eq!(result.into_error(), None);
        }
        assert!(is_valid_text("Hemoglobin 13.5"));
        assert!(!is_valid_text(MISMATCH_PREFIX));
    }
}
