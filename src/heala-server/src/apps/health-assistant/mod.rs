// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

pub mod analysis;
pub mod capture;
pub mod chat;
pub mod distance;
pub mod gemini;
pub mod prompts;
pub mod records;
pub mod reveal;
pub mod schedule;
pub mod session;
pub mod types;

pub use analysis::{
    split_header, AnalysisSession, Controls, DocumentAnalyzer, TranslateOutcome, WorkflowState,
};
pub use capture::{CapturedImage, FileImageSource, ImageSource};
pub use chat::{ChatMessage, ChatRole, HealthChat};
pub use distance::{
    filter_hospitals, format_distance, haversine_km, load_hospitals, load_hospitals_file, nearest,
    rank_hospitals, select_hospitals, Coordinate, HospitalRecord, RankedHospital,
};
pub use gemini::{GeminiClient, GeminiConfig, GeminiEndpoint, GenerativeModel};
pub use records::{HealthRecord, HealthRecords, RecordType};
pub use reveal::RevealHandle;
pub use schedule::{
    recent_prescriptions, MedicineSchedule, Period, PrescriptionSummary, ScheduleEntry,
};
pub use session::SessionContext;
pub use types::*;

#[cfg(test)]
pub(crate) mod testing {
    use super::capture::{CapturedImage, ImageSource};
    use super::gemini::GenerativeModel;
    use super::types::GenerateContentRequest;
    use crate::HealaError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// generateContent body carrying `text` as the first candidate.
    pub fn candidate_body(text: &str) -> Result<String, HealaError> {
        Ok(json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] }).to_string())
    }

    /// Model that replays canned bodies in order and records every request.
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, HealaError>>>,
        requests: Mutex<Vec<GenerateContentRequest>>,
    }

    impl ScriptedModel {
        pub fn new(replies: Vec<Result<String, HealaError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn requests(&self) -> Vec<GenerateContentRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate_raw(
            &self,
            request: &GenerateContentRequest,
        ) -> Result<String, HealaError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(HealaError::RemoteCallFailure("script exhausted".into())))
        }
    }

    pub enum StaticImageSource {
        Image(CapturedImage),
        Cancelled,
        Denied,
    }

    #[async_trait]
    impl ImageSource for StaticImageSource {
        async fn pick(&self) -> Result<Option<CapturedImage>, HealaError> {
            match self {
                StaticImageSource::Image(image) => Ok(Some(image.clone())),
                StaticImageSource::Cancelled => Ok(None),
                StaticImageSource::Denied => {
                    Err(HealaError::PermissionDenied("gallery access refused".into()))
                }
            }
        }
    }
}
