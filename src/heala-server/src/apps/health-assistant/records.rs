// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

// Read-only health record history loaded from bundled JSON.

use crate::HealaError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicineLine {
    pub name: String,
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum HealthRecord {
    Prescription {
        id: u32,
        disease: String,
        #[serde(default)]
        medicines: Vec<MedicineLine>,
    },
    #[serde(rename = "Lab Report")]
    LabReport {
        id: u32,
        title: String,
        #[serde(default)]
        details: String,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecordType {
    Prescription,
    #[serde(rename = "Lab Report")]
    LabReport,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Prescription => "Prescription",
            RecordType::LabReport => "Lab Report",
        }
    }
}

impl HealthRecord {
    pub fn record_type(&self) -> RecordType {
        match self {
            HealthRecord::Prescription { .. } => RecordType::Prescription,
            HealthRecord::LabReport { .. } => RecordType::LabReport,
        }
    }

    /// Key identifying an expandable prescription row.
    pub fn disease_key(&self) -> Option<String> {
        match self {
            HealthRecord::Prescription { id, disease, .. } => Some(format!("{id}-{disease}")),
            HealthRecord::LabReport { .. } => None,
        }
    }

    fn matches(&self, query: &str) -> bool {
        match self {
            HealthRecord::Prescription {
                disease, medicines, ..
            } => {
                disease.to_lowercase().contains(query)
                    || medicines.iter().any(|m| {
                        m.name.to_lowercase().contains(query)
                            || m.details.to_lowercase().contains(query)
                    })
            }
            HealthRecord::LabReport { title, details, .. } => {
                title.to_lowercase().contains(query) || details.to_lowercase().contains(query)
            }
        }
    }
}

/// Body of the detail popup for a medicine line or lab report.
pub fn detail_message(title: &str, details: &str) -> String {
    format!("{title}\n \n{details}")
}

/// "1 record" / "3 records".
pub fn count_label(count: usize) -> String {
    if count == 1 {
        "1 record".to_string()
    } else {
        format!("{count} records")
    }
}

/// Records split by type, each keeping file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedRecords<'a> {
    pub prescriptions: Vec<&'a HealthRecord>,
    pub lab_reports: Vec<&'a HealthRecord>,
}

impl<'a> GroupedRecords<'a> {
    pub fn get(&self, record_type: RecordType) -> &[&'a HealthRecord] {
        match record_type {
            RecordType::Prescription => &self.prescriptions,
            RecordType::LabReport => &self.lab_reports,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prescriptions.is_empty() && self.lab_reports.is_empty()
    }
}

/// Which group and prescription row open by themselves for a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoExpand {
    pub record_type: Option<RecordType>,
    pub disease_key: Option<String>,
}

pub struct HealthRecords {
    records: Vec<HealthRecord>,
}

impl HealthRecords {
    pub fn new(records: Vec<HealthRecord>) -> Self {
        Self { records }
    }

    pub fn from_json(json: &str) -> Result<Self, HealaError> {
        let records: Vec<HealthRecord> = serde_json::from_str(json)
            .map_err(|e| HealaError::ValidationError(format!("Invalid health records: {e}")))?;
        Ok(Self::new(records))
    }

    pub async fn load_file(path: impl AsRef<Path>) -> Result<Self, HealaError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            HealaError::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        let records = Self::from_json(&json)?;
        info!("Loaded {} health records", records.records.len());
        Ok(records)
    }

    pub fn records(&self) -> &[HealthRecord] {
        &self.records
    }

    pub fn group_by_type(&self) -> GroupedRecords<'_> {
        group(self.records.iter())
    }

    /// Case-insensitive search. An empty query matches everything.
    pub fn search(&self, query: &str) -> GroupedRecords<'_> {
        let query = query.to_lowercase();
        group(self.records.iter().filter(|r| r.matches(&query)))
    }

    pub fn auto_expand(&self, query: &str) -> AutoExpand {
        if query.is_empty() {
            return AutoExpand::default();
        }
        let found = self.search(query);
        if let Some(first) = found.prescriptions.first() {
            AutoExpand {
                record_type: Some(RecordType::Prescription),
                disease_key: first.disease_key(),
            }
        } else if !found.lab_reports.is_empty() {
            AutoExpand {
                record_type: Some(RecordType::LabReport),
                disease_key: None,
            }
        } else {
            AutoExpand::default()
        }
    }
}

fn group<'a>(records: impl Iterator<Item = &'a HealthRecord>) -> GroupedRecords<'a> {
    let mut grouped = GroupedRecords::default();
    for record in records {
        match record.record_type() {
            RecordType::Prescription => grouped.prescriptions.push(record),
            RecordType::LabReport => grouped.lab_reports.push(record),
        }
    }
    grouped
}
