// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Morning,
    Evening,
    Night,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Morning, Period::Evening, Period::Night];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Morning => "morning",
            Period::Evening => "evening",
            Period::Night => "night",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.as_str();
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => write!(f, "{}{}", first.to_ascii_uppercase(), chars.as_str()),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub id: u32,
    #[serde(rename = "medicine")]
    pub medicine_name: String,
    pub time: String,
    pub period: Period,
    #[serde(default)]
    pub taken: bool,
}

impl ScheduleEntry {
    pub fn new(id: u32, medicine_name: &str, time: &str, period: Period) -> Self {
        Self {
            id,
            medicine_name: medicine_name.to_string(),
            time: time.to_string(),
            period,
            taken: false,
        }
    }
}

/// A past prescription shown under "recent prescriptions".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrescriptionSummary {
    pub id: u32,
    pub medicine: String,
    pub date: String,
    pub doctor: String,
    pub dosage: String,
    pub days: u32,
}

/// In-memory daily medicine schedule. Nothing is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicineSchedule {
    entries: Vec<ScheduleEntry>,
}

impl Default for MedicineSchedule {
    fn default() -> Self {
        Self::new(vec![
            ScheduleEntry::new(1, "Amoxicillin 500mg", "8:00 AM", Period::Morning),
            ScheduleEntry::new(2, "Vitamin D3", "2:00 PM", Period::Evening),
            ScheduleEntry::new(3, "Paracetamol", "9:00 PM", Period::Night),
        ])
    }
}

impl MedicineSchedule {
    pub fn new(entries: Vec<ScheduleEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// Mark a dose as taken. Returns false for an unknown id.
    pub fn mark_taken(&mut self, id: u32) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.taken = true;
                info!("Marked {} as taken", entry.medicine_name);
                true
            }
            None => {
                debug!("No schedule entry with id {}", id);
                false
            }
        }
    }

    /// Remove an entry. Asking the user to confirm happens before this call.
    pub fn delete(&mut self, id: u32) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        before != self.entries.len()
    }

    /// Case-insensitive substring match on the medicine name.
    pub fn search(&self, query: &str) -> Vec<&ScheduleEntry> {
        let query = query.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.medicine_name.to_lowercase().contains(&query))
            .collect()
    }

    pub fn by_period(&self, period: Period) -> Vec<&ScheduleEntry> {
        self.entries.iter().filter(|e| e.period == period).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.taken).count()
    }
}

pub fn recent_prescriptions() -> Vec<PrescriptionSummary> {
    let row = |id, medicine: &str, date: &str, doctor: &str, dosage: &str, days| {
        PrescriptionSummary {
            id,
            medicine: medicine.to_string(),
            date: date.to_string(),
            doctor: doctor.to_string(),
            dosage: dosage.to_string(),
            days,
        }
    };
    vec![
        row(1, "Amoxicillin 500mg", "Oct 5", "Dr. Smith", "500mg, 3× daily", 7),
        row(2, "Vitamin D3", "Oct 8", "Dr. Johnson", "1000 IU, 1× daily", 30),
        row(3, "Paracetamol", "Oct 10", "Dr. Adams", "500mg, 2× daily", 5),
    ]
}
