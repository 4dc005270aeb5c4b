use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

/// The kind of change a write records in the store's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitMessage {
    AddScan { card_id: String },
    ReplaceScans,
    AddVehicle { card_id: String },
    UpdateVehicle { card_id: String },
    ReplaceVehicles,
    DeleteVehicle { card_id: String },
}

impl CommitMessage {
    /// Render the message with the time of the write, e.g.
    /// `Add scan: A1 - 2026-10-15T08:30:00.000Z`.
    pub fn render(&self, at: DateTime<Utc>) -> String {
        format!("{} - {}", self, at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl fmt::Display for CommitMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitMessage::AddScan { card_id } => write!(f, "Add scan: {}", card_id),
            CommitMessage::ReplaceScans => f.write_str("Update scans"),
            CommitMessage::AddVehicle { card_id } => write!(f, "Add vehicle: {}", card_id),
            CommitMessage::UpdateVehicle { card_id } => write!(f, "Update vehicle: {}", card_id),
            CommitMessage::ReplaceVehicles => f.write_str("Update vehicles"),
            CommitMessage::DeleteVehicle { card_id } => write!(f, "Delete vehicle: {}", card_id),
        }
    }
}
