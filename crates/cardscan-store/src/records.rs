use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::commit::CommitMessage;
use crate::document::DocumentStore;
use crate::error::StoreError;

/// Location of the scan log in the remote store.
pub const SCANS_PATH: &str = "data/scans.json";

/// Location of the vehicle registry in the remote store.
pub const VEHICLES_PATH: &str = "data/vehicles.json";

/// A card id as clients send it. Readers report either strings or numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub Value);

impl CardId {
    /// Registry key for this id: the string itself or the number's decimal
    /// form. Empty strings and other JSON types have no key.
    pub fn key(&self) -> Option<String> {
        match &self.0 {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// A card scan. Stored as-is; only `cardId` is ever looked at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanRecord(pub Value);

impl ScanRecord {
    pub fn card_id(&self) -> Option<String> {
        let id = self.0.get("cardId")?;
        CardId(id.clone()).key()
    }
}

/// A vehicle entry. Opaque; keyed by card id in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleRecord(pub Value);

/// Scans, newest first. Duplicate card ids are allowed.
pub type ScanLog = Vec<ScanRecord>;

/// Vehicles keyed by card id. Kept sorted so rewrites diff cleanly.
pub type VehicleRegistry = BTreeMap<String, VehicleRecord>;

/// Whether an upsert created the key or replaced an existing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Added,
    Updated,
}

/// Put a scan at the front of the log.
pub fn prepend_scan(log: &mut ScanLog, scan: ScanRecord) -> CommitMessage {
    let card_id = scan.card_id().unwrap_or_else(|| "unknown".to_string());
    log.insert(0, scan);
    CommitMessage::AddScan { card_id }
}

/// Insert or replace a vehicle.
///
/// The outcome reflects the registry before the insert.
pub fn upsert_vehicle(
    registry: &mut VehicleRegistry,
    card_id: &str,
    vehicle: VehicleRecord,
) -> UpsertOutcome {
    match registry.insert(card_id.to_string(), vehicle) {
        Some(_) => UpsertOutcome::Updated,
        None => UpsertOutcome::Added,
    }
}

/// The scan log and vehicle registry, each kept as one remote document.
#[derive(Clone)]
pub struct RecordStore {
    documents: DocumentStore,
}

impl RecordStore {
    pub fn new(documents: DocumentStore) -> Self {
        Self { documents }
    }

    pub fn backend_name(&self) -> &'static str {
        self.documents.backend_name()
    }

    // =========================================================================
    // Scans
    // =========================================================================

    pub async fn scans(&self) -> Result<ScanLog, StoreError> {
        Ok(self.documents.load::<ScanLog>(SCANS_PATH).await?.content)
    }

    #[instrument(skip(self, scan), level = "debug", fields(card_id = ?scan.card_id()))]
    pub async fn add_scan(&self, scan: ScanRecord) -> Result<(), StoreError> {
        let file = self
            .documents
            .update(SCANS_PATH, move |log: &mut ScanLog| prepend_scan(log, scan))
            .await?;
        info!("Added scan ({} total)", file.content.len());
        Ok(())
    }

    #[instrument(skip(self, scans), level = "debug", fields(count = scans.len()))]
    pub async fn replace_scans(&self, scans: ScanLog) -> Result<(), StoreError> {
        self.documents
            .replace(SCANS_PATH, scans, CommitMessage::ReplaceScans)
            .await?;
        info!("Replaced scan log");
        Ok(())
    }

    // =========================================================================
    // Vehicles
    // =========================================================================

    pub async fn vehicles(&self) -> Result<VehicleRegistry, StoreError> {
        Ok(self
            .documents
            .load::<VehicleRegistry>(VEHICLES_PATH)
            .await?
            .content)
    }

    #[instrument(skip(self, vehicle), level = "debug")]
    pub async fn upsert_vehicle(
        &self,
        card_id: &str,
        vehicle: VehicleRecord,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut outcome = UpsertOutcome::Added;
        self.documents
            .update(VEHICLES_PATH, |registry: &mut VehicleRegistry| {
                outcome = upsert_vehicle(registry, card_id, vehicle);
                let card_id = card_id.to_string();
                match outcome {
                    UpsertOutcome::Added => CommitMessage::AddVehicle { card_id },
                    UpsertOutcome::Updated => CommitMessage::UpdateVehicle { card_id },
                }
            })
            .await?;
        info!("{:?} vehicle {}", outcome, card_id);
        Ok(outcome)
    }

    #[instrument(skip(self, vehicles), level = "debug", fields(count = vehicles.len()))]
    pub async fn replace_vehicles(&self, vehicles: VehicleRegistry) -> Result<(), StoreError> {
        self.documents
            .replace(VEHICLES_PATH, vehicles, CommitMessage::ReplaceVehicles)
            .await?;
        info!("Replaced vehicle registry");
        Ok(())
    }

    /// Remove a vehicle, returning whether it was present.
    ///
    /// The document is written back even when the key was absent.
    #[instrument(skip(self), level = "debug")]
    pub async fn delete_vehicle(&self, card_id: &str) -> Result<bool, StoreError> {
        let mut existed = false;
        self.documents
            .update(VEHICLES_PATH, |registry: &mut VehicleRegistry| {
                existed = registry.remove(card_id).is_some();
                CommitMessage::DeleteVehicle {
                    card_id: card_id.to_string(),
                }
            })
            .await?;
        info!("Deleted vehicle {} (existed: {})", card_id, existed);
        Ok(existed)
    }
}
