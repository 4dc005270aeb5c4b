//! Core types for the card scan store.
//!
//! Two JSON documents, a scan log and a vehicle registry, live as whole files
//! in a versioned remote blob store. This crate defines:
//! - `BlobStore`: path-addressed fetch and conditional write
//! - `codec`: base64-wrapped JSON documents
//! - `DocumentStore`: the read-modify-write cycle over a `BlobStore`
//! - `RecordStore`: scan and vehicle operations on top of it
//! - `MemoryBlobStore`: an in-process `BlobStore`

mod blob;
pub mod codec;
mod commit;
mod document;
mod error;
mod memory;
mod records;

pub use blob::{BlobStore, Revision, StoredBlob};
pub use commit::CommitMessage;
pub use document::{Document, DocumentStore, RemoteFile};
pub use error::StoreError;
pub use memory::{MemoryBlobStore, WriteRecord};
pub use records::{
    prepend_scan, upsert_vehicle, CardId, RecordStore, ScanLog, ScanRecord, UpsertOutcome,
    VehicleRecord, VehicleRegistry, SCANS_PATH, VEHICLES_PATH,
};
