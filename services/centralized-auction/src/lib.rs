//! Single-leader centralised auction, kept as an interface example.
//!
//! This is the trivial baseline the replicated contracts are measured
//! against: one process, one mutex-protected counter, no ledger. Nothing
//! in the contract runtime depends on it. State survives restarts
//! through an opaque blob store under a single storage id.

use std::collections::BTreeMap;
use std::sync::Mutex;

use log::debug;
use thiserror::Error;

/// The one storage id the service persists under.
pub const STORAGE_ID: &str = "centralized_auction";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The bid did not exceed the current highest bid.
    #[error("bid too low")]
    BidTooLow,
    /// The blob store rejected the operation.
    #[error("blob store failure")]
    Storage,
    /// The persisted blob failed to decode.
    #[error("persisted state is corrupt")]
    CorruptState,
}

/// An opaque key-value blob store the service persists through.
pub trait BlobStore {
    fn save(&mut self, id: &str, blob: &[u8]) -> Result<(), ServiceError>;
    fn load(&self, id: &str) -> Result<Option<Vec<u8>>, ServiceError>;
}

/// In-memory store used in tests and simulations.
#[derive(Default)]
pub struct MemoryStore {
    blobs: BTreeMap<String, Vec<u8>>,
}

impl BlobStore for MemoryStore {
    fn save(&mut self, id: &str, blob: &[u8]) -> Result<(), ServiceError> {
        self.blobs.insert(id.to_string(), blob.to_vec());
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        Ok(self.blobs.get(id).cloned())
    }
}

/// The service itself: a mutex around the highest bid.
#[derive(Default)]
pub struct AuctionService {
    highest_bid: Mutex<i64>,
}

impl AuctionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a service from the blob store; a missing blob starts at 0.
    pub fn load(store: &dyn BlobStore) -> Result<Self, ServiceError> {
        let highest_bid = match store.load(STORAGE_ID)? {
            Some(blob) => borsh::from_slice(&blob).map_err(|_| ServiceError::CorruptState)?,
            None => 0,
        };
        Ok(Self {
            highest_bid: Mutex::new(highest_bid),
        })
    }

    /// Persist the current highest bid under the storage id.
    pub fn save(&self, store: &mut dyn BlobStore) -> Result<(), ServiceError> {
        let highest_bid = *self.highest_bid.lock().expect("bid lock poisoned");
        let blob = borsh::to_vec(&highest_bid).map_err(|_| ServiceError::CorruptState)?;
        store.save(STORAGE_ID, &blob)
    }

    /// Accept a bid iff it strictly exceeds the current highest.
    pub fn bid(&self, amount: i64) -> Result<(), ServiceError> {
        let mut highest_bid = self.highest_bid.lock().expect("bid lock poisoned");
        if *highest_bid >= amount {
            return Err(ServiceError::BidTooLow);
        }
        debug!("new highest bid {amount}");
        *highest_bid = amount;
        Ok(())
    }

    /// Return the highest bid and reset the auction.
    pub fn close(&self) -> i64 {
        let mut highest_bid = self.highest_bid.lock().expect("bid lock poisoned");
        std::mem::take(&mut *highest_bid)
    }
}
