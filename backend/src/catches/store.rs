use chrono::{SecondsFormat, Utc};
use log::info;
use shared::{CatchRecord, NewCatch};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serde JSON error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Catch not found: {0}")]
    NotFound(String),
    #[error("Duplicate catch id: {0}")]
    Duplicate(String),
    #[error("Invalid catch: {0}")]
    Invalid(&'static str),
}

/// Catch list persisted as one JSON document, rewritten in full on every
/// mutation. Records are only ever appended or removed, never edited.
pub struct CatchStore {
    path: PathBuf,
    records: Mutex<Vec<CatchRecord>>,
}

impl CatchStore {
    pub fn load(path: PathBuf) -> Result<Self, StoreError> {
        let records: Vec<CatchRecord> = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            Vec::new()
        };
        info!("Loaded {} catches from {}", records.len(), path.display());

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn list(&self) -> Vec<CatchRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn add(&self, new_catch: NewCatch) -> Result<CatchRecord, StoreError> {
        if new_catch.species.is_empty() {
            return Err(StoreError::Invalid("species must not be empty"));
        }
        if new_catch.facts.is_empty() {
            return Err(StoreError::Invalid("facts must not be empty"));
        }

        let now = Utc::now();
        let record = CatchRecord {
            id: now.to_rfc3339_opts(SecondsFormat::Micros, true),
            image: new_catch.image,
            species: new_catch.species,
            facts: new_catch.facts,
            location: new_catch.location,
            timestamp: new_catch
                .timestamp
                .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        };

        let mut records = self.records.lock().unwrap();
        if records.iter().any(|existing| existing.id == record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        records.push(record.clone());
        self.persist(&records)?;
        Ok(record)
    }

    pub fn remove(&self, id: &str) -> Result<CatchRecord, StoreError> {
        let mut records = self.records.lock().unwrap();
        let position = records
            .iter()
            .position(|record| record.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let removed = records.remove(position);
        self.persist(&records)?;
        Ok(removed)
    }

    fn persist(&self, records: &[CatchRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
