//! Lookup collaborators for veterinarian and service records.
//!
//! Record CRUD and persistence live elsewhere; the scheduling core only
//! needs these two read contracts plus in-memory implementations used by
//! tests and small deployments.

use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::ServiceCategory;

/// What the scheduler needs to know about a service.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub active: bool,
    pub duration_minutes: u32,
    pub base_fee: f64,
    pub category: ServiceCategory,
}

pub trait VeterinarianDirectory: Send + Sync {
    fn is_active(&self, id: Uuid) -> Result<bool, DatabaseError>;
}

pub trait ServiceCatalog: Send + Sync {
    fn get(&self, id: Uuid) -> Result<Option<ServiceInfo>, DatabaseError>;
}

// ─── In-memory implementations ────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryVeterinarianDirectory {
    active: RwLock<HashMap<Uuid, bool>>,
}

impl MemoryVeterinarianDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: Uuid, active: bool) {
        self.active
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, active);
    }
}

impl VeterinarianDirectory for MemoryVeterinarianDirectory {
    fn is_active(&self, id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self
            .active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .copied()
            .unwrap_or(false))
    }
}

#[derive(Default)]
pub struct MemoryServiceCatalog {
    services: RwLock<HashMap<Uuid, ServiceInfo>>,
}

impl MemoryServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: Uuid, info: ServiceInfo) {
        self.services
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, info);
    }
}

impl ServiceCatalog for MemoryServiceCatalog {
    fn get(&self, id: Uuid) -> Result<Option<ServiceInfo>, DatabaseError> {
        Ok(self
            .services
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned())
    }
}
