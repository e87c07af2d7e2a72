//! Read-only catalog queries: medicines, doctors, specialities.

use std::sync::Arc;

use crate::error::Result;
use crate::models::{Doctor, Medicine, Speciality};
use crate::providers::CatalogStore;

/// Thin typed reads over the catalog tables.
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
}

/// Everything the browsing views need in one round of reads.
#[derive(Debug, Clone)]
pub struct CatalogOverview {
    pub medicines: Vec<Medicine>,
    pub doctors: Vec<Doctor>,
    pub specialities: Vec<Speciality>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn medicines(&self) -> Result<Vec<Medicine>> {
        self.store.medicines().await
    }

    pub async fn doctors(&self) -> Result<Vec<Doctor>> {
        self.store.doctors().await
    }

    pub async fn doctors_by_speciality(&self, speciality_id: &str) -> Result<Vec<Doctor>> {
        self.store.doctors_by_speciality(speciality_id).await
    }

    pub async fn specialities(&self) -> Result<Vec<Speciality>> {
        self.store.specialities().await
    }

    /// Fetch the full catalog concurrently.
    pub async fn overview(&self) -> Result<CatalogOverview> {
        let (medicines, doctors, specialities) = tokio::try_join!(
            self.store.medicines(),
            self.store.doctors(),
            self.store.specialities(),
        )?;
        Ok(CatalogOverview {
            medicines,
            doctors,
            specialities,
        })
    }
}
