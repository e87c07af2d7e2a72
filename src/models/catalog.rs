//! Catalog rows: medicines, doctors and specialities.

use serde::{Deserialize, Serialize};

/// Row in the `medicines` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Unit price in the smallest currency unit (cents)
    pub price_cents: u64,
    pub category: String,
    #[serde(default)]
    pub in_stock: bool,
}

/// Row in the `doctors` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub speciality_id: String,
    #[serde(default)]
    pub qualification: Option<String>,
    #[serde(default)]
    pub experience_years: Option<u32>,
}

/// Row in the `specialities` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speciality {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}
