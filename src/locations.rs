//! City name to IATA code resolution
//!
//! A single versioned table is shared by the flight and hotel tools. The
//! embedded copy lives in `data/city_codes.json`; deployments can point
//! `locations.table_path` at a replacement file with the same layout.

use crate::{Result, TravelCrewError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

const BUILTIN_TABLE: &str = include_str!("../data/city_codes.json");

/// Versioned, read-only mapping of display city names to IATA codes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityCodeTable {
    version: u32,
    cities: BTreeMap<String, String>,
}

impl CityCodeTable {
    /// The table shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_TABLE)
    }

    /// Load a replacement table from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let table = Self::from_json(&content)?;
        info!(
            "Loaded city code table v{} with {} cities from {}",
            table.version,
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Use `path` when given, the embedded table otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::builtin(),
        }
    }

    /// Parse and validate a table
    pub fn from_json(content: &str) -> Result<Self> {
        let table: CityCodeTable = serde_json::from_str(content)?;
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<()> {
        if self.version == 0 {
            return Err(TravelCrewError::config("City code table version must be at least 1"));
        }
        if self.cities.is_empty() {
            return Err(TravelCrewError::config("City code table is empty"));
        }
        for (city, code) in &self.cities {
            if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(TravelCrewError::config(format!(
                    "Invalid code '{code}' for city '{city}'"
                )));
            }
        }
        Ok(())
    }

    /// Resolve a display name to its code. Unknown names are a hard failure.
    pub fn resolve_code(&self, display_name: &str) -> Result<&str> {
        let name = display_name.trim();
        match self.cities.get(name) {
            Some(code) => {
                debug!("Resolved '{}' to {}", name, code);
                Ok(code)
            }
            None => Err(TravelCrewError::unknown_location(name)),
        }
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Iterate `(display name, code)` pairs in name order
    pub fn cities(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cities.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
