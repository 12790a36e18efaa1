//! Country reference rows

use serde::{Deserialize, Serialize};

/// Static metadata about one country
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    /// Display name, also the join key for artist rows
    pub name: String,
    /// Surface area in km²
    pub area: Option<f64>,
    pub capital: Option<String>,
    /// Population; `None` when the source value was not numeric
    pub population: Option<u64>,
    pub region: Option<String>,
}

impl CountryRecord {
    /// Population usable as a per-capita denominator
    pub fn usable_population(&self) -> Option<u64> {
        self.population.filter(|p| *p > 0)
    }
}
