//! Country reference table
//!
//! Static country metadata embedded in the binary. Numeric columns are
//! coerced on load: numbers and numeric strings are accepted, anything else
//! becomes `None` and the country is excluded from per-capita figures.

use crate::models::CountryRecord;
use arta_common::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

static EMBEDDED_COUNTRIES: &str = include_str!("../../data/countries.json");

#[derive(Debug, Deserialize)]
struct RawCountry {
    name: String,
    #[serde(default)]
    area: Option<Value>,
    #[serde(default)]
    capital: Option<Value>,
    #[serde(default)]
    population: Option<Value>,
    #[serde(default)]
    region: Option<Value>,
}

/// Numeric value from a JSON number or numeric string
fn coerce_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn coerce_population(value: Option<&Value>) -> Option<u64> {
    coerce_number(value)
        .filter(|n| *n >= 0.0)
        .map(|n| n.round() as u64)
}

fn coerce_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

impl From<RawCountry> for CountryRecord {
    fn from(raw: RawCountry) -> Self {
        Self {
            area: coerce_number(raw.area.as_ref()),
            capital: coerce_text(raw.capital.as_ref()),
            population: coerce_population(raw.population.as_ref()),
            region: coerce_text(raw.region.as_ref()),
            name: raw.name,
        }
    }
}

/// Lookup table of countries, matched case-insensitively by name
#[derive(Debug, Clone, Default)]
pub struct CountryReference {
    countries: Vec<CountryRecord>,
    by_lower_name: HashMap<String, usize>,
}

impl CountryReference {
    /// Reference table compiled into the binary
    pub fn load_embedded() -> Result<Self> {
        let reference = Self::from_json(EMBEDDED_COUNTRIES)?;
        tracing::debug!(countries = reference.len(), "Loaded embedded country reference");
        Ok(reference)
    }

    /// Parse a JSON array of country objects
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Vec<RawCountry> = serde_json::from_str(json)
            .map_err(|e| Error::Internal(format!("Country reference parse failed: {}", e)))?;
        Ok(Self::from_records(raw.into_iter().map(CountryRecord::from).collect()))
    }

    /// Build from already-typed rows; on duplicate names the first row wins
    pub fn from_records(countries: Vec<CountryRecord>) -> Self {
        let mut by_lower_name = HashMap::with_capacity(countries.len());
        for (index, country) in countries.iter().enumerate() {
            by_lower_name
                .entry(country.name.to_lowercase())
                .or_insert(index);
        }
        Self {
            countries,
            by_lower_name,
        }
    }

    /// Case-insensitive lookup
    pub fn lookup(&self, name: &str) -> Option<&CountryRecord> {
        self.by_lower_name
            .get(&name.to_lowercase())
            .map(|&index| &self.countries[index])
    }

    /// Reference spelling of `name`, if the country is known
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.lookup(name).map(|c| c.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn countries(&self) -> &[CountryRecord] {
        &self.countries
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// Distinct region names, sorted
    pub fn regions(&self) -> Vec<&str> {
        let mut regions: Vec<&str> = self
            .countries
            .iter()
            .filter_map(|c| c.region.as_deref())
            .collect();
        regions.sort_unstable();
        regions.dedup();
        regions
    }
}
