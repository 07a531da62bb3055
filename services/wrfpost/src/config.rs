//! Pipeline configuration.
//!
//! The built-in airport and product tables cover the standard run; an
//! optional YAML file replaces either table wholesale:
//!
//! ```yaml
//! airports:
//!   high_priority:
//!     - { id: ahn, lat: 33.95, lon: -83.32 }
//!   secondary:
//!     - { id: atl, lat: 33.64, lon: -84.43 }
//! products:
//!   - { name: temperature, field: T2 }
//!   - { name: rh_700mb, field: rh }
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use wrf_common::locations::{high_priority_airports, secondary_airports};
use wrf_common::Airport;

use crate::products::{builtin_products, ProductSpec};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Airports getting every product, Skew-T included.
    pub high_priority: Vec<Airport>,
    /// Airports getting everything except the Skew-T figures.
    pub secondary: Vec<Airport>,
    /// Map products, in output order.
    pub products: Vec<ProductSpec>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            high_priority: high_priority_airports(),
            secondary: secondary_airports(),
            products: builtin_products(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    airports: Option<AirportsSection>,
    #[serde(default)]
    products: Option<Vec<ProductSpec>>,
}

#[derive(Debug, Deserialize)]
struct AirportsSection {
    #[serde(default)]
    high_priority: Vec<Airport>,
    #[serde(default)]
    secondary: Vec<Airport>,
}

impl PipelineConfig {
    /// Load overrides from a YAML file on top of the built-in tables.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let file: ConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config YAML from {:?}", path))?;

        let mut config = PipelineConfig::default();
        if let Some(airports) = file.airports {
            config.high_priority = airports.high_priority;
            config.secondary = airports.secondary;
        }
        if let Some(products) = file.products {
            config.products = products;
        }
        config.validate()?;
        Ok(config)
    }

    /// High-priority airports first, then secondary; the order text
    /// and meteogram output iterate in.
    pub fn all_airports(&self) -> Vec<Airport> {
        let mut all = self.high_priority.clone();
        all.extend(self.secondary.iter().cloned());
        all
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.high_priority.is_empty() || !self.secondary.is_empty(),
            "Airport tables cannot both be empty"
        );
        for airport in self.high_priority.iter().chain(&self.secondary) {
            anyhow::ensure!(!airport.id.is_empty(), "Airport id cannot be empty");
            anyhow::ensure!(
                (-90.0..=90.0).contains(&airport.lat),
                "Airport {} latitude out of range: {}",
                airport.id,
                airport.lat
            );
            anyhow::ensure!(
                (-180.0..=180.0).contains(&airport.lon),
                "Airport {} longitude out of range: {}",
                airport.id,
                airport.lon
            );
        }
        for product in &self.products {
            anyhow::ensure!(!product.name.is_empty(), "Product name cannot be empty");
            anyhow::ensure!(
                !product.field.is_empty(),
                "Product {} has no source field",
                product.name
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn defaults_match_builtin_tables() {
        let config = PipelineConfig::default();
        assert_eq!(config.high_priority.len(), 11);
        assert_eq!(config.secondary.len(), 6);
        assert_eq!(config.products.len(), 45);
        assert_eq!(config.all_airports().len(), 17);
        assert_eq!(config.all_airports()[0].id, "ahn");
    }

    #[test]
    fn yaml_replaces_airports_and_products() {
        let (_dir, path) = write_config(
            "airports:\n\
             \x20 high_priority:\n\
             \x20   - { id: tst, lat: 33.5, lon: -84.0 }\n\
             \x20 secondary: []\n\
             products:\n\
             \x20 - { name: temperature, field: T2 }\n",
        );
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.high_priority.len(), 1);
        assert_eq!(config.high_priority[0].id, "tst");
        assert!(config.secondary.is_empty());
        assert_eq!(config.products.len(), 1);
        assert_eq!(config.products[0].field, "T2");
    }

    #[test]
    fn partial_yaml_keeps_builtin_products() {
        let (_dir, path) = write_config(
            "airports:\n\
             \x20 high_priority:\n\
             \x20   - { id: tst, lat: 33.5, lon: -84.0 }\n",
        );
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.products.len(), 45);
        assert_eq!(config.high_priority.len(), 1);
    }

    #[test]
    fn bad_latitude_is_rejected() {
        let (_dir, path) = write_config(
            "airports:\n\
             \x20 high_priority:\n\
             \x20   - { id: bad, lat: 133.5, lon: -84.0 }\n",
        );
        let err = PipelineConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("latitude"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(PipelineConfig::load(Path::new("/nonexistent/pipeline.yaml")).is_err());
    }
}
