//! Driver registry for service configuration.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::error::ConfigError;

use super::{LoopbackDriver, ProtocolDriver, SimulatedDriver};

pub struct DriverRegistry {
    entries: HashMap<SmolStr, DriverRegistryEntry>,
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub struct DriverSpec {
    pub name: SmolStr,
    pub driver: Arc<dyn ProtocolDriver>,
}

type DriverCreate = fn(&toml::Value) -> Result<Arc<dyn ProtocolDriver>, ConfigError>;

#[derive(Clone)]
struct DriverRegistryEntry {
    canonical: SmolStr,
    create: DriverCreate,
}

impl DriverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    #[must_use]
    pub fn default_registry() -> Self {
        let mut registry = Self::new();
        registry.register("simulated", create_simulated);
        registry.register_alias("sim", "simulated");
        registry.register("loopback", create_loopback);
        registry
    }

    pub fn register(&mut self, name: impl Into<SmolStr>, create: DriverCreate) {
        let canonical = normalize_name(&name.into());
        let entry = DriverRegistryEntry {
            canonical: canonical.clone(),
            create,
        };
        self.entries.insert(canonical, entry);
    }

    pub fn register_alias(&mut self, alias: impl Into<SmolStr>, target: &str) {
        let alias = normalize_name(&alias.into());
        if let Some(entry) = self.entries.get(&normalize_name(target)).cloned() {
            self.entries.insert(alias, entry);
        }
    }

    /// Build the named driver; `none` yields no driver.
    pub fn build(&self, driver: &str, params: &toml::Value) -> Result<Option<DriverSpec>, ConfigError> {
        if is_none_driver(driver) {
            return Ok(None);
        }
        let entry = self.entries.get(&normalize_name(driver)).ok_or_else(|| {
            ConfigError::Invalid(format!("unsupported driver.name '{driver}'").into())
        })?;
        let driver = (entry.create)(params)?;
        Ok(Some(DriverSpec {
            name: entry.canonical.clone(),
            driver,
        }))
    }

    pub fn contains(&self, driver: &str) -> bool {
        is_none_driver(driver) || self.entries.contains_key(&normalize_name(driver))
    }

    /// Return the canonical driver names (stable sorted).
    #[must_use]
    pub fn canonical_driver_names(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .entries
            .values()
            .map(|entry| entry.canonical.to_string())
            .collect();
        names.into_iter().collect()
    }
}

fn normalize_name(name: &str) -> SmolStr {
    SmolStr::new(name.trim().to_ascii_lowercase())
}

fn is_none_driver(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case("none")
}

fn create_simulated(_params: &toml::Value) -> Result<Arc<dyn ProtocolDriver>, ConfigError> {
    Ok(Arc::new(SimulatedDriver))
}

fn create_loopback(_params: &toml::Value) -> Result<Arc<dyn ProtocolDriver>, ConfigError> {
    Ok(Arc::new(LoopbackDriver::new()))
}
