//! Driver Registry
//!
//! Maps URL schemes to driver factories. The host application builds a
//! registry, lets each driver crate register itself and then opens
//! connections by URL.

use std::collections::HashMap;
use std::sync::Arc;

use crate::driver::{Driver, DriverFactory};
use crate::error::{DriverError, DriverResult};

/// Registry of driver factories keyed by URL scheme
#[derive(Default)]
pub struct DriverRegistry {
    factories: HashMap<String, Arc<dyn DriverFactory>>,
}

impl DriverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register `factory` under every scheme in `schemes`.
    ///
    /// A scheme that is already taken is handed to the new factory.
    pub fn register(&mut self, schemes: &[&str], factory: Arc<dyn DriverFactory>) {
        for scheme in schemes {
            let scheme = scheme.to_lowercase();
            if self.factories.insert(scheme.clone(), Arc::clone(&factory)).is_some() {
                tracing::warn!("Driver for scheme '{}' was replaced", scheme);
            } else {
                tracing::debug!("Registered driver for scheme '{}'", scheme);
            }
        }
    }

    /// Get the factory registered for `scheme`
    pub fn get(&self, scheme: &str) -> Option<Arc<dyn DriverFactory>> {
        self.factories.get(&scheme.to_lowercase()).cloned()
    }

    /// Registered schemes, sorted
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.factories.keys().cloned().collect();
        schemes.sort();
        schemes
    }

    /// Open a driver using the factory registered for the URL's scheme
    pub async fn open(&self, url: &str) -> DriverResult<Box<dyn Driver>> {
        let scheme = scheme_of(url)?;
        let factory = self.get(&scheme).ok_or_else(|| {
            DriverError::Configuration(format!("No driver registered for scheme '{}'", scheme))
        })?;

        factory.open(url).await
    }
}

fn scheme_of(url: &str) -> DriverResult<String> {
    let parsed = url::Url::parse(url)
        .map_err(|e| DriverError::Configuration(format!("Invalid connection URL: {}", e)))?;
    Ok(parsed.scheme().to_string())
}
