//! Adapter lookup keyed by platform tag, built once at startup.

use std::collections::HashMap;
use std::sync::Arc;

use courier_types::models::Platform;
use thiserror::Error;
use tracing::info;

use crate::adapter::PlatformAdapter;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("platform not supported: {0}")]
    NotSupported(Platform),
    #[error("platform not configured: {0}")]
    NotConfigured(Platform),
    #[error("duplicate adapter for platform: {0}")]
    DuplicateAdapter(Platform),
}

pub struct PlatformRegistry {
    adapters: HashMap<Platform, Arc<dyn PlatformAdapter>>,
}

impl PlatformRegistry {
    /// Build from the full adapter set. Two adapters claiming the same
    /// platform is a configuration error, not a last-one-wins overwrite.
    pub fn new(adapters: Vec<Arc<dyn PlatformAdapter>>) -> Result<Self, RegistryError> {
        let mut map: HashMap<Platform, Arc<dyn PlatformAdapter>> = HashMap::new();
        for adapter in adapters {
            let platform = adapter.platform();
            if map.insert(platform, adapter).is_some() {
                return Err(RegistryError::DuplicateAdapter(platform));
            }
        }
        info!(adapters = map.len(), "platform registry built");
        Ok(Self { adapters: map })
    }

    /// Adapter lookup on the dispatch path. An unknown or unconfigured
    /// platform fails the destination here, before any network call.
    pub fn get(&self, platform: Platform) -> Result<&Arc<dyn PlatformAdapter>, RegistryError> {
        let adapter = self
            .adapters
            .get(&platform)
            .ok_or(RegistryError::NotSupported(platform))?;
        if !adapter.is_configured() {
            return Err(RegistryError::NotConfigured(platform));
        }
        Ok(adapter)
    }

    /// Capability introspection: registered and configured.
    pub fn is_available(&self, platform: Platform) -> bool {
        self.adapters
            .get(&platform)
            .is_some_and(|a| a.is_configured())
    }
}
