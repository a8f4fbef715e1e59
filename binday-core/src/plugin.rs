//! Registry for all council adapters.

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{CouncilId, CouncilMeta};
use crate::ports::{PortError, UpstreamAdapter};

/// Adapter for a single council together with its metadata.
pub struct CouncilPlugin {
    /// Static metadata describing the council.
    pub meta: CouncilMeta,
    /// Implementation of the upstream pipeline stages.
    pub adapter: Arc<dyn UpstreamAdapter>,
}

/// Registry that resolves adapters by council identifier.
pub struct AdapterRegistry {
    plugins: HashMap<CouncilId, CouncilPlugin>,
}

impl AdapterRegistry {
    /// Build a registry from the provided plugin list.
    #[must_use]
    pub fn new(plugins: Vec<CouncilPlugin>) -> Self {
        let plugins_map = plugins
            .into_iter()
            .map(|plugin| (plugin.meta.id.clone(), plugin))
            .collect();
        Self {
            plugins: plugins_map,
        }
    }

    /// Return metadata for all registered councils.
    #[must_use]
    pub fn councils(&self) -> Vec<CouncilMeta> {
        let mut councils: Vec<CouncilMeta> = self
            .plugins
            .values()
            .map(|plugin| plugin.meta.clone())
            .collect();
        councils.sort_by(|left, right| left.id.0.cmp(&right.id.0));
        councils
    }

    /// Look up the adapter for the given council.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::UnsupportedCouncil`] when no plugin is registered.
    pub fn adapter(&self, council: &CouncilId) -> Result<&Arc<dyn UpstreamAdapter>, PortError> {
        self.plugins
            .get(council)
            .map(|plugin| &plugin.adapter)
            .ok_or(PortError::UnsupportedCouncil)
    }
}
