//! Source catalog and adapter registry.
//!
//! The catalog is static data: which sources exist, whether they are switched
//! on, and which factory builds their adapter. The registry turns a source id
//! into a shared adapter instance, creating it on first use and keeping it for
//! the rest of the process.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use panelkit_core::diagnostics::Diagnostics;
//! use panelkit_core::fetch::HttpFetcher;
//! use panelkit_core::registry::{Registry, SourceCatalog};
//! use panelkit_core::source::SourceContext;
//!
//! let context = SourceContext::new(Arc::new(HttpFetcher::direct()), Arc::new(Diagnostics::new()));
//! let registry = Registry::new(SourceCatalog::builtin(), context, "mangahaven");
//!
//! let source = registry.resolve(None).unwrap();
//! assert_eq!(source.descriptor().id, "mangahaven");
//! assert!(registry.resolve(Some("toonvault")).is_err());
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::RegistryError;
use crate::models::SourceDescriptor;
use crate::source::{ComicPark, ComicSource, MangaHaven, SourceContext};

/// Builds the adapter for one source.
pub type SourceFactory = Arc<dyn Fn(SourceContext) -> Arc<dyn ComicSource> + Send + Sync>;

/// One catalog row. An entry without a factory is declared but not yet
/// implemented.
#[derive(Clone)]
pub struct CatalogEntry {
    pub descriptor: SourceDescriptor,
    pub factory: Option<SourceFactory>,
}

/// Ordered set of known sources.
#[derive(Clone, Default)]
pub struct SourceCatalog {
    entries: Vec<CatalogEntry>,
}

impl SourceCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The sources shipped with the crate.
    pub fn builtin() -> Self {
        Self::new()
            .with_source(MangaHaven::catalog_entry(), Some(Arc::new(MangaHaven::create)))
            .with_source(ComicPark::catalog_entry(), Some(Arc::new(ComicPark::create)))
            .with_source(descriptor("toonvault", "ToonVault", "https://www.toonvault.com", false), None)
            .with_source(descriptor("inkstone", "Inkstone", "https://www.inkstone.io", true), None)
    }

    /// Adds a source, replacing any entry with the same id in place.
    pub fn with_source(mut self, descriptor: SourceDescriptor, factory: Option<SourceFactory>) -> Self {
        let entry = CatalogEntry { descriptor, factory };
        match self.entries.iter_mut().find(|e| e.descriptor.id == entry.descriptor.id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.descriptor.id == id)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }
}

/// Shorthand for a catalog descriptor.
pub fn descriptor(id: &str, name: &str, base_url: &str, enabled: bool) -> SourceDescriptor {
    SourceDescriptor { id: id.to_string(), name: name.to_string(), base_url: base_url.to_string(), enabled }
}

/// Resolves source ids to long-lived adapter instances.
pub struct Registry {
    catalog: SourceCatalog,
    context: SourceContext,
    default_source: String,
    instances: RwLock<HashMap<String, Arc<dyn ComicSource>>>,
}

impl Registry {
    pub fn new(catalog: SourceCatalog, context: SourceContext, default_source: impl Into<String>) -> Self {
        Self { catalog, context, default_source: default_source.into(), instances: RwLock::new(HashMap::new()) }
    }

    /// Id used when a caller does not name a source.
    pub fn default_source(&self) -> &str {
        &self.default_source
    }

    /// Returns the adapter for `source_id`, or for the default source when
    /// `None`.
    ///
    /// Catalog checks run before anything is created, and every call for the
    /// same id returns the same instance.
    pub fn resolve(&self, source_id: Option<&str>) -> Result<Arc<dyn ComicSource>, RegistryError> {
        let id = source_id.unwrap_or(&self.default_source);
        let entry = self.catalog.get(id).ok_or_else(|| RegistryError::UnknownSource { id: id.to_string() })?;
        if !entry.descriptor.enabled {
            return Err(RegistryError::SourceDisabled { id: id.to_string() });
        }
        let factory = entry
            .factory
            .as_ref()
            .ok_or_else(|| RegistryError::SourceNotImplemented { id: id.to_string() })?;

        // Entries are only ever inserted whole, so a poisoned map is still usable.
        if let Some(source) = self.instances.read().unwrap_or_else(PoisonError::into_inner).get(id) {
            return Ok(Arc::clone(source));
        }

        let mut instances = self.instances.write().unwrap_or_else(PoisonError::into_inner);
        let source = instances.entry(id.to_string()).or_insert_with(|| {
            tracing::info!(source = id, "creating source adapter");
            factory(self.context.clone())
        });
        Ok(Arc::clone(source))
    }

    /// Descriptors of enabled sources, in catalog order.
    pub fn list_available_sources(&self) -> Vec<SourceDescriptor> {
        self.catalog
            .entries()
            .iter()
            .filter(|e| e.descriptor.enabled)
            .map(|e| e.descriptor.clone())
            .collect()
    }

    /// Every descriptor, disabled ones included.
    pub fn list_all_sources(&self) -> Vec<SourceDescriptor> {
        self.catalog.entries().iter().map(|e| e.descriptor.clone()).collect()
    }
}
