pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fetch;
pub mod models;
pub mod query;
pub mod registry;
pub mod service;
pub mod source;
pub mod store;

pub use cache::{CacheKind, CacheStats, Clock, ManualClock, ResultCache, SystemClock};
pub use config::{PanelConfig, PanelConfigBuilder};
pub use diagnostics::{Diagnostics, DiagnosticsSnapshot};
pub use error::{PanelError, RegistryError, Result};
pub use fetch::{FetchConfig, HttpFetcher, NoProxy, ProxyConfig, ProxyKind, ProxySource, StaticProxy, StoredProxySettings};
pub use models::{
    Category, CategoryList, Chapter, ChapterImage, ChapterList, ComicDetail, ComicPage, ComicStatus, ComicSummary,
    ImageList, SourceDescriptor,
};
pub use query::{Document, Element, Selection};
pub use registry::{Registry, SourceCatalog};
pub use service::ComicService;
pub use source::{ComicSource, SourceContext};
pub use store::{KeyValueStore, MemoryStore, StoreError};
