//! Composition root: registry, cache and degrade policy in one handle.
//!
//! Every operation resolves the source first, so registry failures are
//! returned to the caller before any network call. After that the operation
//! goes through the result cache, and a failing adapter call is logged,
//! counted and turned into an empty result. Degraded results are never
//! cached.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use panelkit_core::{ComicService, PanelConfig};
//! use panelkit_core::store::MemoryStore;
//!
//! # #[tokio::main]
//! # async fn main() -> panelkit_core::Result<()> {
//! let service = ComicService::new(PanelConfig::default(), Arc::new(MemoryStore::new()));
//!
//! let page = service.hot_comics(None, 1, 20).await?;
//! for comic in &page.comics {
//!     println!("{} {}", comic.id, comic.title);
//! }
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::Result;
use crate::cache::{CacheKind, ResultCache};
use crate::config::PanelConfig;
use crate::diagnostics::{Diagnostics, DiagnosticsSnapshot};
use crate::fetch::{HttpFetcher, ProxySource, StoredProxySettings};
use crate::models::{CategoryList, ChapterList, ComicDetail, ComicPage, ImageList, SourceDescriptor};
use crate::registry::{Registry, SourceCatalog};
use crate::source::{SourceContext, limit_or_default, page_or_default};
use crate::store::KeyValueStore;

/// Entry point for callers.
pub struct ComicService {
    registry: Registry,
    cache: ResultCache,
    diagnostics: Arc<Diagnostics>,
}

impl ComicService {
    /// Builtin sources, with the cache and the proxy settings both kept in
    /// `store`.
    pub fn new(config: PanelConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let proxy = Arc::new(StoredProxySettings::new(Arc::clone(&store)));
        Self::with_proxy(config, store, proxy)
    }

    /// Builtin sources with an explicit proxy source.
    pub fn with_proxy(config: PanelConfig, store: Arc<dyn KeyValueStore>, proxy: Arc<dyn ProxySource>) -> Self {
        let diagnostics = Arc::new(Diagnostics::new());
        let fetcher = Arc::new(HttpFetcher::new(config.fetch, proxy));
        let context = SourceContext::new(fetcher, Arc::clone(&diagnostics));
        let registry = Registry::new(SourceCatalog::builtin(), context, config.default_source);
        Self::from_parts(registry, ResultCache::new(store), diagnostics)
    }

    /// Assembles a service from prebuilt parts.
    ///
    /// `diagnostics` should be the instance the registry's adapters were
    /// given, so dropped ids and degraded calls land in the same counters.
    pub fn from_parts(registry: Registry, cache: ResultCache, diagnostics: Arc<Diagnostics>) -> Self {
        Self { registry, cache, diagnostics }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    pub fn list_available_sources(&self) -> Vec<SourceDescriptor> {
        self.registry.list_available_sources()
    }

    pub fn list_all_sources(&self) -> Vec<SourceDescriptor> {
        self.registry.list_all_sources()
    }

    pub async fn hot_comics(&self, source_id: Option<&str>, page: u32, limit: u32) -> Result<ComicPage> {
        let source = self.registry.resolve(source_id)?;
        let adapter = source.as_ref();
        let id = adapter.descriptor().id;
        let (page, limit) = (page_or_default(page), limit_or_default(limit));

        let params = json!({ "source": id, "page": page, "limit": limit });
        let result = self
            .cached(&id, CacheKind::HotComics, &params, move || async move {
                adapter.hot_comics(page, limit).await.map(Some)
            })
            .await;
        Ok(result.unwrap_or_default())
    }

    pub async fn latest_comics(&self, source_id: Option<&str>, page: u32, limit: u32) -> Result<ComicPage> {
        let source = self.registry.resolve(source_id)?;
        let adapter = source.as_ref();
        let id = adapter.descriptor().id;
        let (page, limit) = (page_or_default(page), limit_or_default(limit));

        let params = json!({ "source": id, "page": page, "limit": limit });
        let result = self
            .cached(&id, CacheKind::LatestComics, &params, move || async move {
                adapter.latest_comics(page, limit).await.map(Some)
            })
            .await;
        Ok(result.unwrap_or_default())
    }

    /// `category_id` of `None` lists every category.
    pub async fn comics_by_category(
        &self, source_id: Option<&str>, category_id: Option<&str>, page: u32, limit: u32,
    ) -> Result<ComicPage> {
        let source = self.registry.resolve(source_id)?;
        let adapter = source.as_ref();
        let id = adapter.descriptor().id;
        let (page, limit) = (page_or_default(page), limit_or_default(limit));

        let params = json!({ "source": id, "category": category_id, "page": page, "limit": limit });
        let result = self
            .cached(&id, CacheKind::CategoryComics, &params, move || async move {
                adapter.comics_by_category(category_id, page, limit).await.map(Some)
            })
            .await;
        Ok(result.unwrap_or_default())
    }

    pub async fn search_comics(
        &self, source_id: Option<&str>, keyword: &str, page: u32, limit: u32,
    ) -> Result<ComicPage> {
        let source = self.registry.resolve(source_id)?;
        let adapter = source.as_ref();
        let id = adapter.descriptor().id;
        let (page, limit) = (page_or_default(page), limit_or_default(limit));

        let params = json!({ "source": id, "keyword": keyword, "page": page, "limit": limit });
        let result = self
            .cached(&id, CacheKind::Search, &params, move || async move {
                adapter.search_comics(keyword, page, limit).await.map(Some)
            })
            .await;
        Ok(result.unwrap_or_default())
    }

    /// `None` when the comic is not found or the fetch failed.
    pub async fn comic_detail(&self, source_id: Option<&str>, comic_id: &str) -> Result<Option<ComicDetail>> {
        let source = self.registry.resolve(source_id)?;
        let adapter = source.as_ref();
        let id = adapter.descriptor().id;

        let params = json!({ "source": id, "comicId": comic_id });
        Ok(self
            .cached(&id, CacheKind::ComicDetail, &params, move || async move {
                adapter.comic_detail(comic_id).await
            })
            .await)
    }

    pub async fn chapters(&self, source_id: Option<&str>, comic_id: &str) -> Result<ChapterList> {
        let source = self.registry.resolve(source_id)?;
        let adapter = source.as_ref();
        let id = adapter.descriptor().id;

        let params = json!({ "source": id, "comicId": comic_id });
        let result = self
            .cached(&id, CacheKind::Chapters, &params, move || async move {
                adapter.chapters(comic_id).await.map(Some)
            })
            .await;
        Ok(result.unwrap_or_default())
    }

    pub async fn chapter_images(&self, source_id: Option<&str>, chapter_id: &str) -> Result<ImageList> {
        let source = self.registry.resolve(source_id)?;
        let adapter = source.as_ref();
        let id = adapter.descriptor().id;

        let params = json!({ "source": id, "chapterId": chapter_id });
        let result = self
            .cached(&id, CacheKind::ChapterImages, &params, move || async move {
                adapter.chapter_images(chapter_id).await.map(Some)
            })
            .await;
        Ok(result.unwrap_or_default())
    }

    pub async fn categories(&self, source_id: Option<&str>) -> Result<CategoryList> {
        let source = self.registry.resolve(source_id)?;
        let adapter = source.as_ref();
        let id = adapter.descriptor().id;

        let params = json!({ "source": id });
        let result = self
            .cached(&id, CacheKind::Categories, &params, move || async move {
                adapter.categories().await.map(Some)
            })
            .await;
        Ok(result.unwrap_or_default())
    }

    /// Read-through with the degrade policy applied: an adapter error is
    /// recorded and reported as `None`.
    async fn cached<T, F, Fut>(&self, source: &str, kind: CacheKind, params: &Value, fetch: F) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        match self.cache.wrap(&kind, params, fetch).await {
            Ok(value) => value,
            Err(err) => {
                self.diagnostics.record_degraded(source, kind.as_str(), &err);
                None
            }
        }
    }
}
