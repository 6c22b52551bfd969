//! The operation set every source adapter implements.
//!
//! Adapters return `Ok` with empty or default values when a page simply
//! lacks what was asked for, and `Err` only for transport failures from the
//! shared [`HttpFetcher`]. Turning those errors into empty results is done
//! one layer up, in [`ComicService`](crate::service::ComicService).

pub mod comicpark;
pub mod extract;
pub mod mangahaven;

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::diagnostics::Diagnostics;
use crate::fetch::HttpFetcher;
use crate::models::{CategoryList, ChapterList, ComicDetail, ComicPage, ImageList, SourceDescriptor};

pub use comicpark::ComicPark;
pub use mangahaven::MangaHaven;

/// Page requested when the caller gives none.
pub const DEFAULT_PAGE: u32 = 1;

/// Page size requested when the caller gives none.
pub const DEFAULT_LIMIT: u32 = 20;

/// Shared services handed to every adapter on creation.
#[derive(Clone)]
pub struct SourceContext {
    pub fetcher: Arc<HttpFetcher>,
    pub diagnostics: Arc<Diagnostics>,
}

impl SourceContext {
    pub fn new(fetcher: Arc<HttpFetcher>, diagnostics: Arc<Diagnostics>) -> Self {
        Self { fetcher, diagnostics }
    }
}

/// Scraping contract for one external source.
#[async_trait]
pub trait ComicSource: Send + Sync {
    /// Catalog entry this adapter serves.
    fn descriptor(&self) -> SourceDescriptor;

    async fn hot_comics(&self, page: u32, limit: u32) -> Result<ComicPage>;

    async fn latest_comics(&self, page: u32, limit: u32) -> Result<ComicPage>;

    /// Listing for one category, or the unfiltered listing for `None`.
    async fn comics_by_category(&self, category_id: Option<&str>, page: u32, limit: u32) -> Result<ComicPage>;

    async fn search_comics(&self, keyword: &str, page: u32, limit: u32) -> Result<ComicPage>;

    /// `None` when the page has no recognizable comic on it.
    async fn comic_detail(&self, comic_id: &str) -> Result<Option<ComicDetail>>;

    async fn chapters(&self, comic_id: &str) -> Result<ChapterList>;

    /// `chapter_id` is the adapter's composite id from [`ComicSource::chapters`].
    async fn chapter_images(&self, chapter_id: &str) -> Result<ImageList>;

    async fn categories(&self) -> Result<CategoryList>;
}

/// Clamps a 1-based page number.
pub(crate) fn page_or_default(page: u32) -> u32 {
    if page == 0 { DEFAULT_PAGE } else { page }
}

/// Clamps a page size.
pub(crate) fn limit_or_default(limit: u32) -> u32 {
    if limit == 0 { DEFAULT_LIMIT } else { limit }
}
