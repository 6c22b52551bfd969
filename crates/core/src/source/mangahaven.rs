//! MangaHaven (`www.mangahaven.net`).
//!
//! Server-rendered desktop site. Listings are `ul.comic-list` blocks with a
//! pager underneath; a listing has more pages exactly when the pager shows a
//! next link. Chapter pages carry their image list in an inline script.
//!
//! Ids: comics are `/comic/<digits>/`, chapters are `<comicId>_<chapterId>`
//! built from `/comic/<comicId>/<chapterId>.html`.

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use super::extract::{
    clean_text, cover_url, extract_id, normalize_url, parse_rating, parse_status, scan_image_urls,
    split_numeric_pair, strip_label, title_from,
};
use super::{ComicSource, SourceContext, limit_or_default, page_or_default};
use crate::diagnostics::Diagnostics;
use crate::models::{
    Category, CategoryList, Chapter, ChapterList, ComicDetail, ComicPage, ComicSummary, ImageList, SourceDescriptor,
};
use crate::query::{Document, Selection};
use crate::{PanelError, Result};

pub const SOURCE_ID: &str = "mangahaven";
pub const SOURCE_NAME: &str = "MangaHaven";
pub const BASE_URL: &str = "https://www.mangahaven.net";

/// Relative image paths in script payloads resolve against the image CDN.
const IMAGE_HOST: &str = "https://img.mhcdn.net/";

const HOT_PATH: &str = "/rank/hot/";
const LATEST_PATH: &str = "/update/";
const LIST_PATH: &str = "/list/";
const SEARCH_PATH: &str = "/search/";

const LIST_ITEM: &str = "ul.comic-list > li";
const ITEM_LINK: &str = "a.cover";
const ITEM_COVER: &str = "img.thumb";
const ITEM_TITLE: &str = "p.title";
const ITEM_STATUS: &str = "span.status";
const ITEM_LATEST: &str = "span.latest";
const ITEM_TIME: &str = "span.time";
const NEXT_PAGE: &str = "div.pager a.next";

const DETAIL_ROOT: &str = "div.book-info";
const DETAIL_TITLE: &str = "h1.book-title";
const DETAIL_COVER: &str = "img.book-cover";
const DETAIL_AUTHOR: &str = "p.author";
const DETAIL_TAGS: &str = "p.tags";
const DETAIL_STATUS: &str = "span.status";
const DETAIL_SCORE: &str = "span.score";
const DETAIL_LATEST: &str = "span.latest";
const DETAIL_UPDATE: &str = "span.update";
const DETAIL_INTRO: &str = "#intro";
const DETAIL_INTRO_FALLBACK: &str = "div.intro";

const CHAPTER_ITEM: &str = "#chapter-list li";
const CHAPTER_TIME: &str = "em.time";

const CATEGORY_LINK: &str = "ul.genre-list a";

static COMIC_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/comic/(\d+)(?:/|$)").expect("comic id pattern"));

static CHAPTER_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/comic/(\d+)/(\d+)\.html").expect("chapter href pattern"));

static CATEGORY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/list/([a-z0-9-]+)/?(?:\?|$)").expect("category id pattern"));

/// Adapter for MangaHaven.
pub struct MangaHaven {
    ctx: SourceContext,
    base_url: String,
}

impl MangaHaven {
    pub fn new(ctx: SourceContext) -> Self {
        Self::with_base_url(ctx, BASE_URL)
    }

    /// Requests go to `base_url` instead of the live site, e.g. a mirror.
    pub fn with_base_url(ctx: SourceContext, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { ctx, base_url }
    }

    /// Registry factory.
    pub fn create(ctx: SourceContext) -> Arc<dyn ComicSource> {
        Arc::new(Self::new(ctx))
    }

    pub fn catalog_entry() -> SourceDescriptor {
        SourceDescriptor {
            id: SOURCE_ID.to_string(),
            name: SOURCE_NAME.to_string(),
            base_url: BASE_URL.to_string(),
            enabled: true,
        }
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        self.ctx.fetcher.get(url, &[("Referer", self.base_url.as_str())]).await
    }

    async fn listing(&self, path: &str, page: u32, limit: u32) -> Result<ComicPage> {
        let url = format!("{}{}?page={}", self.base_url, path, page_or_default(page));
        let html = self.fetch(&url).await?;
        Ok(parse_listing(&html, limit_or_default(limit), &self.ctx.diagnostics))
    }
}

#[async_trait]
impl ComicSource for MangaHaven {
    fn descriptor(&self) -> SourceDescriptor {
        Self::catalog_entry()
    }

    async fn hot_comics(&self, page: u32, limit: u32) -> Result<ComicPage> {
        self.listing(HOT_PATH, page, limit).await
    }

    async fn latest_comics(&self, page: u32, limit: u32) -> Result<ComicPage> {
        self.listing(LATEST_PATH, page, limit).await
    }

    async fn comics_by_category(&self, category_id: Option<&str>, page: u32, limit: u32) -> Result<ComicPage> {
        let category = category_id.map(str::trim).filter(|id| !id.is_empty()).unwrap_or("all");
        let path = format!("{}{}/", LIST_PATH, category);
        self.listing(&path, page, limit).await
    }

    async fn search_comics(&self, keyword: &str, page: u32, limit: u32) -> Result<ComicPage> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(ComicPage::empty());
        }

        let page = page_or_default(page).to_string();
        let params = [("q", keyword), ("page", page.as_str())];
        let url = Url::parse_with_params(&format!("{}{}", self.base_url, SEARCH_PATH), &params)
            .map_err(|e| PanelError::InvalidUrl(e.to_string()))?;
        let html = self.fetch(url.as_str()).await?;
        Ok(parse_listing(&html, limit_or_default(limit), &self.ctx.diagnostics))
    }

    async fn comic_detail(&self, comic_id: &str) -> Result<Option<ComicDetail>> {
        let html = self.fetch(&format!("{}/comic/{}/", self.base_url, comic_id)).await?;
        Ok(parse_detail(&html, comic_id))
    }

    async fn chapters(&self, comic_id: &str) -> Result<ChapterList> {
        let html = self.fetch(&format!("{}/comic/{}/", self.base_url, comic_id)).await?;
        Ok(parse_chapters(&html, &self.ctx.diagnostics))
    }

    async fn chapter_images(&self, chapter_id: &str) -> Result<ImageList> {
        let Some((comic, chapter)) = split_chapter_id(chapter_id) else {
            tracing::debug!(source = SOURCE_ID, chapter_id, "malformed chapter id");
            return Ok(ImageList::empty());
        };

        let html = self.fetch(&format!("{}/comic/{}/{}.html", self.base_url, comic, chapter)).await?;
        Ok(parse_chapter_images(&html))
    }

    async fn categories(&self) -> Result<CategoryList> {
        let html = self.fetch(&format!("{}{}", self.base_url, LIST_PATH)).await?;
        Ok(parse_categories(&html))
    }
}

/// Splits `"<comicId>_<chapterId>"`.
pub fn split_chapter_id(chapter_id: &str) -> Option<(&str, &str)> {
    split_numeric_pair(chapter_id, '_')
}

/// Parses a listing or search result page.
pub fn parse_listing(html: &str, limit: u32, diagnostics: &Diagnostics) -> ComicPage {
    let doc = Document::parse(html);
    let comics: Vec<ComicSummary> = doc
        .query(LIST_ITEM)
        .iter()
        .filter_map(|item| parse_item(&Selection::from(item), diagnostics))
        .take(limit as usize)
        .collect();

    let has_more = !doc.query(NEXT_PAGE).is_empty();
    ComicPage::new(comics, has_more)
}

fn parse_item(item: &Selection<'_>, diagnostics: &Diagnostics) -> Option<ComicSummary> {
    let mut link = item.query(ITEM_LINK).first();
    if link.is_empty() {
        link = item.query("a").first();
    }

    let href = link.attr("href");
    let Some(id) = extract_id(&href, &COMIC_ID) else {
        diagnostics.record_dropped_id(SOURCE_ID, &href);
        return None;
    };

    let mut title = title_from(&link, &item.query(ITEM_TITLE));
    if title.is_empty() {
        title = clean_text(&link.text());
    }

    Some(ComicSummary {
        id,
        title,
        cover: cover_url(item, ITEM_COVER, BASE_URL),
        latest_chapter: clean_text(&item.query(ITEM_LATEST).text()),
        status: parse_status(&item.query(ITEM_STATUS).text()),
        update_time: clean_text(&item.query(ITEM_TIME).text()),
    })
}

/// Parses a comic page. `None` when the page has no info block or title.
pub fn parse_detail(html: &str, comic_id: &str) -> Option<ComicDetail> {
    let doc = Document::parse(html);
    let info = doc.query(DETAIL_ROOT).first();
    if info.is_empty() {
        return None;
    }

    let mut title = clean_text(&info.query(DETAIL_TITLE).text());
    if title.is_empty() {
        title = doc
            .title()
            .and_then(|t| t.split(['_', '-', '|']).next().map(clean_text))
            .unwrap_or_default();
    }
    if title.is_empty() {
        return None;
    }

    let mut description = clean_text(&doc.query(DETAIL_INTRO).text());
    if description.is_empty() {
        description = clean_text(&doc.query(DETAIL_INTRO_FALLBACK).text());
    }

    let categories: BTreeSet<String> = info
        .query(DETAIL_TAGS)
        .query("a")
        .iter()
        .map(|tag| clean_text(&tag.text()))
        .filter(|name| !name.is_empty())
        .collect();

    Some(ComicDetail {
        summary: ComicSummary {
            id: comic_id.to_string(),
            title,
            cover: cover_url(&info, DETAIL_COVER, BASE_URL),
            latest_chapter: clean_text(&info.query(DETAIL_LATEST).text()),
            status: parse_status(&info.query(DETAIL_STATUS).text()),
            update_time: clean_text(&info.query(DETAIL_UPDATE).text()),
        },
        author: strip_label(&info.query(DETAIL_AUTHOR).text(), &["作者", "Author"]),
        description,
        categories,
        rating: parse_rating(&info.query(DETAIL_SCORE).text()),
    })
}

/// Parses the chapter list on a comic page, in listing order.
///
/// `order` is the 1-based listing position, so dropped entries leave gaps.
pub fn parse_chapters(html: &str, diagnostics: &Diagnostics) -> ChapterList {
    let doc = Document::parse(html);
    let mut chapters = Vec::new();

    doc.query(CHAPTER_ITEM).for_each(|index, item| {
        let item = Selection::from(item);
        let link = item.query("a").first();
        let href = link.attr("href");

        let Some(caps) = CHAPTER_HREF.captures(&href) else {
            diagnostics.record_dropped_id(SOURCE_ID, &href);
            return;
        };

        chapters.push(Chapter {
            id: format!("{}_{}", &caps[1], &caps[2]),
            title: title_from(&link, &link),
            order: index as u32 + 1,
            update_time: clean_text(&item.query(CHAPTER_TIME).text()),
            is_read: false,
        });
    });

    ChapterList::new(chapters)
}

/// Extracts page images from a chapter page's script payload.
pub fn parse_chapter_images(html: &str) -> ImageList {
    ImageList::from_urls(scan_image_urls(html, IMAGE_HOST))
}

/// Parses the genre filter on the list page. The "all" pseudo-genre is
/// skipped.
pub fn parse_categories(html: &str) -> CategoryList {
    let doc = Document::parse(html);
    let mut seen = BTreeSet::new();

    let categories = doc
        .query(CATEGORY_LINK)
        .iter()
        .filter_map(|link| {
            let href = link.attr("href").unwrap_or_default();
            let id = extract_id(href, &CATEGORY_ID)?;
            if id == "all" || !seen.insert(id.clone()) {
                return None;
            }
            Some(Category { id, name: clean_text(&link.text()), source_url: normalize_url(href, BASE_URL) })
        })
        .collect();

    CategoryList::new(categories)
}
