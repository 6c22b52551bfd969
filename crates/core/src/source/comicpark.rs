//! ComicPark (`m.comicpark.cc`).
//!
//! Mobile site with no pager markup. Listings take an explicit page size, so
//! a full page is taken to mean another one follows. The reader renders page
//! images as `img` tags; older chapters only ship a script payload.
//!
//! Ids: comics are `/book/<digits>`, chapters are `<comicId>/<chapterId>`.

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use super::extract::{
    clean_text, cover_url, extract_id, image_src, normalize_url, parse_rating, parse_status, scan_image_urls,
    split_numeric_pair, strip_label, title_from,
};
use super::{ComicSource, SourceContext, limit_or_default, page_or_default};
use crate::diagnostics::Diagnostics;
use crate::models::{
    Category, CategoryList, Chapter, ChapterList, ComicDetail, ComicPage, ComicSummary, ImageList, SourceDescriptor,
};
use crate::query::{Document, Selection};
use crate::{PanelError, Result};

pub const SOURCE_ID: &str = "comicpark";
pub const SOURCE_NAME: &str = "ComicPark";
pub const BASE_URL: &str = "https://m.comicpark.cc";

const LIST_ITEM: &str = "div.book-list div.book-item";
const ITEM_NAME: &str = ".book-name";
const ITEM_COVER: &str = "img.book-cover";
const ITEM_STATE: &str = ".book-state";
const ITEM_CHAPTER: &str = ".book-chapter";
const ITEM_DATE: &str = ".book-date";

const DETAIL_ROOT: &str = "div.detail-header";
const DETAIL_TITLE: &str = ".detail-title";
const DETAIL_COVER: &str = "img.detail-cover";
const DETAIL_AUTHOR: &str = ".detail-author";
const DETAIL_TAGS: &str = ".detail-tags";
const DETAIL_STATUS: &str = ".detail-status";
const DETAIL_RATING: &str = ".detail-rating";
const DETAIL_LATEST: &str = ".detail-latest";
const DETAIL_UPDATE: &str = ".detail-update";
const DETAIL_DESC: &str = ".detail-desc";

const CHAPTER_LINK: &str = "ul.chapter-list a";
const READER_IMAGE: &str = "div.reader img";
const TAG_LINK: &str = "div.tag-list a";

static BOOK_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/book/(\d+)/?(?:[?#]|$)").expect("book id pattern"));

static CHAPTER_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/book/(\d+)/(\d+)/?(?:[?#]|$)").expect("chapter href pattern"));

static TAG_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[?&]tag=(\d+)").expect("tag id pattern"));

/// Adapter for ComicPark.
pub struct ComicPark {
    ctx: SourceContext,
    base_url: String,
}

impl ComicPark {
    pub fn new(ctx: SourceContext) -> Self {
        Self::with_base_url(ctx, BASE_URL)
    }

    /// Requests go to `base_url` instead of the live site.
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

    async fn listing(&self, path: &str, query: &[(&str, &str)], page: u32, limit: u32) -> Result<ComicPage> {
        let limit = limit_or_default(limit);
        let page = page_or_default(page).to_string();
        let size = limit.to_string();

        let mut params = query.to_vec();
        params.push(("page", page.as_str()));
        params.push(("size", size.as_str()));

        let url = Url::parse_with_params(&format!("{}{}", self.base_url, path), &params)
            .map_err(|e| PanelError::InvalidUrl(e.to_string()))?;
        let html = self.fetch(url.as_str()).await?;
        Ok(parse_listing(&html, limit, &self.ctx.diagnostics))
    }
}

#[async_trait]
impl ComicSource for ComicPark {
    fn descriptor(&self) -> SourceDescriptor {
        Self::catalog_entry()
    }

    async fn hot_comics(&self, page: u32, limit: u32) -> Result<ComicPage> {
        self.listing("/rank", &[("type", "hot")], page, limit).await
    }

    async fn latest_comics(&self, page: u32, limit: u32) -> Result<ComicPage> {
        self.listing("/update", &[], page, limit).await
    }

    async fn comics_by_category(&self, category_id: Option<&str>, page: u32, limit: u32) -> Result<ComicPage> {
        match category_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(tag) => self.listing("/category", &[("tag", tag)], page, limit).await,
            None => self.listing("/category", &[], page, limit).await,
        }
    }

    async fn search_comics(&self, keyword: &str, page: u32, limit: u32) -> Result<ComicPage> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(ComicPage::empty());
        }
        self.listing("/search", &[("keyword", keyword)], page, limit).await
    }

    async fn comic_detail(&self, comic_id: &str) -> Result<Option<ComicDetail>> {
        let html = self.fetch(&format!("{}/book/{}", self.base_url, comic_id)).await?;
        Ok(parse_detail(&html, comic_id))
    }

    async fn chapters(&self, comic_id: &str) -> Result<ChapterList> {
        let html = self.fetch(&format!("{}/book/{}", self.base_url, comic_id)).await?;
        Ok(parse_chapters(&html, &self.ctx.diagnostics))
    }

    async fn chapter_images(&self, chapter_id: &str) -> Result<ImageList> {
        let Some((comic, chapter)) = split_chapter_id(chapter_id) else {
            tracing::debug!(source = SOURCE_ID, chapter_id, "malformed chapter id");
            return Ok(ImageList::empty());
        };

        let html = self.fetch(&format!("{}/book/{}/{}", self.base_url, comic, chapter)).await?;
        Ok(parse_chapter_images(&html))
    }

    async fn categories(&self) -> Result<CategoryList> {
        let html = self.fetch(&format!("{}/category", self.base_url)).await?;
        Ok(parse_categories(&html))
    }
}

/// Splits `"<comicId>/<chapterId>"`.
pub fn split_chapter_id(chapter_id: &str) -> Option<(&str, &str)> {
    split_numeric_pair(chapter_id, '/')
}

/// Parses a listing or search page.
///
/// `has_more` is true when the page came back full.
pub fn parse_listing(html: &str, limit: u32, diagnostics: &Diagnostics) -> ComicPage {
    let doc = Document::parse(html);
    let mut comics: Vec<ComicSummary> = doc
        .query(LIST_ITEM)
        .iter()
        .filter_map(|item| parse_item(&Selection::from(item), diagnostics))
        .collect();

    let has_more = comics.len() >= limit as usize;
    comics.truncate(limit as usize);
    ComicPage::new(comics, has_more)
}

fn parse_item(item: &Selection<'_>, diagnostics: &Diagnostics) -> Option<ComicSummary> {
    let link = item.query("a").first();
    let href = link.attr("href");
    let Some(id) = extract_id(&href, &BOOK_ID) else {
        diagnostics.record_dropped_id(SOURCE_ID, &href);
        return None;
    };

    Some(ComicSummary {
        id,
        title: title_from(&link, &item.query(ITEM_NAME)),
        cover: cover_url(item, ITEM_COVER, BASE_URL),
        latest_chapter: clean_text(&item.query(ITEM_CHAPTER).text()),
        status: parse_status(&item.query(ITEM_STATE).text()),
        update_time: clean_text(&item.query(ITEM_DATE).text()),
    })
}

/// Parses a book page. `None` when the header or its title is missing.
pub fn parse_detail(html: &str, comic_id: &str) -> Option<ComicDetail> {
    let doc = Document::parse(html);
    let header = doc.query(DETAIL_ROOT).first();
    let title = clean_text(&header.query(DETAIL_TITLE).text());
    if title.is_empty() {
        return None;
    }

    let categories: BTreeSet<String> = header
        .query(DETAIL_TAGS)
        .query("span.tag")
        .iter()
        .map(|tag| clean_text(&tag.text()))
        .filter(|name| !name.is_empty())
        .collect();

    Some(ComicDetail {
        summary: ComicSummary {
            id: comic_id.to_string(),
            title,
            cover: cover_url(&header, DETAIL_COVER, BASE_URL),
            latest_chapter: clean_text(&header.query(DETAIL_LATEST).text()),
            status: parse_status(&header.query(DETAIL_STATUS).text()),
            update_time: strip_label(&header.query(DETAIL_UPDATE).text(), &["更新", "Updated"]),
        },
        author: strip_label(&header.query(DETAIL_AUTHOR).text(), &["作者", "Author"]),
        description: clean_text(&doc.query(DETAIL_DESC).text()),
        categories,
        rating: parse_rating(&header.query(DETAIL_RATING).text()),
    })
}

/// Parses the chapter list on a book page, in listing order.
pub fn parse_chapters(html: &str, diagnostics: &Diagnostics) -> ChapterList {
    let doc = Document::parse(html);
    let mut chapters = Vec::new();

    doc.query(CHAPTER_LINK).for_each(|index, link| {
        let href = link.attr("href").unwrap_or_default();
        let Some(caps) = CHAPTER_HREF.captures(href) else {
            diagnostics.record_dropped_id(SOURCE_ID, href);
            return;
        };

        let link = Selection::from(link);
        chapters.push(Chapter {
            id: format!("{}/{}", &caps[1], &caps[2]),
            title: title_from(&link, &link),
            order: index as u32 + 1,
            update_time: String::new(),
            is_read: false,
        });
    });

    ChapterList::new(chapters)
}

/// Reader images, falling back to the script payload when the reader has no
/// usable `img` tags.
pub fn parse_chapter_images(html: &str) -> ImageList {
    let doc = Document::parse(html);
    let mut seen = BTreeSet::new();
    let urls: Vec<String> = doc
        .query(READER_IMAGE)
        .iter()
        .map(|img| normalize_url(&image_src(&Selection::from(img)), BASE_URL))
        .filter(|url| !url.is_empty() && seen.insert(url.clone()))
        .collect();

    if !urls.is_empty() {
        return ImageList::from_urls(urls);
    }
    ImageList::from_urls(scan_image_urls(html, BASE_URL))
}

/// Parses the tag cloud on the category page.
pub fn parse_categories(html: &str) -> CategoryList {
    let doc = Document::parse(html);
    let mut seen = BTreeSet::new();

    let categories = doc
        .query(TAG_LINK)
        .iter()
        .filter_map(|link| {
            let href = link.attr("href").unwrap_or_default();
            let id = extract_id(href, &TAG_ID)?;
            if !seen.insert(id.clone()) {
                return None;
            }
            Some(Category { id, name: clean_text(&link.text()), source_url: normalize_url(href, BASE_URL) })
        })
        .collect();

    CategoryList::new(categories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ComicStatus;
    use rstest::rstest;

    fn item(id: &str) -> String {
        format!(
            r#"<div class="book-item"><a href="/book/{id}"><img class="book-cover" data-src="//cdn.comicpark.cc/c/{id}.jpg"><p class="book-name">Book {id}</p></a><span class="book-state">连载</span></div>"#
        )
    }

    fn listing(ids: &[&str]) -> String {
        let items: String = ids.iter().map(|id| item(id)).collect();
        format!(r#"<div class="book-list">{}</div>"#, items)
    }

    #[rstest]
    #[case(&["1", "2", "3"], 3, true)]
    #[case(&["1", "2", "3"], 4, false)]
    #[case(&["1", "2", "3", "4"], 3, true)]
    #[case(&[], 20, false)]
    fn test_has_more_is_full_page(#[case] ids: &[&str], #[case] limit: u32, #[case] expected: bool) {
        let page = parse_listing(&listing(ids), limit, &Diagnostics::new());

        assert_eq!(page.has_more, expected);
        assert!(page.total <= limit as usize);
    }

    #[test]
    fn test_parse_listing_drops_unmatched_ids() {
        let html = format!(
            r#"<div class="book-list">{}{}<div class="book-item"><a href="/author/9">Someone</a></div></div>"#,
            item("501"),
            item("502")
        );
        let diagnostics = Diagnostics::new();
        let page = parse_listing(&html, 20, &diagnostics);

        assert_eq!(page.total, 2);
        assert_eq!(diagnostics.snapshot().dropped_ids, 1);

        let first = &page.comics[0];
        assert_eq!(first.id, "501");
        assert_eq!(first.title, "Book 501");
        assert_eq!(first.cover, "https://cdn.comicpark.cc/c/501.jpg");
        assert_eq!(first.status, ComicStatus::Ongoing);
    }

    #[test]
    fn test_chapter_links_are_not_comics() {
        let html = r#"<div class="book-list"><div class="book-item"><a href="/book/7/70">Ch</a></div></div>"#;
        let diagnostics = Diagnostics::new();

        assert_eq!(parse_listing(html, 20, &diagnostics).total, 0);
        assert_eq!(diagnostics.snapshot().dropped_ids, 1);
    }

    #[test]
    fn test_parse_detail() {
        let html = r#"
            <div class="detail-header">
                <img class="detail-cover" src="//cdn.comicpark.cc/c/501.jpg">
                <h1 class="detail-title"> Night  Market </h1>
                <p class="detail-author">作者：林秋</p>
                <div class="detail-tags"><span class="tag">冒险</span><span class="tag">奇幻</span><span class="tag">冒险</span></div>
                <p class="detail-status">已完结</p>
                <p class="detail-rating">9.1分</p>
            </div>
            <div class="detail-desc"><p>A night market</p> <p>that never closes.</p></div>
        "#;
        let detail = parse_detail(html, "501").unwrap();

        assert_eq!(detail.summary.id, "501");
        assert_eq!(detail.summary.title, "Night Market");
        assert_eq!(detail.summary.status, ComicStatus::Completed);
        assert_eq!(detail.author, "林秋");
        assert_eq!(detail.rating, 9.1);
        assert_eq!(detail.categories.len(), 2);
        assert_eq!(detail.description, "A night market that never closes.");
    }

    #[test]
    fn test_parse_detail_without_title() {
        assert!(parse_detail(r#"<div class="detail-header"></div>"#, "1").is_none());
    }

    #[test]
    fn test_parse_chapters() {
        let html = r#"
            <ul class="chapter-list">
                <li><a href="/book/501/9001">第1话</a></li>
                <li><a href="/book/501/9002" title="第2话 夜市">第2话</a></li>
            </ul>
        "#;
        let list = parse_chapters(html, &Diagnostics::new());

        assert_eq!(list.total, 2);
        assert_eq!(list.chapters[0].id, "501/9001");
        assert_eq!(list.chapters[1].title, "第2话 夜市");
        assert_eq!(list.chapters[1].order, 2);
    }

    #[test]
    fn test_reader_images_then_script_fallback() {
        let reader = r#"
            <div class="reader">
                <img data-original="//img.comicpark.cc/501/9001/1.jpg" src="/lazy.gif">
                <img src="https://img.comicpark.cc/501/9001/2.jpg">
                <img src="https://img.comicpark.cc/501/9001/2.jpg">
            </div>
        "#;
        let list = parse_chapter_images(reader);
        assert_eq!(list.total, 2);
        assert_eq!(list.images[0].url, "https://img.comicpark.cc/501/9001/1.jpg");
        assert_eq!(list.images[1].page, 2);

        let script = r#"<div class="reader"></div><script>var pages = ["/img/1.png", "/img/2.png"];</script>"#;
        let list = parse_chapter_images(script);
        assert_eq!(list.total, 2);
        assert_eq!(list.images[1].url, "https://m.comicpark.cc/img/2.png");
    }

    #[test]
    fn test_split_chapter_id() {
        assert_eq!(split_chapter_id("7001/81"), Some(("7001", "81")));
        assert_eq!(split_chapter_id("a/../x"), None);
        assert_eq!(split_chapter_id("7001/81/../../admin"), None);
        assert_eq!(split_chapter_id("7001"), None);
    }

    #[test]
    fn test_parse_categories() {
        let html = r#"
            <div class="tag-list">
                <a href="/category?tag=3">热血</a>
                <a href="/category?page=1&tag=5">恋爱</a>
                <a href="/category">全部</a>
            </div>
        "#;
        let list = parse_categories(html);

        assert_eq!(list.total, 2);
        assert_eq!(list.categories[0].id, "3");
        assert_eq!(list.categories[1].id, "5");
        assert_eq!(list.categories[0].source_url, "https://m.comicpark.cc/category?tag=3");
    }
}
