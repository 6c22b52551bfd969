//! Normalized content model shared by every source.
//!
//! All types serialize in camelCase: the same JSON is written into the
//! result cache and printed by the CLI.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Publication status, normalized from site-specific text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComicStatus {
    #[default]
    Ongoing,
    Completed,
}

impl fmt::Display for ComicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ongoing => f.write_str("ongoing"),
            Self::Completed => f.write_str("completed"),
        }
    }
}

/// One entry of a listing or search result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComicSummary {
    /// Unique within its source only.
    pub id: String,
    pub title: String,
    pub cover: String,
    pub latest_chapter: String,
    pub status: ComicStatus,
    pub update_time: String,
}

/// Full comic page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComicDetail {
    #[serde(flatten)]
    pub summary: ComicSummary,
    pub author: String,
    pub description: String,
    pub categories: BTreeSet<String>,
    pub rating: f64,
}

/// One chapter of a comic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    /// Adapter-specific composite id, e.g. `"<comicId>_<part>"`.
    pub id: String,
    pub title: String,
    /// 1-based position in the source's listing order.
    pub order: u32,
    pub update_time: String,
    pub is_read: bool,
}

/// One page image of a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterImage {
    /// 1-based page number.
    pub page: u32,
    pub url: String,
}

/// A browsable category on a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub source_url: String,
}

/// Catalog entry for a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    pub id: String,
    pub name: String,
    pub base_url: String,
    pub enabled: bool,
}

/// A page of listing or search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComicPage {
    pub comics: Vec<ComicSummary>,
    pub has_more: bool,
    /// Number of comics actually extracted; unmatched entries are not counted.
    pub total: usize,
}

impl ComicPage {
    pub fn new(comics: Vec<ComicSummary>, has_more: bool) -> Self {
        let total = comics.len();
        Self { comics, has_more, total }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterList {
    pub chapters: Vec<Chapter>,
    pub total: usize,
}

impl ChapterList {
    pub fn new(chapters: Vec<Chapter>) -> Self {
        let total = chapters.len();
        Self { chapters, total }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageList {
    pub images: Vec<ChapterImage>,
    pub total: usize,
}

impl ImageList {
    /// Numbers the urls as pages 1..=n in the given order.
    pub fn from_urls(urls: Vec<String>) -> Self {
        let images: Vec<ChapterImage> = urls
            .into_iter()
            .zip(1..)
            .map(|(url, page)| ChapterImage { page, url })
            .collect();
        let total = images.len();
        Self { images, total }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryList {
    pub categories: Vec<Category>,
    pub total: usize,
}

impl CategoryList {
    pub fn new(categories: Vec<Category>) -> Self {
        let total = categories.len();
        Self { categories, total }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}
