//! Field extraction helpers shared by the adapters.
//!
//! Each helper tolerates missing input and returns an empty or default value
//! instead of failing; adapters layer their own fallbacks on top.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::models::ComicStatus;
use crate::query::Selection;

/// Status markers meaning the series has finished.
const COMPLETED_MARKERS: &[&str] = &["完结", "完結", "completed", "finished"];

/// Markers that negate a completed marker ("未完结" = not finished).
const NOT_COMPLETED_MARKERS: &[&str] = &["未完", "not completed", "unfinished"];

/// Attributes holding an image URL, most specific first. Lazy loaders keep
/// the real URL in a data attribute and a placeholder in `src`.
const IMAGE_ATTRS: &[&str] = &["data-original", "data-src", "src"];

/// File extensions accepted as page images, matched on the URL path.
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp"];

/// A whole absolute or protocol-relative URL, up to the first quote,
/// whitespace, bracket, comma or semicolon.
static URL_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:https?:)?//[^\s"'<>()\\,;\[\]]+"#).expect("url candidate pattern"));

static QUOTED_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[\s*(?:"[^"\n]*"|'[^'\n]*')(?:\s*,\s*(?:"[^"\n]*"|'[^'\n]*'))*\s*,?\s*\]"#).expect("quoted list pattern")
});

static QUOTED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"\n]*)"|'([^'\n]*)'"#).expect("quoted item pattern"));

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number pattern"));

/// First capture group of `pattern` in `href`.
pub fn extract_id(href: &str, pattern: &Regex) -> Option<String> {
    pattern
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| !id.is_empty())
}

/// Splits a composite `<digits><separator><digits>` id.
///
/// Anything else, including empty or non-numeric halves, is rejected so an
/// id can never smuggle extra path segments into a URL.
pub fn split_numeric_pair(id: &str, separator: char) -> Option<(&str, &str)> {
    let (left, right) = id.split_once(separator)?;
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    (numeric(left) && numeric(right)).then_some((left, right))
}

/// Makes `raw` absolute.
///
/// Protocol-relative URLs get `https:`; site-relative paths are joined onto
/// `base`. Empty input stays empty, and input that cannot be joined is
/// returned trimmed but otherwise unchanged.
pub fn normalize_url(raw: &str, base: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if let Some(rest) = raw.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_string();
    }

    Url::parse(base)
        .and_then(|base| base.join(raw))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Maps free-form status text to a [`ComicStatus`].
///
/// Anything without a completed marker, including empty text, is ongoing.
pub fn parse_status(text: &str) -> ComicStatus {
    let text = text.to_lowercase();
    if NOT_COMPLETED_MARKERS.iter().any(|m| text.contains(m)) {
        return ComicStatus::Ongoing;
    }
    if COMPLETED_MARKERS.iter().any(|m| text.contains(m)) {
        ComicStatus::Completed
    } else {
        ComicStatus::Ongoing
    }
}

/// First number in `text`, or 0.
pub fn parse_rating(text: &str) -> f64 {
    NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}

/// Collapses runs of whitespace to single spaces.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops a leading `label` (such as `"Author:"`) and surrounding whitespace.
pub fn strip_label(text: &str, labels: &[&str]) -> String {
    let text = clean_text(text);
    labels
        .iter()
        .find_map(|label| text.strip_prefix(label))
        .map(|rest| rest.trim_start_matches([':', '：', ' ']).trim().to_string())
        .unwrap_or(text)
}

/// Title from the link's `title` attribute, else from the fallback's text.
pub fn title_from(link: &Selection<'_>, fallback: &Selection<'_>) -> String {
    let title = link.attr("title");
    let title = title.trim();
    if !title.is_empty() {
        return clean_text(title);
    }
    clean_text(&fallback.text())
}

/// Image URL of the first node, honoring lazy-load attributes.
pub fn image_src(img: &Selection<'_>) -> String {
    IMAGE_ATTRS
        .iter()
        .map(|attr| img.attr(attr))
        .find(|value| !value.trim().is_empty())
        .unwrap_or_default()
}

/// Cover image inside `scope`: the class-scoped image first, else the first
/// `img` of the scope.
pub fn cover_url(scope: &Selection<'_>, primary: &str, base: &str) -> String {
    let primary = image_src(&scope.query(primary).first());
    let src = if primary.is_empty() { image_src(&scope.query("img").first()) } else { primary };
    normalize_url(&src, base)
}

fn dedupe(urls: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter().filter(|url| seen.insert(url.clone())).collect()
}

/// True when the path of `url` (query and fragment ignored) ends in an image
/// extension. `a.jpg@800w.webp` counts; `a.jpg/page` does not.
fn has_image_extension(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or_default().to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Finds image URLs embedded anywhere in a page body.
///
/// Escaped slashes from JSON payloads (`\/`) are undone before scanning.
/// Each URL is taken whole and kept only if its path ends in an image
/// extension. Results are protocol-normalized and de-duplicated in
/// first-seen order.
pub fn scan_direct_image_urls(body: &str) -> Vec<String> {
    let body = body.replace("\\/", "/");
    dedupe(
        URL_CANDIDATE
            .find_iter(&body)
            .map(|m| m.as_str())
            .filter(|url| has_image_extension(url))
            .map(|url| normalize_url(url, "https://localhost/")),
    )
}

/// Finds the longest bracketed list of quoted strings in a page body and
/// returns its entries, unmodified apart from `\/` unescaping.
pub fn scan_quoted_list(body: &str) -> Vec<String> {
    let body = body.replace("\\/", "/");
    let longest = QUOTED_LIST
        .find_iter(&body)
        .map(|list| {
            QUOTED_ITEM
                .captures_iter(list.as_str())
                .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
                .map(|m| m.as_str().trim().to_string())
                .filter(|item| !item.is_empty())
                .collect::<Vec<_>>()
        })
        .max_by_key(Vec::len)
        .unwrap_or_default();
    dedupe(longest)
}

/// Chapter images from an inline script payload.
///
/// Tries a direct URL scan first; only when that finds nothing does it fall
/// back to the quoted-list scan, whose entries are resolved against
/// `image_base`.
pub fn scan_image_urls(body: &str, image_base: &str) -> Vec<String> {
    let direct = scan_direct_image_urls(body);
    if !direct.is_empty() {
        return direct;
    }

    dedupe(
        scan_quoted_list(body)
            .iter()
            .map(|item| normalize_url(item, image_base))
            .filter(|url| !url.is_empty()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Document;
    use rstest::rstest;

    #[rstest]
    #[case("已完结", ComicStatus::Completed)]
    #[case("状态：完結", ComicStatus::Completed)]
    #[case("Completed", ComicStatus::Completed)]
    #[case("Status: FINISHED", ComicStatus::Completed)]
    #[case("连载中", ComicStatus::Ongoing)]
    #[case("未完结", ComicStatus::Ongoing)]
    #[case("Ongoing", ComicStatus::Ongoing)]
    #[case("hiatus?", ComicStatus::Ongoing)]
    #[case("", ComicStatus::Ongoing)]
    fn test_parse_status(#[case] text: &str, #[case] expected: ComicStatus) {
        assert_eq!(parse_status(text), expected);
    }

    #[rstest]
    #[case("//img.example.com/a.jpg", "https://img.example.com/a.jpg")]
    #[case("http://x.com/a", "http://x.com/a")]
    #[case("/comic/1/", "https://www.site.com/comic/1/")]
    #[case("list/2", "https://www.site.com/base/list/2")]
    #[case("  ", "")]
    fn test_normalize_url(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_url(raw, "https://www.site.com/base/"), expected);
    }

    #[test]
    fn test_extract_id() {
        let pattern = Regex::new(r"/comic/(\d+)/?").unwrap();
        assert_eq!(extract_id("/comic/1024/", &pattern), Some("1024".to_string()));
        assert_eq!(extract_id("https://x.com/comic/7", &pattern), Some("7".to_string()));
        assert_eq!(extract_id("/comic/abc/", &pattern), None);
        assert_eq!(extract_id("", &pattern), None);
    }

    #[rstest]
    #[case("31045_500", '_', Some(("31045", "500")))]
    #[case("7001/81", '/', Some(("7001", "81")))]
    #[case("a/../x", '/', None)]
    #[case("7001/81/2", '/', None)]
    #[case("7001/", '/', None)]
    #[case("7001_81", '/', None)]
    fn test_split_numeric_pair(#[case] id: &str, #[case] separator: char, #[case] expected: Option<(&str, &str)>) {
        assert_eq!(split_numeric_pair(id, separator), expected);
    }

    #[test]
    fn test_parse_rating_and_labels() {
        assert_eq!(parse_rating("评分 8.7 / 10"), 8.7);
        assert_eq!(parse_rating("no score"), 0.0);
        assert_eq!(strip_label("  Author:   Kei ", &["Author"]), "Kei");
        assert_eq!(strip_label("作者：林秋", &["作者"]), "林秋");
        assert_eq!(strip_label("Kei", &["Author"]), "Kei");
    }

    #[test]
    fn test_title_and_cover_fallbacks() {
        let doc = Document::parse(
            r##"
            <div class="a"><a title=" From Attr " href="#">text</a><img class="thumb" data-original="//c/1.jpg" src="/lazy.gif"></div>
            <div class="b"><a href="#"> From   Text </a><img src="/p/2.png"></div>
            "##,
        );
        let a = doc.query("div.a");
        let b = doc.query("div.b");

        assert_eq!(title_from(&a.query("a"), &a.query("a")), "From Attr");
        assert_eq!(title_from(&b.query("a"), &b.query("a")), "From Text");
        assert_eq!(cover_url(&a, "img.thumb", "https://s.com/"), "https://c/1.jpg");
        assert_eq!(cover_url(&b, "img.thumb", "https://s.com/"), "https://s.com/p/2.png");
        assert_eq!(cover_url(&doc.query("div.none"), "img.thumb", "https://s.com/"), "");
    }

    #[test]
    fn test_direct_scan_dedupes_in_order() {
        let body = r#"
            <script>
            var a = ["https://img.x.com/1.jpg","https://img.x.com/2.png"];
            var b = "https:\/\/img.x.com\/1.jpg";
            preload('//img.x.com/3.webp?v=1'); preload("//img.x.com/4.gif");
            var c = ["https://img.x.com/2.png", "//img.x.com/3.webp?v=1", "https://img.x.com/4.gif"];
            </script>
        "#;

        assert_eq!(
            scan_direct_image_urls(body),
            vec![
                "https://img.x.com/1.jpg",
                "https://img.x.com/2.png",
                "https://img.x.com/3.webp?v=1",
                "https://img.x.com/4.gif",
            ]
        );
    }

    #[test]
    fn test_direct_scan_keeps_whole_urls() {
        let body = r#"var pages = ["https://c.x.com/p/1.jpg_1.webp","https://c.x.com/p/1.jpg_2.webp",
            "https://i0.hdslb.com/bfs/a.jpg@800w.webp","https://img.gifcdn.com/p/3.jpg"];"#;

        assert_eq!(
            scan_image_urls(body, "https://img.x.com/"),
            vec![
                "https://c.x.com/p/1.jpg_1.webp",
                "https://c.x.com/p/1.jpg_2.webp",
                "https://i0.hdslb.com/bfs/a.jpg@800w.webp",
                "https://img.gifcdn.com/p/3.jpg",
            ]
        );
    }

    #[rstest]
    #[case("https://x.com/a.JPG", true)]
    #[case("//x.com/a.webp?v=2#top", true)]
    #[case("https://x.com/a.jpg/page", false)]
    #[case("https://img.gifcdn.com/", false)]
    #[case("https://x.com/a.js", false)]
    fn test_has_image_extension(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(has_image_extension(url), expected);
    }

    #[test]
    fn test_quoted_list_fallback() {
        let body = r#"<script>var tags = ["a"]; var pages = ['/p/9/001', '/p/9/002', "/p/9/003"];</script>"#;

        assert_eq!(scan_quoted_list(body), vec!["/p/9/001", "/p/9/002", "/p/9/003"]);
        assert_eq!(
            scan_image_urls(body, "https://img.x.com/"),
            vec!["https://img.x.com/p/9/001", "https://img.x.com/p/9/002", "https://img.x.com/p/9/003"]
        );
    }

    #[test]
    fn test_scan_prefers_direct_urls() {
        let body = r#"var pages = ["/p/1", "/p/2", "/p/3"]; var cover = "//img.x.com/cover.jpg";"#;
        assert_eq!(scan_image_urls(body, "https://img.x.com/"), vec!["https://img.x.com/cover.jpg"]);
    }

    #[test]
    fn test_scan_nothing() {
        assert!(scan_image_urls("<p>no images here</p>", "https://img.x.com/").is_empty());
    }
}
