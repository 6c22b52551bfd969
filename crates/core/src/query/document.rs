//! HTML parsing and DOM access.
//!
//! [`Document`] wraps a parsed page; [`Element`] is a reference to one node
//! in it. Both expose [`query`](Document::query), which returns a
//! [`Selection`].
//!
//! # Example
//!
//! ```rust
//! use panelkit_core::query::Document;
//!
//! let html = r#"
//!     <html>
//!         <body>
//!             <h1>Title</h1>
//!             <p class="content">Paragraph</p>
//!         </body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html);
//! assert_eq!(doc.query("p.content").text(), "Paragraph");
//! ```

use scraper::{ElementRef, Html};

use super::selection::Selection;
use super::selector::Selector;

/// Represents a parsed HTML document.
///
/// Parsing never fails: html5ever recovers from any markup, which is the
/// tolerance third-party pages need.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses an HTML page or fragment.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Selects elements anywhere in the document.
    ///
    /// Unsupported or malformed selectors produce an empty selection.
    pub fn query(&'_ self, selector: &str) -> Selection<'_> {
        match Selector::parse(selector) {
            Some(sel) => self.query_with(&sel),
            None => {
                tracing::debug!(selector, "unsupported selector, returning empty selection");
                Selection::default()
            }
        }
    }

    /// Selects elements with a precompiled selector.
    pub fn query_with(&'_ self, selector: &Selector) -> Selection<'_> {
        let root = self.html.root_element();
        Selection::from_refs(selector.select_document(root))
    }

    /// Gets the title of the document.
    pub fn title(&self) -> Option<String> {
        let title = self.query("title").text();
        if title.is_empty() { None } else { Some(title) }
    }

    /// Gets all text content from the document, scripts included.
    pub fn text(&self) -> String {
        self.html.root_element().text().collect()
    }
}

/// A reference to one element node of a [`Document`].
///
/// Exposes the node's tag name, attribute mapping, element children and
/// descendant text.
#[derive(Clone, Copy, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    pub(crate) fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    pub(crate) fn element_ref(&self) -> ElementRef<'a> {
        self.element
    }

    /// Gets the lowercase tag name.
    pub fn tag_name(&self) -> &'a str {
        self.element.value().name()
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Iterates over every `(name, value)` attribute pair.
    pub fn attributes(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.element.value().attrs()
    }

    /// Checks the class list.
    pub fn has_class(&self, name: &str) -> bool {
        self.element.value().classes().any(|c| c == name)
    }

    /// Gets the element children, in order.
    pub fn children(&self) -> Selection<'a> {
        Selection::from_refs(self.element.children().filter_map(ElementRef::wrap).collect())
    }

    /// Gets the concatenation of all descendant text nodes, untrimmed.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Selects elements inside this one.
    pub fn query(&self, selector: &str) -> Selection<'a> {
        Selection::from(*self).query(selector)
    }
}
