//! Ordered, re-queryable result sets.

use scraper::ElementRef;

use super::document::Element;
use super::selector::Selector;

/// An ordered set of element references produced by a query.
///
/// A selection is immutable: every operation that narrows or extends it
/// returns a new one. Accessors on an empty selection return empty values
/// instead of failing, so extraction code can chain freely.
///
/// # Example
///
/// ```rust
/// use panelkit_core::query::Document;
///
/// let doc = Document::parse(r#"<ul class="list"><li><a href="/a">A</a></li><li>B</li></ul>"#);
/// let items = doc.query("ul.list > li");
///
/// assert_eq!(items.len(), 2);
/// assert_eq!(items.first().query("a").attr("href"), "/a");
/// assert_eq!(items.query("span").attr("title"), "");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Selection<'a> {
    nodes: Vec<Element<'a>>,
}

impl<'a> Selection<'a> {
    pub(crate) fn from_refs(refs: Vec<ElementRef<'a>>) -> Self {
        Self { nodes: refs.into_iter().map(Element::new).collect() }
    }

    /// Selects elements inside each node of this selection.
    ///
    /// Results are grouped per node, each group in document order. Nested
    /// roots may contribute the same element twice; nothing is deduplicated.
    pub fn query(&self, selector: &str) -> Selection<'a> {
        match Selector::parse(selector) {
            Some(sel) => self.query_with(&sel),
            None => {
                tracing::debug!(selector, "unsupported selector, returning empty selection");
                Selection::default()
            }
        }
    }

    /// Scoped query with a precompiled selector.
    pub fn query_with(&self, selector: &Selector) -> Selection<'a> {
        let refs = self
            .nodes
            .iter()
            .flat_map(|node| selector.select_within(node.element_ref()))
            .collect();
        Self::from_refs(refs)
    }

    /// A selection holding only the first node (or nothing).
    pub fn first(&self) -> Selection<'a> {
        Self { nodes: self.nodes.first().copied().into_iter().collect() }
    }

    /// Gets the node at `index`.
    pub fn get(&self, index: usize) -> Option<Element<'a>> {
        self.nodes.get(index).copied()
    }

    /// Concatenated descendant text of every node, in document order, with
    /// outer whitespace trimmed.
    pub fn text(&self) -> String {
        let text: String = self.nodes.iter().map(Element::text).collect();
        text.trim().to_string()
    }

    /// Attribute of the first node, or an empty string when the selection is
    /// empty or the attribute is absent.
    pub fn attr(&self, name: &str) -> String {
        self.nodes
            .first()
            .and_then(|node| node.attr(name))
            .unwrap_or_default()
            .to_string()
    }

    /// Calls `f` with each node and its position.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(usize, Element<'a>),
    {
        for (index, node) in self.nodes.iter().enumerate() {
            f(index, *node);
        }
    }

    /// Class check on the first node only.
    pub fn has_class(&self, name: &str) -> bool {
        self.nodes.first().is_some_and(|node| node.has_class(name))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Element<'a>> + '_ {
        self.nodes.iter().copied()
    }

    pub fn nodes(&self) -> &[Element<'a>] {
        &self.nodes
    }
}

impl<'a> From<Element<'a>> for Selection<'a> {
    fn from(element: Element<'a>) -> Self {
        Self { nodes: vec![element] }
    }
}

impl<'a> IntoIterator for Selection<'a> {
    type Item = Element<'a>;
    type IntoIter = std::vec::IntoIter<Element<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}
