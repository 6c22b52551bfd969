//! Restricted selector grammar.
//!
//! Only a small, predictable subset of CSS is understood:
//!
//! | Form        | Example           |
//! |-------------|-------------------|
//! | id          | `#chapter-list`   |
//! | class       | `.cover`          |
//! | tag         | `li`              |
//! | tag + class | `ul.list`         |
//! | descendant  | `div.intro p`     |
//! | child       | `ul.list > li`    |
//!
//! A compound may combine one tag, at most one id and any number of classes
//! (`a.title.hot`). At most one combinator is allowed. Anything else
//! (attribute selectors, pseudo-classes, sibling combinators, selector lists,
//! the universal selector) does not compile, and [`Selector::parse`] returns
//! `None`.

use scraper::ElementRef;
use scraper::node::Element as ElementData;

/// Characters that belong to CSS syntax this engine does not support.
const UNSUPPORTED: &[char] = &['[', ']', ':', '+', '~', '*', ',', '(', ')', '"', '\'', '=', '|', '\\'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// One tag/id/class conjunction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn parse(input: &str) -> Option<Self> {
        if input.is_empty() {
            return None;
        }

        let mut compound = Compound::default();
        let mut rest = input;

        if !rest.starts_with(['.', '#']) {
            let end = rest.find(['.', '#']).unwrap_or(rest.len());
            let tag = &rest[..end];
            if !is_tag_name(tag) {
                return None;
            }
            compound.tag = Some(tag.to_ascii_lowercase());
            rest = &rest[end..];
        }

        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(['.', '#']).unwrap_or(body.len());
            let ident = &body[..end];
            if !is_ident(ident) {
                return None;
            }

            if marker == '#' {
                if compound.id.is_some() {
                    return None;
                }
                compound.id = Some(ident.to_string());
            } else {
                compound.classes.push(ident.to_string());
            }

            rest = &body[end..];
        }

        Some(compound)
    }

    fn matches(&self, element: &ElementData) -> bool {
        if let Some(tag) = &self.tag
            && !element.name().eq_ignore_ascii_case(tag)
        {
            return false;
        }

        if let Some(id) = &self.id
            && element.id() != Some(id.as_str())
        {
            return false;
        }

        self.classes
            .iter()
            .all(|class| element.classes().any(|c| c == class))
    }
}

fn is_tag_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic()) && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with(|c: char| c.is_ascii_digit())
        && s.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

/// A compiled selector in the restricted grammar.
///
/// # Example
///
/// ```rust
/// use panelkit_core::query::Selector;
///
/// assert!(Selector::parse("ul.list > li").is_some());
/// assert!(Selector::parse("a[href]").is_none());
/// assert!(Selector::parse("li:first-child").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    ancestor: Option<(Compound, Combinator)>,
    subject: Compound,
}

impl Selector {
    /// Compiles a selector, returning `None` for anything outside the
    /// supported grammar.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() || input.contains(UNSUPPORTED) {
            return None;
        }

        if input.contains('>') {
            let mut parts = input.split('>');
            let (left, right) = (parts.next()?.trim(), parts.next()?.trim());
            if parts.next().is_some() || left.contains(char::is_whitespace) || right.contains(char::is_whitespace) {
                return None;
            }

            return Some(Self {
                ancestor: Some((Compound::parse(left)?, Combinator::Child)),
                subject: Compound::parse(right)?,
            });
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        match parts.as_slice() {
            [subject] => Some(Self { ancestor: None, subject: Compound::parse(subject)? }),
            [ancestor, subject] => Some(Self {
                ancestor: Some((Compound::parse(ancestor)?, Combinator::Descendant)),
                subject: Compound::parse(subject)?,
            }),
            _ => None,
        }
    }

    /// Tests one element.
    ///
    /// Ancestor matching stops at `scope` (inclusive) when one is given, so a
    /// scoped query never looks outside the subtree it was asked about.
    pub(crate) fn matches(&self, element: ElementRef<'_>, scope: Option<ElementRef<'_>>) -> bool {
        if !self.subject.matches(element.value()) {
            return false;
        }

        let Some((ancestor, combinator)) = &self.ancestor else {
            return true;
        };

        match combinator {
            Combinator::Child => element
                .parent()
                .and_then(ElementRef::wrap)
                .is_some_and(|parent| ancestor.matches(parent.value())),
            Combinator::Descendant => {
                for node in element.ancestors() {
                    if let Some(candidate) = ElementRef::wrap(node)
                        && ancestor.matches(candidate.value())
                    {
                        return true;
                    }
                    if scope.is_some_and(|scope| scope.id() == node.id()) {
                        break;
                    }
                }
                false
            }
        }
    }

    /// Collects matches below `root` in document order, excluding `root`.
    pub(crate) fn select_within<'a>(&self, root: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        root.descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(|el| self.matches(*el, Some(root)))
            .collect()
    }

    /// Collects matches from `root` (inclusive) with unbounded ancestry.
    pub(crate) fn select_document<'a>(&self, root: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        root.descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| self.matches(*el, None))
            .collect()
    }
}
