mod document;
mod selection;
mod selector;

pub use document::{Document, Element};
pub use selection::Selection;
pub use selector::Selector;
