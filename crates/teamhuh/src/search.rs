//! Pure lookups over already-fetched documents.

use crate::xml::{Document, Element, names_match};

/// Value of the attribute `name` on `element`, matched case-insensitively.
pub fn find_attribute<'a>(name: &str, element: &'a Element) -> Option<&'a str> {
    element.attribute(name)
}

/// Every element of `document` (root included) whose local name matches
/// `name` case-insensitively, in document order. `None` when nothing matches.
pub fn find_descendants_by_name<'a>(name: &str, document: &'a Document) -> Option<Vec<&'a Element>> {
    let matches: Vec<&Element> = document
        .elements()
        .filter(|e| names_match(e.name(), name))
        .collect();
    if matches.is_empty() { None } else { Some(matches) }
}

/// First direct child of the root whose `id` attribute equals `id`.
pub fn find_child_by_id<'a>(id: &str, document: &'a Document) -> Option<&'a Element> {
    document
        .root()?
        .children()
        .iter()
        .find(|child| child.attribute("id").is_some_and(|v| names_match(v, id)))
}
