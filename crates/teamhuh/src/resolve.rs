//! Field resolution: turning a requested name into a value, a node, a
//! collection, or a miss.
//!
//! The remote representation mixes four shapes under one XML form:
//! attributes, inline scalar leaves, single nested links and repeated
//! collections. Resolution tells them apart from local structure only
//! (name equality, childlessness, `href` presence, cardinality), never a
//! schema.
//!
//! Order of precedence for a resolved node:
//!
//! 1. `first` enumerates and takes the first child.
//! 2. `exists` reports whether the node holds a document; `<name>exists`
//!    (or `<name>_exists`) reports whether `<name>` resolves.
//! 3. An attribute on the document's first element.
//! 4. Elements anywhere in the document with that name.
//! 5. Steps 3 and 4 against the linked document behind the root's `href`.
//! 6. For an envelope (a root carrying an `href` and exactly one child
//!    element), an attribute on that child.
//!
//! An unresolved entry node instead fetches `name` as a top-level resource.

use crate::config;
use crate::node::QueryNode;
use crate::search;
use crate::xml::{Document, Element, names_match};
use tracing::debug;

const FIRST: &str = "first";
const EXISTS: &str = "exists";

/// Outcome of resolving one name.
#[derive(Debug, Clone)]
pub enum Resolution {
    Scalar(String),
    Node(QueryNode),
    Collection(Collection),
    NotFound,
}

/// Several elements matching one name.
///
/// `node` is rooted at a synthetic `<name>s` element holding copies of every
/// match in document order; `items` wraps each match on its own. The plural
/// is always `name + "s"`, whatever the English plural would be.
#[derive(Debug, Clone)]
pub struct Collection {
    node: QueryNode,
    items: Vec<QueryNode>,
}

impl Collection {
    pub fn node(&self) -> &QueryNode {
        &self.node
    }

    pub fn items(&self) -> &[QueryNode] {
        &self.items
    }

    pub fn into_items(self) -> Vec<QueryNode> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Resolution {
    pub fn from_bool(value: bool) -> Self {
        Resolution::Scalar(value.to_string())
    }

    pub fn is_found(&self) -> bool {
        !matches!(self, Resolution::NotFound)
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Resolution::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_scalar(self) -> Option<String> {
        match self {
            Resolution::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// The node to keep navigating from; collections yield their synthetic
    /// container node.
    pub fn into_node(self) -> Option<QueryNode> {
        match self {
            Resolution::Node(node) => Some(node),
            Resolution::Collection(collection) => Some(collection.node),
            Resolution::Scalar(_) | Resolution::NotFound => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Resolution::Collection(collection) => Some(collection),
            _ => None,
        }
    }
}

/// Resolve `name` against `node`.
pub fn resolve(node: &QueryNode, name: &str) -> Resolution {
    let Some(document) = node.document() else {
        let url = config::resource_url(node.base_address(), name);
        let fetched = node.fetch(&url).unwrap_or_default();
        return Resolution::Node(node.with_document(fetched));
    };

    if names_match(name, FIRST) {
        return node.first().map_or(Resolution::NotFound, Resolution::Node);
    }

    if names_match(name, EXISTS) {
        return Resolution::from_bool(!document.is_empty());
    }

    if let Some(inner) = strip_exists_suffix(name) {
        let found = resolve(node, inner).is_found();
        debug!(name = inner, found, "existence check");
        return Resolution::from_bool(found);
    }

    if let Some(found) = search_document(node, document, name) {
        return found;
    }

    debug!(
        name,
        cached = node.linked_fetch_attempted(),
        "no match in document, trying linked document"
    );
    if let Some(found) = node
        .linked_document()
        .and_then(|linked| search_document(node, linked, name))
    {
        return found;
    }

    envelope_attribute(document, name)
        .map_or(Resolution::NotFound, |value| Resolution::Scalar(value.to_string()))
}

/// `"buildexists"` and `"build_exists"` both strip to `"build"`.
fn strip_exists_suffix(name: &str) -> Option<&str> {
    let split = name.len().checked_sub(EXISTS.len())?;
    if !name.is_char_boundary(split) || !name[split..].eq_ignore_ascii_case(EXISTS) {
        return None;
    }
    let inner = name[..split].trim_end_matches('_');
    if inner.is_empty() { None } else { Some(inner) }
}

fn search_document(node: &QueryNode, document: &Document, name: &str) -> Option<Resolution> {
    let root = document.root()?;

    if let Some(value) = search::find_attribute(name, root) {
        return Some(Resolution::Scalar(value.to_string()));
    }

    let matches = search::find_descendants_by_name(name, document)?;
    Some(classify(node, name, &matches))
}

/// Attribute of the only child of a linked root, e.g. `id` in
/// `<root href="/a"><item id="1"/></root>`.
fn envelope_attribute<'a>(document: &'a Document, name: &str) -> Option<&'a str> {
    let root = document.root()?;
    search::find_attribute("href", root)?;
    match root.children() {
        [only] => search::find_attribute(name, only),
        _ => None,
    }
}

fn classify(node: &QueryNode, name: &str, matches: &[&Element]) -> Resolution {
    match matches {
        [] => Resolution::NotFound,
        [single] if single.is_childless() && names_match(single.name(), name) => {
            resolve_stub(node, single)
        }
        [single] => Resolution::Node(node.with_element(single)),
        many => {
            debug!(name, count = many.len(), "multiple matches, building collection");
            let container = Element::new(format!("{}s", name))
                .with_children(many.iter().map(|e| (*e).clone()));
            Resolution::Collection(Collection {
                node: node.with_document(Document::new(container)),
                items: many.iter().map(|e| node.with_element(e)).collect(),
            })
        }
    }
}

/// A childless element is either a link to a fuller resource or a leaf value.
fn resolve_stub(node: &QueryNode, element: &Element) -> Resolution {
    if let Some(href) = search::find_attribute("href", element)
        && let Some(document) = node.fetch(&config::linked_url(node.base_address(), href))
    {
        return Resolution::Node(node.with_document(document));
    }
    Resolution::Scalar(element.text().unwrap_or_default().to_string())
}
