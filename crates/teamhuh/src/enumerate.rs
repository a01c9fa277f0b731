//! Turning a collection document into one node per member.
//!
//! Remote collections often open with a self-reference element before the
//! repeated members (`<list><self href=".."/><entry/><entry/></list>`), so
//! the member tag is taken from the root's *second* child when there is
//! one. This is a convention of the remote API, not a general XML rule.

use crate::node::QueryNode;
use crate::xml::Document;
use tracing::debug;

/// Members of the collection held by `node`, in document order.
///
/// When the node's own document has nothing below its root, the linked
/// document is used instead. Each member owns a copy of its element.
pub fn children(node: &QueryNode) -> Vec<QueryNode> {
    let Some(document) = node.document() else {
        return Vec::new();
    };

    let source = if has_nested_elements(document) {
        document
    } else {
        match node.linked_document() {
            Some(linked) if has_nested_elements(linked) => linked,
            _ => return Vec::new(),
        }
    };

    let Some(tag) = member_tag(source) else {
        return Vec::new();
    };
    debug!(tag, "enumerating collection");

    source
        .elements()
        .filter(|e| e.name() == tag)
        .map(|e| node.with_element(e))
        .collect()
}

fn has_nested_elements(document: &Document) -> bool {
    document.elements().nth(1).is_some()
}

fn member_tag(document: &Document) -> Option<&str> {
    match document.root()?.children() {
        [] => None,
        [only] => Some(only.name()),
        [_, second, ..] => Some(second.name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::transport::MemoryTransport;
    use std::sync::Arc;

    const BASE: &str = "http://ci";

    fn node_over(transport: &Arc<MemoryTransport>, xml: &str) -> QueryNode {
        QueryNode::new(BASE, Credentials::default(), transport.clone())
            .with_document(Document::parse(xml).unwrap())
    }

    fn ids(nodes: &[QueryNode]) -> Vec<String> {
        nodes
            .iter()
            .filter_map(|n| n.get("id").into_scalar())
            .collect()
    }

    #[test]
    fn test_skips_self_reference() {
        let transport = Arc::new(MemoryTransport::new(BASE));
        let node = node_over(
            &transport,
            r#"<list><self href="/list"/><entry id="1"/><entry id="2"/></list>"#,
        );

        let members = children(&node);
        assert_eq!(members.len(), 2);
        for member in &members {
            assert_eq!(member.document().unwrap().root().unwrap().name(), "entry");
        }
        assert_eq!(ids(&members), vec!["1", "2"]);
    }

    #[test]
    fn test_homogeneous_collection() {
        let transport = Arc::new(MemoryTransport::new(BASE));
        let node = node_over(
            &transport,
            r#"<builds count="3"><build id="a"/><build id="b"/><build id="c"/></builds>"#,
        );
        assert_eq!(ids(&children(&node)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_single_member() {
        let transport = Arc::new(MemoryTransport::new(BASE));
        let node = node_over(&transport, r#"<builds count="1"><build id="only"/></builds>"#);
        assert_eq!(ids(&children(&node)), vec!["only"]);
    }

    #[test]
    fn test_nested_members_are_ignored_for_tag() {
        let transport = Arc::new(MemoryTransport::new(BASE));
        let node = node_over(
            &transport,
            r#"<builds><build id="1"><tags><tag/></tags></build><build id="2"/></builds>"#,
        );
        assert_eq!(ids(&children(&node)), vec!["1", "2"]);
    }

    #[test]
    fn test_restartable_and_order_preserving() {
        let transport = Arc::new(MemoryTransport::new(BASE));
        let node = node_over(
            &transport,
            r#"<agents><agent id="x"/><agent id="y"/><agent id="z"/></agents>"#,
        );
        let first_pass = ids(&node.children());
        let second_pass = ids(&node.iter().collect::<Vec<_>>());
        assert_eq!(first_pass, second_pass);
        assert_eq!(first_pass, vec!["x", "y", "z"]);

        let mut via_for = Vec::new();
        for child in &node {
            via_for.push(child.get("id").into_scalar().unwrap());
        }
        assert_eq!(via_for, first_pass);
    }

    #[test]
    fn test_empty_document_falls_back_to_linked() {
        let transport = Arc::new(MemoryTransport::new(BASE).with_document(
            "/httpAuth/app/rest/projects",
            r#"<projects><project id="_Root"/><project id="Main"/></projects>"#,
        ));
        let node = node_over(&transport, r#"<projects href="/httpAuth/app/rest/projects"/>"#);

        assert_eq!(ids(&children(&node)), vec!["_Root", "Main"]);
        assert_eq!(ids(&children(&node)), vec!["_Root", "Main"]);
        assert_eq!(transport.fetch_count("/httpAuth/app/rest/projects"), 1);
    }

    #[test]
    fn test_leaf_without_href_is_empty() {
        let transport = Arc::new(MemoryTransport::new(BASE));
        let node = node_over(&transport, r#"<builds count="0"/>"#);
        assert!(children(&node).is_empty());
        assert!(transport.fetched().is_empty());
    }

    #[test]
    fn test_empty_linked_document_is_empty() {
        let transport =
            Arc::new(MemoryTransport::new(BASE).with_document("/empty", r#"<builds count="0"/>"#));
        let node = node_over(&transport, r#"<builds href="/empty"/>"#);
        assert!(children(&node).is_empty());
        assert_eq!(transport.fetch_count("/empty"), 1);
    }

    #[test]
    fn test_unresolved_node_has_no_children() {
        let transport = Arc::new(MemoryTransport::new(BASE));
        let root = QueryNode::new(BASE, Credentials::default(), transport.clone());
        assert!(children(&root).is_empty());
        assert!(transport.fetched().is_empty());
    }

    #[test]
    fn test_member_tag() {
        let d = Document::parse("<l><a/><b/><b/></l>").unwrap();
        assert_eq!(member_tag(&d), Some("b"));
        let d = Document::parse("<l><a/></l>").unwrap();
        assert_eq!(member_tag(&d), Some("a"));
        let d = Document::parse("<l/>").unwrap();
        assert_eq!(member_tag(&d), None);
    }
}
