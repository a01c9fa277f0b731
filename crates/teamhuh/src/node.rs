use crate::config::{self, Credentials, ServerConfig};
use crate::error::Result;
use crate::resolve::{self, Resolution};
use crate::search;
use crate::transport::{HttpTransport, Transport};
use crate::xml::{Document, Element};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Coordinates shared by every node derived from the same entry point.
pub(crate) struct Session {
    base_address: String,
    credentials: Credentials,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_address", &self.base_address)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
enum NodeState {
    /// Entry point: nothing fetched yet, names are top-level resources.
    Unresolved,
    Resolved {
        document: Document,
        /// Document behind the root's `href`, fetched on the first miss.
        /// `Some(None)` records a fetch that was attempted and failed.
        linked: OnceCell<Option<Document>>,
    },
}

/// A position in the remote resource tree.
///
/// Nodes are cheap to derive and own their documents outright, so a node
/// handed out by [`QueryNode::get`] can be mutated without touching its
/// parent.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use teamhuh::{Credentials, MemoryTransport, QueryNode};
///
/// let transport = MemoryTransport::new("http://ci").with_document(
///     "/httpAuth/app/rest/server",
///     r#"<server version="2024.1"><projects href="/projects"/></server>"#,
/// );
/// let root = QueryNode::new("http://ci", Credentials::new("alex", "pw"), Arc::new(transport));
///
/// let version = root.path(["server", "version"]);
/// assert_eq!(version.as_scalar(), Some("2024.1"));
/// ```
#[derive(Debug, Clone)]
pub struct QueryNode {
    session: Arc<Session>,
    state: NodeState,
}

impl QueryNode {
    /// An unresolved entry point.
    pub fn new(
        base_address: impl AsRef<str>,
        credentials: Credentials,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            session: Arc::new(Session {
                base_address: config::normalize_base_address(base_address.as_ref()),
                credentials,
                transport,
            }),
            state: NodeState::Unresolved,
        }
    }

    /// An unresolved entry point talking HTTP to the configured server.
    pub fn connect(config: &ServerConfig) -> Result<Self> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::new(
            &config.base_address,
            config.credentials.clone(),
            Arc::new(transport),
        ))
    }

    /// A node over `document` sharing this node's server coordinates.
    pub fn with_document(&self, document: Document) -> Self {
        Self {
            session: Arc::clone(&self.session),
            state: NodeState::Resolved {
                document,
                linked: OnceCell::new(),
            },
        }
    }

    /// A node over an independent copy of `element`.
    pub(crate) fn with_element(&self, element: &Element) -> Self {
        self.with_document(Document::new(element.clone()))
    }

    pub fn base_address(&self) -> &str {
        &self.session.base_address
    }

    pub fn credentials(&self) -> &Credentials {
        &self.session.credentials
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, NodeState::Resolved { .. })
    }

    pub fn document(&self) -> Option<&Document> {
        match &self.state {
            NodeState::Unresolved => None,
            NodeState::Resolved { document, .. } => Some(document),
        }
    }

    pub fn document_mut(&mut self) -> Option<&mut Document> {
        match &mut self.state {
            NodeState::Unresolved => None,
            NodeState::Resolved { document, .. } => Some(document),
        }
    }

    /// The linked document, fetching it on first use. Only one fetch is
    /// ever issued per node, even when it fails or the node is shared
    /// across threads.
    pub fn linked_document(&self) -> Option<&Document> {
        let NodeState::Resolved { document, linked } = &self.state else {
            return None;
        };
        linked
            .get_or_init(|| {
                let href = document.root().and_then(|root| search::find_attribute("href", root))?;
                self.fetch(&config::linked_url(self.base_address(), href))
            })
            .as_ref()
    }

    /// Whether the linked document has been attempted, successfully or not.
    pub(crate) fn linked_fetch_attempted(&self) -> bool {
        match &self.state {
            NodeState::Unresolved => false,
            NodeState::Resolved { linked, .. } => linked.get().is_some(),
        }
    }

    /// Resolve `name` against this node.
    pub fn get(&self, name: &str) -> Resolution {
        resolve::resolve(self, name)
    }

    /// Resolve a chain of names, each against the node the previous one
    /// produced. A scalar or a miss part-way through yields `NotFound`.
    pub fn path<I, S>(&self, names: I) -> Resolution
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names = names.into_iter();
        let Some(first) = names.next() else {
            return Resolution::Node(self.clone());
        };
        let mut current = self.get(first.as_ref());
        for name in names {
            current = match current.into_node() {
                Some(node) => node.get(name.as_ref()),
                None => return Resolution::NotFound,
            };
        }
        current
    }

    /// Child nodes of this collection; recomputed on every call.
    pub fn children(&self) -> Vec<QueryNode> {
        crate::enumerate::children(self)
    }

    pub fn first(&self) -> Option<QueryNode> {
        self.children().into_iter().next()
    }

    pub fn iter(&self) -> std::vec::IntoIter<QueryNode> {
        self.children().into_iter()
    }

    /// Whether this node holds a non-empty document.
    pub fn exists(&self) -> bool {
        self.document().is_some_and(|d| !d.is_empty())
    }

    /// The root child whose `id` attribute equals `id`.
    pub fn by_id(&self, id: &str) -> Option<QueryNode> {
        let found = search::find_child_by_id(id, self.document()?)?;
        Some(self.with_element(found))
    }

    pub fn to_xml_string(&self) -> Result<String> {
        match self.document() {
            Some(document) => document.to_xml_string(),
            None => Ok(String::new()),
        }
    }

    /// Fetch `url`, logging and swallowing any transport failure.
    pub(crate) fn fetch(&self, url: &str) -> Option<Document> {
        debug!(url, "fetching");
        match self.session.transport.fetch(url, &self.session.credentials) {
            Ok(document) => Some(document),
            Err(err) => {
                warn!(url, error = %err, "fetch failed, treating resource as absent");
                None
            }
        }
    }
}

impl<'a> IntoIterator for &'a QueryNode {
    type Item = QueryNode;
    type IntoIter = std::vec::IntoIter<QueryNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
