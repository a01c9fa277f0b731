//! Fetching XML documents by URL.
//!
//! The resolver never sees transport errors: it turns every `Err` into an
//! absent document. Implementations should still report failures precisely
//! so the log explains why a resource was treated as missing.

use crate::config::{Credentials, ServerConfig};
use crate::error::{NavError, Result};
use crate::xml::Document;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

/// Authenticated retrieval of an XML document.
pub trait Transport: Send + Sync {
    fn fetch(&self, url: &str, credentials: &Credentials) -> Result<Document>;
}

// ── HTTP ─────────────────────────────────────────────────────────────

/// Blocking HTTP transport using basic auth.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        Self::new(config.timeout, &config.user_agent)
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str, credentials: &Credentials) -> Result<Document> {
        let response = self
            .client
            .get(url)
            .basic_auth(credentials.username(), Some(credentials.password()))
            .header(ACCEPT, "text/xml")
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(NavError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Document::parse(&response.text()?)
    }
}

// ── Fixture directory ────────────────────────────────────────────────

/// Serves documents from `*.xml` files laid out like the server's URL space.
///
/// `{base}/httpAuth/app/rest/projects` maps to
/// `{dir}/httpAuth/app/rest/projects.xml`. Credentials are ignored.
#[derive(Debug, Clone)]
pub struct FixtureTransport {
    base_address: String,
    dir: PathBuf,
}

impl FixtureTransport {
    pub fn new(base_address: impl AsRef<str>, dir: impl Into<PathBuf>) -> Self {
        Self {
            base_address: crate::config::normalize_base_address(base_address.as_ref()),
            dir: dir.into(),
        }
    }

    /// File that would back `url`, or `None` when the URL lies outside the
    /// base address.
    pub fn file_for(&self, url: &str) -> Option<PathBuf> {
        let relative = url.strip_prefix(&self.base_address)?.trim_start_matches('/');
        if relative.is_empty() || relative.split('/').any(|part| part == "..") {
            return None;
        }
        Some(self.dir.join(format!("{}.xml", relative)))
    }
}

impl Transport for FixtureTransport {
    fn fetch(&self, url: &str, _credentials: &Credentials) -> Result<Document> {
        let path = self.file_for(url).ok_or_else(|| NavError::Status {
            url: url.to_string(),
            status: 404,
        })?;
        let content = std::fs::read_to_string(&path)?;
        Document::parse(&content)
    }
}

// ── In-memory ────────────────────────────────────────────────────────

/// Documents keyed by path relative to the base address, with a log of
/// every fetched path. Handy for tests and for embedding canned responses.
#[derive(Debug)]
pub struct MemoryTransport {
    base_address: String,
    documents: HashMap<String, String>,
    fetched: Mutex<Vec<String>>,
}

impl MemoryTransport {
    pub fn new(base_address: impl AsRef<str>) -> Self {
        Self {
            base_address: crate::config::normalize_base_address(base_address.as_ref()),
            documents: HashMap::new(),
            fetched: Mutex::new(Vec::new()),
        }
    }

    /// Register raw XML under `path` (e.g. `"/httpAuth/app/rest/projects"`).
    pub fn with_document(mut self, path: impl Into<String>, xml: impl Into<String>) -> Self {
        self.documents.insert(path.into(), xml.into());
        self
    }

    /// Every path requested so far, in request order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn fetch_count(&self, path: &str) -> usize {
        self.fetched().iter().filter(|p| p.as_str() == path).count()
    }
}

impl Transport for MemoryTransport {
    fn fetch(&self, url: &str, _credentials: &Credentials) -> Result<Document> {
        let path = url.strip_prefix(&self.base_address).unwrap_or(url);
        if let Ok(mut log) = self.fetched.lock() {
            log.push(path.to_string());
        }

        let xml = self.documents.get(path).ok_or_else(|| NavError::Status {
            url: url.to_string(),
            status: 404,
        })?;
        Document::parse(xml)
    }
}
