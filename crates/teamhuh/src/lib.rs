#![doc = include_str!("../README.md")]

pub mod config;
pub mod enumerate;
pub mod error;
pub mod node;
pub mod resolve;
pub mod search;
pub mod transport;
pub mod xml;

pub use config::{Credentials, ServerConfig};
pub use error::{NavError, Result};
pub use node::QueryNode;
pub use resolve::{Collection, Resolution};
pub use transport::{FixtureTransport, HttpTransport, MemoryTransport, Transport};
pub use xml::{Attribute, Document, Element};
