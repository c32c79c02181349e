//! Tile provider abstraction
//!
//! A [`Provider`] turns a tile index into a request against a remote tile
//! server and returns the raw payload. The only implementation is the
//! [`TemplateProvider`], which expands a URL template per tile.
//!
//! ```ignore
//! use std::time::Duration;
//! use getmaps::provider::{ReqwestClient, TemplateProvider, UrlTemplate};
//!
//! let http_client = ReqwestClient::with_timeout(Duration::from_secs(30))?;
//! let provider = TemplateProvider::new(http_client, UrlTemplate::default(), 4);
//! ```

mod http;
mod template;
mod types;

pub use http::{HttpClient, ReqwestClient, DEFAULT_TIMEOUT_SECS};
pub use template::{TemplateProvider, UrlTemplate, DEFAULT_URL_TEMPLATE, DEFAULT_ZOOM_OFFSET};
pub use types::{Provider, ProviderError};

#[cfg(test)]
pub use http::tests::{MockHttpClient, ScriptedHttpClient};
