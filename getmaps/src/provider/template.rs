//! Tile provider driven by a URL template.
//!
//! The template is an ordinary URL containing placeholders that are replaced
//! per tile:
//!
//! - `{x}` / `{y}`: tile column and row
//! - `{zoom}`: zoom level in the server's numbering (see below)
//! - `{quadkey}`: quadtree key of the tile at the server zoom
//!
//! # Zoom numbering
//!
//! The server counts zoom levels differently from the internal numbering:
//! `server_zoom = zoom - zoom_offset`, with an offset of 4 for the default
//! server. The result may be negative for small internal zoom levels; it is
//! passed through unchanged.

use crate::coord::{quadtree_key, TileIndex};
use crate::provider::{HttpClient, Provider, ProviderError};

/// Default tile server (street maps).
pub const DEFAULT_URL_TEMPLATE: &str =
    "http://mt0.google.com/mt/v=w2.95&hl=en&x={x}&y={y}&zoom={zoom}";

/// Difference between the internal zoom numbering and the server's.
pub const DEFAULT_ZOOM_OFFSET: i32 = 4;

const PLACEHOLDERS: [&str; 4] = ["{x}", "{y}", "{zoom}", "{quadkey}"];

/// A validated tile URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
}

impl UrlTemplate {
    /// Parses a template.
    ///
    /// The template must address tiles either by `{x}` and `{y}` or by
    /// `{quadkey}`, and must expand to an absolute URL.
    pub fn parse(template: &str) -> Result<Self, ProviderError> {
        let has_xy = template.contains("{x}") && template.contains("{y}");
        if !has_xy && !template.contains("{quadkey}") {
            return Err(ProviderError::InvalidUrl(format!(
                "template '{}' needs {{x}} and {{y}} or {{quadkey}}",
                template
            )));
        }

        let sample = PLACEHOLDERS
            .iter()
            .fold(template.to_string(), |url, p| url.replace(p, "0"));
        reqwest::Url::parse(&sample)
            .map_err(|e| ProviderError::InvalidUrl(format!("{}: {}", template, e)))?;

        Ok(Self {
            template: template.to_string(),
        })
    }

    /// Expands the template for one tile.
    pub fn expand(&self, x: u32, y: u32, server_zoom: i32) -> String {
        let mut url = self
            .template
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
            .replace("{zoom}", &server_zoom.to_string());
        if url.contains("{quadkey}") {
            url = url.replace("{quadkey}", &quadtree_key(x, y, server_zoom));
        }
        url
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Host name of the server, if the template has one.
    pub fn host(&self) -> Option<String> {
        let sample = PLACEHOLDERS
            .iter()
            .fold(self.template.clone(), |url, p| url.replace(p, "0"));
        reqwest::Url::parse(&sample)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

impl Default for UrlTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_URL_TEMPLATE.to_string(),
        }
    }
}

/// Tile provider that fetches tiles from a templated URL.
///
/// # Example
///
/// ```no_run
/// use getmaps::provider::{ReqwestClient, TemplateProvider, UrlTemplate};
///
/// let client = ReqwestClient::new().unwrap();
/// let provider = TemplateProvider::new(client, UrlTemplate::default(), 4);
/// ```
pub struct TemplateProvider<C: HttpClient> {
    http_client: C,
    template: UrlTemplate,
    zoom_offset: i32,
    name: String,
}

impl<C: HttpClient> TemplateProvider<C> {
    pub fn new(http_client: C, template: UrlTemplate, zoom_offset: i32) -> Self {
        let name = template.host().unwrap_or_else(|| "tile server".to_string());
        Self {
            http_client,
            template,
            zoom_offset,
            name,
        }
    }

    /// Maps an internal zoom level to the server's numbering.
    pub fn server_zoom(&self, zoom: u8) -> i32 {
        zoom as i32 - self.zoom_offset
    }

    pub fn http_client(&self) -> &C {
        &self.http_client
    }
}

impl<C: HttpClient> Provider for TemplateProvider<C> {
    fn tile_url(&self, tile: &TileIndex) -> String {
        self.template
            .expand(tile.x, tile.y, self.server_zoom(tile.zoom))
    }

    fn fetch_tile(&self, tile: &TileIndex) -> Result<Vec<u8>, ProviderError> {
        let url = self.tile_url(tile);
        self.http_client.get(&url)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
