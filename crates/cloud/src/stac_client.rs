//! Async STAC client for scene-footprint searches.
//!
//! One `POST /search` per call, no pagination and no retries: the first page
//! (bounded by `limit`) is what gets drawn.

use geoweave_core::{FeatureSet, GeoBBox};
use tracing::{debug, info};

use crate::error::{CloudError, Result};
use crate::http::HttpTransport;
use crate::stac_models::{footprints, StacItemCollection, StacSearchParams};

// ---------------------------------------------------------------------------
// Catalog enum
// ---------------------------------------------------------------------------

/// Well-known STAC catalogs plus custom endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StacCatalog {
    /// Microsoft Planetary Computer STAC API.
    PlanetaryComputer,
    /// AWS Earth Search (Element 84).
    EarthSearch,
    /// Any STAC API endpoint, root or `/search` URL.
    Custom(String),
}

impl StacCatalog {
    /// Return the full POST `/search` URL for this catalog.
    pub fn search_url(&self) -> String {
        match self {
            Self::PlanetaryComputer => {
                "https://planetarycomputer.microsoft.com/api/stac/v1/search".to_string()
            }
            Self::EarthSearch => "https://earth-search.aws.element84.com/v1/search".to_string(),
            Self::Custom(base) => {
                let base = base.trim_end_matches('/');
                if base.ends_with("/search") {
                    base.to_string()
                } else {
                    format!("{}/search", base)
                }
            }
        }
    }

    /// Parse a shorthand string into a catalog.
    ///
    /// Recognized shorthands: `"pc"`, `"planetary-computer"`, `"es"`,
    /// `"earth-search"`. Anything else is treated as a custom URL.
    pub fn from_str_or_url(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pc" | "planetary-computer" | "planetarycomputer" => Self::PlanetaryComputer,
            "es" | "earth-search" | "earthsearch" => Self::EarthSearch,
            _ => Self::Custom(s.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Footprint search against one catalog.
#[derive(Debug, Clone)]
pub struct StacClient {
    catalog: StacCatalog,
    collections: Vec<String>,
    limit: u32,
}

impl StacClient {
    pub fn new(catalog: StacCatalog, collections: Vec<String>, limit: u32) -> Self {
        Self {
            catalog,
            collections,
            limit,
        }
    }

    /// The catalog this client is configured for.
    pub fn catalog(&self) -> &StacCatalog {
        &self.catalog
    }

    pub fn params_for(&self, bbox: &GeoBBox) -> StacSearchParams {
        let [w, s, e, n] = bbox.to_stac();
        StacSearchParams::new()
            .bbox(w, s, e, n)
            .collections(&self.collections)
            .limit(self.limit)
    }

    /// Execute a single search request and return the page of results.
    pub async fn search<T: HttpTransport>(
        &self,
        transport: &T,
        params: &StacSearchParams,
    ) -> Result<StacItemCollection> {
        let url = self.catalog.search_url();
        let body = serde_json::to_value(params).map_err(|e| CloudError::decode("STAC", e))?;
        debug!(%url, %body, "STAC search");

        let response = transport.post_json(&url, &body).await?;
        response.ensure_success(&url, "STAC")?;
        serde_json::from_slice(&response.body).map_err(|e| CloudError::decode("STAC", e))
    }

    /// Search `bbox` and return lon/lat footprints, one per item.
    pub async fn footprints<T: HttpTransport>(
        &self,
        transport: &T,
        bbox: &GeoBBox,
    ) -> Result<FeatureSet> {
        bbox.validate()?;
        let page = self.search(transport, &self.params_for(bbox)).await?;
        info!(items = page.len(), matched = ?page.number_matched, "STAC search complete");
        Ok(footprints(&page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_urls() {
        assert_eq!(
            StacCatalog::from_str_or_url("es").search_url(),
            "https://earth-search.aws.element84.com/v1/search"
        );
        assert_eq!(
            StacCatalog::Custom("https://stac.example.org/api/v1/".into()).search_url(),
            "https://stac.example.org/api/v1/search"
        );
        assert_eq!(
            StacCatalog::from_str_or_url("https://x.org/search").search_url(),
            "https://x.org/search"
        );
    }

    #[test]
    fn params_use_stac_bbox_order() {
        let client = StacClient::new(StacCatalog::EarthSearch, vec!["sentinel-2-l2a".into()], 50);
        let params = client.params_for(&GeoBBox::new(40.0, -3.8, 40.5, -3.6));
        assert_eq!(params.bbox, Some([-3.8, 40.0, -3.6, 40.5]));
        assert_eq!(params.limit, Some(50));
    }
}
