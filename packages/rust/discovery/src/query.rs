//! Search query construction and response parsing.
//!
//! The search API is Serper-compatible:
//! - request: `{"q": "<query>", "num": <n>}`
//! - response: `{"organic": [{"link": "https://..."}, ...]}`

use leadline_shared::{LeadlineError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Request body sent to the search endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub q: String,
    pub num: u32,
}

/// The part of the search response we read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub organic: Vec<OrganicResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub link: Option<String>,
}

// ---------------------------------------------------------------------------
// Query building
// ---------------------------------------------------------------------------

/// Build the website query for a counselor.
///
/// `"{name} counseling {city} {region} -site:a.com -site:b.com"`
pub fn build_query(name: &str, city: &str, region: &str, excluded_sites: &[String]) -> String {
    let mut query = [name.trim(), "counseling", city.trim(), region.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    for site in excluded_sites {
        let site = site.trim();
        if !site.is_empty() {
            query.push_str(" -site:");
            query.push_str(site);
        }
    }
    query
}

/// Parse a search response body and return the first usable organic link.
///
/// An empty result list is `Ok(None)`. A body that is not valid JSON is a
/// parse error.
pub fn first_result(body: &str) -> Result<Option<Url>> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| LeadlineError::parse(format!("invalid search response: {e}")))?;

    Ok(response
        .organic
        .into_iter()
        .filter_map(|result| result.link)
        .filter_map(|link| Url::parse(link.trim()).ok())
        .find(|url| matches!(url.scheme(), "http" | "https")))
}
