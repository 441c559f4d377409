//! Website resolution for contacts.
//!
//! Given a counselor's name and location, Leadline asks a search API for the
//! person's own website, excluding directory and aggregator domains, and takes
//! the first organic result.
//!
//! Failures are tagged: timeouts, connection errors, HTTP 429 and 5xx are
//! retryable; any other HTTP error or an unparseable body is permanent; an
//! empty result list is a successful "no website".

mod query;

use std::time::Duration;

use leadline_shared::{Attempt, LeadlineError, Result, SearchConfig, Secret};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use query::{SearchRequest, SearchResponse, build_query, first_result};

/// Maximum number of redirects to follow when calling the search API.
const MAX_REDIRECTS: usize = 3;

/// Default timeout in seconds for a search request.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("Leadline/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Resolver options
// ---------------------------------------------------------------------------

/// Configuration for the website resolver.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Search endpoint URL.
    pub endpoint: String,
    /// Result-count hint sent with each query.
    pub result_count: u32,
    /// Domains excluded with `-site:` filters.
    pub excluded_sites: Vec<String>,
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl ResolverOptions {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            result_count: config.result_count,
            excluded_sites: config.excluded_sites.clone(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}

// ---------------------------------------------------------------------------
// WebsiteResolver
// ---------------------------------------------------------------------------

/// Search-API client that resolves a contact to a website URL.
pub struct WebsiteResolver {
    client: Client,
    api_key: Secret,
    opts: ResolverOptions,
}

impl WebsiteResolver {
    pub fn new(opts: ResolverOptions, api_key: Secret) -> Result<Self> {
        let client = build_client(&opts)?;
        Ok(Self {
            client,
            api_key,
            opts,
        })
    }

    /// Resolve the most likely website for `name` in `city, region`.
    #[instrument(skip_all, fields(name = %name, city = %city, region = %region))]
    pub async fn resolve(&self, name: &str, city: &str, region: &str) -> Attempt<Option<Url>> {
        let q = build_query(name, city, region, &self.opts.excluded_sites);
        debug!(query = %q, "searching for website");

        let outcome: Attempt<Option<Url>> = self.search(&q).await.into();
        match &outcome {
            Attempt::Ok(Some(url)) => info!(%url, "website resolved"),
            Attempt::Ok(None) => info!("no website found"),
            Attempt::Retryable(e) => warn!(error = %e, "search failed, will retry on a later run"),
            Attempt::Permanent(e) => warn!(error = %e, "search failed permanently"),
        }
        outcome
    }

    async fn search(&self, q: &str) -> Result<Option<Url>> {
        let endpoint = self.opts.endpoint.as_str();
        let response = self
            .client
            .post(endpoint)
            .header("X-API-KEY", self.api_key.expose())
            .json(&SearchRequest {
                q: q.to_string(),
                num: self.opts.result_count,
            })
            .send()
            .await
            .map_err(|e| request_error(endpoint, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadlineError::http(status.as_u16(), endpoint));
        }

        let body = response
            .text()
            .await
            .map_err(|e| request_error(endpoint, &e))?;

        first_result(&body)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &ResolverOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| LeadlineError::network(format!("failed to build HTTP client: {e}")))
}

/// Classify a reqwest transport error.
fn request_error(url: &str, e: &reqwest::Error) -> LeadlineError {
    if e.is_timeout() {
        LeadlineError::timeout(format!("{url}: {e}"))
    } else {
        LeadlineError::network(format!("{url}: {e}"))
    }
}
