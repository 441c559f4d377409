//! Paginated directory collection for one (region, city) target.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use leadline_shared::{Lead, LeadlineError, ProspectingConfig, Result};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::parse::{Listing, is_blocked_page, parse_page};
use crate::regions::{region_code, slugify};
use crate::score::{MIN_SCORE, score_listing, tier_for};

/// Browser-like User-Agent; directory pages reject obvious bots.
const USER_AGENT: &str = concat!("Mozilla/5.0 (compatible; Leadline/", env!("CARGO_PKG_VERSION"), ")");

/// Per-page request timeout.
const PAGE_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

/// Configuration for the collector.
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    /// Search URL template with `{region_code}` and `{city}` placeholders.
    pub base_url_template: String,
    /// Result pages walked per target.
    pub max_pages: u32,
    /// Pause between pages, in milliseconds.
    pub page_delay_ms: u64,
    /// Minimum retained score.
    pub min_score: u32,
}

impl CollectorOptions {
    pub fn from_config(config: &ProspectingConfig) -> Self {
        Self {
            base_url_template: config.base_url_template.clone(),
            max_pages: config.max_pages,
            page_delay_ms: config.page_delay_ms,
            min_score: config.min_score.max(MIN_SCORE),
        }
    }
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self::from_config(&ProspectingConfig::default())
    }
}

/// Why the page walk ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// All `max_pages` pages were read.
    PageLimit,
    /// A page had no listings.
    NoListings { page: u32 },
    /// A page looked like a block or bot challenge.
    Blocked { page: u32 },
    /// A page could not be fetched.
    FetchFailed { page: u32, error: String },
}

/// Leads retained for one target.
#[derive(Debug, Clone)]
pub struct Collection {
    /// `region/city` label of the target.
    pub target: String,
    /// Retained leads, deduplicated, best score first.
    pub leads: Vec<Lead>,
    /// Listing containers seen across all pages.
    pub listings_seen: usize,
    /// Pages successfully read.
    pub pages_read: u32,
    pub stop: StopReason,
}

// ---------------------------------------------------------------------------
// LeadCollector
// ---------------------------------------------------------------------------

/// Walks directory result pages and keeps scored, deduplicated leads.
pub struct LeadCollector {
    client: Client,
    opts: CollectorOptions,
}

impl LeadCollector {
    pub fn new(opts: CollectorOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(PAGE_TIMEOUT_SECS))
            .build()
            .map_err(|e| LeadlineError::network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, opts })
    }

    /// The first search page URL for a target.
    pub fn search_url(&self, region: &str, city: &str) -> Result<Url> {
        let region_slug = slugify(region);
        let code = match region_code(region) {
            Some(code) => code.to_string(),
            None => {
                warn!(region, "region code not found, using as-is");
                region_slug
            }
        };
        let raw = self
            .opts
            .base_url_template
            .replace("{region_code}", &code)
            .replace("{city}", &slugify(city));
        Url::parse(&raw).map_err(|e| LeadlineError::config(format!("invalid directory URL {raw}: {e}")))
    }

    /// Collect leads for `city` in `region`.
    #[instrument(skip_all, fields(region = %region, city = %city))]
    pub async fn collect(&self, region: &str, city: &str) -> Result<Collection> {
        let base = self.search_url(region, city)?;
        let target = format!("{}/{}", slugify(region), slugify(city));
        info!(%base, "collecting listings");

        let mut seen_keys: HashSet<String> = HashSet::new();
        let mut leads: Vec<Lead> = Vec::new();
        let mut listings_seen = 0;
        let mut pages_read = 0;
        let mut stop = StopReason::PageLimit;

        for page in 1..=self.opts.max_pages {
            if page > 1 && self.opts.page_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.opts.page_delay_ms)).await;
            }

            let mut url = base.clone();
            url.query_pairs_mut().append_pair("page", &page.to_string());

            let html = match self.fetch(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(page, error = %e, "page fetch failed, stopping");
                    stop = StopReason::FetchFailed {
                        page,
                        error: e.to_string(),
                    };
                    break;
                }
            };

            if is_blocked_page(&html) {
                warn!(page, "blocked or challenged by directory, stopping");
                stop = StopReason::Blocked { page };
                break;
            }

            let listings = parse_page(&html, &url);
            if listings.is_empty() {
                info!(page, "no more listings");
                stop = StopReason::NoListings { page };
                break;
            }
            pages_read += 1;
            listings_seen += listings.len();

            let before = leads.len();
            for listing in listings {
                if let Some(lead) = self.qualify(listing, &target) {
                    if seen_keys.insert(lead.key.clone()) {
                        leads.push(lead);
                    }
                }
            }
            debug!(page, retained = leads.len() - before, "page processed");
        }

        // Stable: equal scores keep first-seen order.
        leads.sort_by(|a, b| b.score.cmp(&a.score));

        info!(
            retained = leads.len(),
            listings_seen,
            pages_read,
            stop = ?stop,
            "collection finished"
        );

        Ok(Collection {
            target,
            leads,
            listings_seen,
            pages_read,
            stop,
        })
    }

    /// Score a listing and turn it into a lead if it is valid and scores high enough.
    fn qualify(&self, listing: Listing, target: &str) -> Option<Lead> {
        if !listing.is_valid() {
            return None;
        }
        let score = score_listing(&listing);
        if score < self.opts.min_score {
            return None;
        }
        let key = listing.key()?.to_string();

        Some(Lead {
            key,
            name: listing.name.unwrap_or_default(),
            profile_url: listing.profile_url,
            credentials: listing.credentials,
            phone: listing.phone,
            city: listing.city,
            region: listing.region,
            description: listing.description,
            is_verified: listing.is_verified,
            is_mft: listing.is_mft,
            score,
            tier: tier_for(score),
            target: target.to_string(),
            first_seen_at: Utc::now(),
        })
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        debug!(%url, "fetching page");
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| LeadlineError::network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadlineError::http(status.as_u16(), url.as_str()));
        }

        response
            .text()
            .await
            .map_err(|e| LeadlineError::network(format!("{url}: body read failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn collector_for(server: &MockServer, max_pages: u32) -> LeadCollector {
        LeadCollector::new(CollectorOptions {
            base_url_template: format!(
                "{}/us/therapists/{{region_code}}/{{city}}?category=couples-counseling",
                server.uri()
            ),
            max_pages,
            page_delay_ms: 0,
            min_score: MIN_SCORE,
        })
        .unwrap()
    }

    fn row(name: &str, href: &str, text: &str) -> String {
        format!(
            r#"<div class="results-row"><a class="profile-title" href="{href}">{name}</a>
               <div class="statements">{text}</div></div>"#
        )
    }

    async fn serve_page(server: &MockServer, page: &str, body: String) {
        Mock::given(method("GET"))
            .and(path("/us/therapists/tx/austin"))
            .and(query_param("page", page))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[test]
    fn search_url_uses_region_code_and_city_slug() {
        let collector = LeadCollector::new(CollectorOptions::default()).unwrap();
        let url = collector.search_url("Texas", "San Antonio").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.psychologytoday.com/us/therapists/tx/san-antonio?category=couples-counseling"
        );
    }

    #[tokio::test]
    async fn collects_dedups_and_sorts() {
        let server = MockServer::start().await;
        serve_page(
            &server,
            "1",
            format!(
                "{}{}{}",
                row("Jane", "/p/jane", "Gottman couples therapy"),
                row("Low", "/p/low", "Individual adult therapy"),
                row("Mark", "/p/mark", "Marriage counseling")
            ),
        )
        .await;
        serve_page(
            &server,
            "2",
            format!(
                "{}{}",
                // Same profile again with a different score: first-seen wins.
                row("Jane", "/p/jane", "Prepare/Enrich Gottman"),
                row("Ruth", "/p/ruth", "Prepare/Enrich Christian")
            ),
        )
        .await;
        serve_page(&server, "3", "<p>No results</p>".into()).await;

        let collection = collector_for(&server, 5).collect("texas", "austin").await.unwrap();

        assert_eq!(collection.target, "texas/austin");
        assert_eq!(collection.stop, StopReason::NoListings { page: 3 });
        assert_eq!(collection.pages_read, 2);
        assert_eq!(collection.listings_seen, 5);

        let names: Vec<_> = collection.leads.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Ruth", "Jane", "Mark"]);

        let jane = &collection.leads[1];
        assert_eq!(jane.score, 80);
        assert_eq!(jane.tier, leadline_shared::Tier::Confirmed);
        assert!(jane.key.ends_with("/p/jane"));
    }

    #[tokio::test]
    async fn stops_on_block_page() {
        let server = MockServer::start().await;
        serve_page(&server, "1", row("Jane", "/p/jane", "Gottman")).await;
        serve_page(&server, "2", "<h1>Access denied</h1>".into()).await;

        let collection = collector_for(&server, 5).collect("tx", "austin").await.unwrap();
        assert_eq!(collection.stop, StopReason::Blocked { page: 2 });
        assert_eq!(collection.leads.len(), 1);
    }

    #[tokio::test]
    async fn respects_page_limit() {
        let server = MockServer::start().await;
        serve_page(&server, "1", row("A", "/p/a", "Gottman")).await;
        serve_page(&server, "2", row("B", "/p/b", "Gottman")).await;
        Mock::given(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_string(row("C", "/p/c", "Gottman")))
            .expect(0)
            .mount(&server)
            .await;

        let collection = collector_for(&server, 2).collect("texas", "austin").await.unwrap();
        assert_eq!(collection.stop, StopReason::PageLimit);
        assert_eq!(collection.leads.len(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_stops_walk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let collection = collector_for(&server, 5).collect("texas", "austin").await.unwrap();
        assert!(matches!(collection.stop, StopReason::FetchFailed { page: 1, .. }));
        assert!(collection.leads.is_empty());
    }
}
