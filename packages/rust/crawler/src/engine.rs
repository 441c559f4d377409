//! Contact email extraction engine.
//!
//! Starting from a website URL, the extractor walks a short, fixed sequence
//! of pages and stops as soon as one of them yields an address:
//!
//! 1. the homepage,
//! 2. the probe paths `/contact`, `/contact-us`, `/about`, `/about-us`
//!    (HTTP 200 pages only),
//! 3. up to three contact links found on the homepage (`mailto:` targets are
//!    read without fetching).
//!
//! Candidates are then filtered and the best one selected (see [`crate::emails`]).

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

use leadline_shared::{Attempt, LeadlineError, Result};

use crate::emails::{parse_mailto, scan_emails, select_best};
use crate::links::{ContactLink, find_contact_links};

/// User-Agent string for page requests.
const USER_AGENT: &str = concat!("Leadline/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: usize = 5;

/// Paths probed when the homepage has no address, in order.
pub const PROBE_PATHS: &[&str] = &["/contact", "/contact-us", "/about", "/about-us"];

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Where the winning candidates were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStep {
    Homepage,
    ProbePath(&'static str),
    Mailto,
    ContactLink(Url),
}

/// Outcome of a successful homepage fetch.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// The selected address, if any candidate survived filtering.
    pub email: Option<String>,
    /// Raw candidates from the step that produced them, in discovery order.
    pub candidates: Vec<String>,
    /// The step that produced the candidates.
    pub step: Option<ExtractionStep>,
    /// Number of HTTP requests issued, homepage included.
    pub requests: usize,
}

// ---------------------------------------------------------------------------
// EmailExtractor
// ---------------------------------------------------------------------------

/// Sequential, bounded email extractor for a single website.
pub struct EmailExtractor {
    client: Client,
    /// Allow localhost/private IPs (for integration tests with mock servers).
    allow_localhost: bool,
}

impl EmailExtractor {
    /// Create a new extractor with a 10 s per-request timeout.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LeadlineError::network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            allow_localhost: false,
        })
    }

    /// Allow fetching localhost/private IPs (for integration tests).
    #[cfg(test)]
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }

    /// Return the single best contact email for `website`, or none.
    ///
    /// Only a failed homepage fetch is reported as a failure; errors on probe
    /// paths and followed links count as "nothing found at that step".
    pub async fn extract(&self, website: &Url) -> Attempt<Option<String>> {
        self.extract_detailed(website).await.map(|e| e.email)
    }

    /// Like [`EmailExtractor::extract`], also reporting candidates and the winning step.
    #[instrument(skip_all, fields(website = %website))]
    pub async fn extract_detailed(&self, website: &Url) -> Attempt<Extraction> {
        if !self.allow_localhost && is_ssrf_target(website) {
            warn!("SSRF protection: blocked");
            return Attempt::Permanent(LeadlineError::validation(format!(
                "refusing to fetch private or non-http address {website}"
            )));
        }

        // 1. Homepage
        let homepage = match self.fetch(website).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "homepage fetch failed");
                return Attempt::failed(e);
            }
        };
        let mut requests = 1;

        let (candidates, step) = 'search: {
            let found = scan_emails(&homepage);
            if !found.is_empty() {
                break 'search (found, Some(ExtractionStep::Homepage));
            }

            // 2. Probe paths
            debug!("no emails on homepage, probing contact paths");
            for &probe in PROBE_PATHS {
                let Some(url) = probe_url(website, probe) else {
                    continue;
                };
                requests += 1;
                match self.fetch(&url).await {
                    Ok(body) => {
                        let found = scan_emails(&body);
                        if !found.is_empty() {
                            break 'search (found, Some(ExtractionStep::ProbePath(probe)));
                        }
                    }
                    Err(e) => debug!(%url, error = %e, "probe failed"),
                }
            }

            // 3. Contact links on the homepage
            debug!("probes found nothing, following contact links");
            let mut mailtos = Vec::new();
            for link in find_contact_links(&homepage, website) {
                match link {
                    ContactLink::Mailto(href) => {
                        if let Some(email) = parse_mailto(&href) {
                            mailtos.push(email);
                        }
                    }
                    ContactLink::Page(url) => {
                        if !self.allow_localhost && is_ssrf_target(&url) {
                            warn!(%url, "SSRF protection: blocked");
                            continue;
                        }
                        requests += 1;
                        match self.fetch(&url).await {
                            Ok(body) => {
                                let found = scan_emails(&body);
                                if !found.is_empty() {
                                    mailtos.extend(found);
                                    break 'search (mailtos, Some(ExtractionStep::ContactLink(url)));
                                }
                            }
                            Err(e) => debug!(%url, error = %e, "contact link failed"),
                        }
                    }
                }
            }

            if mailtos.is_empty() {
                (Vec::new(), None)
            } else {
                (mailtos, Some(ExtractionStep::Mailto))
            }
        };

        let email = select_best(&candidates);
        info!(
            candidates = candidates.len(),
            step = ?step,
            requests,
            email = email.as_deref().unwrap_or("-"),
            "extraction finished"
        );

        Attempt::Ok(Extraction {
            email,
            candidates,
            step,
            requests,
        })
    }

    /// GET a page, returning its body on HTTP 200.
    async fn fetch(&self, url: &Url) -> Result<String> {
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LeadlineError::timeout(format!("{url}: {e}"))
                } else {
                    LeadlineError::network(format!("{url}: {e}"))
                }
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(LeadlineError::http(status.as_u16(), url.as_str()));
        }

        response
            .text()
            .await
            .map_err(|e| LeadlineError::network(format!("{url}: body read failed: {e}")))
    }
}

/// Append a probe path to the website URL (query and fragment dropped).
fn probe_url(website: &Url, probe: &str) -> Option<Url> {
    let mut base = website.clone();
    base.set_query(None);
    base.set_fragment(None);
    let joined = format!("{}{probe}", base.as_str().trim_end_matches('/'));
    Url::parse(&joined).ok()
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    // Block non-HTTP schemes
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            // Block known local hostnames
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
                // 192.0.0.0/24
                || (v4.octets()[0] == 192 && v4.octets()[1] == 0 && v4.octets()[2] == 0)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

#[cfg(test)]
mod extractor_tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn extractor() -> EmailExtractor {
        EmailExtractor::new().unwrap().allow_localhost()
    }

    async fn page(server: &MockServer, at: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    fn site(server: &MockServer) -> Url {
        Url::parse(&server.uri()).unwrap()
    }

    #[test]
    fn test_ssrf_protection_blocks_file() {
        let url = Url::parse("file:///etc/passwd").unwrap();
        assert!(is_ssrf_target(&url));
    }

    #[test]
    fn test_ssrf_protection_blocks_private_ip() {
        for raw in ["http://192.168.1.1/admin", "http://10.0.0.1/", "http://127.0.0.1:8080/", "http://[::1]/"] {
            let url = Url::parse(raw).unwrap();
            assert!(is_ssrf_target(&url), "{raw}");
        }
    }

    #[test]
    fn test_ssrf_allows_public() {
        let url = Url::parse("https://janesmith-counseling.com/").unwrap();
        assert!(!is_ssrf_target(&url));
        let url = Url::parse("http://localhost:3000/").unwrap();
        assert!(is_ssrf_target(&url));
    }

    #[test]
    fn test_probe_url() {
        let site = Url::parse("https://janesmith.com/practice/?ref=x#top").unwrap();
        assert_eq!(
            probe_url(&site, "/contact").unwrap().as_str(),
            "https://janesmith.com/practice/contact"
        );
        let root = Url::parse("https://janesmith.com").unwrap();
        assert_eq!(
            probe_url(&root, "/about-us").unwrap().as_str(),
            "https://janesmith.com/about-us"
        );
    }

    #[tokio::test]
    async fn blocked_private_website_is_permanent() {
        let extractor = EmailExtractor::new().unwrap();
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        assert!(matches!(extractor.extract(&url).await, Attempt::Permanent(_)));
    }

    #[tokio::test]
    async fn homepage_personal_beats_builder_address() {
        let server = MockServer::start().await;
        page(
            &server,
            "/",
            "<footer>admin@wixsite.com</footer><p>Email jane@janesmith-counseling.com</p>",
        )
        .await;

        let result = extractor().extract_detailed(&site(&server)).await;
        let Attempt::Ok(extraction) = result else {
            panic!("expected success");
        };
        assert_eq!(extraction.email.as_deref(), Some("jane@janesmith-counseling.com"));
        assert_eq!(extraction.step, Some(ExtractionStep::Homepage));
        assert_eq!(extraction.requests, 1);
    }

    #[tokio::test]
    async fn falls_back_to_contact_page() {
        let server = MockServer::start().await;
        page(&server, "/", "<p>Welcome to our practice</p>").await;
        page(&server, "/contact", "<p>info@example-counseling.com</p>").await;
        Mock::given(path("/about"))
            .respond_with(ResponseTemplate::new(200).set_body_string("bob@else.org"))
            .expect(0)
            .mount(&server)
            .await;

        let result = extractor().extract_detailed(&site(&server)).await;
        let Attempt::Ok(extraction) = result else {
            panic!("expected success");
        };
        assert_eq!(extraction.email.as_deref(), Some("info@example-counseling.com"));
        assert_eq!(extraction.step, Some(ExtractionStep::ProbePath("/contact")));
    }

    #[tokio::test]
    async fn non_200_probe_pages_are_ignored() {
        let server = MockServer::start().await;
        page(&server, "/", "<p>Welcome</p>").await;
        Mock::given(path("/contact"))
            .respond_with(ResponseTemplate::new(404).set_body_string("webmaster@host.org"))
            .mount(&server)
            .await;
        page(&server, "/about-us", "jane@practice.org").await;

        let result = extractor().extract(&site(&server)).await;
        assert!(matches!(result, Attempt::Ok(Some(ref e)) if e == "jane@practice.org"));
    }

    #[tokio::test]
    async fn follows_at_most_three_contact_links() {
        let server = MockServer::start().await;
        page(
            &server,
            "/",
            r#"<a href="/reach-us-1">1</a><a href="/reach-us-2">2</a>
               <a href="/reach-us-3">3</a><a href="/reach-us-4">4</a>"#,
        )
        .await;
        for (at, hits) in [("/reach-us-1", 1), ("/reach-us-2", 1), ("/reach-us-3", 1), ("/reach-us-4", 0)] {
            Mock::given(path(at))
                .respond_with(ResponseTemplate::new(200).set_body_string("<p>nothing</p>"))
                .expect(hits)
                .mount(&server)
                .await;
        }

        let result = extractor().extract_detailed(&site(&server)).await;
        let Attempt::Ok(extraction) = result else {
            panic!("expected success");
        };
        assert!(extraction.email.is_none());
        // homepage + 4 probes + 3 links
        assert_eq!(extraction.requests, 8);
    }

    #[tokio::test]
    async fn mailto_href_is_found_by_homepage_scan() {
        let server = MockServer::start().await;
        page(
            &server,
            "/",
            r#"<a href="MAILTO:Jane.Smith@practice.org?subject=hi">Email me</a>"#,
        )
        .await;

        // The raw homepage scan already sees the address inside the href.
        let result = extractor().extract(&site(&server)).await;
        assert!(matches!(result, Attempt::Ok(Some(ref e)) if e == "Jane.Smith@practice.org"));
    }

    #[tokio::test]
    async fn first_followed_link_with_emails_wins() {
        let server = MockServer::start().await;
        page(
            &server,
            "/",
            r#"<a href="/about-me">About</a><a href="/get-in-touch">Contact</a>"#,
        )
        .await;
        page(&server, "/about-me", "<p>jane@practice.org</p>").await;
        Mock::given(path("/get-in-touch"))
            .respond_with(ResponseTemplate::new(200).set_body_string("bob@practice.org"))
            .expect(0)
            .mount(&server)
            .await;

        let result = extractor().extract_detailed(&site(&server)).await;
        let Attempt::Ok(extraction) = result else {
            panic!("expected success");
        };
        assert_eq!(extraction.email.as_deref(), Some("jane@practice.org"));
        assert!(matches!(extraction.step, Some(ExtractionStep::ContactLink(_))));
    }

    #[tokio::test]
    async fn homepage_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(path("/"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let result = extractor().extract(&site(&server)).await;
        assert!(result.is_retryable());
    }

    #[tokio::test]
    async fn homepage_not_found_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(path("/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = extractor().extract(&site(&server)).await;
        assert!(matches!(result, Attempt::Permanent(LeadlineError::Http { status: 404, .. })));
    }

    #[tokio::test]
    async fn only_blocked_candidates_yield_none() {
        let server = MockServer::start().await;
        page(&server, "/", r#"<img src="hero@2x.jpg"> noreply@squarespace.com"#).await;

        let result = extractor().extract_detailed(&site(&server)).await;
        let Attempt::Ok(extraction) = result else {
            panic!("expected success");
        };
        assert!(extraction.email.is_none());
        assert_eq!(extraction.candidates.len(), 2);
        assert_eq!(extraction.step, Some(ExtractionStep::Homepage));
    }
}
