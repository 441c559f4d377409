//! Directory search-page parsing.
//!
//! Listing containers and every field use prioritized selector lists so that
//! small markup changes on the directory degrade to a fallback instead of
//! losing the field.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

// ---------------------------------------------------------------------------
// Selector lists
// ---------------------------------------------------------------------------

/// Listing containers, most specific first. The first selector with any match wins.
pub const LISTING_SELECTORS: &[&str] = &[
    "[data-qa='result-listing']",
    "article[data-test='therapist-result']",
    "li[data-test='search-result']",
    "div.results-row",
];

const NAME_SELECTORS: &[&str] = &[
    "a.profile-title",
    "h3.profile-title a",
    "div.profile-title a",
    "a[href*='/therapists/']",
    ".profile-title",
];

const CREDENTIAL_SELECTORS: &[&str] = &[
    "div.profile-subtitle-credentials",
    "div.profile-subtitle",
    "span.credentials",
    "div.profile-credentials",
    ".credentials",
];

const LOCATION_SELECTORS: &[&str] = &[
    "div.profile-location span.address",
    "div.profile-location",
    "span.address",
    "div.location",
    ".profile-location",
];

const PHONE_SELECTORS: &[&str] = &[
    "span.results-row-phone",
    "a.results-row-phone-sm",
    "div.profile-phone",
    "span.phone",
    "a[href^='tel:']",
    ".phone",
];

const PROFILE_URL_SELECTORS: &[&str] = &[
    "a.profile-title",
    "a.results-row-cta-view",
    "h3.profile-title a",
    "div.profile-title a",
    "a[href*='/therapists/']",
];

const DESCRIPTION_SELECTORS: &[&str] = &[
    "div.statements",
    "div.profile-statement",
    "div.profile-statements",
    "div.statement",
    "p.statement",
    ".statements",
];

const VERIFIED_SELECTORS: &[&str] = &[
    "div.verified-badge",
    "span.verified",
    ".verified-badge",
    ".verified",
];

/// Page text that marks a block or bot challenge.
const BLOCK_SIGNALS: &[&str] = &[
    "access denied",
    "verify you are a human",
    "are you a human",
    "temporarily blocked",
    "unusual traffic",
    "blocked by security rules",
];

/// Characters kept in a phone number.
static PHONE_STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\d\-()\s+]").expect("phone regex"));

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// One parsed directory listing, before scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub name: Option<String>,
    pub profile_url: Option<String>,
    pub credentials: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub description: Option<String>,
    pub is_verified: bool,
    /// Credentials mention MFT / LMFT.
    pub is_mft: bool,
    /// All visible text of the listing, space separated.
    pub full_text: String,
}

impl Listing {
    /// A listing needs both a name and a profile URL to be usable.
    pub fn is_valid(&self) -> bool {
        self.name.is_some() && self.profile_url.is_some()
    }

    /// Dedup key: profile URL, falling back to name.
    pub fn key(&self) -> Option<&str> {
        self.profile_url.as_deref().or(self.name.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse every listing container on a search page.
///
/// Relative profile URLs are resolved against `page_url`.
pub fn parse_page(html: &str, page_url: &Url) -> Vec<Listing> {
    let doc = Html::parse_document(html);

    for raw in LISTING_SELECTORS {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        let rows: Vec<ElementRef<'_>> = doc.select(&selector).collect();
        if !rows.is_empty() {
            tracing::debug!(selector = raw, count = rows.len(), "listing containers found");
            return rows.into_iter().map(|row| parse_listing(row, page_url)).collect();
        }
    }

    tracing::debug!("no listing containers matched");
    Vec::new()
}

/// Whether the page looks like a block or challenge page.
pub fn is_blocked_page(html: &str) -> bool {
    let lower = html.to_lowercase();
    BLOCK_SIGNALS.iter().any(|signal| lower.contains(signal))
}

fn parse_listing(row: ElementRef<'_>, page_url: &Url) -> Listing {
    let credentials = first_text(row, CREDENTIAL_SELECTORS);
    let is_mft = credentials
        .as_deref()
        .is_some_and(|c| c.to_uppercase().contains("MFT"));

    let (city, region) = match first_text(row, LOCATION_SELECTORS) {
        Some(location) => split_location(&location),
        None => (None, None),
    };

    Listing {
        name: first_text(row, NAME_SELECTORS),
        profile_url: profile_url(row, page_url),
        credentials,
        phone: phone(row),
        city,
        region,
        description: first_text(row, DESCRIPTION_SELECTORS),
        is_verified: VERIFIED_SELECTORS
            .iter()
            .filter_map(|raw| Selector::parse(raw).ok())
            .any(|sel| row.select(&sel).next().is_some()),
        is_mft,
        full_text: element_text(row),
    }
}

/// Text of the first selector whose element has non-empty text.
fn first_text(row: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    selectors
        .iter()
        .filter_map(|raw| Selector::parse(raw).ok())
        .find_map(|sel| {
            row.select(&sel)
                .next()
                .map(element_text)
                .filter(|text| !text.is_empty())
        })
}

/// Visible text, whitespace collapsed.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn profile_url(row: ElementRef<'_>, page_url: &Url) -> Option<String> {
    PROFILE_URL_SELECTORS
        .iter()
        .filter_map(|raw| Selector::parse(raw).ok())
        .find_map(|sel| {
            row.select(&sel)
                .next()
                .and_then(|el| el.value().attr("href"))
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .map(|mut url| {
            url.set_fragment(None);
            url.to_string()
        })
}

fn phone(row: ElementRef<'_>) -> Option<String> {
    PHONE_SELECTORS
        .iter()
        .filter_map(|raw| Selector::parse(raw).ok())
        .find_map(|sel| {
            let el = row.select(&sel).next()?;
            let text = element_text(el);
            let raw = if text.is_empty() {
                el.value()
                    .attr("href")
                    .map(|href| href.trim_start_matches("tel:").to_string())
                    .unwrap_or_default()
            } else {
                text
            };
            let cleaned = PHONE_STRIP_RE.replace_all(&raw, "").trim().to_string();
            (!cleaned.is_empty()).then_some(cleaned)
        })
}

/// Split `"City, ST 78701"` into `(city, region)`.
fn split_location(location: &str) -> (Option<String>, Option<String>) {
    let mut parts = location.split(',').map(str::trim);
    let city = parts
        .next()
        .filter(|c| !c.is_empty())
        .map(String::from);
    let region = parts
        .next()
        .and_then(|r| r.split_whitespace().next())
        .map(String::from);
    (city, region)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://directory.example/us/therapists/tx/austin?page=1").unwrap()
    }

    const PAGE: &str = r#"<html><body>
        <div class="results-row">
            <a class="profile-title" href="/us/therapists/jane-smith-austin-tx/123">Jane Smith</a>
            <div class="profile-subtitle-credentials">Licensed Marriage &amp; Family Therapist, LMFT</div>
            <div class="profile-location"><span class="address">Austin, TX 78701</span></div>
            <span class="results-row-phone">(512) 555-0100 ext.</span>
            <div class="statements">Gottman-trained couples counseling for engaged partners.</div>
            <span class="verified">Verified</span>
        </div>
        <div class="results-row">
            <div class="profile-location">Round Rock, TX</div>
            <a href="tel:+15125550199"></a>
        </div>
    </body></html>"#;

    #[test]
    fn parses_fields_with_fallbacks() {
        let listings = parse_page(PAGE, &page_url());
        assert_eq!(listings.len(), 2);

        let jane = &listings[0];
        assert_eq!(jane.name.as_deref(), Some("Jane Smith"));
        assert_eq!(
            jane.profile_url.as_deref(),
            Some("https://directory.example/us/therapists/jane-smith-austin-tx/123")
        );
        assert!(jane.is_mft);
        assert!(jane.is_verified);
        assert_eq!(jane.city.as_deref(), Some("Austin"));
        assert_eq!(jane.region.as_deref(), Some("TX"));
        assert_eq!(jane.phone.as_deref(), Some("(512) 555-0100"));
        assert!(jane.full_text.contains("Gottman-trained couples counseling"));
        assert!(jane.is_valid());
        assert_eq!(jane.key(), jane.profile_url.as_deref());
    }

    #[test]
    fn listing_without_name_is_invalid() {
        let listings = parse_page(PAGE, &page_url());
        let other = &listings[1];
        assert!(!other.is_valid());
        assert_eq!(other.city.as_deref(), Some("Round Rock"));
        assert_eq!(other.phone.as_deref(), Some("+15125550199"));
        assert!(!other.is_verified);
    }

    #[test]
    fn prefers_first_container_selector() {
        let html = r#"
            <div data-qa="result-listing"><a class="profile-title" href="https://x.example/therapists/a">A</a></div>
            <div class="results-row"><a class="profile-title" href="/therapists/b">B</a></div>"#;
        let listings = parse_page(html, &page_url());
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].name.as_deref(), Some("A"));
    }

    #[test]
    fn empty_page_has_no_listings() {
        assert!(parse_page("<html><body><p>No results</p></body></html>", &page_url()).is_empty());
    }

    #[test]
    fn detects_block_pages() {
        assert!(is_blocked_page("<h1>Access Denied</h1>"));
        assert!(is_blocked_page("Please verify you are a human"));
        assert!(!is_blocked_page(PAGE));
    }

    #[test]
    fn location_split() {
        assert_eq!(
            split_location("Austin, TX 78701"),
            (Some("Austin".into()), Some("TX".into()))
        );
        assert_eq!(split_location("Online"), (Some("Online".into()), None));
    }
}
