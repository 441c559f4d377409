//! Email candidate scanning, filtering, and selection.
//!
//! Pages are scanned as raw HTML, so addresses inside attributes (`mailto:`
//! hrefs, data attributes, inline scripts) are found alongside visible text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

// ---------------------------------------------------------------------------
// Patterns (compiled once)
// ---------------------------------------------------------------------------

/// ASCII address shape: `local@host.tld`.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[a-z0-9.\-+_]+@[a-z0-9.\-+_]+\.[a-z]+").expect("email regex")
});

/// Substrings that disqualify an address (checked case-insensitively).
pub const BLOCKED_PATTERNS: &[&str] = &[
    // images mistaken for addresses (e.g. logo@2x.png)
    "png",
    "jpg",
    "gif",
    "jpeg",
    "svg",
    // site builders
    "wix.com",
    "wixpress.com",
    "wixsite.com",
    "wordpress.com",
    "wp.com",
    "blogger.com",
    "squarespace.com",
    "weebly.com",
    // error tracking
    "sentry.io",
    // placeholders
    "example.com",
    "test.com",
    "domain.com",
    // theme vendors
    "themenectar.com",
    "templatemonster.com",
    "envato.com",
    // automated mailboxes
    "@support",
    "@noreply",
    "@no-reply",
    // directories
    "mapquest.com",
    "yelp.com",
    "yellowpages.com",
    // other professions
    "gortlaw.com",
    "@law",
];

/// Local-part prefixes of shared role mailboxes.
pub const ROLE_PREFIXES: &[&str] = &["info@", "contact@", "admin@", "hello@"];

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

/// Find every address-shaped string in `html`, in order of appearance.
pub fn scan_emails(html: &str) -> Vec<String> {
    EMAIL_RE
        .find_iter(html)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Parse the address out of a `mailto:` href (query and encoding ignored).
pub fn parse_mailto(href: &str) -> Option<String> {
    let lower = href.to_ascii_lowercase();
    let start = lower.find("mailto:")? + "mailto:".len();
    EMAIL_RE
        .find(&href[start..])
        .filter(|m| m.start() == 0)
        .map(|m| m.as_str().to_string())
}

// ---------------------------------------------------------------------------
// Filtering and selection
// ---------------------------------------------------------------------------

/// Whether `email` contains any blocked substring.
pub fn is_blocked(email: &str) -> bool {
    let lower = email.to_ascii_lowercase();
    BLOCKED_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

/// Whether `email` belongs to a shared role mailbox (`info@`, `contact@`, ...).
pub fn is_role_account(email: &str) -> bool {
    let lower = email.to_ascii_lowercase();
    ROLE_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
}

/// Drop blocked addresses and case-insensitive duplicates, keeping discovery order.
pub fn filter_candidates<I, S>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .map(|c| c.as_ref().trim_matches('.').to_string())
        .filter(|c| !is_blocked(c))
        .filter(|c| seen.insert(c.to_ascii_lowercase()))
        .collect()
}

/// Pick the best address from raw candidates.
///
/// The first personal address wins; a role mailbox is used only when no
/// personal address survived filtering.
pub fn select_best<I, S>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let valid = filter_candidates(candidates);
    valid
        .iter()
        .find(|email| !is_role_account(email))
        .or_else(|| valid.first())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_addresses_in_order() {
        let html = r#"<p>Reach Jane at <a href="mailto:Jane@JaneSmith.com">email</a>
            or the office: office@janesmith.com.</p>"#;
        assert_eq!(
            scan_emails(html),
            vec!["Jane@JaneSmith.com", "office@janesmith.com"]
        );
    }

    #[test]
    fn scan_catches_image_names() {
        let html = r#"<img src="/img/logo@2x.png">"#;
        let found = scan_emails(html);
        assert_eq!(found, vec!["logo@2x.png"]);
        assert!(select_best(found).is_none());
    }

    #[test]
    fn mailto_parsing() {
        assert_eq!(
            parse_mailto("mailto:jane@janesmith.com?subject=Hi").as_deref(),
            Some("jane@janesmith.com")
        );
        assert_eq!(
            parse_mailto("MAILTO:Jane@Site.org").as_deref(),
            Some("Jane@Site.org")
        );
        assert!(parse_mailto("mailto:").is_none());
        assert!(parse_mailto("/contact").is_none());
    }

    #[test]
    fn blocked_patterns_case_insensitive() {
        assert!(is_blocked("admin@wixsite.com"));
        assert!(is_blocked("user@EXAMPLE.COM"));
        assert!(is_blocked("me@noreply.site.org"));
        assert!(is_blocked("partner@lawfirm.com"));
        assert!(!is_blocked("jane@janesmith-counseling.com"));
        assert!(!is_blocked("info@example-counseling.com"));
    }

    #[test]
    fn personal_beats_role() {
        let best = select_best(["info@practice.com", "hello@practice.com", "jane@practice.com"]);
        assert_eq!(best.as_deref(), Some("jane@practice.com"));
    }

    #[test]
    fn role_used_when_alone() {
        let best = select_best(["info@practice.com", "contact@practice.com"]);
        assert_eq!(best.as_deref(), Some("info@practice.com"));
    }

    #[test]
    fn builder_address_never_selected() {
        let best = select_best(["admin@wixsite.com", "jane@janesmith-counseling.com"]);
        assert_eq!(best.as_deref(), Some("jane@janesmith-counseling.com"));
        assert!(select_best(["admin@wixsite.com", "noreply@squarespace.com"]).is_none());
    }

    #[test]
    fn dedup_preserves_first_spelling() {
        let filtered = filter_candidates(["Jane@Site.org", "jane@site.org", "bob@site.org"]);
        assert_eq!(filtered, vec!["Jane@Site.org", "bob@site.org"]);
    }

    #[test]
    fn empty_input() {
        assert!(select_best(Vec::<String>::new()).is_none());
    }
}
