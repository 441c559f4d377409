//! Contact-page link discovery on a homepage.

use scraper::{Html, Selector};
use url::Url;

/// Maximum number of contact links taken from a homepage.
pub const MAX_CONTACT_LINKS: usize = 3;

/// Href fragments that mark a link as a likely contact page.
const CONTACT_HINTS: &[&str] = &["contact", "about", "get-in-touch", "reach-us", "mailto:"];

/// A contact link found on a homepage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactLink {
    /// A `mailto:` href, kept verbatim. Never fetched.
    Mailto(String),
    /// A page to fetch, resolved against the homepage URL.
    Page(Url),
}

/// Find up to [`MAX_CONTACT_LINKS`] contact links, in document order.
///
/// Page links are resolved against `base` and must be http(s); fragments are
/// dropped and repeated targets are skipped.
pub fn find_contact_links(html: &str, base: &Url) -> Vec<ContactLink> {
    let doc = Html::parse_document(html);
    let anchor_sel = Selector::parse("a[href]").expect("anchor selector");
    let mut links: Vec<ContactLink> = Vec::new();

    for el in doc.select(&anchor_sel) {
        if links.len() >= MAX_CONTACT_LINKS {
            break;
        }
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        let lower = href.to_ascii_lowercase();
        if !CONTACT_HINTS.iter().any(|hint| lower.contains(hint)) {
            continue;
        }

        let link = if lower.starts_with("mailto:") {
            ContactLink::Mailto(href.to_string())
        } else {
            let Ok(mut resolved) = base.join(href) else {
                continue;
            };
            if !matches!(resolved.scheme(), "http" | "https") {
                continue;
            }
            resolved.set_fragment(None);
            ContactLink::Page(resolved)
        };

        if !links.contains(&link) {
            links.push(link);
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://janesmith.com/").unwrap()
    }

    #[test]
    fn finds_contact_links_in_document_order() {
        let html = r#"<nav>
            <a href="/services">Services</a>
            <a href="/about-jane">About</a>
            <a href="mailto:jane@janesmith.com">Email</a>
            <a href="https://janesmith.com/get-in-touch#form">Get in touch</a>
        </nav>"#;
        let links = find_contact_links(html, &base());
        assert_eq!(
            links,
            vec![
                ContactLink::Page(Url::parse("https://janesmith.com/about-jane").unwrap()),
                ContactLink::Mailto("mailto:jane@janesmith.com".into()),
                ContactLink::Page(Url::parse("https://janesmith.com/get-in-touch").unwrap()),
            ]
        );
    }

    #[test]
    fn caps_at_three() {
        let html = r#"
            <a href="/contact-1">1</a><a href="/contact-2">2</a>
            <a href="/contact-3">3</a><a href="/contact-4">4</a>
            <a href="/contact-5">5</a>"#;
        let links = find_contact_links(html, &base());
        assert_eq!(links.len(), MAX_CONTACT_LINKS);
    }

    #[test]
    fn skips_duplicates_and_non_http() {
        let html = r#"
            <a href="/contact">Contact</a>
            <a href="/contact#top">Contact again</a>
            <a href="javascript:contactForm()">Popup</a>
            <a href="ftp://files.janesmith.com/about">FTP</a>"#;
        let links = find_contact_links(html, &base());
        assert_eq!(
            links,
            vec![ContactLink::Page(Url::parse("https://janesmith.com/contact").unwrap())]
        );
    }

    #[test]
    fn no_hints_no_links() {
        let html = r#"<a href="/services">Services</a><a href="/blog">Blog</a>"#;
        assert!(find_contact_links(html, &base()).is_empty());
    }
}
