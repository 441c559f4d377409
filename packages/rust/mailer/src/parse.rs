//! Raw RFC 822 message parsing for the reply monitor.

use chrono::{DateTime, Utc};
use leadline_shared::{LeadlineError, Result};
use mailparse::{MailAddr, MailHeaderMap, ParsedMail};

/// Maximum characters kept in a reply preview.
pub const PREVIEW_CHARS: usize = 200;

/// The fields of an inbound message the reply monitor needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub message_id: Option<String>,
    /// Bare sender address, lower-cased.
    pub from_email: String,
    /// Display name, or the address when the header has none.
    pub from_name: String,
    pub subject: String,
    /// Plain-text body with whitespace collapsed.
    pub body: String,
    pub date: Option<DateTime<Utc>>,
}

impl InboundMessage {
    /// Domain part of the sender address.
    pub fn from_domain(&self) -> Option<&str> {
        self.from_email.rsplit_once('@').map(|(_, domain)| domain)
    }

    /// First [`PREVIEW_CHARS`] characters of the body.
    pub fn preview(&self) -> String {
        self.body.chars().take(PREVIEW_CHARS).collect()
    }
}

/// Parse a raw message fetched from the mailbox.
pub fn parse_message(raw: &[u8]) -> Result<InboundMessage> {
    let mail = mailparse::parse_mail(raw)
        .map_err(|e| LeadlineError::parse(format!("malformed message: {e}")))?;

    let from_header = mail.headers.get_first_value("From").unwrap_or_default();
    let (from_email, from_name) = split_sender(&from_header);
    if from_email.is_empty() {
        return Err(LeadlineError::parse("message has no sender address"));
    }

    let message_id = mail
        .headers
        .get_first_value("Message-ID")
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());

    let date = mail
        .headers
        .get_first_value("Date")
        .and_then(|raw| mailparse::dateparse(&raw).ok())
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0));

    Ok(InboundMessage {
        message_id,
        from_email,
        from_name,
        subject: mail
            .headers
            .get_first_value("Subject")
            .unwrap_or_default()
            .trim()
            .to_string(),
        body: collapse_whitespace(&plain_body(&mail)),
        date,
    })
}

/// `(address, display name)` from a From header value.
fn split_sender(header: &str) -> (String, String) {
    let single = mailparse::addrparse(header)
        .ok()
        .and_then(|list| {
            list.iter().find_map(|addr| match addr {
                MailAddr::Single(info) => Some(info.clone()),
                MailAddr::Group(group) => group.addrs.first().cloned(),
            })
        });

    match single {
        Some(info) => {
            let email = info.addr.trim().to_lowercase();
            let name = info
                .display_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| email.clone());
            (email, name)
        }
        None => {
            let email = header.trim().to_lowercase();
            (email.clone(), email)
        }
    }
}

/// First `text/plain` part, or the body of a single-part message.
fn plain_body(mail: &ParsedMail<'_>) -> String {
    if mail.subparts.is_empty() {
        return mail.get_body().unwrap_or_default();
    }
    find_plain(mail).unwrap_or_default()
}

fn find_plain(part: &ParsedMail<'_>) -> Option<String> {
    if part.subparts.is_empty() {
        return part
            .ctype
            .mimetype
            .eq_ignore_ascii_case("text/plain")
            .then(|| part.get_body().ok())
            .flatten();
    }
    part.subparts.iter().find_map(find_plain)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
