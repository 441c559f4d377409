//! Outbound message types and template rendering.

use leadline_shared::{Contact, OutreachConfig};

/// A plain-text outreach email ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    /// Display name for the From header.
    pub from_name: String,
    /// Sending account address.
    pub from_email: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub reply_to: Option<String>,
}

impl OutboundEmail {
    /// `"Name <address>"`, or the bare address when the name is empty.
    pub fn from_header(&self) -> String {
        if self.from_name.trim().is_empty() {
            self.from_email.clone()
        } else {
            format!("{} <{}>", self.from_name.trim(), self.from_email)
        }
    }
}

/// What the transport reported on acceptance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReceipt {
    /// Provider message ID, when the transport returns one.
    pub id: Option<String>,
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// First name for a greeting: the first word after dropping `Dr.` and commas.
pub fn first_name(full_name: &str) -> String {
    full_name
        .replace("Dr.", "")
        .replace(',', "")
        .split_whitespace()
        .next()
        .unwrap_or("there")
        .to_string()
}

/// Substitute `{first_name}`, `{city}`, and `{from_name}` placeholders.
pub fn render(template: &str, first_name: &str, city: &str, from_name: &str) -> String {
    template
        .replace("{first_name}", first_name)
        .replace("{city}", city)
        .replace("{from_name}", from_name)
}

/// Render the configured subject and body for a contact.
///
/// Returns `None` when the contact has no email.
pub fn compose(config: &OutreachConfig, contact: &Contact, from_email: &str) -> Option<OutboundEmail> {
    let to = contact.email.as_deref()?.trim();
    if to.is_empty() {
        return None;
    }

    let first = first_name(&contact.full_name);
    let city = match contact.city.trim() {
        "" => "your area",
        city => city,
    };

    Some(OutboundEmail {
        from_name: config.from_name.clone(),
        from_email: from_email.to_string(),
        to: to.to_string(),
        subject: render(&config.subject_template, &first, city, &config.from_name),
        body: render(&config.body_template, &first, city, &config.from_name),
        reply_to: config.reply_to.clone(),
    })
}
