//! Core domain types for Leadline: contacts, leads, and inbound replies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LeadlineError;

// ---------------------------------------------------------------------------
// ContactId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for contact identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(pub Uuid);

impl ContactId {
    /// Generate a new time-sortable contact identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ContactId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ContactId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// ContactStatus
// ---------------------------------------------------------------------------

/// Workflow status of a contact.
///
/// ```text
/// pending ─┬─> enrichment_success ──> ready_to_email ──> contacted
///          └─> enrichment_failed
/// (any state except unsubscribed) ──> unsubscribed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    Pending,
    EnrichmentSuccess,
    EnrichmentFailed,
    ReadyToEmail,
    Contacted,
    Unsubscribed,
}

impl ContactStatus {
    pub const ALL: [ContactStatus; 6] = [
        Self::Pending,
        Self::EnrichmentSuccess,
        Self::EnrichmentFailed,
        Self::ReadyToEmail,
        Self::Contacted,
        Self::Unsubscribed,
    ];

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::EnrichmentSuccess => "enrichment_success",
            Self::EnrichmentFailed => "enrichment_failed",
            Self::ReadyToEmail => "ready_to_email",
            Self::Contacted => "contacted",
            Self::Unsubscribed => "unsubscribed",
        }
    }

    /// Terminal states are never picked up again by an automated stage.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::EnrichmentFailed | Self::Contacted | Self::Unsubscribed
        )
    }

    /// Whether the workflow allows moving from `self` to `next`.
    ///
    /// Unsubscribing is an opt-out signal and is accepted from every state
    /// except `unsubscribed` itself, including `contacted` (replies arrive
    /// after contact).
    pub fn can_transition_to(&self, next: ContactStatus) -> bool {
        use ContactStatus::*;
        match (self, next) {
            (Unsubscribed, _) => false,
            (_, Unsubscribed) => true,
            (Pending, EnrichmentSuccess | EnrichmentFailed) => true,
            (EnrichmentSuccess, ReadyToEmail) => true,
            (ReadyToEmail, Contacted) => true,
            _ => false,
        }
    }

    /// Whether a contact in this status must carry an email address.
    pub fn requires_email(&self) -> bool {
        matches!(
            self,
            Self::EnrichmentSuccess | Self::ReadyToEmail | Self::Contacted
        )
    }
}

impl std::fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContactStatus {
    type Err = LeadlineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| LeadlineError::validation(format!("unknown contact status '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

/// A counselor contact moving through the outreach workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub full_name: String,
    pub city: String,
    pub region: String,
    /// Personal or practice website, once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Contact email, set at most once by enrichment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_attempted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contacted_at: Option<DateTime<Utc>>,
    /// Last failed send, if any. Retried contacts queue behind fresh ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_attempted_at: Option<DateTime<Utc>>,
    /// A transport rejected the address for good; the sender skips it.
    #[serde(default)]
    pub send_failed: bool,
}

impl Contact {
    /// A freshly imported contact in `pending`.
    pub fn new(
        full_name: impl Into<String>,
        city: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            id: ContactId::new(),
            full_name: full_name.into(),
            city: city.into(),
            region: region.into(),
            website: None,
            email: None,
            status: ContactStatus::Pending,
            created_at: Utc::now(),
            enrichment_attempted_at: None,
            contacted_at: None,
            send_attempted_at: None,
            send_failed: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Leads
// ---------------------------------------------------------------------------

/// Relevance tier derived from a lead's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    BelowThreshold,
    Potential,
    Probable,
    Confirmed,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Probable => "probable",
            Self::Potential => "potential",
            Self::BelowThreshold => "below_threshold",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = LeadlineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(Self::Confirmed),
            "probable" => Ok(Self::Probable),
            "potential" => Ok(Self::Potential),
            "below_threshold" => Ok(Self::BelowThreshold),
            other => Err(LeadlineError::validation(format!("unknown tier '{other}'"))),
        }
    }
}

/// A scored directory listing retained by prospecting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    /// Dedup key: profile URL, or name when the listing has none.
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_verified: bool,
    pub is_mft: bool,
    pub score: u32,
    pub tier: Tier,
    /// The `region/city` search target the lead was found under.
    pub target: String,
    pub first_seen_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// Classification of an inbound reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Unsubscribe,
    Positive,
    Question,
    Negative,
    General,
}

impl ReplyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unsubscribe => "unsubscribe",
            Self::Positive => "positive",
            Self::Question => "question",
            Self::Negative => "negative",
            Self::General => "general",
        }
    }

    /// Follow-up priority for this kind of reply.
    pub fn priority(&self) -> ReplyPriority {
        match self {
            Self::Unsubscribe => ReplyPriority::Urgent,
            Self::Positive => ReplyPriority::High,
            Self::Question | Self::General => ReplyPriority::Medium,
            Self::Negative => ReplyPriority::Low,
        }
    }
}

impl std::fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReplyKind {
    type Err = LeadlineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unsubscribe" => Ok(Self::Unsubscribe),
            "positive" => Ok(Self::Positive),
            "question" => Ok(Self::Question),
            "negative" => Ok(Self::Negative),
            "general" => Ok(Self::General),
            other => Err(LeadlineError::validation(format!("unknown reply kind '{other}'"))),
        }
    }
}

/// How soon a reply needs a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl ReplyPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for ReplyPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound reply captured by the reply monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: String,
    /// Sending account whose inbox received the reply.
    pub account: String,
    pub from_email: String,
    pub from_name: String,
    pub subject: String,
    /// First 200 characters of the plain-text body, whitespace collapsed.
    pub body_preview: String,
    pub kind: ReplyKind,
    pub received_at: DateTime<Utc>,
}

impl Reply {
    pub fn priority(&self) -> ReplyPriority {
        self.kind.priority()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_id_roundtrip() {
        let id = ContactId::new();
        let parsed: ContactId = id.to_string().parse().expect("parse ContactId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn status_string_roundtrip() {
        for status in ContactStatus::ALL {
            let parsed: ContactStatus = status.as_str().parse().expect("parse status");
            assert_eq!(parsed, status);
        }
        assert!("archived".parse::<ContactStatus>().is_err());
    }

    #[test]
    fn forward_transitions_only() {
        use ContactStatus::*;
        assert!(Pending.can_transition_to(EnrichmentSuccess));
        assert!(Pending.can_transition_to(EnrichmentFailed));
        assert!(EnrichmentSuccess.can_transition_to(ReadyToEmail));
        assert!(ReadyToEmail.can_transition_to(Contacted));

        assert!(!Pending.can_transition_to(Contacted));
        assert!(!Pending.can_transition_to(ReadyToEmail));
        assert!(!EnrichmentSuccess.can_transition_to(Contacted));
        assert!(!EnrichmentFailed.can_transition_to(Pending));
        assert!(!Contacted.can_transition_to(ReadyToEmail));
        assert!(!EnrichmentSuccess.can_transition_to(Pending));
    }

    #[test]
    fn unsubscribe_from_any_other_state() {
        use ContactStatus::*;
        for status in [Pending, EnrichmentSuccess, EnrichmentFailed, ReadyToEmail, Contacted] {
            assert!(status.can_transition_to(Unsubscribed), "{status}");
        }
        for status in ContactStatus::ALL {
            assert!(!Unsubscribed.can_transition_to(status));
        }
    }

    #[test]
    fn terminal_states() {
        assert!(ContactStatus::EnrichmentFailed.is_terminal());
        assert!(ContactStatus::Contacted.is_terminal());
        assert!(ContactStatus::Unsubscribed.is_terminal());
        assert!(!ContactStatus::Pending.is_terminal());
        assert!(!ContactStatus::ReadyToEmail.is_terminal());
    }

    #[test]
    fn reply_priorities() {
        assert_eq!(ReplyKind::Unsubscribe.priority(), ReplyPriority::Urgent);
        assert_eq!(ReplyKind::Positive.priority(), ReplyPriority::High);
        assert_eq!(ReplyKind::Negative.priority(), ReplyPriority::Low);
        assert!(ReplyPriority::Urgent > ReplyPriority::Medium);
    }

    #[test]
    fn contact_serialization() {
        let contact = Contact::new("Jane Smith", "Austin", "TX");
        let json = serde_json::to_string(&contact).expect("serialize");
        assert!(json.contains(r#""status":"pending""#));
        assert!(!json.contains("email"));
        let parsed: Contact = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.full_name, "Jane Smith");
        assert_eq!(parsed.status, ContactStatus::Pending);
    }
}
