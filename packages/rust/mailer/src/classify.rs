//! Keyword classification of inbound replies.

use leadline_shared::ReplyKind;

const UNSUBSCRIBE_KEYWORDS: &[&str] = &[
    "unsubscribe",
    "remove me",
    "take me off",
    "stop emailing",
    "not interested",
    "remove from list",
    "opt out",
];

const POSITIVE_KEYWORDS: &[&str] = &[
    "interested",
    "yes",
    "sounds good",
    "tell me more",
    "how do i",
    "sign up",
    "join",
    "add me",
    "listing",
];

const QUESTION_KEYWORDS: &[&str] = &["how", "what", "when", "where", "why", "?"];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "no thank",
    "already have",
    "not looking",
    "not needed",
    "pass",
    "decline",
];

/// Classify a reply body. Checks run in a fixed order and the first hit wins,
/// so "not interested" is an unsubscribe, never a positive.
pub fn classify_reply(body: &str) -> ReplyKind {
    let lower = body.to_lowercase();
    let hit = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if hit(UNSUBSCRIBE_KEYWORDS) {
        ReplyKind::Unsubscribe
    } else if hit(POSITIVE_KEYWORDS) {
        ReplyKind::Positive
    } else if hit(QUESTION_KEYWORDS) {
        ReplyKind::Question
    } else if hit(NEGATIVE_KEYWORDS) {
        ReplyKind::Negative
    } else {
        ReplyKind::General
    }
}
