//! Reply monitor: fetch new inbox messages per sending account, classify
//! them, store them, and unsubscribe contacts who asked to be removed.

use chrono::{Days, NaiveDate, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use leadline_mailer::{InboundMessage, Inbox, classify_reply, parse_message};
use leadline_shared::{Reply, ReplyKind, Result};
use leadline_storage::Storage;

use crate::progress::ProgressReporter;

/// Cursor date format.
const CURSOR_DATE_FORMAT: &str = "%Y-%m-%d";

/// A sending account's mailbox.
pub struct MonitoredInbox {
    pub account: String,
    pub email: String,
    inbox: Box<dyn Inbox>,
}

impl MonitoredInbox {
    pub fn new(account: impl Into<String>, email: impl Into<String>, inbox: Box<dyn Inbox>) -> Self {
        Self {
            account: account.into(),
            email: email.into(),
            inbox,
        }
    }

    fn cursor_name(&self) -> String {
        format!("inbox:{}", self.account)
    }

    /// Domain whose messages are our own and never count as replies.
    fn own_domain<'a>(&'a self, sender_domain: Option<&'a str>) -> Option<&'a str> {
        sender_domain.or_else(|| self.email.rsplit_once('@').map(|(_, d)| d))
    }
}

/// Per-run options.
#[derive(Debug, Clone)]
pub struct ReplyOptions {
    /// Most recent messages fetched per account.
    pub max_messages: usize,
    /// Overrides each account's own address domain for self-filtering.
    pub sender_domain: Option<String>,
    /// The run date; cursors advance to it.
    pub today: NaiveDate,
}

impl ReplyOptions {
    pub fn new(max_messages: usize, sender_domain: Option<String>) -> Self {
        Self {
            max_messages,
            sender_domain,
            today: Utc::now().date_naive(),
        }
    }
}

/// Counts for one reply check.
#[derive(Debug, Clone, Default)]
pub struct ReplyReport {
    pub accounts_checked: usize,
    pub accounts_failed: usize,
    pub fetched: usize,
    pub own_messages: usize,
    pub unparseable: usize,
    pub duplicates: usize,
    pub unsubscribed: usize,
    /// Newly stored replies, in fetch order.
    pub replies: Vec<Reply>,
}

/// Check every inbox once.
///
/// A failing account is logged and skipped; its cursor does not move, so
/// the same window is fetched again next run.
#[instrument(skip_all, fields(accounts = inboxes.len()))]
pub async fn check_replies(
    storage: &Storage,
    inboxes: &[MonitoredInbox],
    opts: &ReplyOptions,
    progress: &dyn ProgressReporter,
) -> Result<ReplyReport> {
    progress.phase("Checking replies");
    let mut report = ReplyReport::default();

    for (i, mailbox) in inboxes.iter().enumerate() {
        progress.item(&mailbox.account, i + 1, inboxes.len());

        let since = cursor_date(storage, &mailbox.cursor_name(), opts.today).await?;
        let raw_messages = match mailbox.inbox.fetch_since(since, opts.max_messages).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(account = %mailbox.account, error = %e, "inbox check failed");
                report.accounts_failed += 1;
                continue;
            }
        };
        info!(account = %mailbox.account, %since, fetched = raw_messages.len(), "inbox fetched");
        report.fetched += raw_messages.len();

        let own_domain = mailbox.own_domain(opts.sender_domain.as_deref());
        for raw in &raw_messages {
            let message = match parse_message(raw) {
                Ok(message) => message,
                Err(e) => {
                    debug!(error = %e, "skipping unparseable message");
                    report.unparseable += 1;
                    continue;
                }
            };

            if is_own_message(&message, own_domain) {
                report.own_messages += 1;
                continue;
            }

            let reply = to_reply(&mailbox.account, &message);
            if reply.kind == ReplyKind::Unsubscribe {
                report.unsubscribed += unsubscribe_sender(storage, &reply.from_email).await?;
            }

            if storage.insert_reply(&reply).await? {
                info!(
                    account = %mailbox.account,
                    from = %reply.from_email,
                    kind = %reply.kind,
                    priority = %reply.priority(),
                    "reply stored"
                );
                report.replies.push(reply);
            } else {
                report.duplicates += 1;
            }
        }

        storage
            .set_cursor(
                &mailbox.cursor_name(),
                &opts.today.format(CURSOR_DATE_FORMAT).to_string(),
            )
            .await?;
        report.accounts_checked += 1;
    }

    progress.finish(&format!(
        "{} new replies, {} unsubscribed",
        report.replies.len(),
        report.unsubscribed
    ));
    Ok(report)
}

/// Stored cursor date, or the day before `today` when unset or unreadable.
async fn cursor_date(storage: &Storage, name: &str, today: NaiveDate) -> Result<NaiveDate> {
    let fallback = today.checked_sub_days(Days::new(1)).unwrap_or(today);
    Ok(storage
        .get_cursor(name)
        .await?
        .and_then(|raw| NaiveDate::parse_from_str(&raw, CURSOR_DATE_FORMAT).ok())
        .unwrap_or(fallback))
}

fn is_own_message(message: &InboundMessage, own_domain: Option<&str>) -> bool {
    match (message.from_domain(), own_domain) {
        (Some(from), Some(own)) => from.eq_ignore_ascii_case(own),
        _ => false,
    }
}

fn to_reply(account: &str, message: &InboundMessage) -> Reply {
    Reply {
        id: message
            .message_id
            .clone()
            .unwrap_or_else(|| fallback_reply_id(account, message)),
        account: account.to_string(),
        from_email: message.from_email.clone(),
        from_name: message.from_name.clone(),
        subject: message.subject.clone(),
        body_preview: message.preview(),
        kind: classify_reply(&message.body),
        received_at: message.date.unwrap_or_else(Utc::now),
    }
}

/// Stable id for a message without a Message-ID, so a re-fetch of the
/// same message is recognized as a duplicate.
fn fallback_reply_id(account: &str, message: &InboundMessage) -> String {
    let date = message.date.map(|d| d.to_rfc3339()).unwrap_or_default();
    let mut hasher = Sha256::new();
    for part in [
        account,
        message.from_email.as_str(),
        date.as_str(),
        message.subject.as_str(),
        message.body.as_str(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("sha256:{:x}", hasher.finalize())
}

/// Unsubscribe every contact whose email matches. Returns how many changed.
async fn unsubscribe_sender(storage: &Storage, email: &str) -> Result<usize> {
    let changed = storage.unsubscribe_email(email).await?;
    if changed.is_empty() {
        debug!(%email, "unsubscribe matched no subscribed contact");
    }
    for id in &changed {
        info!(contact = %id, %email, "contact unsubscribed");
    }
    Ok(changed.len())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use leadline_shared::{Contact, ContactStatus, LeadlineError};
    use uuid::Uuid;

    use super::*;
    use crate::progress::SilentProgress;

    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("leadline_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    /// Serves fixed messages and records the `since` dates it was asked for.
    struct FakeInbox {
        messages: Vec<Vec<u8>>,
        fail: bool,
        asked: Arc<Mutex<Vec<NaiveDate>>>,
    }

    #[async_trait]
    impl Inbox for FakeInbox {
        async fn fetch_since(&self, since: NaiveDate, limit: usize) -> Result<Vec<Vec<u8>>> {
            self.asked.lock().unwrap().push(since);
            if self.fail {
                return Err(LeadlineError::mail("connection refused", true));
            }
            Ok(self.messages.iter().take(limit).cloned().collect())
        }
    }

    fn raw(from: &str, id: &str, body: &str) -> Vec<u8> {
        format!("From: {from}\r\nSubject: Re: listing\r\nMessage-ID: <{id}>\r\n\r\n{body}\r\n")
            .into_bytes()
    }

    fn mailbox(messages: Vec<Vec<u8>>, fail: bool) -> (MonitoredInbox, Arc<Mutex<Vec<NaiveDate>>>) {
        let asked = Arc::new(Mutex::new(Vec::new()));
        let inbox = FakeInbox {
            messages,
            fail,
            asked: asked.clone(),
        };
        (
            MonitoredInbox::new("lauren", "lauren@directory.example", Box::new(inbox)),
            asked,
        )
    }

    fn opts(today: NaiveDate) -> ReplyOptions {
        ReplyOptions {
            max_messages: 50,
            sender_domain: None,
            today,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn classifies_stores_and_unsubscribes() {
        let storage = test_storage().await;
        let jane = Contact::new("Jane Smith", "Austin", "TX");
        storage.insert_contact(&jane).await.unwrap();
        storage
            .record_enrichment_success(&jane.id, "https://janesmith.com/", "jane@janesmith.com")
            .await
            .unwrap();

        let (inbox, asked) = mailbox(
            vec![
                raw("\"Jane Smith\" <Jane@JaneSmith.com>", "1@janesmith.com", "Please remove me from your list."),
                raw("mark@markjones.example", "2@markjones.example", "Yes, add me!"),
                raw("lauren@directory.example", "3@directory.example", "bounce copy"),
                b"garbage without headers".to_vec(),
            ],
            false,
        );

        let today = date(2025, 10, 14);
        let report = check_replies(&storage, &[inbox], &opts(today), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(asked.lock().unwrap().as_slice(), &[date(2025, 10, 13)]);
        assert_eq!(report.accounts_checked, 1);
        assert_eq!(report.fetched, 4);
        assert_eq!(report.own_messages, 1);
        assert_eq!(report.unparseable, 1);
        assert_eq!(report.replies.len(), 2);
        assert_eq!(report.replies[0].kind, ReplyKind::Unsubscribe);
        assert_eq!(report.replies[1].kind, ReplyKind::Positive);
        assert_eq!(report.unsubscribed, 1);

        let stored = storage.get_contact(&jane.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ContactStatus::Unsubscribed);

        assert_eq!(
            storage.get_cursor("inbox:lauren").await.unwrap().as_deref(),
            Some("2025-10-14")
        );
    }

    #[tokio::test]
    async fn cursor_drives_next_window_and_duplicates_are_ignored() {
        let storage = test_storage().await;
        storage.set_cursor("inbox:lauren", "2025-10-01").await.unwrap();

        let messages = vec![raw("mark@markjones.example", "2@markjones.example", "What does it cost?")];
        let (inbox, asked) = mailbox(messages.clone(), false);
        let today = date(2025, 10, 14);

        let first = check_replies(&storage, &[inbox], &opts(today), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(first.replies.len(), 1);
        assert_eq!(first.replies[0].kind, ReplyKind::Question);
        assert_eq!(asked.lock().unwrap()[0], date(2025, 10, 1));

        let (inbox, _) = mailbox(messages, false);
        let second = check_replies(&storage, &[inbox], &opts(today), &SilentProgress)
            .await
            .unwrap();
        assert!(second.replies.is_empty());
        assert_eq!(second.duplicates, 1);
    }

    #[tokio::test]
    async fn messages_without_id_are_stored_once() {
        let storage = test_storage().await;
        let message = b"From: mark@markjones.example\r\nSubject: Re: listing\r\n\
Date: Tue, 14 Oct 2025 09:30:00 +0000\r\n\r\nTell me more please.\r\n"
            .to_vec();
        let today = date(2025, 10, 14);

        let (inbox, _) = mailbox(vec![message.clone()], false);
        let first = check_replies(&storage, &[inbox], &opts(today), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(first.replies.len(), 1);
        assert!(first.replies[0].id.starts_with("sha256:"));

        let (inbox, _) = mailbox(vec![message], false);
        let second = check_replies(&storage, &[inbox], &opts(today), &SilentProgress)
            .await
            .unwrap();
        assert!(second.replies.is_empty());
        assert_eq!(second.duplicates, 1);
        assert_eq!(storage.list_replies(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unsubscribe_reaches_every_contact_with_the_address() {
        let storage = test_storage().await;
        let mut ids = Vec::new();
        for name in ["Jane Smith", "Jane Smith, LMFT"] {
            let c = Contact::new(name, "Austin", "TX");
            storage.insert_contact(&c).await.unwrap();
            storage
                .record_enrichment_success(&c.id, "https://janesmith.com/", "jane@janesmith.com")
                .await
                .unwrap();
            ids.push(c.id);
        }

        let (inbox, _) = mailbox(
            vec![raw("jane@janesmith.com", "7@janesmith.com", "Please unsubscribe me.")],
            false,
        );
        let report = check_replies(&storage, &[inbox], &opts(date(2025, 10, 14)), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.unsubscribed, 2);
        for id in &ids {
            let c = storage.get_contact(id).await.unwrap().unwrap();
            assert_eq!(c.status, ContactStatus::Unsubscribed);
        }
    }

    #[test]
    fn fallback_id_is_stable_and_content_bound() {
        let message = InboundMessage {
            message_id: None,
            from_email: "mark@markjones.example".into(),
            from_name: "Mark".into(),
            subject: "Re: listing".into(),
            body: "Tell me more".into(),
            date: None,
        };
        let a = fallback_reply_id("lauren", &message);
        assert_eq!(a, fallback_reply_id("lauren", &message));
        assert_ne!(a, fallback_reply_id("mark", &message));

        let other = InboundMessage {
            body: "Not interested".into(),
            ..message
        };
        assert_ne!(a, fallback_reply_id("lauren", &other));
    }

    #[tokio::test]
    async fn failed_account_keeps_cursor() {
        let storage = test_storage().await;
        storage.set_cursor("inbox:lauren", "2025-10-01").await.unwrap();

        let (inbox, _) = mailbox(Vec::new(), true);
        let report = check_replies(&storage, &[inbox], &opts(date(2025, 10, 14)), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.accounts_failed, 1);
        assert_eq!(report.accounts_checked, 0);
        assert_eq!(
            storage.get_cursor("inbox:lauren").await.unwrap().as_deref(),
            Some("2025-10-01")
        );
    }

    #[tokio::test]
    async fn sender_domain_override_filters_own_mail() {
        let storage = test_storage().await;
        let (inbox, _) = mailbox(
            vec![raw("owner@brand.example", "9@brand.example", "internal note")],
            false,
        );
        let options = ReplyOptions {
            sender_domain: Some("brand.example".into()),
            ..opts(date(2025, 10, 14))
        };
        let report = check_replies(&storage, &[inbox], &options, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.own_messages, 1);
        assert!(report.replies.is_empty());
    }
}
