//! Inbound mail: the [`Inbox`] seam and its IMAP implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use leadline_shared::{ImapConfig, LeadlineError, Result, Secret};
use tracing::{debug, instrument};

/// Fetches raw RFC 822 messages from one mailbox.
#[async_trait]
pub trait Inbox: Send + Sync {
    /// Messages received on or after `since`, at most the `limit` most recent.
    async fn fetch_since(&self, since: NaiveDate, limit: usize) -> Result<Vec<Vec<u8>>>;
}

/// IMAP search date, e.g. `14-Oct-2025`.
pub fn imap_date(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}

/// The `limit` highest sequence numbers, ascending.
pub fn most_recent(mut ids: Vec<u32>, limit: usize) -> Vec<u32> {
    ids.sort_unstable();
    let skip = ids.len().saturating_sub(limit);
    ids.split_off(skip)
}

// ---------------------------------------------------------------------------
// IMAP
// ---------------------------------------------------------------------------

/// IMAP-over-TLS inbox for one account.
pub struct ImapInbox {
    host: String,
    port: u16,
    username: String,
    password: Secret,
}

impl ImapInbox {
    pub fn new(config: &ImapConfig, username: impl Into<String>, password: Secret) -> Result<Self> {
        if config.host.trim().is_empty() {
            return Err(LeadlineError::config("imap.host is not set"));
        }
        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            username: username.into(),
            password,
        })
    }
}

#[async_trait]
impl Inbox for ImapInbox {
    #[instrument(skip_all, fields(user = %self.username, since = %since))]
    async fn fetch_since(&self, since: NaiveDate, limit: usize) -> Result<Vec<Vec<u8>>> {
        let host = self.host.clone();
        let port = self.port;
        let username = self.username.clone();
        let password = self.password.clone();

        tokio::task::spawn_blocking(move || {
            fetch_blocking(&host, port, &username, &password, since, limit)
        })
        .await
        .map_err(|e| LeadlineError::mail(format!("imap task failed: {e}"), true))?
    }
}

fn fetch_blocking(
    host: &str,
    port: u16,
    username: &str,
    password: &Secret,
    since: NaiveDate,
    limit: usize,
) -> Result<Vec<Vec<u8>>> {
    let imap_err = |stage: &str, e: imap::Error| LeadlineError::mail(format!("imap {stage}: {e}"), true);

    let tls = native_tls::TlsConnector::builder()
        .build()
        .map_err(|e| LeadlineError::mail(format!("tls setup: {e}"), false))?;
    let client = imap::connect((host, port), host, &tls).map_err(|e| imap_err("connect", e))?;
    let mut session = client
        .login(username, password.expose())
        .map_err(|(e, _)| LeadlineError::mail(format!("imap login: {e}"), false))?;

    session.select("INBOX").map_err(|e| imap_err("select", e))?;

    let found = session
        .search(format!("SINCE {}", imap_date(since)))
        .map_err(|e| imap_err("search", e))?;
    let ids = most_recent(found.into_iter().collect(), limit);
    debug!(matched = ids.len(), "imap search done");

    let mut raw = Vec::with_capacity(ids.len());
    if !ids.is_empty() {
        let set = ids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let fetched = session
            .fetch(set, "RFC822")
            .map_err(|e| imap_err("fetch", e))?;
        raw.extend(fetched.iter().filter_map(|m| m.body().map(<[u8]>::to_vec)));
    }

    // Best effort; the messages are already in hand.
    let _ = session.logout();
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_search_date() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 4).unwrap();
        assert_eq!(imap_date(date), "04-Oct-2025");
    }

    #[test]
    fn keeps_highest_ids() {
        assert_eq!(most_recent(vec![9, 2, 7, 5], 2), vec![7, 9]);
        assert_eq!(most_recent(vec![3, 1], 50), vec![1, 3]);
        assert!(most_recent(Vec::new(), 5).is_empty());
    }

    #[test]
    fn requires_host() {
        assert!(ImapInbox::new(&ImapConfig::default(), "u", Secret::new("p")).is_err());
    }
}
