//! Enrichment stage: resolve each pending contact's website, extract the
//! best contact email from it, and record the outcome.
//!
//! Outcome to status mapping:
//!
//! | resolver / extractor             | status               |
//! |----------------------------------|----------------------|
//! | email found                      | `enrichment_success` |
//! | no website, or no email on it    | `enrichment_failed`  |
//! | permanent failure                | `enrichment_failed`  |
//! | retryable failure                | stays `pending`      |

use async_trait::async_trait;
use tracing::{info, instrument, warn};
use url::Url;

use leadline_crawler::EmailExtractor;
use leadline_discovery::WebsiteResolver;
use leadline_shared::{Attempt, Contact, Result};
use leadline_storage::Storage;

use crate::progress::ProgressReporter;

// ---------------------------------------------------------------------------
// Lookup seams
// ---------------------------------------------------------------------------

/// Finds a contact's own website.
#[async_trait]
pub trait WebsiteLookup: Send + Sync {
    async fn find_website(&self, contact: &Contact) -> Attempt<Option<Url>>;
}

/// Finds the best contact email on a website.
#[async_trait]
pub trait EmailLookup: Send + Sync {
    async fn find_email(&self, website: &Url) -> Attempt<Option<String>>;
}

#[async_trait]
impl WebsiteLookup for WebsiteResolver {
    async fn find_website(&self, contact: &Contact) -> Attempt<Option<Url>> {
        self.resolve(&contact.full_name, &contact.city, &contact.region)
            .await
    }
}

#[async_trait]
impl EmailLookup for EmailExtractor {
    async fn find_email(&self, website: &Url) -> Attempt<Option<String>> {
        self.extract(website).await
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// What happened to one contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    Enriched { website: String, email: String },
    NoWebsite,
    NoEmail { website: String },
    Failed { website: Option<String>, reason: String },
    Deferred { reason: String },
}

/// Counts for one enrichment run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub selected: usize,
    pub enriched: usize,
    pub failed: usize,
    pub deferred: usize,
    /// Contacts whose status changed underneath this run.
    pub skipped: usize,
}

/// Enrich up to `batch_size` pending contacts, one at a time.
///
/// Each result is persisted before the next contact is touched.
#[instrument(skip_all, fields(batch_size = batch_size))]
pub async fn run_enrichment(
    storage: &Storage,
    websites: &dyn WebsiteLookup,
    emails: &dyn EmailLookup,
    batch_size: u32,
    progress: &dyn ProgressReporter,
) -> Result<EnrichmentReport> {
    progress.phase("Enriching contacts");
    let batch = storage.contacts_for_enrichment(batch_size).await?;
    let mut report = EnrichmentReport {
        selected: batch.len(),
        ..EnrichmentReport::default()
    };
    info!(selected = batch.len(), "enrichment batch loaded");

    for (i, contact) in batch.iter().enumerate() {
        progress.item(&contact.full_name, i + 1, batch.len());
        let outcome = enrich_one(contact, websites, emails).await;

        let applied = match &outcome {
            EnrichmentOutcome::Enriched { website, email } => {
                storage
                    .record_enrichment_success(&contact.id, website, email)
                    .await?
            }
            EnrichmentOutcome::NoWebsite => {
                storage.record_enrichment_failure(&contact.id, None).await?
            }
            EnrichmentOutcome::NoEmail { website } => {
                storage
                    .record_enrichment_failure(&contact.id, Some(website.as_str()))
                    .await?
            }
            EnrichmentOutcome::Failed { website, reason } => {
                warn!(contact = %contact.id, %reason, "permanent enrichment failure");
                storage
                    .record_enrichment_failure(&contact.id, website.as_deref())
                    .await?
            }
            EnrichmentOutcome::Deferred { reason } => {
                warn!(contact = %contact.id, %reason, "enrichment deferred");
                storage.record_enrichment_deferred(&contact.id).await?
            }
        };

        if !applied {
            warn!(contact = %contact.id, "contact no longer pending, result not recorded");
            report.skipped += 1;
            continue;
        }
        match outcome {
            EnrichmentOutcome::Enriched { .. } => report.enriched += 1,
            EnrichmentOutcome::Deferred { .. } => report.deferred += 1,
            _ => report.failed += 1,
        }
    }

    info!(
        enriched = report.enriched,
        failed = report.failed,
        deferred = report.deferred,
        skipped = report.skipped,
        "enrichment finished"
    );
    progress.finish(&format!(
        "{} enriched, {} failed, {} deferred",
        report.enriched, report.failed, report.deferred
    ));
    Ok(report)
}

/// Resolve and extract for one contact. The extractor only runs when a
/// website was found.
pub async fn enrich_one(
    contact: &Contact,
    websites: &dyn WebsiteLookup,
    emails: &dyn EmailLookup,
) -> EnrichmentOutcome {
    let website = match websites.find_website(contact).await {
        Attempt::Ok(Some(url)) => url,
        Attempt::Ok(None) => return EnrichmentOutcome::NoWebsite,
        Attempt::Retryable(e) => {
            return EnrichmentOutcome::Deferred {
                reason: e.to_string(),
            };
        }
        Attempt::Permanent(e) => {
            return EnrichmentOutcome::Failed {
                website: None,
                reason: e.to_string(),
            };
        }
    };

    match emails.find_email(&website).await {
        Attempt::Ok(Some(email)) => EnrichmentOutcome::Enriched {
            website: website.to_string(),
            email,
        },
        Attempt::Ok(None) => EnrichmentOutcome::NoEmail {
            website: website.to_string(),
        },
        Attempt::Retryable(e) => EnrichmentOutcome::Deferred {
            reason: e.to_string(),
        },
        Attempt::Permanent(e) => EnrichmentOutcome::Failed {
            website: Some(website.to_string()),
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::progress::SilentProgress;
    use leadline_shared::{ContactStatus, LeadlineError};
    use uuid::Uuid;

    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("leadline_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    /// Scripted resolver keyed by contact name.
    #[derive(Default)]
    struct FakeWebsites {
        results: HashMap<String, fn() -> Attempt<Option<Url>>>,
    }

    impl FakeWebsites {
        fn with(mut self, name: &str, result: fn() -> Attempt<Option<Url>>) -> Self {
            self.results.insert(name.into(), result);
            self
        }
    }

    #[async_trait]
    impl WebsiteLookup for FakeWebsites {
        async fn find_website(&self, contact: &Contact) -> Attempt<Option<Url>> {
            match self.results.get(&contact.full_name) {
                Some(result) => result(),
                None => Attempt::Ok(None),
            }
        }
    }

    /// Scripted extractor keyed by host; records every call.
    #[derive(Default)]
    struct FakeEmails {
        results: HashMap<String, fn() -> Attempt<Option<String>>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeEmails {
        fn with(mut self, host: &str, result: fn() -> Attempt<Option<String>>) -> Self {
            self.results.insert(host.into(), result);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EmailLookup for FakeEmails {
        async fn find_email(&self, website: &Url) -> Attempt<Option<String>> {
            let host = website.host_str().unwrap_or_default().to_string();
            self.calls.lock().unwrap().push(host.clone());
            match self.results.get(&host) {
                Some(result) => result(),
                None => Attempt::Ok(None),
            }
        }
    }

    fn site(host: &str) -> Attempt<Option<Url>> {
        Attempt::Ok(Some(Url::parse(&format!("https://{host}/")).unwrap()))
    }

    async fn seeded(storage: &Storage, name: &str) -> Contact {
        let contact = Contact::new(name, "Austin", "TX");
        storage.insert_contact(&contact).await.unwrap();
        contact
    }

    async fn status_of(storage: &Storage, contact: &Contact) -> Contact {
        storage.get_contact(&contact.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn success_records_email_and_website() {
        let storage = test_storage().await;
        let jane = seeded(&storage, "Jane Smith").await;

        let websites = FakeWebsites::default().with("Jane Smith", || site("janesmith.com"));
        let emails = FakeEmails::default()
            .with("janesmith.com", || Attempt::Ok(Some("jane@janesmith.com".into())));

        let report = run_enrichment(&storage, &websites, &emails, 75, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.selected, 1);
        assert_eq!(report.enriched, 1);

        let stored = status_of(&storage, &jane).await;
        assert_eq!(stored.status, ContactStatus::EnrichmentSuccess);
        assert_eq!(stored.email.as_deref(), Some("jane@janesmith.com"));
        assert_eq!(stored.website.as_deref(), Some("https://janesmith.com/"));
        assert!(stored.enrichment_attempted_at.is_some());
    }

    #[tokio::test]
    async fn no_website_skips_extractor_and_fails() {
        let storage = test_storage().await;
        let mark = seeded(&storage, "Mark Jones").await;

        let emails = FakeEmails::default();
        let report = run_enrichment(&storage, &FakeWebsites::default(), &emails, 75, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert!(emails.calls().is_empty());
        let stored = status_of(&storage, &mark).await;
        assert_eq!(stored.status, ContactStatus::EnrichmentFailed);
        assert!(stored.email.is_none());
    }

    #[tokio::test]
    async fn retryable_failure_stays_pending() {
        let storage = test_storage().await;
        let ruth = seeded(&storage, "Ruth Lee").await;

        let websites = FakeWebsites::default().with("Ruth Lee", || {
            Attempt::failed(LeadlineError::http(429, "https://search.example"))
        });
        let report = run_enrichment(&storage, &websites, &FakeEmails::default(), 75, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.deferred, 1);
        let stored = status_of(&storage, &ruth).await;
        assert_eq!(stored.status, ContactStatus::Pending);
        assert!(stored.enrichment_attempted_at.is_some());

        // Still selectable next run.
        let again = storage.contacts_for_enrichment(75).await.unwrap();
        assert_eq!(again.len(), 1);
    }

    #[tokio::test]
    async fn extractor_failures_map_by_tag() {
        let storage = test_storage().await;
        let down = seeded(&storage, "Down Site").await;
        let gone = seeded(&storage, "Gone Site").await;
        let empty = seeded(&storage, "Empty Site").await;

        let websites = FakeWebsites::default()
            .with("Down Site", || site("down.example"))
            .with("Gone Site", || site("gone.example"))
            .with("Empty Site", || site("empty.example"));
        let emails = FakeEmails::default()
            .with("down.example", || {
                Attempt::failed(LeadlineError::http(503, "https://down.example/"))
            })
            .with("gone.example", || {
                Attempt::failed(LeadlineError::http(404, "https://gone.example/"))
            });

        let report = run_enrichment(&storage, &websites, &emails, 75, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.deferred, 1);
        assert_eq!(report.failed, 2);

        assert_eq!(status_of(&storage, &down).await.status, ContactStatus::Pending);
        let gone = status_of(&storage, &gone).await;
        assert_eq!(gone.status, ContactStatus::EnrichmentFailed);
        assert_eq!(gone.website.as_deref(), Some("https://gone.example/"));
        assert_eq!(
            status_of(&storage, &empty).await.status,
            ContactStatus::EnrichmentFailed
        );
    }

    #[tokio::test]
    async fn respects_batch_size() {
        let storage = test_storage().await;
        for i in 0..3 {
            seeded(&storage, &format!("Counselor {i}")).await;
        }

        let report = run_enrichment(
            &storage,
            &FakeWebsites::default(),
            &FakeEmails::default(),
            2,
            &SilentProgress,
        )
        .await
        .unwrap();
        assert_eq!(report.selected, 2);
        assert_eq!(storage.contacts_for_enrichment(75).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn enrich_one_permanent_resolver_failure() {
        let contact = Contact::new("Jane", "Austin", "TX");
        let websites = FakeWebsites::default().with("Jane", || {
            Attempt::failed(LeadlineError::http(403, "https://search.example"))
        });
        let outcome = enrich_one(&contact, &websites, &FakeEmails::default()).await;
        assert!(matches!(outcome, EnrichmentOutcome::Failed { website: None, .. }));
    }
}
