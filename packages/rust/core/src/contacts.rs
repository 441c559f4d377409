//! Manual contact operations: adding contacts and approving enriched ones.

use tracing::{info, instrument, warn};

use leadline_shared::{Contact, ContactId, ContactStatus, LeadlineError, Result};
use leadline_storage::Storage;

/// Create a `pending` contact.
#[instrument(skip(storage))]
pub async fn add_contact(storage: &Storage, full_name: &str, city: &str, region: &str) -> Result<Contact> {
    let full_name = full_name.trim();
    if full_name.is_empty() {
        return Err(LeadlineError::validation("contact name must not be empty"));
    }
    let contact = Contact::new(full_name, city.trim(), region.trim());
    storage.insert_contact(&contact).await?;
    info!(contact = %contact.id, "contact added");
    Ok(contact)
}

/// Result of a review pass.
#[derive(Debug, Clone, Default)]
pub struct ReviewReport {
    pub approved: Vec<ContactId>,
    /// Contacts that were not in `enrichment_success`, with their status
    /// (`None` when the id is unknown).
    pub rejected: Vec<(ContactId, Option<ContactStatus>)>,
}

/// Approve reviewed contacts: `enrichment_success -> ready_to_email`.
#[instrument(skip_all, fields(count = ids.len()))]
pub async fn approve_contacts(storage: &Storage, ids: &[ContactId]) -> Result<ReviewReport> {
    let mut report = ReviewReport::default();
    for id in ids {
        let moved = storage
            .transition_status(id, ContactStatus::EnrichmentSuccess, ContactStatus::ReadyToEmail)
            .await?;
        if moved {
            report.approved.push(id.clone());
        } else {
            let current = storage.get_contact(id).await?.map(|c| c.status);
            warn!(contact = %id, status = ?current, "not awaiting review");
            report.rejected.push((id.clone(), current));
        }
    }
    Ok(report)
}

/// Approve every contact awaiting review, oldest first, up to `limit`.
pub async fn approve_all(storage: &Storage, limit: u32) -> Result<ReviewReport> {
    let ids: Vec<ContactId> = storage
        .list_contacts(Some(ContactStatus::EnrichmentSuccess), limit)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();
    approve_contacts(storage, &ids).await
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("leadline_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    #[tokio::test]
    async fn add_trims_and_rejects_empty_names() {
        let storage = test_storage().await;
        let contact = add_contact(&storage, "  Jane Smith ", " Austin", "TX ").await.unwrap();
        assert_eq!(contact.full_name, "Jane Smith");
        assert_eq!(contact.city, "Austin");
        assert_eq!(contact.status, ContactStatus::Pending);

        assert!(add_contact(&storage, "   ", "Austin", "TX").await.is_err());
    }

    #[tokio::test]
    async fn approves_only_enriched_contacts() {
        let storage = test_storage().await;
        let enriched = add_contact(&storage, "Jane Smith", "Austin", "TX").await.unwrap();
        storage
            .record_enrichment_success(&enriched.id, "https://janesmith.com/", "jane@janesmith.com")
            .await
            .unwrap();
        let pending = add_contact(&storage, "Mark Jones", "Austin", "TX").await.unwrap();
        let unknown = ContactId::new();

        let report = approve_contacts(
            &storage,
            &[enriched.id.clone(), pending.id.clone(), unknown.clone()],
        )
        .await
        .unwrap();

        assert_eq!(report.approved, vec![enriched.id.clone()]);
        assert_eq!(
            report.rejected,
            vec![
                (pending.id.clone(), Some(ContactStatus::Pending)),
                (unknown, None)
            ]
        );
        let stored = storage.get_contact(&enriched.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ContactStatus::ReadyToEmail);
    }

    #[tokio::test]
    async fn approve_all_moves_every_enriched_contact() {
        let storage = test_storage().await;
        for (name, email) in [("A", "a@a.example"), ("B", "b@b.example")] {
            let c = add_contact(&storage, name, "Austin", "TX").await.unwrap();
            storage
                .record_enrichment_success(&c.id, "https://x.example/", email)
                .await
                .unwrap();
        }

        let report = approve_all(&storage, 100).await.unwrap();
        assert_eq!(report.approved.len(), 2);
        assert_eq!(storage.contacts_ready_to_send(10).await.unwrap().len(), 2);
    }
}
