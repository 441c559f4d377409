//! Prospecting stage: collect scored directory leads for a target and
//! promote the good ones to `pending` contacts.

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use leadline_listings::{Collection, LeadCollector, StopReason};
use leadline_shared::{Contact, Lead, Result};
use leadline_storage::Storage;

use crate::progress::ProgressReporter;

/// Produces the leads for one (region, city) target.
#[async_trait]
pub trait LeadSource: Send + Sync {
    async fn collect(&self, region: &str, city: &str) -> Result<Collection>;
}

#[async_trait]
impl LeadSource for LeadCollector {
    async fn collect(&self, region: &str, city: &str) -> Result<Collection> {
        LeadCollector::collect(self, region, city).await
    }
}

/// Counts for one prospecting run.
#[derive(Debug, Clone)]
pub struct ProspectReport {
    pub target: String,
    pub collected: usize,
    /// Leads stored for the first time.
    pub inserted: usize,
    /// Leads already known from an earlier run.
    pub known: usize,
    pub pages_read: u32,
    pub stop: StopReason,
}

/// Collect leads for `city` in `region` and store the new ones.
#[instrument(skip_all, fields(region = %region, city = %city))]
pub async fn run_prospecting(
    storage: &Storage,
    source: &dyn LeadSource,
    region: &str,
    city: &str,
    progress: &dyn ProgressReporter,
) -> Result<ProspectReport> {
    progress.phase(&format!("Prospecting {city}, {region}"));
    let collection = source.collect(region, city).await?;

    let mut inserted = 0;
    for (i, lead) in collection.leads.iter().enumerate() {
        progress.item(&lead.name, i + 1, collection.leads.len());
        if storage.insert_lead(lead).await? {
            inserted += 1;
        }
    }

    if let StopReason::Blocked { page } | StopReason::FetchFailed { page, .. } = &collection.stop {
        warn!(page, stop = ?collection.stop, "collection ended early");
    }

    let report = ProspectReport {
        target: collection.target,
        collected: collection.leads.len(),
        inserted,
        known: collection.leads.len() - inserted,
        pages_read: collection.pages_read,
        stop: collection.stop,
    };
    info!(
        target = %report.target,
        collected = report.collected,
        inserted = report.inserted,
        "prospecting finished"
    );
    progress.finish(&format!(
        "{} leads ({} new) from {} pages",
        report.collected, report.inserted, report.pages_read
    ));
    Ok(report)
}

/// Counts for one promotion run.
#[derive(Debug, Clone, Default)]
pub struct PromoteReport {
    pub promoted: Vec<Contact>,
    /// Leads another run linked first.
    pub skipped: usize,
}

/// Turn unpromoted leads scoring at least `min_score` into `pending`
/// contacts, best score first.
///
/// Each contact is created in the same transaction that links its lead, so
/// a lead promoted by a concurrent run leaves no extra contact behind.
#[instrument(skip(storage))]
pub async fn promote_leads(storage: &Storage, min_score: u32, limit: u32) -> Result<PromoteReport> {
    let leads = storage.unpromoted_leads(min_score, limit).await?;
    let mut report = PromoteReport::default();

    for lead in &leads {
        let contact = contact_for(lead);
        if !storage.promote_lead(&lead.key, &contact).await? {
            warn!(lead = %lead.key, "lead was promoted concurrently");
            report.skipped += 1;
            continue;
        }
        info!(lead = %lead.key, contact = %contact.id, score = lead.score, "lead promoted");
        report.promoted.push(contact);
    }
    Ok(report)
}

fn contact_for(lead: &Lead) -> Contact {
    let region = lead
        .region
        .clone()
        .or_else(|| lead.target.split('/').next().map(String::from))
        .unwrap_or_default();
    Contact::new(
        lead.name.clone(),
        lead.city.clone().unwrap_or_default(),
        region,
    )
}
