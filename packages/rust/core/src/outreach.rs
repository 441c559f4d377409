//! Outreach stage: send the templated email to every `ready_to_email`
//! contact, rotating sending accounts and pacing sends.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{info, instrument, warn};

use leadline_mailer::{Mailer, OutboundEmail, compose};
use leadline_shared::{Attempt, LeadlineError, OutreachConfig, Result};
use leadline_storage::Storage;

use crate::progress::ProgressReporter;

/// A sending account and the transport that sends as it.
pub struct Sender {
    pub name: String,
    pub email: String,
    mailer: Option<Arc<dyn Mailer>>,
}

impl Sender {
    pub fn new(name: impl Into<String>, email: impl Into<String>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            mailer: Some(mailer),
        }
    }

    /// An account identity for dry runs; it cannot send.
    pub fn preview_only(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            mailer: None,
        }
    }

    pub fn can_send(&self) -> bool {
        self.mailer.is_some()
    }
}

/// Per-run options.
#[derive(Debug, Clone)]
pub struct OutreachOptions {
    /// Maximum contacts picked up this run.
    pub limit: u32,
    /// Render only; no sends, no status changes, no pauses.
    pub dry_run: bool,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl OutreachOptions {
    pub fn from_config(config: &OutreachConfig, limit: u32, dry_run: bool) -> Self {
        Self {
            limit,
            dry_run,
            min_delay: Duration::from_secs(config.min_delay_secs),
            max_delay: Duration::from_secs(config.max_delay_secs),
        }
    }
}

/// One rendered message, reported for dry runs and sends alike.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub account: String,
    pub email: OutboundEmail,
}

/// Counts for one outreach run.
#[derive(Debug, Clone, Default)]
pub struct OutreachReport {
    pub selected: usize,
    pub sent: usize,
    pub failed: usize,
    /// Failures the transport reported as permanent; those contacts are not
    /// selected again.
    pub undeliverable: usize,
    /// Contacts whose status changed underneath this run.
    pub skipped: usize,
    pub messages: Vec<SentMessage>,
}

/// Uniform random pause in `[min, max]`.
pub fn pacing_delay(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let millis = rand::thread_rng().gen_range(min.as_millis()..=max.as_millis());
    Duration::from_millis(millis as u64)
}

/// Send to up to `opts.limit` ready contacts.
///
/// Accounts rotate round-robin by position in the batch, so a failed send
/// still advances the rotation. A failed send leaves the contact
/// `ready_to_email` and queues it behind never-attempted contacts; a
/// permanent failure removes it from the send queue.
#[instrument(skip_all, fields(limit = opts.limit, dry_run = opts.dry_run))]
pub async fn run_outreach(
    storage: &Storage,
    config: &OutreachConfig,
    senders: &[Sender],
    opts: &OutreachOptions,
    progress: &dyn ProgressReporter,
) -> Result<OutreachReport> {
    if senders.is_empty() {
        return Err(LeadlineError::config("no sending accounts configured"));
    }
    if !opts.dry_run && !senders.iter().all(Sender::can_send) {
        return Err(LeadlineError::config("sending accounts have no transport"));
    }

    progress.phase(if opts.dry_run {
        "Previewing outreach"
    } else {
        "Sending outreach"
    });
    let batch = storage.contacts_ready_to_send(opts.limit).await?;
    let mut report = OutreachReport {
        selected: batch.len(),
        ..OutreachReport::default()
    };
    info!(selected = batch.len(), accounts = senders.len(), "outreach batch loaded");

    for (i, contact) in batch.iter().enumerate() {
        let sender = &senders[i % senders.len()];
        progress.item(&contact.full_name, i + 1, batch.len());

        let Some(email) = compose(config, contact, &sender.email) else {
            warn!(contact = %contact.id, "ready contact has no email, skipping");
            report.skipped += 1;
            continue;
        };

        let Some(mailer) = sender.mailer.as_ref().filter(|_| !opts.dry_run) else {
            report.messages.push(SentMessage {
                account: sender.name.clone(),
                email,
            });
            continue;
        };

        match mailer.send(&email).await {
            Attempt::Ok(receipt) => {
                if storage.mark_contacted(&contact.id).await? {
                    info!(contact = %contact.id, account = %sender.name, id = ?receipt.id, "sent");
                    report.sent += 1;
                } else {
                    warn!(contact = %contact.id, "sent but contact was no longer ready_to_email");
                    report.skipped += 1;
                }
                report.messages.push(SentMessage {
                    account: sender.name.clone(),
                    email,
                });
            }
            Attempt::Retryable(e) => {
                warn!(contact = %contact.id, account = %sender.name, error = %e, "send failed, will retry");
                storage.record_send_failure(&contact.id, false).await?;
                report.failed += 1;
            }
            Attempt::Permanent(e) => {
                warn!(contact = %contact.id, account = %sender.name, error = %e, "address rejected");
                storage.record_send_failure(&contact.id, true).await?;
                report.failed += 1;
                report.undeliverable += 1;
            }
        }

        if i + 1 < batch.len() {
            let pause = pacing_delay(opts.min_delay, opts.max_delay);
            info!(seconds = pause.as_secs(), "pausing before next send");
            tokio::time::sleep(pause).await;
        }
    }

    info!(
        sent = report.sent,
        failed = report.failed,
        skipped = report.skipped,
        "outreach finished"
    );
    progress.finish(&format!(
        "{} sent, {} failed, {} previewed",
        report.sent,
        report.failed,
        if opts.dry_run { report.messages.len() } else { 0 }
    ));
    Ok(report)
}
