//! libSQL storage layer for contacts, leads, replies, and run cursors.
//!
//! The [`Storage`] struct wraps a libSQL database, either a local file or a
//! hosted (Turso) database reached over the network.
//!
//! **Status rules:**
//! - every status write is a compare-and-set on the current status
//!   (`UPDATE ... WHERE id = ? AND status = ?`), so two concurrent runs cannot
//!   double-transition a contact
//! - an email, once set, is never overwritten
//! - list commands may open the database read-only via [`Storage::open_readonly`];
//!   such a handle never migrates, so callers check [`Storage::is_current`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use leadline_shared::{
    Contact, ContactId, ContactStatus, Lead, LeadlineError, Reply, ReplyKind, Result, Tier,
};
use libsql::{Connection, Database, params};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a local database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LeadlineError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;

        Self::from_database(db, false).await
    }

    /// Connect to a hosted libSQL database in read-write mode.
    pub async fn open_remote(url: &str, auth_token: &str) -> Result<Self> {
        let db = libsql::Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;

        Self::from_database(db, false).await
    }

    /// Open a local database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;

        Self::from_database(db, true).await
    }

    async fn from_database(db: Database, readonly: bool) -> Result<Self> {
        let conn = db
            .connect()
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;

        let storage = Self { db, conn, readonly };
        if !readonly {
            storage.run_migrations().await?;
        }
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        LeadlineError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Whether every known migration has been applied.
    pub async fn is_current(&self) -> bool {
        self.get_schema_version().await >= migrations::latest_version()
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(LeadlineError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Contact operations
    // -----------------------------------------------------------------------

    /// Insert a new contact record.
    pub async fn insert_contact(&self, contact: &Contact) -> Result<()> {
        self.check_writable()?;
        insert_contact_on(&self.conn, contact).await
    }

    /// Get a contact by ID.
    pub async fn get_contact(&self, id: &ContactId) -> Result<Option<Contact>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_contact(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(LeadlineError::Storage(e.to_string())),
        }
    }

    /// Every contact that owns `email` (case-insensitive), oldest first.
    pub async fn find_contacts_by_email(&self, email: &str) -> Result<Vec<Contact>> {
        let rows = self
            .conn
            .query(
                &format!(
                    "SELECT {CONTACT_COLUMNS} FROM contacts
                     WHERE email = ?1 COLLATE NOCASE
                     ORDER BY created_at"
                ),
                params![email.trim()],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;

        collect_contacts(rows).await
    }

    /// List contacts, optionally filtered by status, oldest first.
    pub async fn list_contacts(
        &self,
        status: Option<ContactStatus>,
        limit: u32,
    ) -> Result<Vec<Contact>> {
        let rows = match status {
            Some(status) => {
                self.conn
                    .query(
                        &format!(
                            "SELECT {CONTACT_COLUMNS} FROM contacts
                             WHERE status = ?1 ORDER BY created_at LIMIT ?2"
                        ),
                        params![status.as_str(), limit],
                    )
                    .await
            }
            None => {
                self.conn
                    .query(
                        &format!(
                            "SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY created_at LIMIT ?1"
                        ),
                        params![limit],
                    )
                    .await
            }
        }
        .map_err(|e| LeadlineError::Storage(e.to_string()))?;

        collect_contacts(rows).await
    }

    /// Contacts awaiting enrichment: `pending` with no email.
    ///
    /// Never-attempted contacts come first, then the least recently attempted.
    pub async fn contacts_for_enrichment(&self, limit: u32) -> Result<Vec<Contact>> {
        let rows = self
            .conn
            .query(
                &format!(
                    "SELECT {CONTACT_COLUMNS} FROM contacts
                     WHERE email IS NULL AND status = 'pending'
                     ORDER BY enrichment_attempted_at IS NOT NULL,
                              enrichment_attempted_at,
                              created_at
                     LIMIT ?1"
                ),
                params![limit],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;

        collect_contacts(rows).await
    }

    /// Contacts the sender may pick up: `ready_to_email` with an email and
    /// no permanent send failure.
    ///
    /// Never-attempted contacts come first, then the least recently attempted.
    pub async fn contacts_ready_to_send(&self, limit: u32) -> Result<Vec<Contact>> {
        let rows = self
            .conn
            .query(
                &format!(
                    "SELECT {CONTACT_COLUMNS} FROM contacts
                     WHERE status = 'ready_to_email' AND email IS NOT NULL AND send_failed = 0
                     ORDER BY send_attempted_at IS NOT NULL,
                              send_attempted_at,
                              created_at
                     LIMIT ?1"
                ),
                params![limit],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;

        collect_contacts(rows).await
    }

    /// Record a successful enrichment: `pending -> enrichment_success`.
    ///
    /// The email is written only if the contact has none yet. Returns `false`
    /// when the contact was no longer eligible (status moved or email set).
    pub async fn record_enrichment_success(
        &self,
        id: &ContactId,
        website: &str,
        email: &str,
    ) -> Result<bool> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let affected = self
            .conn
            .execute(
                "UPDATE contacts
                 SET email = ?1, website = ?2, status = 'enrichment_success',
                     enrichment_attempted_at = ?3
                 WHERE id = ?4 AND status = 'pending' AND email IS NULL",
                params![email, website, now.as_str(), id.to_string()],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    /// Record a final enrichment failure: `pending -> enrichment_failed`.
    pub async fn record_enrichment_failure(
        &self,
        id: &ContactId,
        website: Option<&str>,
    ) -> Result<bool> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let affected = self
            .conn
            .execute(
                "UPDATE contacts
                 SET website = COALESCE(?1, website), status = 'enrichment_failed',
                     enrichment_attempted_at = ?2
                 WHERE id = ?3 AND status = 'pending'",
                params![website, now.as_str(), id.to_string()],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    /// Record an attempt that should be retried later; status stays `pending`.
    pub async fn record_enrichment_deferred(&self, id: &ContactId) -> Result<bool> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let affected = self
            .conn
            .execute(
                "UPDATE contacts SET enrichment_attempted_at = ?1
                 WHERE id = ?2 AND status = 'pending'",
                params![now.as_str(), id.to_string()],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    /// Compare-and-set a status change.
    ///
    /// Fails with [`LeadlineError::Transition`] when the workflow does not
    /// allow `from -> to`. Returns `false` when the contact was not in `from`
    /// (or lacks the email the target status requires).
    pub async fn transition_status(
        &self,
        id: &ContactId,
        from: ContactStatus,
        to: ContactStatus,
    ) -> Result<bool> {
        self.check_writable()?;
        if !from.can_transition_to(to) {
            return Err(LeadlineError::Transition { from, to });
        }

        let email_guard = if to.requires_email() {
            " AND email IS NOT NULL"
        } else {
            ""
        };
        let affected = self
            .conn
            .execute(
                &format!("UPDATE contacts SET status = ?1 WHERE id = ?2 AND status = ?3{email_guard}"),
                params![to.as_str(), id.to_string(), from.as_str()],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;

        tracing::debug!(contact = %id, %from, %to, applied = affected > 0, "status transition");
        Ok(affected > 0)
    }

    /// `ready_to_email -> contacted`, stamping `contacted_at`.
    pub async fn mark_contacted(&self, id: &ContactId) -> Result<bool> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let affected = self
            .conn
            .execute(
                "UPDATE contacts SET status = 'contacted', contacted_at = ?1
                 WHERE id = ?2 AND status = 'ready_to_email' AND email IS NOT NULL",
                params![now.as_str(), id.to_string()],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    /// Record a failed send on a `ready_to_email` contact.
    ///
    /// The contact keeps its status. A `permanent` failure also takes it out
    /// of [`Storage::contacts_ready_to_send`].
    pub async fn record_send_failure(&self, id: &ContactId, permanent: bool) -> Result<bool> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let affected = self
            .conn
            .execute(
                "UPDATE contacts SET send_attempted_at = ?1, send_failed = MAX(send_failed, ?2)
                 WHERE id = ?3 AND status = 'ready_to_email'",
                params![now.as_str(), i64::from(permanent), id.to_string()],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    /// Move a contact to `unsubscribed` from whatever state it is in.
    /// Returns `false` if it was already unsubscribed.
    pub async fn unsubscribe(&self, id: &ContactId) -> Result<bool> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute(
                "UPDATE contacts SET status = 'unsubscribed'
                 WHERE id = ?1 AND status != 'unsubscribed'",
                params![id.to_string()],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    /// Unsubscribe every contact that owns `email` (case-insensitive).
    /// Returns the contacts that changed.
    pub async fn unsubscribe_email(&self, email: &str) -> Result<Vec<ContactId>> {
        self.check_writable()?;
        let mut changed = Vec::new();
        for contact in self.find_contacts_by_email(email).await? {
            if self.unsubscribe(&contact.id).await? {
                changed.push(contact.id);
            }
        }
        Ok(changed)
    }

    /// Contact counts per status, in workflow order. Statuses with no contacts are omitted.
    pub async fn count_by_status(&self) -> Result<Vec<(ContactStatus, u64)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT status, COUNT(*) FROM contacts GROUP BY status",
                params![],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;

        let mut counts = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let status: String = row
                .get(0)
                .map_err(|e| LeadlineError::Storage(e.to_string()))?;
            let count: i64 = row
                .get(1)
                .map_err(|e| LeadlineError::Storage(e.to_string()))?;
            counts.push((status.parse::<ContactStatus>()?, count as u64));
        }
        counts.sort_by_key(|(status, _)| {
            ContactStatus::ALL
                .iter()
                .position(|s| s == status)
                .unwrap_or(usize::MAX)
        });
        Ok(counts)
    }

    // -----------------------------------------------------------------------
    // Lead operations
    // -----------------------------------------------------------------------

    /// Insert a lead unless its key is already known. First-seen wins.
    /// Returns `true` if the lead was new.
    pub async fn insert_lead(&self, lead: &Lead) -> Result<bool> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute(
                "INSERT INTO leads (key, name, profile_url, credentials, phone, city, region,
                                    description, is_verified, is_mft, score, tier, target,
                                    first_seen_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                 ON CONFLICT(key) DO NOTHING",
                params![
                    lead.key.as_str(),
                    lead.name.as_str(),
                    lead.profile_url.as_deref(),
                    lead.credentials.as_deref(),
                    lead.phone.as_deref(),
                    lead.city.as_deref(),
                    lead.region.as_deref(),
                    lead.description.as_deref(),
                    i64::from(lead.is_verified),
                    i64::from(lead.is_mft),
                    i64::from(lead.score),
                    lead.tier.as_str(),
                    lead.target.as_str(),
                    lead.first_seen_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    /// Leads at or above `min_score`, best first.
    pub async fn list_leads(&self, min_score: u32, limit: u32) -> Result<Vec<Lead>> {
        let rows = self
            .conn
            .query(
                &format!(
                    "SELECT {LEAD_COLUMNS} FROM leads
                     WHERE score >= ?1 ORDER BY score DESC, first_seen_at LIMIT ?2"
                ),
                params![min_score, limit],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;

        collect_leads(rows).await
    }

    /// Leads at or above `min_score` that have not been turned into contacts yet.
    pub async fn unpromoted_leads(&self, min_score: u32, limit: u32) -> Result<Vec<Lead>> {
        let rows = self
            .conn
            .query(
                &format!(
                    "SELECT {LEAD_COLUMNS} FROM leads
                     WHERE score >= ?1 AND promoted_contact_id IS NULL
                     ORDER BY score DESC, first_seen_at LIMIT ?2"
                ),
                params![min_score, limit],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;

        collect_leads(rows).await
    }

    /// Insert `contact` and link the lead `key` to it, in one transaction.
    ///
    /// Returns `false`, leaving nothing behind, when the lead was already
    /// linked to another contact.
    pub async fn promote_lead(&self, key: &str, contact: &Contact) -> Result<bool> {
        self.check_writable()?;
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;

        insert_contact_on(&tx, contact).await?;
        let affected = tx
            .execute(
                "UPDATE leads SET promoted_contact_id = ?1
                 WHERE key = ?2 AND promoted_contact_id IS NULL",
                params![contact.id.to_string(), key],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;

        if affected == 0 {
            tx.rollback()
                .await
                .map_err(|e| LeadlineError::Storage(e.to_string()))?;
            tracing::debug!(lead = key, "lead already promoted, rolled back");
            return Ok(false);
        }
        tx.commit()
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Reply operations
    // -----------------------------------------------------------------------

    /// Store a reply. Returns `false` if a reply with the same ID was already stored.
    pub async fn insert_reply(&self, reply: &Reply) -> Result<bool> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute(
                "INSERT INTO replies (id, account, from_email, from_name, subject, body_preview,
                                      kind, priority, received_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO NOTHING",
                params![
                    reply.id.as_str(),
                    reply.account.as_str(),
                    reply.from_email.as_str(),
                    reply.from_name.as_str(),
                    reply.subject.as_str(),
                    reply.body_preview.as_str(),
                    reply.kind.as_str(),
                    reply.priority().as_str(),
                    reply.received_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    /// Most recent replies first.
    pub async fn list_replies(&self, limit: u32) -> Result<Vec<Reply>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, account, from_email, from_name, subject, body_preview, kind, received_at
                 FROM replies ORDER BY received_at DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_reply(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Run cursors
    // -----------------------------------------------------------------------

    /// Read a named cursor.
    pub async fn get_cursor(&self, name: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM run_cursors WHERE name = ?1",
                params![name],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value: String = row
                    .get(0)
                    .map_err(|e| LeadlineError::Storage(e.to_string()))?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(LeadlineError::Storage(e.to_string())),
        }
    }

    /// Create or replace a named cursor.
    pub async fn set_cursor(&self, name: &str, value: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO run_cursors (name, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at",
                params![name, value, now.as_str()],
            )
            .await
            .map_err(|e| LeadlineError::Storage(e.to_string()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

const CONTACT_COLUMNS: &str = "id, full_name, city, region, website, email, status, \
                               created_at, enrichment_attempted_at, contacted_at, \
                               send_attempted_at, send_failed";

async fn insert_contact_on(conn: &Connection, contact: &Contact) -> Result<()> {
    conn.execute(
        "INSERT INTO contacts (id, full_name, city, region, website, email, status,
                               created_at, enrichment_attempted_at, contacted_at,
                               send_attempted_at, send_failed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            contact.id.to_string(),
            contact.full_name.as_str(),
            contact.city.as_str(),
            contact.region.as_str(),
            contact.website.as_deref(),
            contact.email.as_deref(),
            contact.status.as_str(),
            contact.created_at.to_rfc3339(),
            contact.enrichment_attempted_at.map(|t| t.to_rfc3339()),
            contact.contacted_at.map(|t| t.to_rfc3339()),
            contact.send_attempted_at.map(|t| t.to_rfc3339()),
            i64::from(contact.send_failed),
        ],
    )
    .await
    .map_err(|e| LeadlineError::Storage(e.to_string()))?;
    Ok(())
}

const LEAD_COLUMNS: &str = "key, name, profile_url, credentials, phone, city, region, \
                            description, is_verified, is_mft, score, tier, target, first_seen_at";

async fn collect_contacts(mut rows: libsql::Rows) -> Result<Vec<Contact>> {
    let mut results = Vec::new();
    while let Ok(Some(row)) = rows.next().await {
        results.push(row_to_contact(&row)?);
    }
    Ok(results)
}

async fn collect_leads(mut rows: libsql::Rows) -> Result<Vec<Lead>> {
    let mut results = Vec::new();
    while let Ok(Some(row)) = rows.next().await {
        results.push(row_to_lead(&row)?);
    }
    Ok(results)
}

fn text(row: &libsql::Row, idx: i32) -> Result<String> {
    row.get::<String>(idx)
        .map_err(|e| LeadlineError::Storage(e.to_string()))
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LeadlineError::Storage(format!("invalid date: {e}")))
}

fn optional_ts(row: &libsql::Row, idx: i32) -> Result<Option<DateTime<Utc>>> {
    row.get::<String>(idx).ok().as_deref().map(parse_ts).transpose()
}

/// Convert a database row to a [`Contact`].
fn row_to_contact(row: &libsql::Row) -> Result<Contact> {
    let id = text(row, 0)?;
    Ok(Contact {
        id: id
            .parse()
            .map_err(|e| LeadlineError::Storage(format!("invalid contact id {id}: {e}")))?,
        full_name: text(row, 1)?,
        city: text(row, 2)?,
        region: text(row, 3)?,
        website: row.get::<String>(4).ok(),
        email: row.get::<String>(5).ok(),
        status: text(row, 6)?.parse()?,
        created_at: parse_ts(&text(row, 7)?)?,
        enrichment_attempted_at: optional_ts(row, 8)?,
        contacted_at: optional_ts(row, 9)?,
        send_attempted_at: optional_ts(row, 10)?,
        send_failed: row.get::<i64>(11).unwrap_or(0) != 0,
    })
}

/// Convert a database row to a [`Lead`].
fn row_to_lead(row: &libsql::Row) -> Result<Lead> {
    let int = |idx: i32| -> Result<i64> {
        row.get::<i64>(idx)
            .map_err(|e| LeadlineError::Storage(e.to_string()))
    };
    Ok(Lead {
        key: text(row, 0)?,
        name: text(row, 1)?,
        profile_url: row.get::<String>(2).ok(),
        credentials: row.get::<String>(3).ok(),
        phone: row.get::<String>(4).ok(),
        city: row.get::<String>(5).ok(),
        region: row.get::<String>(6).ok(),
        description: row.get::<String>(7).ok(),
        is_verified: int(8)? != 0,
        is_mft: int(9)? != 0,
        score: int(10)?.max(0) as u32,
        tier: text(row, 11)?.parse::<Tier>()?,
        target: text(row, 12)?,
        first_seen_at: parse_ts(&text(row, 13)?)?,
    })
}

/// Convert a database row to a [`Reply`].
fn row_to_reply(row: &libsql::Row) -> Result<Reply> {
    Ok(Reply {
        id: text(row, 0)?,
        account: text(row, 1)?,
        from_email: text(row, 2)?,
        from_name: text(row, 3)?,
        subject: text(row, 4)?,
        body_preview: text(row, 5)?,
        kind: text(row, 6)?.parse::<ReplyKind>()?,
        received_at: parse_ts(&text(row, 7)?)?,
    })
}
