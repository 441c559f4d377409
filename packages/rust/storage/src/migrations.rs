//! SQL migration definitions for the Leadline database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// Version of the newest migration.
pub(crate) fn latest_version() -> u32 {
    all_migrations().last().map(|m| m.version).unwrap_or(0)
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: contacts, leads, replies, run_cursors",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Contacts moving through the outreach workflow
CREATE TABLE IF NOT EXISTS contacts (
    id                      TEXT PRIMARY KEY,
    full_name               TEXT NOT NULL,
    city                    TEXT NOT NULL,
    region                  TEXT NOT NULL,
    website                 TEXT,
    email                   TEXT,
    status                  TEXT NOT NULL DEFAULT 'pending',
    created_at              TEXT NOT NULL,
    enrichment_attempted_at TEXT,
    contacted_at            TEXT,
    CHECK (status NOT IN ('enrichment_success', 'ready_to_email', 'contacted') OR email IS NOT NULL)
);

CREATE INDEX IF NOT EXISTS idx_contacts_status ON contacts(status);
CREATE INDEX IF NOT EXISTS idx_contacts_email ON contacts(email COLLATE NOCASE);

-- Scored directory listings
CREATE TABLE IF NOT EXISTS leads (
    key                 TEXT PRIMARY KEY,
    name                TEXT NOT NULL,
    profile_url         TEXT,
    credentials         TEXT,
    phone               TEXT,
    city                TEXT,
    region              TEXT,
    description         TEXT,
    is_verified         INTEGER NOT NULL DEFAULT 0,
    is_mft              INTEGER NOT NULL DEFAULT 0,
    score               INTEGER NOT NULL,
    tier                TEXT NOT NULL,
    target              TEXT NOT NULL,
    first_seen_at       TEXT NOT NULL,
    promoted_contact_id TEXT REFERENCES contacts(id)
);

CREATE INDEX IF NOT EXISTS idx_leads_score ON leads(score DESC);

-- Inbound replies captured by the reply monitor
CREATE TABLE IF NOT EXISTS replies (
    id           TEXT PRIMARY KEY,
    account      TEXT NOT NULL,
    from_email   TEXT NOT NULL,
    from_name    TEXT NOT NULL,
    subject      TEXT NOT NULL,
    body_preview TEXT NOT NULL,
    kind         TEXT NOT NULL,
    priority     TEXT NOT NULL,
    received_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_replies_received ON replies(received_at DESC);

-- Durable named progress markers (e.g. last inbox check per account)
CREATE TABLE IF NOT EXISTS run_cursors (
    name       TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Send attempt tracking on contacts",
            sql: r#"
ALTER TABLE contacts ADD COLUMN send_attempted_at TEXT;
ALTER TABLE contacts ADD COLUMN send_failed INTEGER NOT NULL DEFAULT 0;

CREATE INDEX IF NOT EXISTS idx_contacts_send ON contacts(status, send_failed);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
