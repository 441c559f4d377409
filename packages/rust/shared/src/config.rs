//! Application configuration for Leadline.
//!
//! User config lives at `~/.leadline/leadline.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets are never stored here: every secret is referenced by the name of
//! the environment variable that holds it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LeadlineError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadline.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadline";

// ---------------------------------------------------------------------------
// Config structs (matching leadline.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Hosted database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Website search API.
    #[serde(default)]
    pub search: SearchConfig,

    /// Outreach sending behaviour.
    #[serde(default)]
    pub outreach: OutreachConfig,

    /// SMTP transport.
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Resend transactional API transport.
    #[serde(default)]
    pub resend: ResendConfig,

    /// Inbox access for reply monitoring.
    #[serde(default)]
    pub imap: ImapConfig,

    /// Directory prospecting.
    #[serde(default)]
    pub prospecting: ProspectingConfig,

    /// Sending accounts, rotated round-robin.
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Contacts processed per enrichment or send run.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Local database file, used when no remote URL is configured.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            database_path: default_database_path(),
        }
    }
}

fn default_batch_size() -> u32 {
    75
}
fn default_database_path() -> String {
    "~/.leadline/leadline.db".into()
}

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Remote libSQL URL (e.g. `libsql://leads-acme.turso.io`). Local file when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,

    /// Name of the env var holding the remote auth token.
    #[serde(default = "default_db_token_env")]
    pub auth_token_env: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            auth_token_env: default_db_token_env(),
        }
    }
}

fn default_db_token_env() -> String {
    "LEADLINE_DB_TOKEN".into()
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search endpoint (Serper-compatible JSON API).
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Result-count hint sent with each query.
    #[serde(default = "default_result_count")]
    pub result_count: u32,

    /// Directory/aggregator domains excluded with `-site:` filters.
    #[serde(default = "default_excluded_sites")]
    pub excluded_sites: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            api_key_env: default_search_key_env(),
            result_count: default_result_count(),
            excluded_sites: default_excluded_sites(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://google.serper.dev/search".into()
}
fn default_search_key_env() -> String {
    "SERPER_API_KEY".into()
}
fn default_result_count() -> u32 {
    3
}
fn default_excluded_sites() -> Vec<String> {
    ["psychologytoday.com", "healthgrades.com", "yelp.com", "facebook.com"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Which outbound transport to send through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Smtp,
    Resend,
}

/// `[outreach]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachConfig {
    /// Outbound transport.
    #[serde(default = "default_transport")]
    pub transport: TransportKind,

    /// Display name used in the From header and `{from_name}` placeholder.
    #[serde(default = "default_from_name")]
    pub from_name: String,

    /// Reply-To address for every message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,

    /// Domain whose inbound messages are ignored by the reply monitor.
    /// Falls back to each account's own address domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_domain: Option<String>,

    /// Minimum pause between two sends, in seconds.
    #[serde(default = "default_min_delay")]
    pub min_delay_secs: u64,

    /// Maximum pause between two sends, in seconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: u64,

    /// Subject template (`{first_name}`, `{city}`, `{from_name}`).
    #[serde(default = "default_subject_template")]
    pub subject_template: String,

    /// Plain-text body template (`{first_name}`, `{city}`, `{from_name}`).
    #[serde(default = "default_body_template")]
    pub body_template: String,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            from_name: default_from_name(),
            reply_to: None,
            sender_domain: None,
            min_delay_secs: default_min_delay(),
            max_delay_secs: default_max_delay(),
            subject_template: default_subject_template(),
            body_template: default_body_template(),
        }
    }
}

fn default_transport() -> TransportKind {
    TransportKind::Smtp
}
fn default_from_name() -> String {
    "Counselor Directory".into()
}
fn default_min_delay() -> u64 {
    30
}
fn default_max_delay() -> u64 {
    90
}
fn default_subject_template() -> String {
    "Free directory listing for {city} premarital counselors".into()
}
fn default_body_template() -> String {
    "Hi {first_name},\n\n\
     I came across your practice while looking into premarital counseling in {city}. \
     We run a directory that helps engaged couples find counselors, and we would like \
     to offer you a free listing: a profile page, a link to your website, and no fees \
     or contracts.\n\n\
     Would you like us to set one up for you?\n\n\
     Best regards,\n\
     {from_name}\n\n\
     If you would prefer not to hear from us again, reply with \"unsubscribe\"."
        .into()
}

/// `[smtp]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// SMTP relay hostname.
    #[serde(default)]
    pub host: String,

    /// Port (465 for implicit TLS, 587 for STARTTLS).
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// TLS mode: "tls" (default), "starttls", or "none".
    #[serde(default = "default_smtp_tls")]
    pub tls: String,

    /// Connection timeout in seconds.
    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            tls: default_smtp_tls(),
            timeout_secs: default_mail_timeout(),
        }
    }
}

fn default_smtp_port() -> u16 {
    465
}
fn default_smtp_tls() -> String {
    "tls".into()
}
fn default_mail_timeout() -> u64 {
    10
}

/// `[resend]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendConfig {
    #[serde(default = "default_resend_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_resend_key_env")]
    pub api_key_env: String,
}

impl Default for ResendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_resend_endpoint(),
            api_key_env: default_resend_key_env(),
        }
    }
}

fn default_resend_endpoint() -> String {
    "https://api.resend.com/emails".into()
}
fn default_resend_key_env() -> String {
    "RESEND_API_KEY".into()
}

/// `[imap]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImapConfig {
    #[serde(default)]
    pub host: String,

    #[serde(default = "default_imap_port")]
    pub port: u16,

    /// Only the most recent N matching messages are fetched per account.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_imap_port(),
            max_messages: default_max_messages(),
        }
    }
}

fn default_imap_port() -> u16 {
    993
}
fn default_max_messages() -> usize {
    50
}

/// `[prospecting]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProspectingConfig {
    /// Directory search URL; `{region_code}` and `{city}` are substituted.
    #[serde(default = "default_base_url_template")]
    pub base_url_template: String,

    /// Result pages walked per target.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Pause between result pages, in milliseconds.
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,

    /// Minimum score a listing needs to be retained.
    #[serde(default = "default_min_score")]
    pub min_score: u32,
}

impl Default for ProspectingConfig {
    fn default() -> Self {
        Self {
            base_url_template: default_base_url_template(),
            max_pages: default_max_pages(),
            page_delay_ms: default_page_delay(),
            min_score: default_min_score(),
        }
    }
}

fn default_base_url_template() -> String {
    "https://www.psychologytoday.com/us/therapists/{region_code}/{city}?category=couples-counseling"
        .into()
}
fn default_max_pages() -> u32 {
    5
}
fn default_page_delay() -> u64 {
    1500
}
fn default_min_score() -> u32 {
    15
}

/// `[[accounts]]` entry - a sending mailbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Short label (e.g. "lauren").
    pub name: String,
    /// Mailbox address; also the SMTP/IMAP login.
    pub email: String,
    /// Name of the env var holding the mailbox password.
    pub password_env: String,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadline/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadlineError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadline/leadline.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadlineError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        LeadlineError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadlineError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadlineError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadlineError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject configurations the pipeline cannot run with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.defaults.batch_size == 0 {
        return Err(LeadlineError::config("defaults.batch_size must be at least 1"));
    }
    if config.search.result_count == 0 {
        return Err(LeadlineError::config("search.result_count must be at least 1"));
    }
    if config.outreach.min_delay_secs > config.outreach.max_delay_secs {
        return Err(LeadlineError::config(format!(
            "outreach.min_delay_secs ({}) exceeds outreach.max_delay_secs ({})",
            config.outreach.min_delay_secs, config.outreach.max_delay_secs
        )));
    }
    for account in &config.accounts {
        if !account.email.contains('@') {
            return Err(LeadlineError::config(format!(
                "account '{}' has an invalid email '{}'",
                account.name, account.email
            )));
        }
    }
    Ok(())
}

/// Expand a leading `~/` against the home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| LeadlineError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}
