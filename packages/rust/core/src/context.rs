//! Run context: configuration, storage, and secrets for one invocation.
//!
//! Every stage receives its dependencies explicitly. The context is the one
//! place that turns configuration plus resolved secrets into concrete
//! resolvers, transports, and inboxes.

use std::sync::Arc;

use leadline_crawler::EmailExtractor;
use leadline_discovery::{ResolverOptions, WebsiteResolver};
use leadline_listings::{CollectorOptions, LeadCollector};
use leadline_mailer::{ImapInbox, Mailer, ResendMailer, SmtpMailer};
use leadline_shared::{
    AppConfig, CredentialProvider, LeadlineError, Result, Secret, TransportKind, expand_home,
};
use leadline_storage::Storage;
use tracing::{debug, info};

use crate::outreach::Sender;
use crate::replies::MonitoredInbox;

/// Everything a stage needs for one run.
pub struct RunContext {
    pub config: AppConfig,
    pub storage: Storage,
    pub credentials: Arc<dyn CredentialProvider>,
}

impl RunContext {
    pub fn new(
        config: AppConfig,
        storage: Storage,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            config,
            storage,
            credentials,
        }
    }

    /// Open storage as configured and build the context.
    pub async fn open(config: AppConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let storage = open_storage(&config, credentials.as_ref()).await?;
        Ok(Self::new(config, storage, credentials))
    }

    /// Like [`RunContext::open`], but for commands that only read.
    pub async fn open_readonly(
        config: AppConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let storage = open_storage_readonly(&config, credentials.as_ref()).await?;
        Ok(Self::new(config, storage, credentials))
    }

    fn secret(&self, env_name: &str) -> Result<Secret> {
        self.credentials.secret(env_name)
    }

    pub fn website_resolver(&self) -> Result<WebsiteResolver> {
        let key = self.secret(&self.config.search.api_key_env)?;
        WebsiteResolver::new(ResolverOptions::from_config(&self.config.search), key)
    }

    pub fn email_extractor(&self) -> Result<EmailExtractor> {
        EmailExtractor::new()
    }

    pub fn lead_collector(&self) -> Result<LeadCollector> {
        LeadCollector::new(CollectorOptions::from_config(&self.config.prospecting))
    }

    /// One sender per configured account, in config order.
    ///
    /// With `preview_only`, no secrets are resolved and no transport is built.
    pub fn senders(&self, preview_only: bool) -> Result<Vec<Sender>> {
        let accounts = &self.config.accounts;
        if accounts.is_empty() {
            return Err(LeadlineError::config(
                "no sending accounts configured. Add an [[accounts]] entry.",
            ));
        }

        if preview_only {
            return Ok(accounts
                .iter()
                .map(|a| Sender::preview_only(&a.name, &a.email))
                .collect());
        }

        match self.config.outreach.transport {
            TransportKind::Smtp => accounts
                .iter()
                .map(|a| {
                    let password = self.secret(&a.password_env)?;
                    let mailer: Arc<dyn Mailer> =
                        Arc::new(SmtpMailer::new(&self.config.smtp, &a.email, &password)?);
                    Ok(Sender::new(&a.name, &a.email, mailer))
                })
                .collect(),
            TransportKind::Resend => {
                let key = self.secret(&self.config.resend.api_key_env)?;
                let mailer: Arc<dyn Mailer> =
                    Arc::new(ResendMailer::new(&self.config.resend, key)?);
                Ok(accounts
                    .iter()
                    .map(|a| Sender::new(&a.name, &a.email, Arc::clone(&mailer)))
                    .collect())
            }
        }
    }

    /// One IMAP inbox per configured account.
    pub fn inboxes(&self) -> Result<Vec<MonitoredInbox>> {
        self.config
            .accounts
            .iter()
            .map(|a| {
                let password = self.secret(&a.password_env)?;
                let inbox = ImapInbox::new(&self.config.imap, &a.email, password)?;
                Ok(MonitoredInbox::new(&a.name, &a.email, Box::new(inbox)))
            })
            .collect()
    }
}

/// Open the configured database: hosted when `database.remote_url` is set,
/// otherwise the local file at `defaults.database_path`.
pub async fn open_storage(
    config: &AppConfig,
    credentials: &dyn CredentialProvider,
) -> Result<Storage> {
    match &config.database.remote_url {
        Some(url) => {
            let token = credentials.secret(&config.database.auth_token_env)?;
            info!(%url, "opening remote database");
            Storage::open_remote(url, token.expose()).await
        }
        None => {
            let path = expand_home(&config.defaults.database_path)?;
            info!(path = %path.display(), "opening local database");
            Storage::open(&path).await
        }
    }
}

/// Open the configured database for reading.
///
/// A local file is opened read-only when it exists and its schema is
/// current; a missing or outdated file is opened read-write so it gets
/// created or migrated first. Hosted databases always open read-write.
pub async fn open_storage_readonly(
    config: &AppConfig,
    credentials: &dyn CredentialProvider,
) -> Result<Storage> {
    if config.database.remote_url.is_some() {
        return open_storage(config, credentials).await;
    }

    let path = expand_home(&config.defaults.database_path)?;
    if path.exists() {
        let storage = Storage::open_readonly(&path).await?;
        if storage.is_current().await {
            debug!(path = %path.display(), "opened local database read-only");
            return Ok(storage);
        }
        info!(path = %path.display(), "database schema is behind, migrating");
    }
    Storage::open(&path).await
}
