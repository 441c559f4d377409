//! Shared types, error model, credentials, and configuration for Leadline.
//!
//! This crate is the foundation depended on by all other Leadline crates.
//! It provides:
//! - [`LeadlineError`] and [`Attempt`]: the unified error and tagged outcome types
//! - Domain types ([`Contact`], [`ContactStatus`], [`Lead`], [`Reply`])
//! - Secrets ([`CredentialProvider`], [`Secret`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod credentials;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AccountConfig, AppConfig, DatabaseConfig, DefaultsConfig, ImapConfig, OutreachConfig,
    ProspectingConfig, ResendConfig, SearchConfig, SmtpConfig, TransportKind, config_dir,
    config_file_path, expand_home, init_config, load_config, load_config_from, validate_config,
};
pub use credentials::{CredentialProvider, EnvCredentials, Secret, StaticCredentials};
pub use error::{Attempt, LeadlineError, Result};
pub use types::{
    Contact, ContactId, ContactStatus, Lead, Reply, ReplyKind, ReplyPriority, Tier,
};
