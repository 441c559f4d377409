//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use leadline_core::contacts::{ReviewReport, add_contact, approve_all, approve_contacts};
use leadline_core::enrichment::run_enrichment;
use leadline_core::outreach::{OutreachOptions, run_outreach};
use leadline_core::prospecting::{promote_leads, run_prospecting};
use leadline_core::replies::{ReplyOptions, check_replies};
use leadline_core::{ProgressReporter, RunContext};
use leadline_shared::{
    AppConfig, ContactId, ContactStatus, EnvCredentials, init_config, load_config, validate_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Leadline: find counselors, discover their email, reach out, track replies.
#[derive(Parser)]
#[command(
    name = "leadline",
    version,
    about = "Prospect, enrich, and email private-practice counselors, then track their replies.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Collect scored leads from the counselor directory for one city.
    Prospect {
        /// Region slug as used by the directory (e.g. "texas").
        region: String,

        /// City slug (e.g. "austin").
        city: String,

        /// Promote leads at or above the configured minimum score afterwards.
        #[arg(long)]
        promote: bool,
    },

    /// Find websites and emails for pending contacts.
    Enrich {
        /// Contacts to process (defaults to defaults.batch_size).
        #[arg(short, long)]
        batch: Option<u32>,
    },

    /// Manage contacts.
    Contacts {
        #[command(subcommand)]
        action: ContactsAction,
    },

    /// Inspect and promote directory leads.
    Leads {
        #[command(subcommand)]
        action: LeadsAction,
    },

    /// Email contacts that are ready_to_email.
    Send {
        /// Render the emails without sending or changing any status.
        #[arg(long)]
        dry_run: bool,

        /// Maximum emails in this run.
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },

    /// Monitor inboxes for replies.
    Replies {
        #[command(subcommand)]
        action: RepliesAction,
    },

    /// Manage configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Contact subcommands.
#[derive(Subcommand)]
pub(crate) enum ContactsAction {
    /// Add a contact by hand.
    Add {
        /// Full name, credentials included (e.g. "Jane Smith, LPC").
        name: String,

        #[arg(long)]
        city: String,

        #[arg(long)]
        region: String,
    },

    /// List contacts, oldest first.
    List {
        /// Only contacts in this status (e.g. enrichment_success).
        #[arg(short, long)]
        status: Option<ContactStatus>,

        #[arg(short, long, default_value = "50")]
        limit: u32,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Approve reviewed contacts for sending.
    Approve {
        /// Contact ids to approve.
        ids: Vec<ContactId>,

        /// Approve every contact awaiting review.
        #[arg(long, conflicts_with = "ids")]
        all: bool,
    },

    /// Show how many contacts are in each status.
    Status,
}

/// Lead subcommands.
#[derive(Subcommand)]
pub(crate) enum LeadsAction {
    /// List stored leads, best score first.
    List {
        #[arg(long, default_value = "0")]
        min_score: u32,

        #[arg(short, long, default_value = "50")]
        limit: u32,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Turn unpromoted leads into pending contacts.
    Promote {
        /// Minimum score (defaults to prospecting.min_score).
        #[arg(long)]
        min_score: Option<u32>,

        #[arg(short, long, default_value = "100")]
        limit: u32,
    },
}

/// Reply subcommands.
#[derive(Subcommand)]
pub(crate) enum RepliesAction {
    /// Fetch new messages from every account inbox.
    Check,

    /// List stored replies, newest first.
    List {
        #[arg(short, long, default_value = "20")]
        limit: u32,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Create default config file at ~/.leadline/leadline.toml.
    Init,
    /// Show current configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadline=info",
        1 => "leadline=debug",
        _ => "leadline=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().with_env_filter(env_filter).json().init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command router
// ---------------------------------------------------------------------------

/// Dispatch CLI commands.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Prospect {
            region,
            city,
            promote,
        } => cmd_prospect(&region, &city, promote).await,
        Command::Enrich { batch } => cmd_enrich(batch).await,
        Command::Contacts { action } => match action {
            ContactsAction::Add { name, city, region } => {
                cmd_contacts_add(&name, &city, &region).await
            }
            ContactsAction::List {
                status,
                limit,
                json,
            } => cmd_contacts_list(status, limit, json).await,
            ContactsAction::Approve { ids, all } => cmd_contacts_approve(&ids, all).await,
            ContactsAction::Status => cmd_contacts_status().await,
        },
        Command::Leads { action } => match action {
            LeadsAction::List {
                min_score,
                limit,
                json,
            } => cmd_leads_list(min_score, limit, json).await,
            LeadsAction::Promote { min_score, limit } => cmd_leads_promote(min_score, limit).await,
        },
        Command::Send { dry_run, limit } => cmd_send(dry_run, limit).await,
        Command::Replies { action } => match action {
            RepliesAction::Check => cmd_replies_check().await,
            RepliesAction::List { limit, json } => cmd_replies_list(limit, json).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Load and validate config, then open storage.
async fn open_context() -> Result<RunContext> {
    let config: AppConfig = load_config()?;
    validate_config(&config)?;
    Ok(RunContext::open(config, Arc::new(EnvCredentials)).await?)
}

/// Load and validate config, then open storage for a read-only command.
async fn open_context_readonly() -> Result<RunContext> {
    let config: AppConfig = load_config()?;
    validate_config(&config)?;
    Ok(RunContext::open_readonly(config, Arc::new(EnvCredentials)).await?)
}

// ---------------------------------------------------------------------------
// Pipeline commands
// ---------------------------------------------------------------------------

async fn cmd_prospect(region: &str, city: &str, promote: bool) -> Result<()> {
    let ctx = open_context().await?;
    let collector = ctx.lead_collector()?;

    info!(region, city, "prospecting");
    let reporter = CliProgress::new();
    let report = run_prospecting(&ctx.storage, &collector, region, city, &reporter).await?;

    println!();
    println!("  Prospecting finished: {}", report.target);
    println!("  Pages:     {}", report.pages_read);
    println!("  Leads:     {}", report.collected);
    println!("  New:       {}", report.inserted);
    println!("  Known:     {}", report.known);
    println!("  Stopped:   {:?}", report.stop);

    if promote {
        let min_score = ctx.config.prospecting.min_score;
        let promoted = promote_leads(&ctx.storage, min_score, u32::MAX).await?;
        println!("  Promoted:  {} (score >= {min_score})", promoted.promoted.len());
    }
    println!();

    Ok(())
}

async fn cmd_enrich(batch: Option<u32>) -> Result<()> {
    let ctx = open_context().await?;
    let batch_size = batch.unwrap_or(ctx.config.defaults.batch_size);
    if batch_size == 0 {
        return Err(eyre!("batch size must be at least 1"));
    }

    let resolver = ctx.website_resolver()?;
    let extractor = ctx.email_extractor()?;

    info!(batch_size, "enriching contacts");
    let reporter = CliProgress::new();
    let report = run_enrichment(&ctx.storage, &resolver, &extractor, batch_size, &reporter).await?;

    println!();
    println!("  Enrichment finished!");
    println!("  Selected:  {}", report.selected);
    println!("  Enriched:  {}", report.enriched);
    println!("  Failed:    {}", report.failed);
    println!("  Deferred:  {}", report.deferred);
    println!("  Skipped:   {}", report.skipped);
    println!();

    Ok(())
}

async fn cmd_send(dry_run: bool, limit: u32) -> Result<()> {
    let ctx = open_context().await?;
    let senders = ctx.senders(dry_run)?;
    let opts = OutreachOptions::from_config(&ctx.config.outreach, limit, dry_run);

    info!(dry_run, limit, accounts = senders.len(), "running outreach");
    let reporter = CliProgress::new();
    let report = run_outreach(&ctx.storage, &ctx.config.outreach, &senders, &opts, &reporter).await?;

    if dry_run {
        for message in &report.messages {
            println!();
            println!("  Account: {}", message.account);
            println!("  From:    {}", message.email.from_header());
            println!("  To:      {}", message.email.to);
            println!("  Subject: {}", message.email.subject);
            println!();
            for line in message.email.body.lines() {
                println!("    {line}");
            }
        }
    }

    println!();
    println!("  Outreach {}!", if dry_run { "previewed" } else { "finished" });
    println!("  Selected:  {}", report.selected);
    println!("  Sent:      {}", report.sent);
    println!("  Failed:    {} ({} undeliverable)", report.failed, report.undeliverable);
    println!("  Skipped:   {}", report.skipped);
    println!();

    Ok(())
}

async fn cmd_replies_check() -> Result<()> {
    let ctx = open_context().await?;
    let inboxes = ctx.inboxes()?;
    let opts = ReplyOptions::new(
        ctx.config.imap.max_messages,
        ctx.config.outreach.sender_domain.clone(),
    );

    info!(accounts = inboxes.len(), "checking replies");
    let reporter = CliProgress::new();
    let report = check_replies(&ctx.storage, &inboxes, &opts, &reporter).await?;

    println!();
    println!("  Reply check finished!");
    println!("  Accounts:      {} ({} failed)", report.accounts_checked, report.accounts_failed);
    println!("  Fetched:       {}", report.fetched);
    println!("  New replies:   {}", report.replies.len());
    println!("  Unsubscribed:  {}", report.unsubscribed);
    println!("  Duplicates:    {}", report.duplicates);
    println!();
    for reply in &report.replies {
        println!(
            "  [{}] {:<12} {} <{}>: {}",
            reply.priority(),
            reply.kind.as_str(),
            reply.from_name,
            reply.from_email,
            reply.subject
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Record commands
// ---------------------------------------------------------------------------

async fn cmd_contacts_add(name: &str, city: &str, region: &str) -> Result<()> {
    let ctx = open_context().await?;
    let contact = add_contact(&ctx.storage, name, city, region).await?;
    println!("Contact added: {} ({})", contact.full_name, contact.id);
    Ok(())
}

async fn cmd_contacts_list(status: Option<ContactStatus>, limit: u32, json: bool) -> Result<()> {
    let ctx = open_context_readonly().await?;
    let contacts = ctx.storage.list_contacts(status, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&contacts)?);
        return Ok(());
    }
    if contacts.is_empty() {
        println!("No contacts.");
        return Ok(());
    }
    for c in &contacts {
        println!(
            "{}  {:<20} {:<28} {:<16} {}",
            c.id,
            c.status.as_str(),
            c.full_name,
            c.city,
            c.email.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn cmd_contacts_approve(ids: &[ContactId], all: bool) -> Result<()> {
    let ctx = open_context().await?;
    let report = if all {
        approve_all(&ctx.storage, u32::MAX).await?
    } else if ids.is_empty() {
        return Err(eyre!("pass contact ids to approve, or --all"));
    } else {
        approve_contacts(&ctx.storage, ids).await?
    };
    print_review(&report);
    Ok(())
}

fn print_review(report: &ReviewReport) {
    println!("Approved: {}", report.approved.len());
    for (id, status) in &report.rejected {
        match status {
            Some(status) => println!("  not approved: {id} is {status}"),
            None => println!("  not approved: {id} does not exist"),
        }
    }
}

async fn cmd_contacts_status() -> Result<()> {
    let ctx = open_context_readonly().await?;
    let counts = ctx.storage.count_by_status().await?;
    for status in ContactStatus::ALL {
        let n = counts
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0);
        println!("  {:<20} {n}", status.as_str());
    }
    Ok(())
}

async fn cmd_leads_list(min_score: u32, limit: u32, json: bool) -> Result<()> {
    let ctx = open_context_readonly().await?;
    let leads = ctx.storage.list_leads(min_score, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&leads)?);
        return Ok(());
    }
    if leads.is_empty() {
        println!("No leads.");
        return Ok(());
    }
    for lead in &leads {
        println!(
            "{:>3}  {:<9} {:<30} {:<16} {}",
            lead.score,
            lead.tier.as_str(),
            lead.name,
            lead.city.as_deref().unwrap_or("-"),
            lead.phone.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn cmd_leads_promote(min_score: Option<u32>, limit: u32) -> Result<()> {
    let ctx = open_context().await?;
    let min_score = min_score.unwrap_or(ctx.config.prospecting.min_score);
    let report = promote_leads(&ctx.storage, min_score, limit).await?;

    println!("Promoted {} leads (score >= {min_score})", report.promoted.len());
    for contact in &report.promoted {
        println!("  {}  {}", contact.id, contact.full_name);
    }
    Ok(())
}

async fn cmd_replies_list(limit: u32, json: bool) -> Result<()> {
    let ctx = open_context_readonly().await?;
    let replies = ctx.storage.list_replies(limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&replies)?);
        return Ok(());
    }
    if replies.is_empty() {
        println!("No replies.");
        return Ok(());
    }
    for reply in &replies {
        println!(
            "{}  [{}] {:<12} {:<32} {}",
            reply.received_at.format("%Y-%m-%d %H:%M"),
            reply.priority(),
            reply.kind.as_str(),
            reply.from_email,
            reply.body_preview
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let toml_str = toml::to_string_pretty(&config)
        .map_err(|e| eyre!("failed to serialize config: {e}"))?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item(&self, label: &str, current: usize, total: usize) {
        self.spinner.set_message(format!("[{current}/{total}] {label}"));
    }

    fn finish(&self, summary: &str) {
        self.spinner.finish_and_clear();
        info!(summary, "stage finished");
    }
}
