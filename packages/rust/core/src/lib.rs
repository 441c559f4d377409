//! Pipeline stages for Leadline.
//!
//! Each stage takes its storage, its I/O seams, and a [`ProgressReporter`]
//! explicitly and processes one batch sequentially:
//! - [`prospecting`]: directory leads, and promotion to contacts
//! - [`enrichment`]: website resolution and email extraction
//! - [`contacts`]: manual add and review approval
//! - [`outreach`]: templated sends with account rotation and pacing
//! - [`replies`]: inbox monitoring, classification, unsubscribes

pub mod contacts;
pub mod context;
pub mod enrichment;
pub mod outreach;
pub mod progress;
pub mod prospecting;
pub mod replies;

pub use context::{RunContext, open_storage, open_storage_readonly};
pub use progress::{ProgressReporter, SilentProgress};
