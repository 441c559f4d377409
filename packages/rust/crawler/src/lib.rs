//! Contact email extraction from counselor websites.
//!
//! This crate provides:
//! - [`engine`]: the bounded homepage → probe paths → contact links walk
//! - [`emails`]: candidate scanning, blocked-pattern filtering, and selection
//! - [`links`]: contact-link discovery on a homepage

pub mod emails;
pub mod engine;
pub mod links;

pub use emails::{BLOCKED_PATTERNS, ROLE_PREFIXES, filter_candidates, is_blocked, is_role_account, scan_emails, select_best};
pub use engine::{EmailExtractor, Extraction, ExtractionStep, PROBE_PATHS};
pub use links::{ContactLink, MAX_CONTACT_LINKS, find_contact_links};
