//! Counselor directory prospecting.
//!
//! This crate provides:
//! - [`parse`]: listing extraction from directory search pages
//! - [`score`]: additive keyword relevance scoring and tiers
//! - [`collector`]: the paginated walk for one (region, city) target
//! - [`regions`]: state name to code mapping

pub mod collector;
pub mod parse;
pub mod regions;
pub mod score;

pub use collector::{Collection, CollectorOptions, LeadCollector, StopReason};
pub use parse::{Listing, is_blocked_page, parse_page};
pub use regions::{region_code, slugify};
pub use score::{MIN_SCORE, score_listing, tier_for};
