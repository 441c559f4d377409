//! Outbound and inbound mail for Leadline.
//!
//! This crate provides:
//! - [`message`]: outbound message type and template rendering
//! - [`transport`]: the [`Mailer`] seam and SMTP sending via lettre
//! - [`resend`]: the Resend HTTP API transport
//! - [`inbox`]: the [`Inbox`] seam and IMAP fetching
//! - [`parse`]: raw message parsing for replies
//! - [`classify`]: keyword classification of reply bodies

pub mod classify;
pub mod inbox;
pub mod message;
pub mod parse;
pub mod resend;
pub mod transport;

pub use classify::classify_reply;
pub use inbox::{ImapInbox, Inbox, imap_date};
pub use message::{OutboundEmail, SendReceipt, compose, first_name, render};
pub use parse::{InboundMessage, PREVIEW_CHARS, parse_message};
pub use resend::ResendMailer;
pub use transport::{Mailer, SmtpMailer, build_message};
