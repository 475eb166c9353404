//! WhatsApp Cloud API channel.
//!
//! - `events`: webhook verification handshake and inbound envelope parsing
//! - `signature`: `X-Hub-Signature-256` payload signing check
//! - `client`: Graph API `messages` client used to report back to the sender
//!
//! ```text
//! Meta webhook → verify signature → parse envelope → QuotationRequest(s) → pipeline
//!                                                                              ↓
//!                                        WhatsAppClient::notify ← report message
//! ```

pub mod client;
pub mod events;
pub mod signature;

pub use client::WhatsAppClient;
pub use events::{
    parse_envelope, verify_subscription, EventError, VerifyError, VerifyQuery, WebhookEnvelope,
    CHANNEL_ID,
};
pub use signature::{sign_payload, verify_signature, SignatureError, SIGNATURE_HEADER};
