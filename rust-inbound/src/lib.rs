//! Mailgun inbound webhook normalization.
//!
//! Converts the form payload Mailgun posts for an inbound route into a
//! canonical email record: recipient lists, sender, bodies, downloaded
//! attachments and a raw header block.
//!
//! ## Architecture
//!
//! ```text
//! Mailgun → POST /webhooks/mailgun → normalize() → NormalizedRecord
//!                                        └→ GET attachment urls (Basic auth)
//! ```

pub mod config;
pub mod normalize;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use normalize::{
    normalize, Attachment, AttachmentFetcher, InboundPayload, NormalizeError, NormalizedRecord,
};
pub use web::AppState;
