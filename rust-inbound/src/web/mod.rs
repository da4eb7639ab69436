//! Web server module for handling Mailgun inbound webhooks.
//!
//! Each request is normalized in place: fields are resolved, stored
//! attachments are downloaded, and the resulting record is returned.

pub mod handlers;

pub use handlers::{health, mailgun_webhook, AppState, HealthResponse, WebhookResponse};
