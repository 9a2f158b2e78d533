//! Outbound delivery channels: tenant webhooks and transactional email.

pub mod email;
pub mod webhook;
