//! Atelier event bus and outbound email.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`DomainEvent`] -- the domain event envelope.
//! - [`EventLogger`] -- background task that traces every published event.
//! - [`mail`] -- the [`Mailer`] seam with SMTP and log-only implementations,
//!   plus the message templates the API sends.

pub mod bus;
pub mod logger;
pub mod mail;

pub use bus::{DomainEvent, EventBus};
pub use logger::EventLogger;
pub use mail::{EmailConfig, EmailError, LogMailer, Mailer, OutgoingEmail, SmtpMailer};
