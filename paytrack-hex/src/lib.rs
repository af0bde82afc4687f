//! # Paytrack Hex
//!
//! Application service layer and HTTP adapter for the paytrack service.
//!
//! ## Architecture
//!
//! - `service/` - Application services (auth, payments, token signing, CSV export)
//! - `inbound/` - HTTP adapter (Axum server, session and rate-limit middleware)
//! - `notify` - Mail outbox and worker
//! - `tasks` - Background sweepers owned by the server
//!
//! Services are generic over the repository ports, allowing different
//! repository implementations to be injected.

pub mod inbound;
pub mod notify;
pub mod openapi;
pub mod service;
pub mod tasks;

#[cfg(test)]
mod service_tests;

pub use notify::{LogMailer, MailJob, MailOutbox, MailWorker};
pub use service::{AuthService, AuthSettings, PaymentService, TokenService};
