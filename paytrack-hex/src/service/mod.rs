//! Application services (orchestrate domain operations over the ports).
//!
//! Contains NO infrastructure logic: handlers call in, repositories are injected.

mod auth;
mod export;
mod payment;
mod token;

pub use auth::{AuthService, AuthSettings, SweepReport};
pub use export::{CSV_HEADER, payments_to_csv};
pub use payment::{PaymentService, RECENT_PAYMENTS};
pub use token::{AccessToken, TokenService};
