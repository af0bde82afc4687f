//! Port traits (interfaces) for the hexagonal architecture.

pub mod mailer;
pub mod repository;

pub use mailer::Mailer;
pub use repository::{
    LookupRepository, PaymentRepository, Repository, TokenRepository, UserRepository,
};
