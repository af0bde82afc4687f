//! # Paytrack Types
//!
//! Domain types and port traits for the payment tracking service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Amount, User, Payment, tokens, lookups)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Amount, Category, Claims, MonthlyTotal, NewPayment, NewUser, PageRequest, PasswordResetToken,
    Payment, PaymentChanges, PaymentFilter, PaymentId, PaymentMethod, PaymentRecord,
    PaymentStatistics, PaymentStatus, RefreshToken, Role, User, UserCredentials, UserId,
    UserSummary,
};
pub use dto::*;
pub use error::{AppError, AuthError, DomainError, FieldError, MailError, RepoError};
pub use ports::{
    LookupRepository, Mailer, PaymentRepository, Repository, TokenRepository, UserRepository,
};
