//! Repository port traits.
//!
//! These are the primary ports in our hexagonal architecture.
//! Adapters (Postgres, SQLite, in-memory mocks) implement them.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Category, MonthlyTotal, NewPayment, NewUser, PageRequest, PasswordResetToken, Payment,
    PaymentChanges, PaymentFilter, PaymentId, PaymentMethod, PaymentRecord, PaymentStatistics,
    RefreshToken, User, UserCredentials, UserId,
};
use crate::error::RepoError;

/// Credential store.
#[async_trait::async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Inserts a user. A duplicate email is `RepoError::Conflict`.
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError>;

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, RepoError>;

    /// Looks a user up by email together with the password hash.
    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, RepoError>;

    async fn update_password(&self, id: UserId, password_hash: &str) -> Result<(), RepoError>;
}

/// Refresh and password-reset token storage.
#[async_trait::async_trait]
pub trait TokenRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Refresh tokens
    // ─────────────────────────────────────────────────────────────────────────────

    async fn create_refresh_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, RepoError>;

    /// Exact match on the token string.
    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, RepoError>;

    async fn delete_refresh_token(&self, token: &str) -> Result<(), RepoError>;

    /// Returns the number of deleted rows.
    async fn delete_refresh_tokens_for_user(&self, user_id: UserId) -> Result<u64, RepoError>;

    async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> Result<u64, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Password reset tokens
    // ─────────────────────────────────────────────────────────────────────────────

    async fn create_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetToken, RepoError>;

    async fn find_reset_token(&self, token: &str)
    -> Result<Option<PasswordResetToken>, RepoError>;

    async fn mark_reset_token_used(&self, id: Uuid) -> Result<(), RepoError>;

    /// Deletes reset tokens that are used or past expiry.
    async fn delete_stale_reset_tokens(&self, now: DateTime<Utc>) -> Result<u64, RepoError>;
}

/// Payment persistence and the query engine.
///
/// Every read and write is scoped to the owning user.
#[async_trait::async_trait]
pub trait PaymentRepository: Send + Sync + 'static {
    async fn create_payment(&self, payment: NewPayment) -> Result<Payment, RepoError>;

    /// Joined record, `None` when absent or owned by someone else.
    async fn find_payment(
        &self,
        user_id: UserId,
        id: PaymentId,
    ) -> Result<Option<PaymentRecord>, RepoError>;

    /// Returns false when no row matched.
    async fn update_payment(
        &self,
        user_id: UserId,
        id: PaymentId,
        changes: PaymentChanges,
    ) -> Result<bool, RepoError>;

    /// Returns false when no row matched.
    async fn delete_payment(&self, user_id: UserId, id: PaymentId) -> Result<bool, RepoError>;

    /// Matching payments, newest transaction first. `None` fetches everything.
    async fn list_payments(
        &self,
        user_id: UserId,
        filter: &PaymentFilter,
        page: Option<PageRequest>,
    ) -> Result<Vec<PaymentRecord>, RepoError>;

    /// Number of matching payments, ignoring pagination.
    async fn count_payments(&self, user_id: UserId, filter: &PaymentFilter)
    -> Result<i64, RepoError>;

    async fn payment_statistics(&self, user_id: UserId) -> Result<PaymentStatistics, RepoError>;

    /// Completed payments per month of `year`, months without any omitted.
    async fn monthly_totals(&self, user_id: UserId, year: i32)
    -> Result<Vec<MonthlyTotal>, RepoError>;
}

/// Reference data (categories and payment methods).
#[async_trait::async_trait]
pub trait LookupRepository: Send + Sync + 'static {
    /// Ordered by name.
    async fn list_categories(&self) -> Result<Vec<Category>, RepoError>;

    /// Active methods ordered by name.
    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, RepoError>;

    async fn category_exists(&self, id: Uuid) -> Result<bool, RepoError>;

    async fn payment_method_exists(&self, id: Uuid) -> Result<bool, RepoError>;

    /// Inserts the default categories and methods that are missing.
    async fn seed_reference_data(&self) -> Result<(), RepoError>;
}

/// Everything the HTTP application needs from storage.
pub trait Repository:
    UserRepository + TokenRepository + PaymentRepository + LookupRepository
{
}

impl<T> Repository for T where
    T: UserRepository + TokenRepository + PaymentRepository + LookupRepository
{
}
