//! Authentication Application Service
//!
//! Registration, login, refresh-token exchange, logout and password reset,
//! orchestrated over the user and token ports.

use std::sync::Arc;

use chrono::{Duration, Utc};
use validator::Validate;

use paytrack_repo::security::{DUMMY_PASSWORD_HASH, generate_token, hash_password, verify_password};
use paytrack_types::{
    AppError, AuthError, AuthResponse, Claims, ForgotPasswordRequest, LoginRequest, NewUser,
    RefreshTokenRequest, RegisterRequest, RepoError, ResetPasswordRequest, Role, TokenRepository,
    User, UserId, UserRepository,
};

use super::token::TokenService;
use crate::notify::{MailJob, MailOutbox};

/// Lifetimes of the opaque credentials.
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    pub refresh_ttl: Duration,
    pub reset_ttl: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            refresh_ttl: Duration::days(7),
            reset_ttl: Duration::hours(1),
        }
    }
}

/// Rows removed by one expired-token sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub refresh_tokens: u64,
    pub reset_tokens: u64,
}

/// Application service for authentication and sessions.
pub struct AuthService<R: UserRepository + TokenRepository> {
    repo: Arc<R>,
    tokens: TokenService,
    outbox: MailOutbox,
    settings: AuthSettings,
}

impl<R: UserRepository + TokenRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, tokens: TokenService, outbox: MailOutbox) -> Self {
        Self::with_settings(repo, tokens, outbox, AuthSettings::default())
    }

    pub fn with_settings(
        repo: Arc<R>,
        tokens: TokenService,
        outbox: MailOutbox,
        settings: AuthSettings,
    ) -> Self {
        Self {
            repo,
            tokens,
            outbox,
            settings,
        }
    }

    /// Verifies a bearer token from the `Authorization` header.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens.validate(token)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Credentials
    // ─────────────────────────────────────────────────────────────────────────

    #[tracing::instrument(skip_all, fields(email = %req.email))]
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AppError> {
        req.validate()?;

        if self
            .repo
            .find_credentials_by_email(&req.email)
            .await?
            .is_some()
        {
            return Err(AuthError::EmailAlreadyRegistered.into());
        }

        let password_hash = hash_blocking(req.password).await?;
        let user = self
            .repo
            .create_user(NewUser {
                email: req.email,
                password_hash,
                full_name: req.full_name,
                role: Role::User,
            })
            .await
            .map_err(|e| match e {
                RepoError::Conflict(_) => AppError::from(AuthError::EmailAlreadyRegistered),
                other => other.into(),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        self.issue_session(user).await
    }

    #[tracing::instrument(skip_all, fields(email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AppError> {
        req.validate()?;

        let (stored, user) = match self.repo.find_credentials_by_email(&req.email).await? {
            Some(credentials) => (credentials.password_hash, Some(credentials.user)),
            None => (DUMMY_PASSWORD_HASH.to_string(), None),
        };

        let matches = tokio::task::spawn_blocking(move || verify_password(&req.password, &stored))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        match user {
            Some(user) if matches => self.issue_session(user).await,
            _ => Err(AuthError::InvalidCredentials.into()),
        }
    }

    /// Profile of the authenticated user.
    pub async fn me(&self, user_id: UserId) -> Result<User, AppError> {
        self.get_user(user_id).await
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<User, AppError> {
        self.repo
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────────────────

    /// Exchanges a refresh token for a new access token. The refresh token
    /// itself is returned unchanged.
    #[tracing::instrument(skip_all)]
    pub async fn refresh(&self, req: RefreshTokenRequest) -> Result<AuthResponse, AppError> {
        req.validate()?;

        let stored = self
            .repo
            .find_refresh_token(&req.refresh_token)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if stored.is_expired(Utc::now()) {
            if let Err(e) = self.repo.delete_refresh_token(&stored.token).await {
                tracing::warn!("Failed to delete expired refresh token: {}", e);
            }
            return Err(AuthError::RefreshTokenExpired.into());
        }

        let user = self
            .repo
            .find_user_by_id(stored.user_id)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        let access = self.tokens.issue(&user)?;
        Ok(AuthResponse {
            token: access.token,
            refresh_token: stored.token,
            expires_in: access.expires_in,
            user,
        })
    }

    /// Revokes every refresh token of the user.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self, user_id: UserId) -> Result<u64, AppError> {
        let revoked = self.repo.delete_refresh_tokens_for_user(user_id).await?;
        tracing::info!(revoked, "User logged out");
        Ok(revoked)
    }

    async fn issue_session(&self, user: User) -> Result<AuthResponse, AppError> {
        let access = self.tokens.issue(&user)?;

        if let Err(e) = self.repo.delete_refresh_tokens_for_user(user.id).await {
            tracing::warn!(user_id = %user.id, "Failed to revoke old refresh tokens: {}", e);
        }

        let refresh_token = generate_token();
        let expires_at = Utc::now() + self.settings.refresh_ttl;
        self.repo
            .create_refresh_token(user.id, &refresh_token, expires_at)
            .await?;

        Ok(AuthResponse {
            token: access.token,
            refresh_token,
            expires_in: access.expires_in,
            user,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Password reset
    // ─────────────────────────────────────────────────────────────────────────

    /// Queues a reset link. Unknown emails succeed silently.
    #[tracing::instrument(skip_all)]
    pub async fn forgot_password(&self, req: ForgotPasswordRequest) -> Result<(), AppError> {
        req.validate()?;

        let Some(credentials) = self.repo.find_credentials_by_email(&req.email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_token();
        let expires_at = Utc::now() + self.settings.reset_ttl;
        self.repo
            .create_reset_token(credentials.user.id, &token, expires_at)
            .await?;

        let job = MailJob::PasswordReset {
            email: credentials.user.email,
            token,
        };
        if let Err(e) = self.outbox.enqueue(job) {
            tracing::error!(user_id = %credentials.user.id, "Failed to queue reset mail: {}", e);
        }
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub async fn reset_password(&self, req: ResetPasswordRequest) -> Result<(), AppError> {
        req.validate()?;

        let reset = self
            .repo
            .find_reset_token(&req.token)
            .await?
            .filter(|t| t.is_redeemable(Utc::now()))
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        let password_hash = hash_blocking(req.new_password).await?;
        self.repo
            .update_password(reset.user_id, &password_hash)
            .await?;

        if let Err(e) = self.repo.mark_reset_token_used(reset.id).await {
            tracing::warn!(token_id = %reset.id, "Failed to mark reset token used: {}", e);
        }

        tracing::info!(user_id = %reset.user_id, "Password reset");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Deletes expired refresh tokens and spent or expired reset tokens.
    pub async fn sweep_expired_tokens(&self) -> Result<SweepReport, AppError> {
        let now = Utc::now();
        Ok(SweepReport {
            refresh_tokens: self.repo.delete_expired_refresh_tokens(now).await?,
            reset_tokens: self.repo.delete_stale_reset_tokens(now).await?,
        })
    }
}

/// Hashes on the blocking pool.
async fn hash_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(Into::into)
}
