//! Outbound notification port.

use crate::error::MailError;

/// Delivers out-of-band messages such as password-reset links.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync + 'static {
    /// Sends the reset link for `token` to `email`.
    async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), MailError>;
}
