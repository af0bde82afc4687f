//! Outbound mail: a bounded outbox drained by a background worker.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, instrument};

use paytrack_types::{MailError, Mailer};

/// A message waiting for delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum MailJob {
    PasswordReset { email: String, token: String },
}

/// Sending half of the mail queue. Enqueueing never blocks a request.
#[derive(Clone)]
pub struct MailOutbox {
    tx: mpsc::Sender<MailJob>,
}

impl MailOutbox {
    /// Creates an outbox holding at most `capacity` pending jobs.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<MailJob>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    pub fn enqueue(&self, job: MailJob) -> Result<(), MailError> {
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => MailError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => MailError::QueueClosed,
        })
    }
}

/// Delivers queued jobs through a [`Mailer`] until shutdown.
pub struct MailWorker<M: Mailer> {
    mailer: Arc<M>,
    rx: mpsc::Receiver<MailJob>,
}

impl<M: Mailer> MailWorker<M> {
    pub fn new(mailer: Arc<M>, rx: mpsc::Receiver<MailJob>) -> Self {
        Self { mailer, rx }
    }

    #[instrument(skip_all)]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting mail worker");
        loop {
            tokio::select! {
                job = self.rx.recv() => match job {
                    Some(job) => self.deliver(job).await,
                    None => break,
                },
                _ = shutdown.changed() => break,
            }
        }
        info!("Mail worker stopped");
    }

    async fn deliver(&self, job: MailJob) {
        let result = match &job {
            MailJob::PasswordReset { email, token } => {
                self.mailer.send_password_reset(email, token).await
            }
        };

        if let Err(e) = result {
            error!("Failed to deliver mail: {}", e);
        }
    }
}

/// Mailer that writes the reset link to the log instead of sending it.
pub struct LogMailer {
    reset_url_base: String,
}

impl LogMailer {
    pub fn new(reset_url_base: impl Into<String>) -> Self {
        Self {
            reset_url_base: reset_url_base.into(),
        }
    }

    pub fn reset_link(&self, token: &str) -> String {
        format!("{}?token={}", self.reset_url_base, token)
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), MailError> {
        info!(%email, link = %self.reset_link(token), "Password reset link issued");
        Ok(())
    }
}
