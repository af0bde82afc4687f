//! Payment domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::amount::Amount;
use super::lookup::{Category, PaymentMethod};
use super::user::{UserId, UserSummary};
use crate::error::DomainError;

/// Unique identifier for a Payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
    /// Creates a new random PaymentId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a PaymentId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PaymentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle status of a payment.
///
/// Any status may follow any other; updates are caller-controlled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Completed,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::InvalidStatus(s.to_string()))
    }
}

/// A stored payment row without joined reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    #[schema(value_type = f64, example = 49.99)]
    pub amount: Amount,
    pub status: PaymentStatus,
    pub category_id: Uuid,
    pub payment_method_id: Uuid,
    pub description: String,
    pub transaction_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A payment with its category, payment method and owner resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentRecord {
    #[serde(flatten)]
    pub payment: Payment,
    pub category: Category,
    pub payment_method: PaymentMethod,
    pub user: UserSummary,
}

/// Data needed to insert a payment. Status always starts as pending.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: UserId,
    pub amount: Amount,
    pub category_id: Uuid,
    pub payment_method_id: Uuid,
    pub description: String,
    pub transaction_date: DateTime<Utc>,
}

/// Full replacement of the mutable payment fields.
#[derive(Debug, Clone)]
pub struct PaymentChanges {
    pub amount: Amount,
    pub status: PaymentStatus,
    pub category_id: Uuid,
    pub payment_method_id: Uuid,
    pub description: String,
    pub transaction_date: DateTime<Utc>,
}
