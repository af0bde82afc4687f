//! Read-only reference data: payment categories and payment methods.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Categories inserted at startup as `(name, description)`, matched by name.
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Subscription", "Monthly or yearly subscriptions"),
    ("Purchase", "One-time purchases"),
    ("Service", "Service payments"),
    ("Donation", "Charitable donations"),
    ("Other", "Other payments"),
];

/// Payment methods inserted at startup as `(name, code)`, matched by code.
pub const DEFAULT_PAYMENT_METHODS: &[(&str, &str)] = &[
    ("Bank Transfer", "bank_transfer"),
    ("Credit Card", "credit_card"),
    ("E-Wallet", "e_wallet"),
    ("Cash", "cash"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    #[schema(example = "Subscription")]
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentMethod {
    pub id: Uuid,
    #[schema(example = "Credit Card")]
    pub name: String,
    #[schema(example = "credit_card")]
    pub code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
