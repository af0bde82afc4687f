//! Dashboard aggregates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Per-user payment counts and the completed total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentStatistics {
    pub total_payments: i64,
    pub completed_count: i64,
    pub pending_count: i64,
    /// Sum over completed payments only. Unbounded, unlike a single `Amount`.
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_amount: Decimal,
}

/// Completed payments for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyTotal {
    /// 1 = January.
    pub month: u32,
    #[schema(example = "Jan")]
    pub label: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_amount: Decimal,
    pub count: i64,
}

impl MonthlyTotal {
    pub fn new(month: u32, total_amount: Decimal, count: i64) -> Self {
        Self {
            month,
            label: month_label(month).to_string(),
            total_amount,
            count,
        }
    }
}

/// Three-letter English month abbreviation, `"???"` outside 1..=12.
pub fn month_label(month: u32) -> &'static str {
    const LABELS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    month
        .checked_sub(1)
        .and_then(|i| LABELS.get(i as usize))
        .copied()
        .unwrap_or("???")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_labels() {
        assert_eq!(month_label(1), "Jan");
        assert_eq!(month_label(12), "Dec");
        assert_eq!(month_label(0), "???");
        assert_eq!(month_label(13), "???");
    }
}
