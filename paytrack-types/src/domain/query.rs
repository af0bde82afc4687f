//! Filter and pagination inputs for payment queries.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use super::amount::Amount;
use super::payment::PaymentStatus;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Optional payment filters. Every set field narrows the result (AND).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    /// Case-insensitive substring of the description.
    pub search: Option<String>,
    /// Inclusive lower bound.
    pub min_amount: Option<Amount>,
    /// Inclusive upper bound.
    pub max_amount: Option<Amount>,
    /// Inclusive lower bound on the transaction date.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the transaction date.
    pub end: Option<DateTime<Utc>>,
}

impl PaymentFilter {
    /// Sets the start bound to midnight (UTC) of `date`.
    pub fn starting_on(mut self, date: NaiveDate) -> Self {
        self.start = Some(date.and_time(NaiveTime::MIN).and_utc());
        self
    }

    /// Sets the end bound to the last instant of `date`, so a single-day
    /// range covers the whole day.
    pub fn ending_on(mut self, date: NaiveDate) -> Self {
        self.end = Some(end_of_day(date));
        self
    }
}

/// Last representable microsecond of a calendar day in UTC.
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap_or(NaiveTime::MIN);
    date.and_time(last).and_utc()
}

/// One-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Clamps the page to at least 1 and the limit to `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}
