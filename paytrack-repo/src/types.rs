//! Shared database row types.
//!
//! Row structs are generic over the id and timestamp column types: Postgres
//! decodes native `UUID`/`TIMESTAMPTZ`, SQLite stores both as `TEXT`.

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use paytrack_types::{
    Amount, Category, MonthlyTotal, PasswordResetToken, Payment, PaymentId, PaymentMethod,
    PaymentRecord, PaymentStatistics, PaymentStatus, RefreshToken, RepoError, Role, User,
    UserCredentials, UserId, UserSummary,
};

// ─────────────────────────────────────────────────────────────────────────────
// Column conversions
// ─────────────────────────────────────────────────────────────────────────────

/// A column that decodes into a UUID.
pub trait DbUuid {
    fn into_uuid(self) -> Result<Uuid, RepoError>;
}

impl DbUuid for Uuid {
    fn into_uuid(self) -> Result<Uuid, RepoError> {
        Ok(self)
    }
}

impl DbUuid for String {
    fn into_uuid(self) -> Result<Uuid, RepoError> {
        Uuid::parse_str(&self).map_err(|e| RepoError::Database(e.to_string()))
    }
}

/// A column that decodes into a UTC timestamp.
pub trait DbTimestamp {
    fn into_timestamp(self) -> Result<DateTime<Utc>, RepoError>;
}

impl DbTimestamp for DateTime<Utc> {
    fn into_timestamp(self) -> Result<DateTime<Utc>, RepoError> {
        Ok(self)
    }
}

impl DbTimestamp for String {
    fn into_timestamp(self) -> Result<DateTime<Utc>, RepoError> {
        DateTime::parse_from_rfc3339(&self)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| RepoError::Database(e.to_string()))
    }
}

/// Fixed-width text form used for SQLite timestamps, so that string order
/// equals chronological order.
pub fn timestamp_text(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `[Jan 1 of year, Jan 1 of year + 1)`, `None` for years chrono cannot represent.
pub fn year_bounds(year: i32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let end = NaiveDate::from_ymd_opt(start.year().checked_add(1)?, 1, 1)?;
    Some((
        start.and_hms_opt(0, 0, 0)?.and_utc(),
        end.and_hms_opt(0, 0, 0)?.and_utc(),
    ))
}

/// Wraps a search term for a `LIKE ... ESCAPE '\'` substring match.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Maps insert/update failures, surfacing constraint violations.
pub fn map_write_error(e: sqlx::Error, conflict: &str) -> RepoError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return RepoError::Conflict(conflict.to_string());
        }
        if db.is_foreign_key_violation() {
            return RepoError::Domain(paytrack_types::DomainError::ValidationError(
                "Referenced category, payment method or user does not exist".into(),
            ));
        }
    }
    RepoError::Database(e.to_string())
}

fn parse_status(status: &str) -> Result<PaymentStatus, RepoError> {
    status
        .parse()
        .map_err(|_| RepoError::Database(format!("Unknown payment status: {}", status)))
}

fn parse_role(role: &str) -> Result<Role, RepoError> {
    role.parse()
        .map_err(|_| RepoError::Database(format!("Unknown role: {}", role)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Query fragments shared by both backends
// ─────────────────────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str =
    "id, email, password_hash, full_name, role, created_at, updated_at";

/// Joined payment select; filters are appended after it.
pub const PAYMENT_RECORD_SELECT: &str = r#"SELECT p.id, p.user_id, p.amount_cents, p.status,
       p.category_id, p.payment_method_id, p.description, p.transaction_date,
       p.created_at, p.updated_at,
       c.name AS category_name, c.description AS category_description,
       c.created_at AS category_created_at,
       m.name AS method_name, m.code AS method_code, m.is_active AS method_is_active,
       m.created_at AS method_created_at,
       u.email AS user_email, u.full_name AS user_full_name
FROM payments p
JOIN categories c ON c.id = p.category_id
JOIN payment_methods m ON m.id = p.payment_method_id
JOIN users u ON u.id = p.user_id"#;

pub const PAYMENT_ORDER: &str = " ORDER BY p.transaction_date DESC, p.created_at DESC";

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// User row from database.
#[derive(FromRow)]
pub struct DbUser<Id, Ts> {
    pub id: Id,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub created_at: Ts,
    pub updated_at: Ts,
}

impl<Id: DbUuid, Ts: DbTimestamp> DbUser<Id, Ts> {
    pub fn into_credentials(self) -> Result<UserCredentials, RepoError> {
        let user = User {
            id: UserId::from_uuid(self.id.into_uuid()?),
            email: self.email,
            full_name: self.full_name,
            role: parse_role(&self.role)?,
            created_at: self.created_at.into_timestamp()?,
            updated_at: self.updated_at.into_timestamp()?,
        };
        Ok(UserCredentials {
            user,
            password_hash: self.password_hash,
        })
    }

    pub fn into_domain(self) -> Result<User, RepoError> {
        self.into_credentials().map(|c| c.user)
    }
}

/// Refresh token row from database.
#[derive(FromRow)]
pub struct DbRefreshToken<Id, Ts> {
    pub id: Id,
    pub user_id: Id,
    pub token: String,
    pub expires_at: Ts,
    pub created_at: Ts,
}

impl<Id: DbUuid, Ts: DbTimestamp> DbRefreshToken<Id, Ts> {
    pub fn into_domain(self) -> Result<RefreshToken, RepoError> {
        Ok(RefreshToken {
            id: self.id.into_uuid()?,
            user_id: UserId::from_uuid(self.user_id.into_uuid()?),
            token: self.token,
            expires_at: self.expires_at.into_timestamp()?,
            created_at: self.created_at.into_timestamp()?,
        })
    }
}

/// Password reset token row from database.
#[derive(FromRow)]
pub struct DbResetToken<Id, Ts> {
    pub id: Id,
    pub user_id: Id,
    pub token: String,
    pub expires_at: Ts,
    pub used: bool,
    pub created_at: Ts,
}

impl<Id: DbUuid, Ts: DbTimestamp> DbResetToken<Id, Ts> {
    pub fn into_domain(self) -> Result<PasswordResetToken, RepoError> {
        Ok(PasswordResetToken {
            id: self.id.into_uuid()?,
            user_id: UserId::from_uuid(self.user_id.into_uuid()?),
            token: self.token,
            expires_at: self.expires_at.into_timestamp()?,
            used: self.used,
            created_at: self.created_at.into_timestamp()?,
        })
    }
}

/// Category row from database.
#[derive(FromRow)]
pub struct DbCategory<Id, Ts> {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub created_at: Ts,
}

impl<Id: DbUuid, Ts: DbTimestamp> DbCategory<Id, Ts> {
    pub fn into_domain(self) -> Result<Category, RepoError> {
        Ok(Category {
            id: self.id.into_uuid()?,
            name: self.name,
            description: self.description,
            created_at: self.created_at.into_timestamp()?,
        })
    }
}

/// Payment method row from database.
#[derive(FromRow)]
pub struct DbPaymentMethod<Id, Ts> {
    pub id: Id,
    pub name: String,
    pub code: String,
    pub is_active: bool,
    pub created_at: Ts,
}

impl<Id: DbUuid, Ts: DbTimestamp> DbPaymentMethod<Id, Ts> {
    pub fn into_domain(self) -> Result<PaymentMethod, RepoError> {
        Ok(PaymentMethod {
            id: self.id.into_uuid()?,
            name: self.name,
            code: self.code,
            is_active: self.is_active,
            created_at: self.created_at.into_timestamp()?,
        })
    }
}

/// Joined payment row produced by [`PAYMENT_RECORD_SELECT`].
#[derive(FromRow)]
pub struct DbPaymentRecord<Id, Ts> {
    pub id: Id,
    pub user_id: Id,
    pub amount_cents: i64,
    pub status: String,
    pub category_id: Id,
    pub payment_method_id: Id,
    pub description: String,
    pub transaction_date: Ts,
    pub created_at: Ts,
    pub updated_at: Ts,

    pub category_name: String,
    pub category_description: String,
    pub category_created_at: Ts,

    pub method_name: String,
    pub method_code: String,
    pub method_is_active: bool,
    pub method_created_at: Ts,

    pub user_email: String,
    pub user_full_name: String,
}

impl<Id: DbUuid, Ts: DbTimestamp> DbPaymentRecord<Id, Ts> {
    pub fn into_domain(self) -> Result<PaymentRecord, RepoError> {
        let user_id = UserId::from_uuid(self.user_id.into_uuid()?);
        let category_id = self.category_id.into_uuid()?;
        let payment_method_id = self.payment_method_id.into_uuid()?;

        let payment = Payment {
            id: PaymentId::from_uuid(self.id.into_uuid()?),
            user_id,
            amount: Amount::from_cents(self.amount_cents)?,
            status: parse_status(&self.status)?,
            category_id,
            payment_method_id,
            description: self.description,
            transaction_date: self.transaction_date.into_timestamp()?,
            created_at: self.created_at.into_timestamp()?,
            updated_at: self.updated_at.into_timestamp()?,
        };

        Ok(PaymentRecord {
            payment,
            category: Category {
                id: category_id,
                name: self.category_name,
                description: self.category_description,
                created_at: self.category_created_at.into_timestamp()?,
            },
            payment_method: PaymentMethod {
                id: payment_method_id,
                name: self.method_name,
                code: self.method_code,
                is_active: self.method_is_active,
                created_at: self.method_created_at.into_timestamp()?,
            },
            user: UserSummary {
                id: user_id,
                email: self.user_email,
                full_name: self.user_full_name,
            },
        })
    }
}

/// Divisor used to split `amount_cents` before summing.
///
/// Aggregates select `SUM(amount_cents / 1000000)` and `SUM(amount_cents % 1000000)`
/// so neither partial sum can overflow a BIGINT; the parts recombine in `i128`.
pub const CENTS_SPLIT: i64 = 1_000_000;

/// Recombines split cent sums into an exact two-decimal total.
pub fn total_from_parts(high: i64, low: i64) -> Result<Decimal, RepoError> {
    let cents = i128::from(high) * i128::from(CENTS_SPLIT) + i128::from(low);
    Decimal::try_from_i128_with_scale(cents, 2)
        .map_err(|e| RepoError::Database(format!("Invalid total: {}", e)))
}

/// Aggregate row for the statistics query.
#[derive(FromRow)]
pub struct DbStatistics {
    pub total_payments: i64,
    pub completed_count: i64,
    pub pending_count: i64,
    pub total_high: i64,
    pub total_low: i64,
}

impl DbStatistics {
    pub fn into_domain(self) -> Result<PaymentStatistics, RepoError> {
        Ok(PaymentStatistics {
            total_payments: self.total_payments,
            completed_count: self.completed_count,
            pending_count: self.pending_count,
            total_amount: total_from_parts(self.total_high, self.total_low)?,
        })
    }
}

/// Aggregate row for the monthly totals query.
#[derive(FromRow)]
pub struct DbMonthlyTotal {
    pub month: i64,
    pub total_high: i64,
    pub total_low: i64,
    pub count: i64,
}

impl DbMonthlyTotal {
    pub fn into_domain(self) -> Result<MonthlyTotal, RepoError> {
        let month = u32::try_from(self.month)
            .map_err(|_| RepoError::Database(format!("Invalid month: {}", self.month)))?;
        Ok(MonthlyTotal::new(
            month,
            total_from_parts(self.total_high, self.total_low)?,
            self.count,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_total_from_parts_recombines_split_sums() {
        assert_eq!(total_from_parts(0, 0).unwrap(), Decimal::ZERO);
        assert_eq!(total_from_parts(0, 4999).unwrap().to_string(), "49.99");
        let total = total_from_parts(i64::MAX, CENTS_SPLIT - 1).unwrap();
        assert_eq!(
            total.mantissa(),
            i128::from(i64::MAX) * i128::from(CENTS_SPLIT) + i128::from(CENTS_SPLIT - 1)
        );
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("net"), "%net%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn test_timestamp_text_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let b = a + chrono::Duration::microseconds(1500);
        assert_eq!(timestamp_text(&a), "2024-06-01T09:00:00.000000Z");
        assert_eq!(timestamp_text(&a).len(), timestamp_text(&b).len());
        assert!(timestamp_text(&a) < timestamp_text(&b));
    }

    #[test]
    fn test_timestamp_text_parses_back() {
        let now = Utc::now();
        let parsed = timestamp_text(&now).into_timestamp().unwrap();
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn test_year_bounds() {
        let (start, end) = year_bounds(2024).unwrap();
        assert_eq!(timestamp_text(&start), "2024-01-01T00:00:00.000000Z");
        assert_eq!(timestamp_text(&end), "2025-01-01T00:00:00.000000Z");
    }
}
