//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

use paytrack_types::domain::{DEFAULT_CATEGORIES, DEFAULT_PAYMENT_METHODS};
use paytrack_types::{
    Category, LookupRepository, MonthlyTotal, NewPayment, NewUser, PageRequest,
    PasswordResetToken, Payment, PaymentChanges, PaymentFilter, PaymentId, PaymentMethod,
    PaymentRecord, PaymentRepository, PaymentStatistics, PaymentStatus, RefreshToken, RepoError,
    TokenRepository, User, UserCredentials, UserId, UserRepository,
};

use crate::types::{
    DbCategory, DbMonthlyTotal, DbPaymentMethod, DbPaymentRecord, DbRefreshToken, DbResetToken,
    DbStatistics, DbUser, PAYMENT_ORDER, PAYMENT_RECORD_SELECT, USER_COLUMNS, like_pattern,
    map_write_error, timestamp_text, year_bounds,
};

type UserRow = DbUser<String, String>;
type PaymentRecordRow = DbPaymentRecord<String, String>;

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
///
/// Ids are stored as hyphenated text, timestamps as fixed-width RFC 3339 text.
pub struct SqliteRepo {
    pool: SqlitePool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &SqlitePool, sql: &str, name: &str) -> anyhow::Result<()> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration and seeding.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` is its own database, so keep exactly one alive.
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };
        let pool = pool_options.connect_with(options).await?;

        let repo = Self { pool };
        repo.create_schema().await?;
        repo.seed_reference_data().await?;
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (idempotent).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        execute_migration(
            &self.pool,
            include_str!("../migrations/0001_create_tables.sql"),
            "0001",
        )
        .await
        .map_err(|e| RepoError::Database(e.to_string()))
    }

    async fn fetch_user(&self, column: &str, value: String) -> Result<Option<UserRow>, RepoError> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }
}

/// Appends the owner scope and every set filter as `AND` clauses.
fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, user_id: UserId, filter: &PaymentFilter) {
    qb.push(" WHERE p.user_id = ").push_bind(user_id.to_string());

    if let Some(status) = filter.status {
        qb.push(" AND p.status = ").push_bind(status.as_str());
    }
    if let Some(search) = &filter.search {
        // LOWER() on both sides; SQLite only folds ASCII.
        qb.push(" AND LOWER(p.description) LIKE LOWER(")
            .push_bind(like_pattern(search))
            .push(") ESCAPE '\\'");
    }
    if let Some(min) = filter.min_amount {
        qb.push(" AND p.amount_cents >= ").push_bind(min.cents());
    }
    if let Some(max) = filter.max_amount {
        qb.push(" AND p.amount_cents <= ").push_bind(max.cents());
    }
    if let Some(start) = &filter.start {
        qb.push(" AND p.transaction_date >= ")
            .push_bind(timestamp_text(start));
    }
    if let Some(end) = &filter.end {
        qb.push(" AND p.transaction_date <= ")
            .push_bind(timestamp_text(end));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Credential store
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl UserRepository for SqliteRepo {
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        let id = UserId::new();
        let now = Utc::now();
        let now_str = timestamp_text(&now);

        sqlx::query(
            r#"INSERT INTO users (id, email, password_hash, full_name, role, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(id.to_string())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(&now_str)
        .bind(&now_str)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "email already registered"))?;

        Ok(User {
            id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, RepoError> {
        self.fetch_user("id", id.to_string())
            .await?
            .map(DbUser::into_domain)
            .transpose()
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, RepoError> {
        self.fetch_user("email", email.to_string())
            .await?
            .map(DbUser::into_credentials)
            .transpose()
    }

    async fn update_password(&self, id: UserId, password_hash: &str) -> Result<(), RepoError> {
        let result = sqlx::query(r#"UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?"#)
            .bind(password_hash)
            .bind(timestamp_text(&Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokens
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl TokenRepository for SqliteRepo {
    async fn create_refresh_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, RepoError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"INSERT INTO refresh_tokens (id, user_id, token, expires_at, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(token)
        .bind(timestamp_text(&expires_at))
        .bind(timestamp_text(&now))
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "refresh token already exists"))?;

        Ok(RefreshToken {
            id,
            user_id,
            token: token.to_string(),
            expires_at,
            created_at: now,
        })
    }

    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, RepoError> {
        let row: Option<DbRefreshToken<String, String>> = sqlx::query_as(
            r#"SELECT id, user_id, token, expires_at, created_at FROM refresh_tokens WHERE token = ?"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbRefreshToken::into_domain).transpose()
    }

    async fn delete_refresh_token(&self, token: &str) -> Result<(), RepoError> {
        sqlx::query(r#"DELETE FROM refresh_tokens WHERE token = ?"#)
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_refresh_tokens_for_user(&self, user_id: UserId) -> Result<u64, RepoError> {
        let result = sqlx::query(r#"DELETE FROM refresh_tokens WHERE user_id = ?"#)
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let result = sqlx::query(r#"DELETE FROM refresh_tokens WHERE expires_at < ?"#)
            .bind(timestamp_text(&now))
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn create_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetToken, RepoError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let now_str = timestamp_text(&now);

        sqlx::query(
            r#"INSERT INTO password_reset_tokens (id, user_id, token, expires_at, used, created_at, updated_at)
               VALUES (?, ?, ?, ?, 0, ?, ?)"#,
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(token)
        .bind(timestamp_text(&expires_at))
        .bind(&now_str)
        .bind(&now_str)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "reset token already exists"))?;

        Ok(PasswordResetToken {
            id,
            user_id,
            token: token.to_string(),
            expires_at,
            used: false,
            created_at: now,
        })
    }

    async fn find_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<PasswordResetToken>, RepoError> {
        let row: Option<DbResetToken<String, String>> = sqlx::query_as(
            r#"SELECT id, user_id, token, expires_at, used, created_at
               FROM password_reset_tokens WHERE token = ?"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbResetToken::into_domain).transpose()
    }

    async fn mark_reset_token_used(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"UPDATE password_reset_tokens SET used = 1, updated_at = ? WHERE id = ?"#,
        )
        .bind(timestamp_text(&Utc::now()))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn delete_stale_reset_tokens(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let result =
            sqlx::query(r#"DELETE FROM password_reset_tokens WHERE used = 1 OR expires_at < ?"#)
                .bind(timestamp_text(&now))
                .execute(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Payments and the query engine
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl PaymentRepository for SqliteRepo {
    async fn create_payment(&self, payment: NewPayment) -> Result<Payment, RepoError> {
        let id = PaymentId::new();
        let now = Utc::now();
        let now_str = timestamp_text(&now);

        sqlx::query(
            r#"INSERT INTO payments (id, user_id, amount_cents, status, category_id, payment_method_id,
                                     description, transaction_date, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(id.to_string())
        .bind(payment.user_id.to_string())
        .bind(payment.amount.cents())
        .bind(PaymentStatus::Pending.as_str())
        .bind(payment.category_id.to_string())
        .bind(payment.payment_method_id.to_string())
        .bind(&payment.description)
        .bind(timestamp_text(&payment.transaction_date))
        .bind(&now_str)
        .bind(&now_str)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "payment already exists"))?;

        Ok(Payment {
            id,
            user_id: payment.user_id,
            amount: payment.amount,
            status: PaymentStatus::Pending,
            category_id: payment.category_id,
            payment_method_id: payment.payment_method_id,
            description: payment.description,
            transaction_date: payment.transaction_date,
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_payment(
        &self,
        user_id: UserId,
        id: PaymentId,
    ) -> Result<Option<PaymentRecord>, RepoError> {
        let sql = format!("{} WHERE p.id = ? AND p.user_id = ?", PAYMENT_RECORD_SELECT);
        let row: Option<PaymentRecordRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbPaymentRecord::into_domain).transpose()
    }

    async fn update_payment(
        &self,
        user_id: UserId,
        id: PaymentId,
        changes: PaymentChanges,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"UPDATE payments
               SET amount_cents = ?, status = ?, category_id = ?, payment_method_id = ?,
                   description = ?, transaction_date = ?, updated_at = ?
               WHERE id = ? AND user_id = ?"#,
        )
        .bind(changes.amount.cents())
        .bind(changes.status.as_str())
        .bind(changes.category_id.to_string())
        .bind(changes.payment_method_id.to_string())
        .bind(&changes.description)
        .bind(timestamp_text(&changes.transaction_date))
        .bind(timestamp_text(&Utc::now()))
        .bind(id.to_string())
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "payment conflict"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_payment(&self, user_id: UserId, id: PaymentId) -> Result<bool, RepoError> {
        let result = sqlx::query(r#"DELETE FROM payments WHERE id = ? AND user_id = ?"#)
            .bind(id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_payments(
        &self,
        user_id: UserId,
        filter: &PaymentFilter,
        page: Option<PageRequest>,
    ) -> Result<Vec<PaymentRecord>, RepoError> {
        let mut qb = QueryBuilder::<Sqlite>::new(PAYMENT_RECORD_SELECT);
        push_filters(&mut qb, user_id, filter);
        qb.push(PAYMENT_ORDER);
        if let Some(page) = page {
            qb.push(" LIMIT ")
                .push_bind(i64::from(page.limit))
                .push(" OFFSET ")
                .push_bind(page.offset());
        }

        let rows: Vec<PaymentRecordRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbPaymentRecord::into_domain).collect()
    }

    async fn count_payments(
        &self,
        user_id: UserId,
        filter: &PaymentFilter,
    ) -> Result<i64, RepoError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM payments p");
        push_filters(&mut qb, user_id, filter);

        qb.build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }

    async fn payment_statistics(&self, user_id: UserId) -> Result<PaymentStatistics, RepoError> {
        let row: DbStatistics = sqlx::query_as(
            r#"SELECT COUNT(*) AS total_payments,
                      COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0) AS completed_count,
                      COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0) AS pending_count,
                      COALESCE(SUM(CASE WHEN status = 'completed' THEN amount_cents / 1000000 ELSE 0 END), 0) AS total_high,
                      COALESCE(SUM(CASE WHEN status = 'completed' THEN amount_cents % 1000000 ELSE 0 END), 0) AS total_low
               FROM payments WHERE user_id = ?"#,
        )
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.into_domain()
    }

    async fn monthly_totals(
        &self,
        user_id: UserId,
        year: i32,
    ) -> Result<Vec<MonthlyTotal>, RepoError> {
        let Some((start, end)) = year_bounds(year) else {
            return Ok(Vec::new());
        };

        let rows: Vec<DbMonthlyTotal> = sqlx::query_as(
            r#"SELECT CAST(substr(transaction_date, 6, 2) AS INTEGER) AS month,
                      SUM(amount_cents / 1000000) AS total_high,
                      SUM(amount_cents % 1000000) AS total_low,
                      COUNT(*) AS count
               FROM payments
               WHERE user_id = ? AND status = 'completed'
                 AND transaction_date >= ? AND transaction_date < ?
               GROUP BY month
               ORDER BY month"#,
        )
        .bind(user_id.to_string())
        .bind(timestamp_text(&start))
        .bind(timestamp_text(&end))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbMonthlyTotal::into_domain).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reference data
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LookupRepository for SqliteRepo {
    async fn list_categories(&self) -> Result<Vec<Category>, RepoError> {
        let rows: Vec<DbCategory<String, String>> = sqlx::query_as(
            r#"SELECT id, name, description, created_at FROM categories ORDER BY name ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbCategory::into_domain).collect()
    }

    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, RepoError> {
        let rows: Vec<DbPaymentMethod<String, String>> = sqlx::query_as(
            r#"SELECT id, name, code, is_active, created_at FROM payment_methods
               WHERE is_active = 1 ORDER BY name ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbPaymentMethod::into_domain).collect()
    }

    async fn category_exists(&self, id: Uuid) -> Result<bool, RepoError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM categories WHERE id = ?"#)
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    async fn payment_method_exists(&self, id: Uuid) -> Result<bool, RepoError> {
        let count: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM payment_methods WHERE id = ?"#)
                .bind(id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    async fn seed_reference_data(&self) -> Result<(), RepoError> {
        let now = timestamp_text(&Utc::now());

        for (name, code) in DEFAULT_PAYMENT_METHODS {
            sqlx::query(
                r#"INSERT INTO payment_methods (id, name, code, is_active, created_at)
                   VALUES (?, ?, ?, 1, ?) ON CONFLICT (code) DO NOTHING"#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(*name)
            .bind(*code)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        }

        for (name, description) in DEFAULT_CATEGORIES {
            sqlx::query(
                r#"INSERT INTO categories (id, name, description, created_at)
                   VALUES (?, ?, ?, ?) ON CONFLICT (name) DO NOTHING"#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(*name)
            .bind(*description)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        }

        tracing::debug!("Reference data seeded");
        Ok(())
    }
}
