//! PostgreSQL repository adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
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
    map_write_error, year_bounds,
};

type UserRow = DbUser<Uuid, DateTime<Utc>>;
type PaymentRecordRow = DbPaymentRecord<Uuid, DateTime<Utc>>;

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository implementation.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
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

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_tables_pg.sql"),
        "0001",
    )
    .await
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration and seeding.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        let repo = Self { pool };
        repo.seed_reference_data().await?;
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        run_migrations(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }
}

/// Appends the owner scope and every set filter as `AND` clauses.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, user_id: UserId, filter: &PaymentFilter) {
    qb.push(" WHERE p.user_id = ").push_bind(user_id.into_uuid());

    if let Some(status) = filter.status {
        qb.push(" AND p.status = ").push_bind(status.as_str());
    }
    if let Some(search) = &filter.search {
        qb.push(" AND p.description ILIKE ")
            .push_bind(like_pattern(search))
            .push(" ESCAPE '\\'");
    }
    if let Some(min) = filter.min_amount {
        qb.push(" AND p.amount_cents >= ").push_bind(min.cents());
    }
    if let Some(max) = filter.max_amount {
        qb.push(" AND p.amount_cents <= ").push_bind(max.cents());
    }
    if let Some(start) = filter.start {
        qb.push(" AND p.transaction_date >= ").push_bind(start);
    }
    if let Some(end) = filter.end {
        qb.push(" AND p.transaction_date <= ").push_bind(end);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Credential store
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl UserRepository for PostgresRepo {
    async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
        let id = UserId::new();
        let now = Utc::now();

        sqlx::query(
            r#"INSERT INTO users (id, email, password_hash, full_name, role, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $6)"#,
        )
        .bind(id.into_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(now)
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
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbUser::into_domain).transpose()
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, RepoError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbUser::into_credentials).transpose()
    }

    async fn update_password(&self, id: UserId, password_hash: &str) -> Result<(), RepoError> {
        let result =
            sqlx::query(r#"UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2"#)
                .bind(password_hash)
                .bind(id.into_uuid())
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
impl TokenRepository for PostgresRepo {
    async fn create_refresh_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, RepoError> {
        let row: DbRefreshToken<Uuid, DateTime<Utc>> = sqlx::query_as(
            r#"INSERT INTO refresh_tokens (id, user_id, token, expires_at)
               VALUES ($1, $2, $3, $4)
               RETURNING id, user_id, token, expires_at, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id.into_uuid())
        .bind(token)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "refresh token already exists"))?;

        row.into_domain()
    }

    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, RepoError> {
        let row: Option<DbRefreshToken<Uuid, DateTime<Utc>>> = sqlx::query_as(
            r#"SELECT id, user_id, token, expires_at, created_at FROM refresh_tokens WHERE token = $1"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbRefreshToken::into_domain).transpose()
    }

    async fn delete_refresh_token(&self, token: &str) -> Result<(), RepoError> {
        sqlx::query(r#"DELETE FROM refresh_tokens WHERE token = $1"#)
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_refresh_tokens_for_user(&self, user_id: UserId) -> Result<u64, RepoError> {
        let result = sqlx::query(r#"DELETE FROM refresh_tokens WHERE user_id = $1"#)
            .bind(user_id.into_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let result = sqlx::query(r#"DELETE FROM refresh_tokens WHERE expires_at < $1"#)
            .bind(now)
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
        let row: DbResetToken<Uuid, DateTime<Utc>> = sqlx::query_as(
            r#"INSERT INTO password_reset_tokens (id, user_id, token, expires_at)
               VALUES ($1, $2, $3, $4)
               RETURNING id, user_id, token, expires_at, used, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id.into_uuid())
        .bind(token)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "reset token already exists"))?;

        row.into_domain()
    }

    async fn find_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<PasswordResetToken>, RepoError> {
        let row: Option<DbResetToken<Uuid, DateTime<Utc>>> = sqlx::query_as(
            r#"SELECT id, user_id, token, expires_at, used, created_at
               FROM password_reset_tokens WHERE token = $1"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbResetToken::into_domain).transpose()
    }

    async fn mark_reset_token_used(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"UPDATE password_reset_tokens SET used = TRUE, updated_at = NOW() WHERE id = $1"#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn delete_stale_reset_tokens(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let result = sqlx::query(
            r#"DELETE FROM password_reset_tokens WHERE used = TRUE OR expires_at < $1"#,
        )
        .bind(now)
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
impl PaymentRepository for PostgresRepo {
    async fn create_payment(&self, payment: NewPayment) -> Result<Payment, RepoError> {
        let id = PaymentId::new();
        let now = Utc::now();

        sqlx::query(
            r#"INSERT INTO payments (id, user_id, amount_cents, status, category_id, payment_method_id,
                                     description, transaction_date, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)"#,
        )
        .bind(id.into_uuid())
        .bind(payment.user_id.into_uuid())
        .bind(payment.amount.cents())
        .bind(PaymentStatus::Pending.as_str())
        .bind(payment.category_id)
        .bind(payment.payment_method_id)
        .bind(&payment.description)
        .bind(payment.transaction_date)
        .bind(now)
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
        let sql = format!("{} WHERE p.id = $1 AND p.user_id = $2", PAYMENT_RECORD_SELECT);
        let row: Option<PaymentRecordRow> = sqlx::query_as(&sql)
            .bind(id.into_uuid())
            .bind(user_id.into_uuid())
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
               SET amount_cents = $1, status = $2, category_id = $3, payment_method_id = $4,
                   description = $5, transaction_date = $6, updated_at = NOW()
               WHERE id = $7 AND user_id = $8"#,
        )
        .bind(changes.amount.cents())
        .bind(changes.status.as_str())
        .bind(changes.category_id)
        .bind(changes.payment_method_id)
        .bind(&changes.description)
        .bind(changes.transaction_date)
        .bind(id.into_uuid())
        .bind(user_id.into_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "payment conflict"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_payment(&self, user_id: UserId, id: PaymentId) -> Result<bool, RepoError> {
        let result = sqlx::query(r#"DELETE FROM payments WHERE id = $1 AND user_id = $2"#)
            .bind(id.into_uuid())
            .bind(user_id.into_uuid())
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
        let mut qb = QueryBuilder::<Postgres>::new(PAYMENT_RECORD_SELECT);
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
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM payments p");
        push_filters(&mut qb, user_id, filter);

        qb.build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }

    async fn payment_statistics(&self, user_id: UserId) -> Result<PaymentStatistics, RepoError> {
        let row: DbStatistics = sqlx::query_as(
            r#"SELECT COUNT(*) AS total_payments,
                      COUNT(*) FILTER (WHERE status = 'completed') AS completed_count,
                      COUNT(*) FILTER (WHERE status = 'pending') AS pending_count,
                      COALESCE(SUM(amount_cents / 1000000) FILTER (WHERE status = 'completed'), 0)::BIGINT AS total_high,
                      COALESCE(SUM(amount_cents % 1000000) FILTER (WHERE status = 'completed'), 0)::BIGINT AS total_low
               FROM payments WHERE user_id = $1"#,
        )
        .bind(user_id.into_uuid())
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
            r#"SELECT EXTRACT(MONTH FROM transaction_date AT TIME ZONE 'UTC')::BIGINT AS month,
                      SUM(amount_cents / 1000000)::BIGINT AS total_high,
                      SUM(amount_cents % 1000000)::BIGINT AS total_low,
                      COUNT(*) AS count
               FROM payments
               WHERE user_id = $1 AND status = 'completed'
                 AND transaction_date >= $2 AND transaction_date < $3
               GROUP BY 1
               ORDER BY 1"#,
        )
        .bind(user_id.into_uuid())
        .bind(start)
        .bind(end)
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
impl LookupRepository for PostgresRepo {
    async fn list_categories(&self) -> Result<Vec<Category>, RepoError> {
        let rows: Vec<DbCategory<Uuid, DateTime<Utc>>> = sqlx::query_as(
            r#"SELECT id, name, description, created_at FROM categories ORDER BY name ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbCategory::into_domain).collect()
    }

    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, RepoError> {
        let rows: Vec<DbPaymentMethod<Uuid, DateTime<Utc>>> = sqlx::query_as(
            r#"SELECT id, name, code, is_active, created_at FROM payment_methods
               WHERE is_active ORDER BY name ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbPaymentMethod::into_domain).collect()
    }

    async fn category_exists(&self, id: Uuid) -> Result<bool, RepoError> {
        sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)"#)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }

    async fn payment_method_exists(&self, id: Uuid) -> Result<bool, RepoError> {
        sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM payment_methods WHERE id = $1)"#)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }

    async fn seed_reference_data(&self) -> Result<(), RepoError> {
        for (name, code) in DEFAULT_PAYMENT_METHODS {
            sqlx::query(
                r#"INSERT INTO payment_methods (id, name, code, is_active)
                   VALUES ($1, $2, $3, TRUE) ON CONFLICT (code) DO NOTHING"#,
            )
            .bind(Uuid::new_v4())
            .bind(*name)
            .bind(*code)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        }

        for (name, description) in DEFAULT_CATEGORIES {
            sqlx::query(
                r#"INSERT INTO categories (id, name, description)
                   VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING"#,
            )
            .bind(Uuid::new_v4())
            .bind(*name)
            .bind(*description)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        }

        tracing::debug!("Reference data seeded");
        Ok(())
    }
}
