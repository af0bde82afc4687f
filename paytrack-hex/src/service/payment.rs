//! Payment Application Service
//!
//! Orchestrates payment operations through the repository port.
//! Every operation is scoped to the authenticated owner.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use uuid::Uuid;

use paytrack_types::{
    AppError, Category, CreatePaymentRequest, FieldError, LookupRepository, MonthlyTotal,
    PageRequest, PaymentId, PaymentListQuery, PaymentMethod, PaymentPage, PaymentRecord,
    PaymentRepository, PaymentStatistics, UpdatePaymentRequest, UserId,
};

use super::export::payments_to_csv;

/// Rows shown on the dashboard's recent list.
pub const RECENT_PAYMENTS: u32 = 5;

/// Application service for payment operations.
///
/// Generic over the repository ports so tests can inject an in-memory store.
pub struct PaymentService<R: PaymentRepository + LookupRepository> {
    repo: Arc<R>,
}

impl<R: PaymentRepository + LookupRepository> PaymentService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    // ─────────────────────────────────────────────────────────────────────────
    // CRUD
    // ─────────────────────────────────────────────────────────────────────────

    #[tracing::instrument(skip(self, req))]
    pub async fn create(
        &self,
        user_id: UserId,
        req: CreatePaymentRequest,
    ) -> Result<PaymentRecord, AppError> {
        let (category_id, method_id) = (req.category_id, req.payment_method_id);
        let converted = req.into_new_payment(user_id);
        let new_payment = self
            .check_references(category_id, method_id, converted)
            .await?;

        let payment = self.repo.create_payment(new_payment).await?;
        tracing::info!(payment_id = %payment.id, "Payment created");
        self.get(user_id, payment.id).await
    }

    pub async fn get(&self, user_id: UserId, id: PaymentId) -> Result<PaymentRecord, AppError> {
        self.repo
            .find_payment(user_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment {}", id)))
    }

    /// Replaces every mutable field of the payment.
    #[tracing::instrument(skip(self, req))]
    pub async fn update(
        &self,
        user_id: UserId,
        id: PaymentId,
        req: UpdatePaymentRequest,
    ) -> Result<PaymentRecord, AppError> {
        let (category_id, method_id) = (req.category_id, req.payment_method_id);
        let converted = req.into_changes();
        let changes = self
            .check_references(category_id, method_id, converted)
            .await?;

        if !self.repo.update_payment(user_id, id, changes).await? {
            return Err(AppError::NotFound(format!("Payment {}", id)));
        }
        self.get(user_id, id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, user_id: UserId, id: PaymentId) -> Result<(), AppError> {
        if !self.repo.delete_payment(user_id, id).await? {
            return Err(AppError::NotFound(format!("Payment {}", id)));
        }
        Ok(())
    }

    /// Merges unknown category / payment method errors into the request's
    /// own validation result so the client sees every problem at once.
    async fn check_references<T>(
        &self,
        category_id: Uuid,
        method_id: Uuid,
        converted: Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut missing = Vec::new();
        if !self.repo.category_exists(category_id).await? {
            missing.push(FieldError::new("category_id", "Category not found"));
        }
        if !self.repo.payment_method_exists(method_id).await? {
            missing.push(FieldError::new("payment_method_id", "Payment method not found"));
        }

        match converted {
            Ok(value) if missing.is_empty() => Ok(value),
            Ok(_) => Err(AppError::Validation(missing)),
            Err(AppError::Validation(mut details)) => {
                details.extend(missing);
                details.sort_by(|a, b| a.field.cmp(&b.field));
                Err(AppError::Validation(details))
            }
            Err(other) => Err(other),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        user_id: UserId,
        query: &PaymentListQuery,
    ) -> Result<PaymentPage, AppError> {
        let (filter, page) = query.parse()?;

        let payments = self
            .repo
            .list_payments(user_id, &filter, Some(page))
            .await?;
        let total = self.repo.count_payments(user_id, &filter).await?;

        Ok(PaymentPage {
            payments,
            total,
            page: page.page,
            limit: page.limit,
        })
    }

    /// Every matching payment as CSV, ignoring pagination.
    #[tracing::instrument(skip(self))]
    pub async fn export_csv(
        &self,
        user_id: UserId,
        query: &PaymentListQuery,
    ) -> Result<Vec<u8>, AppError> {
        let (filter, _) = query.parse()?;
        let records = self.repo.list_payments(user_id, &filter, None).await?;
        tracing::info!(rows = records.len(), "Exporting payments");
        payments_to_csv(&records)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dashboard
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn statistics(&self, user_id: UserId) -> Result<PaymentStatistics, AppError> {
        self.repo
            .payment_statistics(user_id)
            .await
            .map_err(Into::into)
    }

    /// Completed totals per month of `year` (default: current UTC year).
    pub async fn monthly(
        &self,
        user_id: UserId,
        year: Option<i32>,
    ) -> Result<Vec<MonthlyTotal>, AppError> {
        let year = year.unwrap_or_else(|| Utc::now().year());
        self.repo
            .monthly_totals(user_id, year)
            .await
            .map_err(Into::into)
    }

    pub async fn recent(&self, user_id: UserId) -> Result<Vec<PaymentRecord>, AppError> {
        self.repo
            .list_payments(
                user_id,
                &Default::default(),
                Some(PageRequest::new(1, RECENT_PAYMENTS)),
            )
            .await
            .map_err(Into::into)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reference data
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn categories(&self) -> Result<Vec<Category>, AppError> {
        self.repo.list_categories().await.map_err(Into::into)
    }

    pub async fn payment_methods(&self) -> Result<Vec<PaymentMethod>, AppError> {
        self.repo.list_payment_methods().await.map_err(Into::into)
    }
}
