//! Application service tests.
//!
//! Auth runs against an in-memory mock of the user and token ports; payment
//! tests use the SQLite adapter so the query engine is exercised end to end.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Duration, Utc};
    use rust_decimal::Decimal;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use paytrack_repo::SqliteRepo;
    use paytrack_types::{
        AppError, CreatePaymentRequest, ForgotPasswordRequest, LoginRequest, NewUser,
        PasswordResetToken, PaymentListQuery, PaymentStatus, RefreshToken, RefreshTokenRequest,
        RegisterRequest, RepoError, ResetPasswordRequest, TokenRepository, UpdatePaymentRequest,
        User, UserCredentials, UserId, UserRepository,
    };

    use crate::notify::{MailJob, MailOutbox};
    use crate::service::{AuthService, PaymentService, TokenService, CSV_HEADER};

    const SECRET: &str = "test-secret-that-is-at-least-32-bytes-long";

    // ─────────────────────────────────────────────────────────────────────────
    // In-memory user and token store
    // ─────────────────────────────────────────────────────────────────────────

    #[derive(Default)]
    pub(crate) struct MockRepo {
        users: Mutex<HashMap<UserId, UserCredentials>>,
        refresh: Mutex<HashMap<String, RefreshToken>>,
        resets: Mutex<HashMap<String, PasswordResetToken>>,
    }

    impl MockRepo {
        fn expire_refresh_token(&self, token: &str) {
            let mut refresh = self.refresh.lock().unwrap();
            let stored = refresh.get_mut(token).unwrap();
            stored.expires_at = Utc::now() - Duration::seconds(1);
        }

        fn has_refresh_token(&self, token: &str) -> bool {
            self.refresh.lock().unwrap().contains_key(token)
        }

        fn password_hash(&self, id: UserId) -> String {
            self.users.lock().unwrap()[&id].password_hash.clone()
        }
    }

    #[async_trait::async_trait]
    impl UserRepository for MockRepo {
        async fn create_user(&self, user: NewUser) -> Result<User, RepoError> {
            let mut users = self.users.lock().unwrap();
            if users.values().any(|c| c.user.email == user.email) {
                return Err(RepoError::Conflict("email already registered".into()));
            }
            let now = Utc::now();
            let created = User {
                id: UserId::new(),
                email: user.email,
                full_name: user.full_name,
                role: user.role,
                created_at: now,
                updated_at: now,
            };
            users.insert(
                created.id,
                UserCredentials {
                    user: created.clone(),
                    password_hash: user.password_hash,
                },
            );
            Ok(created)
        }

        async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, RepoError> {
            Ok(self.users.lock().unwrap().get(&id).map(|c| c.user.clone()))
        }

        async fn find_credentials_by_email(
            &self,
            email: &str,
        ) -> Result<Option<UserCredentials>, RepoError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|c| c.user.email == email)
                .cloned())
        }

        async fn update_password(&self, id: UserId, password_hash: &str) -> Result<(), RepoError> {
            let mut users = self.users.lock().unwrap();
            let credentials = users.get_mut(&id).ok_or(RepoError::NotFound)?;
            credentials.password_hash = password_hash.to_string();
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl TokenRepository for MockRepo {
        async fn create_refresh_token(
            &self,
            user_id: UserId,
            token: &str,
            expires_at: DateTime<Utc>,
        ) -> Result<RefreshToken, RepoError> {
            let stored = RefreshToken {
                id: Uuid::new_v4(),
                user_id,
                token: token.to_string(),
                expires_at,
                created_at: Utc::now(),
            };
            self.refresh
                .lock()
                .unwrap()
                .insert(token.to_string(), stored.clone());
            Ok(stored)
        }

        async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, RepoError> {
            Ok(self.refresh.lock().unwrap().get(token).cloned())
        }

        async fn delete_refresh_token(&self, token: &str) -> Result<(), RepoError> {
            self.refresh.lock().unwrap().remove(token);
            Ok(())
        }

        async fn delete_refresh_tokens_for_user(&self, user_id: UserId) -> Result<u64, RepoError> {
            let mut refresh = self.refresh.lock().unwrap();
            let before = refresh.len();
            refresh.retain(|_, t| t.user_id != user_id);
            Ok((before - refresh.len()) as u64)
        }

        async fn delete_expired_refresh_tokens(
            &self,
            now: DateTime<Utc>,
        ) -> Result<u64, RepoError> {
            let mut refresh = self.refresh.lock().unwrap();
            let before = refresh.len();
            refresh.retain(|_, t| !t.is_expired(now));
            Ok((before - refresh.len()) as u64)
        }

        async fn create_reset_token(
            &self,
            user_id: UserId,
            token: &str,
            expires_at: DateTime<Utc>,
        ) -> Result<PasswordResetToken, RepoError> {
            let stored = PasswordResetToken {
                id: Uuid::new_v4(),
                user_id,
                token: token.to_string(),
                expires_at,
                used: false,
                created_at: Utc::now(),
            };
            self.resets
                .lock()
                .unwrap()
                .insert(token.to_string(), stored.clone());
            Ok(stored)
        }

        async fn find_reset_token(
            &self,
            token: &str,
        ) -> Result<Option<PasswordResetToken>, RepoError> {
            Ok(self.resets.lock().unwrap().get(token).cloned())
        }

        async fn mark_reset_token_used(&self, id: Uuid) -> Result<(), RepoError> {
            let mut resets = self.resets.lock().unwrap();
            let stored = resets
                .values_mut()
                .find(|t| t.id == id)
                .ok_or(RepoError::NotFound)?;
            stored.used = true;
            Ok(())
        }

        async fn delete_stale_reset_tokens(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
            let mut resets = self.resets.lock().unwrap();
            let before = resets.len();
            resets.retain(|_, t| t.is_redeemable(now));
            Ok((before - resets.len()) as u64)
        }
    }

    fn auth_service() -> (
        AuthService<MockRepo>,
        Arc<MockRepo>,
        mpsc::Receiver<MailJob>,
    ) {
        let repo = Arc::new(MockRepo::default());
        let (outbox, rx) = MailOutbox::channel(8);
        let tokens = TokenService::new(SECRET, Duration::hours(1));
        (AuthService::new(repo.clone(), tokens, outbox), repo, rx)
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "hunter22".to_string(),
            full_name: "Alice Doe".to_string(),
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Auth
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_register_issues_session() {
        let (service, repo, _rx) = auth_service();

        let session = service
            .register(register_request("alice@example.com"))
            .await
            .unwrap();

        assert_eq!(session.user.email, "alice@example.com");
        assert_eq!(session.expires_in, 3600);
        assert!(repo.has_refresh_token(&session.refresh_token));
        let claims = service.validate_token(&session.token).unwrap();
        assert_eq!(claims.sub, session.user.id);
    }

    #[tokio::test]
    async fn test_register_stores_hash_not_password() {
        let (service, repo, _rx) = auth_service();

        let session = service
            .register(register_request("alice@example.com"))
            .await
            .unwrap();

        let hash = repo.password_hash(session.user.id);
        assert_ne!(hash, "hunter22");
        assert!(hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let (service, _repo, _rx) = auth_service();
        service
            .register(register_request("alice@example.com"))
            .await
            .unwrap();

        let result = service.register(register_request("alice@example.com")).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_register_invalid_fields_rejected() {
        let (service, _repo, _rx) = auth_service();

        let result = service
            .register(RegisterRequest {
                email: "not-an-email".into(),
                password: "123".into(),
                full_name: "A".into(),
            })
            .await;

        match result {
            Err(AppError::Validation(details)) => {
                let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, ["email", "full_name", "password"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_wrong_password_unauthorized() {
        let (service, _repo, _rx) = auth_service();
        service
            .register(register_request("alice@example.com"))
            .await
            .unwrap();

        let wrong = service
            .login(login_request("alice@example.com", "wrong-pass"))
            .await;
        let unknown = service
            .login(login_request("bob@example.com", "hunter22"))
            .await;

        match (wrong, unknown) {
            (Err(AppError::Unauthorized(a)), Err(AppError::Unauthorized(b))) => assert_eq!(a, b),
            other => panic!("expected two unauthorized errors, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_revokes_previous_refresh_token() {
        let (service, _repo, _rx) = auth_service();
        let first = service
            .register(register_request("alice@example.com"))
            .await
            .unwrap();

        let second = service
            .login(login_request("alice@example.com", "hunter22"))
            .await
            .unwrap();

        let stale = service
            .refresh(RefreshTokenRequest {
                refresh_token: first.refresh_token,
            })
            .await;
        assert!(matches!(stale, Err(AppError::Unauthorized(_))));

        let fresh = service
            .refresh(RefreshTokenRequest {
                refresh_token: second.refresh_token.clone(),
            })
            .await
            .unwrap();
        assert_eq!(fresh.refresh_token, second.refresh_token);
    }

    #[tokio::test]
    async fn test_refresh_expired_token_rejected_and_removed() {
        let (service, repo, _rx) = auth_service();
        let session = service
            .register(register_request("alice@example.com"))
            .await
            .unwrap();
        repo.expire_refresh_token(&session.refresh_token);

        let result = service
            .refresh(RefreshTokenRequest {
                refresh_token: session.refresh_token.clone(),
            })
            .await;

        match result {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "refresh token expired"),
            other => panic!("expected unauthorized, got {:?}", other),
        }
        assert!(!repo.has_refresh_token(&session.refresh_token));
    }

    #[tokio::test]
    async fn test_logout_revokes_refresh_tokens() {
        let (service, repo, _rx) = auth_service();
        let session = service
            .register(register_request("alice@example.com"))
            .await
            .unwrap();

        let revoked = service.logout(session.user.id).await.unwrap();

        assert_eq!(revoked, 1);
        assert!(!repo.has_refresh_token(&session.refresh_token));
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_email_is_silent() {
        let (service, _repo, mut rx) = auth_service();

        service
            .forgot_password(ForgotPasswordRequest {
                email: "ghost@example.com".into(),
            })
            .await
            .unwrap();

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let (service, _repo, mut rx) = auth_service();
        service
            .register(register_request("alice@example.com"))
            .await
            .unwrap();

        service
            .forgot_password(ForgotPasswordRequest {
                email: "alice@example.com".into(),
            })
            .await
            .unwrap();
        let MailJob::PasswordReset { email, token } = rx.try_recv().unwrap();
        assert_eq!(email, "alice@example.com");

        service
            .reset_password(ResetPasswordRequest {
                token: token.clone(),
                new_password: "new-secret".into(),
            })
            .await
            .unwrap();

        assert!(
            service
                .login(login_request("alice@example.com", "new-secret"))
                .await
                .is_ok()
        );
        assert!(
            service
                .login(login_request("alice@example.com", "hunter22"))
                .await
                .is_err()
        );

        let reused = service
            .reset_password(ResetPasswordRequest {
                token,
                new_password: "another-one".into(),
            })
            .await;
        match reused {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "invalid or expired token"),
            other => panic!("expected bad request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_tokens() {
        let (service, repo, _rx) = auth_service();
        let session = service
            .register(register_request("alice@example.com"))
            .await
            .unwrap();
        repo.expire_refresh_token(&session.refresh_token);

        let report = service.sweep_expired_tokens().await.unwrap();

        assert_eq!(report.refresh_tokens, 1);
        assert_eq!(report.reset_tokens, 0);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payments
    // ─────────────────────────────────────────────────────────────────────────

    struct PaymentFixture {
        service: PaymentService<SqliteRepo>,
        user: UserId,
        category: Uuid,
        method: Uuid,
    }

    async fn payment_fixture() -> PaymentFixture {
        let repo = Arc::new(SqliteRepo::new("sqlite::memory:").await.unwrap());
        let user = repo
            .create_user(NewUser {
                email: "alice@example.com".into(),
                password_hash: "$argon2id$stub".into(),
                full_name: "Alice Doe".into(),
                role: Default::default(),
            })
            .await
            .unwrap()
            .id;
        let service = PaymentService::new(repo);
        let category = service.categories().await.unwrap()[0].id;
        let method = service.payment_methods().await.unwrap()[0].id;
        PaymentFixture {
            service,
            user,
            category,
            method,
        }
    }

    impl PaymentFixture {
        fn create_request(&self, amount: &str, description: &str) -> CreatePaymentRequest {
            CreatePaymentRequest {
                amount: amount.parse::<Decimal>().unwrap(),
                category_id: self.category,
                payment_method_id: self.method,
                description: description.to_string(),
                transaction_date: "2024-06-01T10:30:00Z".to_string(),
            }
        }

        async fn add(&self, amount: &str, description: &str, status: PaymentStatus) {
            let record = self
                .service
                .create(self.user, self.create_request(amount, description))
                .await
                .unwrap();
            if status != PaymentStatus::Pending {
                let p = record.payment;
                self.service
                    .update(
                        self.user,
                        p.id,
                        UpdatePaymentRequest {
                            amount: p.amount.to_decimal(),
                            status: status.as_str().to_string(),
                            category_id: p.category_id,
                            payment_method_id: p.payment_method_id,
                            description: p.description,
                            transaction_date: p.transaction_date.to_rfc3339(),
                        },
                    )
                    .await
                    .unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_create_payment_starts_pending() {
        let f = payment_fixture().await;

        let record = f
            .service
            .create(f.user, f.create_request("49.99", "Groceries"))
            .await
            .unwrap();

        assert_eq!(record.payment.status, PaymentStatus::Pending);
        assert_eq!(record.payment.amount.cents(), 4999);
        assert_eq!(record.user.email, "alice@example.com");
        assert_eq!(record.category.id, f.category);
    }

    #[tokio::test]
    async fn test_create_payment_reports_every_invalid_field() {
        let f = payment_fixture().await;
        let mut req = f.create_request("0", "x");
        req.category_id = Uuid::new_v4();
        req.transaction_date = "yesterday".into();

        let result = f.service.create(f.user, req).await;

        match result {
            Err(AppError::Validation(details)) => {
                let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, ["amount", "category_id", "transaction_date"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_other_users_payment_not_found() {
        let f = payment_fixture().await;
        let record = f
            .service
            .create(f.user, f.create_request("10", "Lunch"))
            .await
            .unwrap();

        let result = f.service.get(UserId::new(), record.payment.id).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_payment_not_found() {
        let f = payment_fixture().await;

        let result = f
            .service
            .delete(f.user, paytrack_types::PaymentId::new())
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_statistics_sum_completed_only() {
        let f = payment_fixture().await;
        f.add("100", "Rent share", PaymentStatus::Completed).await;
        f.add("50", "Utilities", PaymentStatus::Completed).await;
        f.add("30", "Pending order", PaymentStatus::Pending).await;

        let stats = f.service.statistics(f.user).await.unwrap();

        assert_eq!(stats.total_payments, 3);
        assert_eq!(stats.completed_count, 2);
        assert_eq!(stats.pending_count, 1);
        assert_eq!(stats.total_amount.to_string(), "150.00");
    }

    #[tokio::test]
    async fn test_list_paginates_with_total() {
        let f = payment_fixture().await;
        for i in 0..12 {
            f.add("5", &format!("Coffee {}", i), PaymentStatus::Pending)
                .await;
        }

        let page = f
            .service
            .list(
                f.user,
                &PaymentListQuery {
                    page: Some("2".into()),
                    limit: Some("5".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(page.total, 12);
        assert_eq!(page.payments.len(), 5);
        assert_eq!((page.page, page.limit), (2, 5));
    }

    #[tokio::test]
    async fn test_list_rejects_malformed_filter() {
        let f = payment_fixture().await;

        let result = f
            .service
            .list(
                f.user,
                &PaymentListQuery {
                    status: Some("lost".into()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_export_csv_ignores_pagination() {
        let f = payment_fixture().await;
        f.add("12.5", "Netflix", PaymentStatus::Completed).await;
        f.add("3", "Bus", PaymentStatus::Pending).await;

        let csv = f
            .service
            .export_csv(
                f.user,
                &PaymentListQuery {
                    limit: Some("1".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let text = String::from_utf8(csv).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], CSV_HEADER.join(","));
        assert_eq!(lines.len(), 3);
        assert!(text.contains("Netflix,12.50"));
    }

    #[tokio::test]
    async fn test_recent_limited_to_five() {
        let f = payment_fixture().await;
        for i in 0..7 {
            f.add("1", &format!("Snack {}", i), PaymentStatus::Pending)
                .await;
        }

        let recent = f.service.recent(f.user).await.unwrap();

        assert_eq!(recent.len(), 5);
    }
}
