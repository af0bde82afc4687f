//! Domain models for the payment tracking service.

pub mod amount;
pub mod lookup;
pub mod payment;
pub mod query;
pub mod stats;
pub mod token;
pub mod user;

pub use amount::Amount;
pub use lookup::{Category, DEFAULT_CATEGORIES, DEFAULT_PAYMENT_METHODS, PaymentMethod};
pub use payment::{NewPayment, Payment, PaymentChanges, PaymentId, PaymentRecord, PaymentStatus};
pub use query::{PageRequest, PaymentFilter};
pub use stats::{MonthlyTotal, PaymentStatistics};
pub use token::{Claims, PasswordResetToken, RefreshToken};
pub use user::{NewUser, Role, User, UserCredentials, UserId, UserSummary};
