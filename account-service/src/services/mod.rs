//! Services layer for account-service.
//!
//! Business logic sits behind the store, clock, code-generator and email
//! seams so that each has a production and a test implementation.

mod account;
mod clock;
mod database;
mod email;
pub mod error;
mod jwt;
pub mod metrics;
mod store;
mod verification;

pub use account::AccountService;
pub use clock::{Clock, ManualClock, SystemClock};
pub use database::Database;
pub use email::{EmailProvider, EmailService, LogEmailService, MockEmailService, SentEmail};
pub use error::ServiceError;
pub use jwt::{JwtService, TokenClaims, TokenError, TokenPair, TokenSubject};
pub use store::{AccountStore, InMemoryAccountStore, StoreError};
pub use verification::{
    CodeGenerator, FixedCodeGenerator, OsRngCodeGenerator, VerificationError,
    VerificationWorkflow, CODE_LENGTH,
};
