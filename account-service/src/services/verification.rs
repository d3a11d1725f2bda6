use chrono::Duration;
use rand::rngs::OsRng;
use rand::Rng;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::models::{Account, PendingVerification};
use crate::services::Clock;

pub const CODE_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("Email already verified")]
    AlreadyVerified,

    #[error("Invalid verification code")]
    CodeMismatch,

    #[error("Verification code has expired")]
    CodeExpired,
}

/// Source of verification codes.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Six independent uniform digits from the OS CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRngCodeGenerator;

impl CodeGenerator for OsRngCodeGenerator {
    fn generate(&self) -> String {
        let mut rng = OsRng;
        (0..CODE_LENGTH)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }
}

/// Always returns the same code.
#[derive(Debug, Clone)]
pub struct FixedCodeGenerator(pub String);

impl CodeGenerator for FixedCodeGenerator {
    fn generate(&self) -> String {
        self.0.clone()
    }
}

/// Unverified(code, expires_at) -> Verified.
#[derive(Clone)]
pub struct VerificationWorkflow {
    clock: Arc<dyn Clock>,
    generator: Arc<dyn CodeGenerator>,
    code_ttl: Duration,
}

impl VerificationWorkflow {
    pub fn new(
        clock: Arc<dyn Clock>,
        generator: Arc<dyn CodeGenerator>,
        code_ttl_minutes: i64,
    ) -> Self {
        Self {
            clock,
            generator,
            code_ttl: Duration::minutes(code_ttl_minutes),
        }
    }

    pub fn issue_code(&self) -> String {
        self.generator.generate()
    }

    /// A fresh code expiring one TTL from now.
    pub fn start(&self) -> PendingVerification {
        PendingVerification {
            code: self.issue_code(),
            expires_at: self.clock.now() + self.code_ttl,
        }
    }

    /// Decide whether `supplied` verifies `account`. Applying the transition
    /// is left to the caller.
    pub fn attempt_verify(&self, account: &Account, supplied: &str) -> Result<(), VerificationError> {
        if account.is_verified {
            return Err(VerificationError::AlreadyVerified);
        }

        // Compare against an empty code when none is pending so the check
        // still runs.
        let (stored, expires_at) = match &account.verification {
            Some(pending) => (pending.code.as_str(), Some(pending.expires_at)),
            None => ("", None),
        };

        let matches: bool = stored.as_bytes().ct_eq(supplied.as_bytes()).into();
        let Some(expires_at) = expires_at.filter(|_| matches) else {
            return Err(VerificationError::CodeMismatch);
        };

        if self.clock.now() > expires_at {
            return Err(VerificationError::CodeExpired);
        }

        Ok(())
    }

    pub fn resend(&self, account: &Account) -> Result<PendingVerification, VerificationError> {
        if account.is_verified {
            return Err(VerificationError::AlreadyVerified);
        }
        Ok(self.start())
    }
}
