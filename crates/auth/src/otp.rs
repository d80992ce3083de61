//! One-time passcodes for passwordless login and password reset.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const OTP_DIGITS: usize = 6;
pub const OTP_VALIDITY_MINUTES: i64 = 10;
pub const OTP_MAX_ATTEMPTS: u8 = 3;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    Login,
    PasswordReset,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OtpError {
    #[error("OTP has expired")]
    Expired,

    #[error("OTP has already been used")]
    AlreadyUsed,

    #[error("too many OTP attempts")]
    TooManyAttempts,

    #[error("invalid OTP")]
    Mismatch,

    #[error("OTP was issued for a different purpose")]
    WrongPurpose,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpCode {
    pub code: String,
    pub purpose: OtpPurpose,
    pub expires_at: DateTime<Utc>,
    pub attempts: u8,
    pub used: bool,
}

impl OtpCode {
    pub fn issue(purpose: OtpPurpose, now: DateTime<Utc>) -> Self {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
        Self::with_code(code, purpose, now)
    }

    pub fn with_code(code: String, purpose: OtpPurpose, now: DateTime<Utc>) -> Self {
        Self {
            code,
            purpose,
            expires_at: now + Duration::minutes(OTP_VALIDITY_MINUTES),
            attempts: 0,
            used: false,
        }
    }

    /// Check `candidate`, consuming the code on success.
    ///
    /// Every call counts as an attempt; the caller persists `self` afterwards.
    pub fn verify(
        &mut self,
        candidate: &str,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Result<(), OtpError> {
        if self.used {
            return Err(OtpError::AlreadyUsed);
        }
        if now >= self.expires_at {
            return Err(OtpError::Expired);
        }
        if self.attempts >= OTP_MAX_ATTEMPTS {
            return Err(OtpError::TooManyAttempts);
        }
        self.attempts += 1;
        if self.purpose != purpose {
            return Err(OtpError::WrongPurpose);
        }
        if candidate.trim() != self.code {
            return Err(OtpError::Mismatch);
        }
        self.used = true;
        Ok(())
    }
}
