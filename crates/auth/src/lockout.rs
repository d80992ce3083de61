//! Failed-login accounting and temporary account locks.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Login bookkeeping shared by organization and platform accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginState {
    #[serde(default)]
    pub failed_login_attempts: u32,
    #[serde(default)]
    pub locked_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

impl LoginState {
    /// No successful login has been recorded yet.
    pub fn is_first_login(&self) -> bool {
        self.last_login.is_none()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_failed_attempts: u32,
    pub lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lock_duration: Duration::minutes(30),
        }
    }
}

impl LockoutPolicy {
    pub fn is_locked(&self, state: &LoginState, now: DateTime<Utc>) -> bool {
        state.locked_until.is_some_and(|until| until > now)
    }

    /// Count a failed attempt. Returns `true` when this attempt engaged the lock.
    pub fn record_failure(&self, state: &mut LoginState, now: DateTime<Utc>) -> bool {
        state.failed_login_attempts = state.failed_login_attempts.saturating_add(1);
        if state.failed_login_attempts >= self.max_failed_attempts {
            state.locked_until = Some(now + self.lock_duration);
            state.failed_login_attempts = 0;
            return true;
        }
        false
    }

    pub fn record_success(&self, state: &mut LoginState, now: DateTime<Utc>) {
        state.failed_login_attempts = 0;
        state.locked_until = None;
        state.last_login = Some(now);
    }
}
