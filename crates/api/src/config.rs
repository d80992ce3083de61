//! Process configuration read from environment variables.

use std::net::SocketAddr;

use thiserror::Error;

const DEV_SECRET_KEY: &str = "tritiq-dev-secret-change-me";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Outgoing mail settings. Recorded on outbox entries; nothing is sent.
#[derive(Clone, Default)]
pub struct SmtpSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_email: Option<String>,
}

/// Addresses granted super admin at sign-in, stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuperAdminEmails(Vec<String>);

impl SuperAdminEmails {
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.0.iter().any(|e| *e == email)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Platform super admin created at startup when absent.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct Settings {
    pub secret_key: String,
    pub access_token_expire_minutes: i64,
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub api_prefix: String,
    pub super_admin_emails: SuperAdminEmails,
    pub bootstrap_admin: Option<BootstrapAdmin>,
    pub smtp: SmtpSettings,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any variable source; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let secret_key = var("SECRET_KEY").unwrap_or_else(|| {
            tracing::warn!("SECRET_KEY not set; using insecure dev default");
            DEV_SECRET_KEY.to_string()
        });

        let access_token_expire_minutes = match var("ACCESS_TOKEN_EXPIRE_MINUTES") {
            None => 30,
            Some(raw) => match raw.parse::<i64>() {
                Ok(minutes) if minutes > 0 => minutes,
                _ => return Err(invalid("ACCESS_TOKEN_EXPIRE_MINUTES", raw)),
            },
        };

        let bind_addr = match var("BIND_ADDR") {
            None => SocketAddr::from(([0, 0, 0, 0], 8000)),
            Some(raw) => raw.parse().map_err(|_| invalid("BIND_ADDR", raw))?,
        };

        let api_prefix = match var("API_V1_STR") {
            None => "/api/v1".to_string(),
            Some(raw) if raw.starts_with('/') && raw.len() > 1 => raw.trim_end_matches('/').to_string(),
            Some(raw) => return Err(invalid("API_V1_STR", raw)),
        };

        let super_admin_emails = var("SUPER_ADMIN_EMAILS")
            .map(|raw| SuperAdminEmails::parse(&raw))
            .unwrap_or_default();

        let bootstrap_admin = match (var("BOOTSTRAP_ADMIN_EMAIL"), var("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            _ => None,
        };

        let port = match var("SMTP_PORT") {
            None => None,
            Some(raw) => Some(raw.parse::<u16>().map_err(|_| invalid("SMTP_PORT", raw))?),
        };

        Ok(Self {
            secret_key,
            access_token_expire_minutes,
            database_url: var("DATABASE_URL"),
            bind_addr,
            api_prefix,
            super_admin_emails,
            bootstrap_admin,
            smtp: SmtpSettings {
                host: var("SMTP_HOST"),
                port,
                username: var("SMTP_USERNAME"),
                password: var("SMTP_PASSWORD"),
                from_email: var("EMAILS_FROM_EMAIL"),
            },
        })
    }
}

fn invalid(name: &'static str, value: String) -> ConfigError {
    ConfigError::Invalid { name, value }
}

impl core::fmt::Debug for Settings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Settings")
            .field("access_token_expire_minutes", &self.access_token_expire_minutes)
            .field("database", &self.database_url.as_ref().map(|_| "<set>"))
            .field("bind_addr", &self.bind_addr)
            .field("api_prefix", &self.api_prefix)
            .field("super_admin_emails", &self.super_admin_emails.as_slice())
            .field("bootstrap_admin", &self.bootstrap_admin.as_ref().map(|a| &a.email))
            .field("smtp_host", &self.smtp.host)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.access_token_expire_minutes, 30);
        assert_eq!(s.api_prefix, "/api/v1");
        assert_eq!(s.bind_addr.port(), 8000);
        assert!(s.database_url.is_none());
        assert!(s.bootstrap_admin.is_none());
    }

    #[test]
    fn parses_overrides() {
        let s = settings(&[
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "90"),
            ("API_V1_STR", "/api/v2/"),
            ("SUPER_ADMIN_EMAILS", "Root@X.test, ,ops@x.test"),
            ("BOOTSTRAP_ADMIN_EMAIL", "root@x.test"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "changeme123"),
            ("DATABASE_URL", ""),
        ])
        .unwrap();
        assert_eq!(s.access_token_expire_minutes, 90);
        assert_eq!(s.api_prefix, "/api/v2");
        assert_eq!(s.super_admin_emails.as_slice(), ["root@x.test", "ops@x.test"]);
        assert!(s.super_admin_emails.contains(" ROOT@x.test"));
        assert!(!s.super_admin_emails.contains("nobody@x.test"));
        assert!(s.bootstrap_admin.is_some());
        assert!(s.database_url.is_none());
    }

    #[test]
    fn bad_numbers_are_config_errors() {
        assert_eq!(
            settings(&[("ACCESS_TOKEN_EXPIRE_MINUTES", "soon")]).unwrap_err(),
            ConfigError::Invalid {
                name: "ACCESS_TOKEN_EXPIRE_MINUTES",
                value: "soon".into()
            }
        );
        assert!(settings(&[("SMTP_PORT", "99999")]).is_err());
        assert!(settings(&[("BIND_ADDR", "nowhere")]).is_err());
    }

    #[test]
    fn debug_hides_secrets() {
        let s = settings(&[("SECRET_KEY", "hunter2"), ("SMTP_PASSWORD", "pw")]).unwrap();
        let rendered = format!("{s:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("pw\""));
    }
}
