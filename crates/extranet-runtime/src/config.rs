//! Runtime configuration loaded from `EXTRANET_*` environment variables.
//!
//! Unset variables keep their defaults; unparsable ones are reported and
//! ignored.

use std::path::PathBuf;
use std::str::FromStr;

use extranet_api::{ApiConfig, ConfigError};
use extranet_core::SmtpSettings;
use tracing::warn;

/// Accepted bcrypt work factors.
pub const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

/// How outgoing mail leaves the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTransport {
    /// Mails are written to the log only.
    Log,
    Smtp,
}

impl FromStr for MailTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "smtp" => Ok(Self::Smtp),
            other => Err(format!("unknown mail transport '{other}'")),
        }
    }
}

/// Mail configuration
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub transport: MailTransport,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_starttls: bool,
    pub from: String,
    /// Visible recipient of the expiry notice; defaults to `from`.
    pub expiry_notice_to: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: MailTransport::Log,
            smtp_host: String::new(),
            smtp_port: 25,
            smtp_username: None,
            smtp_password: None,
            smtp_starttls: false,
            from: "Extranet <noreply@localhost>".to_string(),
            expiry_notice_to: None,
        }
    }
}

impl MailConfig {
    pub fn smtp_settings(&self) -> SmtpSettings {
        SmtpSettings {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            username: self.smtp_username.clone(),
            password: self.smtp_password.clone(),
            starttls: self.smtp_starttls,
            from: self.from.clone(),
        }
    }

    pub fn expiry_notice_to(&self) -> &str {
        self.expiry_notice_to.as_deref().unwrap_or(&self.from)
    }
}

/// Expiry sweep schedule (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    pub enabled: bool,
    pub hour: u32,
    pub minute: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hour: 2,
            minute: 0,
        }
    }
}

/// Everything the binary needs
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub api: ApiConfig,
    pub database_path: PathBuf,
    pub documents_root: PathBuf,
    pub accounts_dir: PathBuf,
    pub frontend_url: String,
    /// Signs password-reset tokens.
    pub jwt_secret: String,
    pub mail: MailConfig,
    pub bcrypt_cost: u32,
    pub sweep: SweepConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            database_path: PathBuf::from("./data/extranet.db"),
            documents_root: PathBuf::from("./documents"),
            accounts_dir: PathBuf::from("./comptes"),
            frontend_url: "http://localhost:3000".to_string(),
            jwt_secret: String::new(),
            mail: MailConfig::default(),
            bcrypt_cost: extranet_core::adapters::DEFAULT_BCRYPT_COST,
            sweep: SweepConfig::default(),
        }
    }
}

/// Reads `key` and parses it, keeping `current` when unset or invalid.
fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, current: &mut T) {
    let Some(raw) = lookup(key) else { return };
    match raw.trim().parse() {
        Ok(value) => *current = value,
        Err(_) => warn!(variable = key, value = %raw, "ignoring unparsable value"),
    }
}

fn string_var(lookup: &impl Fn(&str) -> Option<String>, key: &str, current: &mut String) {
    if let Some(raw) = lookup(key) {
        *current = raw;
    }
}

fn optional_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

/// `true`/`false`, also `1`/`0`, `yes`/`no`.
fn flag_var(lookup: &impl Fn(&str) -> Option<String>, key: &str, current: &mut bool) {
    let Some(raw) = lookup(key) else { return };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => *current = true,
        "false" | "0" | "no" => *current = false,
        _ => warn!(variable = key, value = %raw, "ignoring unparsable flag"),
    }
}

/// Whether logs are emitted as JSON. Read before the subscriber exists.
pub fn log_json_from_env() -> bool {
    let mut json = false;
    flag_var(&|key| std::env::var(key).ok(), "EXTRANET_LOG_JSON", &mut json);
    json
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let lookup = &lookup;

        parse_var(lookup, "EXTRANET_HOST", &mut config.api.http.host);
        parse_var(lookup, "EXTRANET_PORT", &mut config.api.http.port);
        parse_var(lookup, "EXTRANET_DATABASE_PATH", &mut config.database_path);
        parse_var(lookup, "EXTRANET_DOCUMENTS_ROOT", &mut config.documents_root);
        parse_var(lookup, "EXTRANET_ACCOUNTS_DIR", &mut config.accounts_dir);

        string_var(lookup, "EXTRANET_SESSION_SECRET", &mut config.api.session.secret);
        string_var(lookup, "EXTRANET_JWT_SECRET", &mut config.jwt_secret);
        parse_var(lookup, "EXTRANET_SESSION_TTL_SECS", &mut config.api.session.ttl_secs);
        flag_var(lookup, "EXTRANET_COOKIE_SECURE", &mut config.api.session.cookie_secure);
        config.api.session.redis_url = optional_var(lookup, "EXTRANET_REDIS_URL");

        if let Some(origins) = lookup("EXTRANET_ALLOWED_ORIGINS") {
            config.api.cors.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        string_var(lookup, "EXTRANET_FRONTEND_URL", &mut config.frontend_url);
        parse_var(lookup, "EXTRANET_MAX_UPLOAD_BYTES", &mut config.api.limits.max_upload_bytes);

        parse_var(lookup, "EXTRANET_MAIL_TRANSPORT", &mut config.mail.transport);
        string_var(lookup, "EXTRANET_SMTP_HOST", &mut config.mail.smtp_host);
        parse_var(lookup, "EXTRANET_SMTP_PORT", &mut config.mail.smtp_port);
        config.mail.smtp_username = optional_var(lookup, "EXTRANET_SMTP_USERNAME");
        config.mail.smtp_password = optional_var(lookup, "EXTRANET_SMTP_PASSWORD");
        flag_var(lookup, "EXTRANET_SMTP_STARTTLS", &mut config.mail.smtp_starttls);
        string_var(lookup, "EXTRANET_MAIL_FROM", &mut config.mail.from);
        config.mail.expiry_notice_to = optional_var(lookup, "EXTRANET_EXPIRY_NOTICE_TO");

        parse_var(lookup, "EXTRANET_BCRYPT_COST", &mut config.bcrypt_cost);
        flag_var(lookup, "EXTRANET_SWEEP_ENABLED", &mut config.sweep.enabled);
        parse_var(lookup, "EXTRANET_SWEEP_HOUR", &mut config.sweep.hour);
        parse_var(lookup, "EXTRANET_SWEEP_MINUTE", &mut config.sweep.minute);

        config
    }

    /// Checks what every command that touches accounts or mail needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingSecret("reset token secret"));
        }
        if !BCRYPT_COST_RANGE.contains(&self.bcrypt_cost) {
            return Err(ConfigError::Invalid(format!(
                "bcrypt cost must be within {}..={}",
                BCRYPT_COST_RANGE.start(),
                BCRYPT_COST_RANGE.end()
            )));
        }
        if self.sweep.hour > 23 || self.sweep.minute > 59 {
            return Err(ConfigError::Invalid(format!(
                "sweep time {:02}:{:02} is out of range",
                self.sweep.hour, self.sweep.minute
            )));
        }
        if self.mail.transport == MailTransport::Smtp && self.mail.smtp_host.trim().is_empty() {
            return Err(ConfigError::Invalid("smtp transport needs EXTRANET_SMTP_HOST".into()));
        }
        Ok(())
    }

    /// [`validate`](Self::validate) plus the HTTP server settings.
    pub fn validate_for_serve(&self) -> Result<(), ConfigError> {
        self.validate()?;
        self.api.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> RuntimeConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RuntimeConfig::from_lookup(|key| vars.get(key).cloned())
    }

    fn secrets() -> Vec<(&'static str, &'static str)> {
        vec![
            ("EXTRANET_SESSION_SECRET", "0123456789abcdef0123456789abcdef"),
            ("EXTRANET_JWT_SECRET", "jwt-secret"),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&secrets());
        assert_eq!(config.api.http_addr().port(), 4000);
        assert_eq!(config.database_path, PathBuf::from("./data/extranet.db"));
        assert_eq!(config.mail.transport, MailTransport::Log);
        assert_eq!(config.mail.expiry_notice_to(), "Extranet <noreply@localhost>");
        assert_eq!(config.sweep, SweepConfig::default());
        assert_eq!(config.bcrypt_cost, 10);
        assert!(config.validate_for_serve().is_ok());
    }

    #[test]
    fn test_overrides() {
        let mut pairs = secrets();
        pairs.extend([
            ("EXTRANET_PORT", "8080"),
            ("EXTRANET_ALLOWED_ORIGINS", "https://a.fr, https://b.fr,"),
            ("EXTRANET_COOKIE_SECURE", "yes"),
            ("EXTRANET_MAIL_TRANSPORT", "SMTP"),
            ("EXTRANET_SMTP_HOST", "smtp.syndic.fr"),
            ("EXTRANET_SMTP_PORT", "587"),
            ("EXTRANET_SMTP_USERNAME", ""),
            ("EXTRANET_EXPIRY_NOTICE_TO", "gestion@syndic.fr"),
            ("EXTRANET_SWEEP_HOUR", "5"),
            ("EXTRANET_SWEEP_ENABLED", "false"),
        ]);
        let config = from_pairs(&pairs);

        assert_eq!(config.api.http.port, 8080);
        assert_eq!(config.api.cors.allowed_origins, vec!["https://a.fr", "https://b.fr"]);
        assert!(config.api.session.cookie_secure);
        assert_eq!(config.mail.transport, MailTransport::Smtp);
        let smtp = config.mail.smtp_settings();
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.username, None);
        assert_eq!(config.mail.expiry_notice_to(), "gestion@syndic.fr");
        assert_eq!(config.sweep.hour, 5);
        assert!(!config.sweep.enabled);
        assert!(config.validate_for_serve().is_ok());
    }

    #[test]
    fn test_unparsable_values_keep_defaults() {
        let mut pairs = secrets();
        pairs.extend([("EXTRANET_PORT", "http"), ("EXTRANET_COOKIE_SECURE", "maybe")]);
        let config = from_pairs(&pairs);
        assert_eq!(config.api.http.port, 4000);
        assert!(!config.api.session.cookie_secure);
    }

    #[test]
    fn test_validation_failures() {
        assert!(matches!(
            from_pairs(&[]).validate(),
            Err(ConfigError::MissingSecret(_))
        ));

        let mut short = vec![("EXTRANET_SESSION_SECRET", "short"), ("EXTRANET_JWT_SECRET", "j")];
        assert!(from_pairs(&short).validate().is_ok());
        assert!(from_pairs(&short).validate_for_serve().is_err());

        short = secrets();
        short.push(("EXTRANET_BCRYPT_COST", "3"));
        assert!(from_pairs(&short).validate().is_err());

        let mut late = secrets();
        late.push(("EXTRANET_SWEEP_MINUTE", "60"));
        assert!(from_pairs(&late).validate().is_err());

        let mut smtp = secrets();
        smtp.push(("EXTRANET_MAIL_TRANSPORT", "smtp"));
        assert!(from_pairs(&smtp).validate().is_err());

        let mut upload = secrets();
        upload.push(("EXTRANET_MAX_UPLOAD_BYTES", "0"));
        assert!(from_pairs(&upload).validate_for_serve().is_err());
    }
}
