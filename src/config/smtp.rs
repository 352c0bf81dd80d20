use crate::error::{ReportError, Result};

/// SMTP transport settings, read from SMTP_* variables
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Implicit TLS (SMTPS). When false the connection is upgraded with STARTTLS.
    pub secure: bool,
    pub from_address: String,
    pub to_address: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("secure", &self.secure)
            .field("from_address", &self.from_address)
            .field("to_address", &self.to_address)
            .finish()
    }
}

impl SmtpConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ReportError::MissingConfigField(key.to_string()))
        };

        let host = required("SMTP_HOST")?;
        let port = required("SMTP_PORT")?.parse::<u16>().map_err(|e| {
            ReportError::ConfigValidationError(format!("SMTP_PORT is not a valid port: {}", e))
        })?;
        let username = required("SMTP_USER")?;
        let password = required("SMTP_PASS")?;
        let from_address = required("SMTP_FROM_EMAIL")?;
        let to_address = required("SMTP_TO_EMAIL")?;

        let secure = match lookup("SMTP_SECURE") {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                ReportError::ConfigValidationError(format!(
                    "SMTP_SECURE must be true or false, got '{}'",
                    value
                ))
            })?,
            None => true,
        };

        let config = Self {
            host,
            port,
            username,
            password,
            secure,
            from_address,
            to_address,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that both addresses look like mail addresses
    pub fn validate(&self) -> Result<()> {
        for address in [&self.from_address, &self.to_address] {
            let valid = address
                .split_once('@')
                .map(|(local, domain)| !local.is_empty() && !domain.is_empty())
                .unwrap_or(false);
            if !valid {
                return Err(ReportError::InvalidAddress(
                    address.clone(),
                    "expected user@domain".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
