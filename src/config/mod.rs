// Configuration - report settings from file and environment, SMTP from environment

mod smtp;

pub use smtp::SmtpConfig;

use crate::error::{ReportError, Result};
use crate::scheduler::Schedule;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How the assembler splits the logs into documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportMode {
    /// One document with access, error and vhost sections
    Combined,
    /// One document per configured service
    PerService,
}

impl std::str::FromStr for ReportMode {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "combined" => Ok(ReportMode::Combined),
            "per-service" | "per_service" | "services" => Ok(ReportMode::PerService),
            other => Err(ReportError::InvalidConfig(format!(
                "Unknown report mode: {}. Use combined or per-service",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ReportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportMode::Combined => write!(f, "combined"),
            ReportMode::PerService => write!(f, "per-service"),
        }
    }
}

/// Report settings: which logs to read, where to write, when to run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    #[serde(default = "default_mode")]
    pub mode: ReportMode,

    /// Title printed at the top of the combined report
    #[serde(default = "default_title")]
    pub title: String,

    /// Service names for per-service mode
    #[serde(default)]
    pub services: Vec<String>,

    /// Directory holding the Apache logs
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Explicit paths for combined mode (default to files inside log_dir)
    #[serde(default)]
    pub access_log: Option<PathBuf>,
    #[serde(default)]
    pub error_log: Option<PathBuf>,
    #[serde(default)]
    pub vhost_log: Option<PathBuf>,

    /// Where rendered PDFs are written before they are mailed
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Keep only the last N lines of each log (whole file when unset)
    #[serde(default)]
    pub tail_lines: Option<usize>,

    /// Schedule expression: once, every <N><s|m|h>, daily <HH:MM>
    #[serde(default = "default_schedule")]
    pub schedule: String,

    /// Operational log file
    #[serde(default = "default_service_log")]
    pub service_log: PathBuf,

    /// Display name in the From header
    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,

    /// Image drawn above the title; reports are rendered without it when missing
    #[serde(default)]
    pub logo: Option<PathBuf>,
}

fn default_mode() -> ReportMode {
    ReportMode::Combined
}

fn default_title() -> String {
    "Apache Log Report".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/apache2")
}

fn default_output_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_file_prefix() -> String {
    "apache".to_string()
}

fn default_schedule() -> String {
    "daily 06:00".to_string()
}

fn default_service_log() -> PathBuf {
    PathBuf::from("/var/log/apache-log-mailer/apache-log-mailer.log")
}

fn default_sender_name() -> String {
    "Apache log report".to_string()
}

fn default_pid_file() -> PathBuf {
    std::env::temp_dir().join("apache-log-mailer.pid")
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            title: default_title(),
            services: Vec::new(),
            log_dir: default_log_dir(),
            access_log: None,
            error_log: None,
            vhost_log: None,
            output_dir: default_output_dir(),
            file_prefix: default_file_prefix(),
            tail_lines: None,
            schedule: default_schedule(),
            service_log: default_service_log(),
            sender_name: default_sender_name(),
            pid_file: default_pid_file(),
            logo: None,
        }
    }
}

impl ReportSettings {
    /// Load report settings from a file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<ReportSettings> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ReportError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let mut settings = match extension {
            "toml" => Self::parse_toml(&contents)?,
            "json" => Self::parse_json(&contents)?,
            _ => {
                return Err(ReportError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        settings.expand_env_vars();
        Ok(settings)
    }

    fn parse_toml(contents: &str) -> Result<ReportSettings> {
        toml::from_str(contents)
            .map_err(|e| ReportError::InvalidConfig(format!("Failed to parse TOML: {}", e)))
    }

    fn parse_json(contents: &str) -> Result<ReportSettings> {
        serde_json::from_str(contents)
            .map_err(|e| ReportError::InvalidConfig(format!("Failed to parse JSON: {}", e)))
    }

    /// Apply REPORT_* / APACHE_LOG_DIR overrides from a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup("REPORT_MODE") {
            self.mode = mode.parse()?;
        }
        if let Some(services) = lookup("REPORT_SERVICES") {
            self.services = services
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(schedule) = lookup("REPORT_SCHEDULE") {
            self.schedule = schedule;
        }
        if let Some(dir) = lookup("APACHE_LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("REPORT_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("REPORT_SERVICE_LOG") {
            self.service_log = PathBuf::from(path);
        }
        if let Some(path) = lookup("REPORT_LOGO") {
            self.logo = Some(PathBuf::from(path));
        }
        if let Some(limit) = lookup("REPORT_TAIL_LINES") {
            let limit = limit.trim().parse::<usize>().map_err(|e| {
                ReportError::InvalidConfig(format!("REPORT_TAIL_LINES must be a number: {}", e))
            })?;
            self.tail_lines = Some(limit);
        }
        Ok(())
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ReportError::MissingConfigField("title".to_string()));
        }

        if self.file_prefix.trim().is_empty() {
            return Err(ReportError::MissingConfigField("file_prefix".to_string()));
        }

        if self.mode == ReportMode::PerService && self.services.is_empty() {
            return Err(ReportError::ConfigValidationError(
                "per-service mode needs at least one service".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for service in &self.services {
            if service.is_empty() || service.contains('/') || service.contains('\\') {
                return Err(ReportError::ConfigValidationError(format!(
                    "Invalid service name: '{}'",
                    service
                )));
            }
            if !seen.insert(service.as_str()) {
                return Err(ReportError::ConfigValidationError(format!(
                    "Duplicate service name: {}",
                    service
                )));
            }
        }

        if self.tail_lines == Some(0) {
            return Err(ReportError::ConfigValidationError(
                "tail_lines must be greater than zero".to_string(),
            ));
        }

        self.parsed_schedule()?;

        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(ReportError::ConfigValidationError(format!(
                "Output directory is not a directory: {}",
                self.output_dir.display()
            )));
        }

        Ok(())
    }

    pub fn parsed_schedule(&self) -> Result<Schedule> {
        self.schedule.parse()
    }

    pub fn access_log_path(&self) -> PathBuf {
        self.access_log
            .clone()
            .unwrap_or_else(|| self.log_dir.join("access.log"))
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.error_log
            .clone()
            .unwrap_or_else(|| self.log_dir.join("error.log"))
    }

    pub fn vhost_log_path(&self) -> PathBuf {
        self.vhost_log
            .clone()
            .unwrap_or_else(|| self.log_dir.join("other_vhosts_access.log"))
    }

    /// Access and error log paths for one service
    pub fn service_log_paths(&self, service: &str) -> (PathBuf, PathBuf) {
        (
            self.log_dir.join(format!("{}_access.log", service)),
            self.log_dir.join(format!("{}_error.log", service)),
        )
    }

    fn expand_env_vars(&mut self) {
        self.log_dir = expand_env_in_path(&self.log_dir);
        self.output_dir = expand_env_in_path(&self.output_dir);
        self.service_log = expand_env_in_path(&self.service_log);
        self.pid_file = expand_env_in_path(&self.pid_file);
        for path in [
            &mut self.access_log,
            &mut self.error_log,
            &mut self.vhost_log,
            &mut self.logo,
        ] {
            if let Some(p) = path.as_mut() {
                *p = expand_env_in_path(p);
            }
        }
    }
}

/// Expand $VAR and ${VAR} in a string
fn expand_env_in_string(s: &str) -> String {
    expand_vars(s, |name| std::env::var(name).ok())
}

/// Replace `$NAME` and `${NAME}` with their values.
///
/// A bare `$NAME` takes the longest run of `[A-Za-z0-9_]`, so `$HOMEDIR` never
/// matches `HOME`. Unknown variables are left as written.
fn expand_vars<F>(s: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(dollar) = rest.find('$') {
        result.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];

        // (name, bytes after the '$' that belong to the reference)
        let (name, consumed) = match after.strip_prefix('{') {
            Some(braced) => match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            },
            None => {
                let end = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                (&after[..end], end)
            }
        };

        if name.is_empty() {
            result.push('$');
            rest = after;
            continue;
        }

        match lookup(name) {
            Some(value) => result.push_str(&value),
            None => result.push_str(&rest[dollar..dollar + 1 + consumed]),
        }
        rest = &after[consumed..];
    }

    result.push_str(rest);
    result
}

fn expand_env_in_path(path: &Path) -> PathBuf {
    PathBuf::from(expand_env_in_string(&path.to_string_lossy()))
}

/// Full application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub report: ReportSettings,
    pub smtp: SmtpConfig,
}

impl AppConfig {
    /// Load configuration: defaults, optional file, then environment.
    ///
    /// Fails on any missing or invalid value so that nothing is scheduled
    /// with a broken configuration.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        Self::load_with(config_path, |key| std::env::var(key).ok())
    }

    /// Like [`AppConfig::load`], reading variables from `lookup`
    pub fn load_with<F>(config_path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let report = Self::report_settings_with(config_path, &lookup)?;
        let smtp = SmtpConfig::from_lookup(&lookup)?;
        Ok(Self { report, smtp })
    }

    /// Load only the report settings (used by commands that never send mail)
    pub fn load_report_settings(config_path: Option<&Path>) -> Result<ReportSettings> {
        Self::report_settings_with(config_path, |key| std::env::var(key).ok())
    }

    fn report_settings_with<F>(config_path: Option<&Path>, lookup: F) -> Result<ReportSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut report = match config_path {
            Some(path) => ReportSettings::from_file(path)?,
            None => ReportSettings::default(),
        };
        report.apply_overrides(lookup)?;
        report.validate()?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_report_settings_defaults() {
        let settings = ReportSettings::default();
        assert_eq!(settings.mode, ReportMode::Combined);
        assert_eq!(settings.file_prefix, "apache");
        assert_eq!(settings.schedule, "daily 06:00");
        assert_eq!(
            settings.vhost_log_path(),
            PathBuf::from("/var/log/apache2/other_vhosts_access.log")
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_service_log_paths() {
        let settings = ReportSettings {
            log_dir: PathBuf::from("/logs"),
            ..Default::default()
        };
        let (access, error) = settings.service_log_paths("shop");
        assert_eq!(access, PathBuf::from("/logs/shop_access.log"));
        assert_eq!(error, PathBuf::from("/logs/shop_error.log"));
    }

    #[test]
    fn test_validate_per_service_without_services() {
        let settings = ReportSettings {
            mode: ReportMode::PerService,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ReportError::ConfigValidationError(_))
        ));
    }

    #[test]
    fn test_validate_duplicate_service() {
        let settings = ReportSettings {
            mode: ReportMode::PerService,
            services: vec!["shop".to_string(), "shop".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ReportError::ConfigValidationError(_))
        ));
    }

    #[test]
    fn test_validate_service_with_path_separator() {
        let settings = ReportSettings {
            mode: ReportMode::PerService,
            services: vec!["../etc".to_string()],
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_empty_prefix() {
        let settings = ReportSettings {
            file_prefix: " ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ReportError::MissingConfigField(_))
        ));
    }

    #[test]
    fn test_validate_bad_schedule() {
        let settings = ReportSettings {
            schedule: "sometimes".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ReportError::InvalidSchedule(_, _))
        ));
    }

    #[test]
    fn test_apply_overrides() {
        let vars: HashMap<&str, &str> = [
            ("REPORT_MODE", "per-service"),
            ("REPORT_SERVICES", "shop, blog,,wiki"),
            ("APACHE_LOG_DIR", "/srv/logs"),
        ]
        .into_iter()
        .collect();

        let mut settings = ReportSettings::default();
        settings
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(settings.mode, ReportMode::PerService);
        assert_eq!(settings.services, vec!["shop", "blog", "wiki"]);
        assert_eq!(settings.log_dir, PathBuf::from("/srv/logs"));
    }

    #[test]
    fn test_apply_overrides_bad_mode() {
        let mut settings = ReportSettings::default();
        let result = settings.apply_overrides(|key| {
            (key == "REPORT_MODE").then(|| "weekly".to_string())
        });
        assert!(matches!(result, Err(ReportError::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_toml() {
        let toml_content = r#"
            mode = "per-service"
            services = ["shop", "blog"]
            log_dir = "/srv/apache"
            schedule = "every 15m"
        "#;

        let settings = ReportSettings::parse_toml(toml_content).unwrap();
        assert_eq!(settings.mode, ReportMode::PerService);
        assert_eq!(settings.services.len(), 2);
        assert_eq!(settings.log_dir, PathBuf::from("/srv/apache"));
        assert_eq!(settings.file_prefix, "apache");
    }

    #[test]
    fn test_parse_json() {
        let json_content = r#"
            {
                "mode": "combined",
                "title": "web01 - Apache",
                "access_log": "/tmp/a.log"
            }
        "#;

        let settings = ReportSettings::parse_json(json_content).unwrap();
        assert_eq!(settings.title, "web01 - Apache");
        assert_eq!(settings.access_log_path(), PathBuf::from("/tmp/a.log"));
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("ALM_TEST_LOG_ROOT", "/opt/web");

        let mut settings = ReportSettings {
            log_dir: PathBuf::from("${ALM_TEST_LOG_ROOT}/logs"),
            access_log: Some(PathBuf::from("$ALM_TEST_LOG_ROOT/access.log")),
            ..Default::default()
        };
        settings.expand_env_vars();

        assert_eq!(settings.log_dir, PathBuf::from("/opt/web/logs"));
        assert_eq!(
            settings.access_log,
            Some(PathBuf::from("/opt/web/access.log"))
        );
    }

    #[test]
    fn test_expand_vars_matches_whole_names() {
        let vars: HashMap<&str, &str> =
            [("HOME", "/home/web"), ("HOMEDIR", "/srv/web")].into_iter().collect();
        let lookup = |name: &str| vars.get(name).map(|v| v.to_string());

        assert_eq!(expand_vars("$HOMEDIR/logs", lookup), "/srv/web/logs");
        assert_eq!(expand_vars("$HOME/logs", lookup), "/home/web/logs");
        assert_eq!(expand_vars("${HOME}DIR/logs", lookup), "/home/webDIR/logs");
        assert_eq!(expand_vars("$HOME_2/x", lookup), "$HOME_2/x");
    }

    #[test]
    fn test_expand_vars_leaves_unknown_and_malformed() {
        let lookup = |name: &str| (name == "ROOT").then(|| "/opt".to_string());

        assert_eq!(expand_vars("$UNSET/a", lookup), "$UNSET/a");
        assert_eq!(expand_vars("${UNSET}/a", lookup), "${UNSET}/a");
        assert_eq!(expand_vars("cost$", lookup), "cost$");
        assert_eq!(expand_vars("${ROOT", lookup), "${ROOT");
        assert_eq!(expand_vars("a$-b ${}", lookup), "a$-b ${}");
        assert_eq!(expand_vars("$ROOT$ROOT", lookup), "/opt/opt");
    }

    #[test]
    fn test_logo_override() {
        let mut settings = ReportSettings::default();
        assert_eq!(settings.logo, None);
        settings
            .apply_overrides(|key| {
                (key == "REPORT_LOGO").then(|| "/etc/report/logo.png".to_string())
            })
            .unwrap();
        assert_eq!(settings.logo, Some(PathBuf::from("/etc/report/logo.png")));
    }

    #[test]
    fn test_from_file_unsupported_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "mode: combined").unwrap();

        let result = ReportSettings::from_file(&config_path);
        assert!(matches!(result, Err(ReportError::InvalidConfig(_))));
    }
}
