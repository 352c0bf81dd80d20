// CLI module - User-facing command-line interface

mod output;

use crate::config::{AppConfig, ReportMode, ReportSettings, SmtpConfig};
use crate::error::{ReportError, Result};
use crate::notify::{Notifier, SmtpMailer};
use crate::pipeline::{
    combined_job, service_job, Assembler, Delivery, JobSources, JobSpec, Pipeline,
    COMBINED_IDENTIFIER,
};
use crate::report::ReportVariant;
use crate::scheduler::{shutdown_signal, Driver, PidGuard, Schedule, TriggerOutcome};
use crate::telemetry;
use chrono::Local;
use clap::{ArgGroup, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Apache log mailer - renders Apache logs into PDF reports and mails them
#[derive(Parser)]
#[command(name = "apache-log-mailer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Environment file with SMTP_* variables (defaults to ./.env if present)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and mail the reports once, now
    Run {
        /// Override the configured report mode (combined or per-service)
        #[arg(short, long)]
        mode: Option<ReportMode>,
    },

    /// Keep running and mail reports on a schedule
    Schedule {
        /// Override the configured schedule (once, every <N><s|m|h>, daily <HH:MM>)
        #[arg(short, long)]
        schedule: Option<String>,
    },

    /// Render a single report to a file without sending mail
    #[command(group(ArgGroup::new("source").required(true).args(["service", "combined"])))]
    Render {
        /// Service whose access and error logs are rendered
        #[arg(long)]
        service: Option<String>,

        /// Render the combined access, error and vhost report
        #[arg(long)]
        combined: bool,

        /// Read a prepared combined blob instead of the configured log files
        #[arg(long, requires = "combined")]
        blob: Option<PathBuf>,

        /// Where to write the PDF
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Validate the configuration and print it
    CheckConfig,
}

impl Cli {
    /// Run the CLI application
    pub async fn run() -> Result<()> {
        let cli = Cli::parse();
        cli.execute().await
    }

    /// Execute the parsed command
    async fn execute(&self) -> Result<()> {
        load_env_file(self.env_file.as_deref())?;
        let config_path = self.config.as_deref();

        match &self.command {
            Commands::Run { mode } => {
                let mut config = AppConfig::load(config_path)?;
                if let Some(mode) = mode {
                    config.report.mode = *mode;
                    config.report.validate()?;
                }
                run_once(config).await
            }

            Commands::Schedule { schedule } => {
                let mut config = AppConfig::load(config_path)?;
                if let Some(schedule) = schedule {
                    config.report.schedule = schedule.clone();
                    config.report.validate()?;
                }
                run_scheduled(config).await
            }

            Commands::Render {
                service,
                combined: _,
                blob,
                output,
            } => {
                let settings = AppConfig::load_report_settings(config_path)?;
                render_one(&settings, service.as_deref(), blob.as_deref(), output).await
            }

            Commands::CheckConfig => check_config(config_path),
        }
    }
}

/// Load SMTP_* and REPORT_* variables from an env file
fn load_env_file(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| {
                ReportError::ConfigError(format!(
                    "Failed to load env file {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }
        None => {
            // A missing ./.env is fine
            dotenvy::dotenv().ok();
        }
    }
    Ok(())
}

/// Everything a mailing command needs, built before any work starts
fn build_driver(config: AppConfig) -> Result<Driver> {
    let mailer = SmtpMailer::new(&config.smtp, &config.report.sender_name)?;
    let pipeline = Pipeline::new(config.report, Notifier::new(Arc::new(mailer)));
    Ok(Driver::new(pipeline))
}

async fn run_once(config: AppConfig) -> Result<()> {
    let service_log = config.report.service_log.clone();
    let driver = build_driver(config)?;
    let _guard = telemetry::init_logging(&service_log)?;

    match driver.trigger().await {
        TriggerOutcome::Completed(report) => {
            output::print_run_report(&report);
            match report.delivery {
                Delivery::Sent => Ok(()),
                Delivery::Skipped => Err(ReportError::Internal(
                    "no report was produced, nothing was sent".to_string(),
                )),
                Delivery::Failed(reason) => Err(ReportError::TransportFailure(reason)),
            }
        }
        TriggerOutcome::Failed(e) => Err(e),
        TriggerOutcome::Skipped => Err(ReportError::Internal(
            "a run is already in progress".to_string(),
        )),
    }
}

async fn run_scheduled(config: AppConfig) -> Result<()> {
    let schedule: Schedule = config.report.parsed_schedule()?;
    let service_log = config.report.service_log.clone();
    let pid_file = config.report.pid_file.clone();
    let driver = build_driver(config)?;

    let _guard = telemetry::init_logging(&service_log)?;
    let _pid = PidGuard::acquire(&pid_file)?;

    let shutdown = shutdown_signal()?;
    output::print_info(&format!("Scheduler running ({})", schedule));
    driver.run(schedule, shutdown).await;
    output::print_success_msg("Scheduler stopped");
    Ok(())
}

async fn render_one(
    settings: &ReportSettings,
    service: Option<&str>,
    blob: Option<&Path>,
    output_path: &Path,
) -> Result<()> {
    telemetry::init_console_logging();

    let spec = match (service, blob) {
        (Some(service), _) => {
            if service.is_empty() || service.contains('/') || service.contains('\\') {
                return Err(ReportError::ConfigValidationError(format!(
                    "Invalid service name: '{}'",
                    service
                )));
            }
            service_job(settings, service, output_path.to_path_buf())
        }
        (None, Some(blob)) => JobSpec {
            identifier: COMBINED_IDENTIFIER.to_string(),
            title: settings.title.clone(),
            variant: ReportVariant::Combined,
            sources: JobSources::Blob(blob.to_path_buf()),
            output_path: output_path.to_path_buf(),
        },
        (None, None) => combined_job(settings, output_path.to_path_buf()),
    };

    let spinner = output::create_progress_bar(&format!("Rendering {}", spec.identifier));
    match Assembler::from_settings(settings)
        .assemble(&spec, Local::now())
        .await
    {
        Ok(attachment) => {
            output::finish_progress_success(
                spinner,
                &format!("Report written to {}", attachment.path.display()),
            );
            Ok(())
        }
        Err(e) => {
            output::finish_progress_error(spinner, "Rendering failed");
            Err(e)
        }
    }
}

fn check_config(config_path: Option<&Path>) -> Result<()> {
    let settings = AppConfig::load_report_settings(config_path)?;
    output::print_settings(&settings);

    let smtp = SmtpConfig::from_env()?;
    output::print_smtp(&smtp);
    output::print_success_msg("Configuration is valid");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn smtp_vars() -> HashMap<&'static str, &'static str> {
        [
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "465"),
            ("SMTP_USER", "reports"),
            ("SMTP_PASS", "hunter2"),
            ("SMTP_FROM_EMAIL", "reports@example.com"),
            ("SMTP_TO_EMAIL", "ops@example.com"),
        ]
        .into_iter()
        .collect()
    }

    /// Config file pointing every output of a run into `dir`
    fn write_config(dir: &Path) -> PathBuf {
        let logs = dir.join("logs");
        std::fs::create_dir_all(&logs).unwrap();
        std::fs::write(logs.join("access.log"), "GET / 200\n").unwrap();

        let config_path = dir.join("config.toml");
        std::fs::write(
            &config_path,
            format!(
                "log_dir = {:?}\noutput_dir = {:?}\nservice_log = {:?}\npid_file = {:?}\nschedule = \"once\"\n",
                logs,
                dir.join("out"),
                dir.join("service.log"),
                dir.join("mailer.pid"),
            ),
        )
        .unwrap();
        config_path
    }

    fn assert_nothing_written(dir: &Path) {
        assert!(!dir.join("out").exists());
        assert!(!dir.join("service.log").exists());
        assert!(!dir.join("mailer.pid").exists());
    }

    #[test]
    fn test_missing_smtp_password_fails_before_any_work() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = write_config(temp_dir.path());
        let mut vars = smtp_vars();
        vars.remove("SMTP_PASS");

        let result = AppConfig::load_with(Some(&config_path), |key| {
            vars.get(key).map(|v| v.to_string())
        })
        .and_then(build_driver);

        match result {
            Err(e) => {
                assert!(e.is_config_error());
                assert!(matches!(e, ReportError::MissingConfigField(ref field) if field == "SMTP_PASS"));
            }
            Ok(_) => panic!("driver built without SMTP_PASS"),
        }
        assert_nothing_written(temp_dir.path());
    }

    #[tokio::test]
    async fn test_bad_recipient_stops_run_before_any_work() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = write_config(temp_dir.path());
        let mut config = AppConfig::load_with(Some(&config_path), |key| {
            smtp_vars().get(key).map(|v| v.to_string())
        })
        .unwrap();
        config.smtp.to_address = "ops@@example".to_string();

        let result = run_once(config).await;

        assert!(matches!(result, Err(ReportError::InvalidAddress(_, _))));
        assert_nothing_written(temp_dir.path());
    }

    #[tokio::test]
    async fn test_bad_recipient_stops_scheduler_before_pid_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = write_config(temp_dir.path());
        let mut config = AppConfig::load_with(Some(&config_path), |key| {
            smtp_vars().get(key).map(|v| v.to_string())
        })
        .unwrap();
        config.smtp.from_address = "not an address".to_string();

        let result = run_scheduled(config).await;

        assert!(result.unwrap_err().is_config_error());
        assert_nothing_written(temp_dir.path());
    }
}
