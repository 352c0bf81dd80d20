// Output formatting and display for CLI

use crate::config::{ReportSettings, SmtpConfig};
use crate::pipeline::{Delivery, RunReport};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a success message
pub fn print_success_msg(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print the outcome of one run: a row per report, then the delivery status
pub fn print_run_report(report: &RunReport) {
    #[derive(Tabled)]
    struct ReportRow {
        #[tabled(rename = "Report")]
        report: String,
        #[tabled(rename = "Status")]
        status: String,
    }

    let mut rows: Vec<ReportRow> = report
        .attachments
        .iter()
        .map(|a| ReportRow {
            report: truncate(&a.filename, 48),
            status: attachment_status(&report.delivery),
        })
        .collect();

    rows.extend(report.failures.iter().map(|f| ReportRow {
        report: f.identifier.clone(),
        status: format!("{} {}", "failed:".red(), truncate(&f.error, 60)),
    }));

    if !rows.is_empty() {
        let mut table = Table::new(rows);
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        println!("\n{}\n", table);
    }

    match &report.delivery {
        Delivery::Sent => println!(
            "{}",
            format!("✓ Mail sent with {} report(s)", report.attachments.len())
                .green()
                .bold()
        ),
        Delivery::Skipped => println!("{}", "No report was produced, nothing sent".yellow()),
        Delivery::Failed(reason) => {
            println!("{} {}", "✗ Mail not sent:".red().bold(), reason);
            for attachment in &report.attachments {
                println!("  {} {}", "kept".dimmed(), attachment.path.display());
            }
        }
    }
}

fn attachment_status(delivery: &Delivery) -> String {
    match delivery {
        Delivery::Sent => "sent".green().to_string(),
        Delivery::Skipped => "not sent".yellow().to_string(),
        Delivery::Failed(_) => "kept on disk".red().to_string(),
    }
}

/// Print the effective report settings
pub fn print_settings(settings: &ReportSettings) {
    let optional = |path: &Option<std::path::PathBuf>, fallback: std::path::PathBuf| {
        match path {
            Some(p) => p.display().to_string(),
            None => format!("{} {}", fallback.display(), "(default)".dimmed()),
        }
    };

    let services = if settings.services.is_empty() {
        "-".to_string()
    } else {
        settings.services.join(", ")
    };

    let rows = vec![
        ("Mode", settings.mode.to_string().cyan().to_string()),
        ("Title", settings.title.clone()),
        ("Services", services),
        ("Log dir", settings.log_dir.display().to_string()),
        ("Access log", optional(&settings.access_log, settings.access_log_path())),
        ("Error log", optional(&settings.error_log, settings.error_log_path())),
        ("Vhost log", optional(&settings.vhost_log, settings.vhost_log_path())),
        ("Output dir", settings.output_dir.display().to_string()),
        ("File prefix", settings.file_prefix.clone()),
        (
            "Tail lines",
            settings
                .tail_lines
                .map(|n| n.to_string())
                .unwrap_or_else(|| "all".to_string()),
        ),
        ("Schedule", settings.schedule.clone()),
        ("Service log", settings.service_log.display().to_string()),
        ("PID file", settings.pid_file.display().to_string()),
        (
            "Logo",
            settings
                .logo
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "none".to_string()),
        ),
    ];

    print_key_values("Report settings", &rows);
}

/// Print SMTP settings without the password
pub fn print_smtp(smtp: &SmtpConfig) {
    let security = if smtp.secure { "implicit TLS" } else { "STARTTLS" };
    let rows = vec![
        ("Host", format!("{}:{}", smtp.host, smtp.port)),
        ("Security", security.to_string()),
        ("User", smtp.username.clone()),
        ("Password", "********".dimmed().to_string()),
        ("From", smtp.from_address.clone()),
        ("To", smtp.to_address.clone()),
    ];

    print_key_values("SMTP", &rows);
}

fn print_key_values(heading: &str, rows: &[(&str, String)]) {
    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Setting")]
        key: String,
        #[tabled(rename = "Value")]
        value: String,
    }

    let rows: Vec<Row> = rows
        .iter()
        .map(|(key, value)| Row {
            key: key.to_string(),
            value: value.clone(),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    println!("\n{}", heading.bold().underline());
    println!("{}", table);
}

/// Truncate a string to a maximum number of characters
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Create a spinner for long operations
pub fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Finish a spinner with success
pub fn finish_progress_success(pb: ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {}", "✓".green(), message));
}

/// Finish a spinner with error
pub fn finish_progress_error(pb: ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {}", "✗".red(), message));
}
