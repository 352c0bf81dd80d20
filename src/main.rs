use apache_log_mailer::cli::Cli;
use colored::*;

/// Exit status for a missing or invalid configuration
const EXIT_CONFIG: i32 = 2;

#[tokio::main]
async fn main() {
    if let Err(e) = Cli::run().await {
        eprintln!("{} {}", "✗ Error:".red().bold(), e);
        let code = if e.is_config_error() { EXIT_CONFIG } else { 1 };
        std::process::exit(code);
    }
}
