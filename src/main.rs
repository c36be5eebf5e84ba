mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use docrelay::config::Config;
use docrelay::mail::SmtpMailer;
use docrelay::observability;
use docrelay::poller::Poller;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config)?;
    let _guard = observability::init_tracing(&config.logging)?;

    let smtp = config.smtp.as_ref().ok_or("missing [smtp] section")?;
    let mailer = Arc::new(SmtpMailer::new(smtp)?);
    let mut poller = Poller::from_config(&config, mailer)?;

    match cli.command {
        Commands::Watch => {
            poller.run_forever().await;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Once => {
            let report = poller.run_cycle().await;
            if report.is_clean() {
                Ok(ExitCode::SUCCESS)
            } else {
                tracing::error!(?report, "Cycle finished with errors");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
