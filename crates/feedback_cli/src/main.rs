//! CLI bootstrap and health probe.
//!
//! # Responsibility
//! - Load `.env`, resolve `CoreConfig`, start logging and construct the
//!   storage gateway the same way a request-handling process would.
//! - Print a deterministic summary for quick local sanity checks.

use feedback_core::{
    core_version, init_logging, ping, CoreConfig, FeedbackRepository, FormRepository,
    StorageGateway, SqliteFeedbackRepository, SqliteFormRepository,
};
use log::{error, info};
use std::process::ExitCode;

fn main() -> ExitCode {
    // A missing `.env` is normal; real environment variables still apply.
    let _ = dotenvy::dotenv();

    println!("feedback_core ping={}", ping());
    println!("feedback_core version={}", core_version());

    let config = match CoreConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config status=error error={err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = init_logging(config.log_level, config.log_destination.clone()) {
        eprintln!("logging status=error error={err}");
        return ExitCode::FAILURE;
    }

    let gateway = StorageGateway::new(config.storage.clone());
    let feedback = SqliteFeedbackRepository::new(&gateway);
    let forms = SqliteFormRepository::new(&gateway);

    let summary = feedback
        .list_packages()
        .and_then(|packages| Ok((packages, forms.list_package_names()?)));
    match summary {
        Ok((feedback_packages, form_packages)) => {
            info!(
                "event=cli_probe module=cli status=ok feedback_packages={} form_packages={}",
                feedback_packages.len(),
                form_packages.len()
            );
            println!(
                "storage status=ok target={} feedback_packages={} form_packages={}",
                gateway.target(),
                feedback_packages.len(),
                form_packages.len()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(
                "event=cli_probe module=cli status=error kind={}",
                err.kind().as_str()
            );
            eprintln!(
                "storage status={} target={} error={err}",
                err.kind().as_str(),
                gateway.target()
            );
            ExitCode::FAILURE
        }
    }
}
