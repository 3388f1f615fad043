mod cli;
mod error;
mod logging;

use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use loadgen_engine::{
    DeliveryScheduler, LoadOptions, ProfileStore, RunTarget, SshTransport, load_profiles,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    cli::{APP_VERSION, Args},
    error::{AppError, Result},
};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if args.version {
        println!("{APP_VERSION}");
        return;
    }

    let _log_guard = logging::init(args.verbose, args.quiet, args.log_dir.as_deref());

    if let Err(e) = run(args).await {
        error!("Application error: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let conf = args
        .conf
        .ok_or_else(|| AppError::InvalidInput("--conf is required".to_string()))?;
    info!("Running dry run with config {}", conf.display());

    let store = ProfileStore::load(&conf)?;
    let options = LoadOptions {
        testcases: args.testcase,
        insecure_host_trust: args.insecure_host_trust,
    };
    let profiles = load_profiles(&store, &options)?;
    if profiles.is_empty() {
        println!("No sftp client connections defined");
        return Ok(());
    }

    let target = if args.forever {
        RunTarget::Unbounded
    } else {
        RunTarget::Count(args.filecount)
    };

    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current delivery");
                token.cancel();
            }
        }
    });

    let transport = Arc::new(SshTransport::new(Some(Duration::from_secs(args.timeout))));
    let scheduler = DeliveryScheduler::new(profiles, transport).with_cancellation(token);
    let names: Vec<&str> = scheduler
        .endpoints()
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    info!(endpoints = ?names, ?target, "Starting delivery run");
    let report = scheduler.run(target).await;

    for tally in &report.endpoints {
        info!(
            endpoint = %tally.name,
            successful = tally.counters.successful,
            total = tally.counters.total,
            "Endpoint summary"
        );
    }
    println!(
        "{} out of {} files delivered successfully",
        report.counters.successful, report.counters.total
    );
    Ok(())
}
