use std::io::Write as _;
use std::time::Duration;

use anyhow::Context;
use clap::Parser as _;
use uperf_profile::{ProfileDocument, Workload};
use uperf_results::store_output;
use uperf_runner::cli::{HarnessCli, HarnessCommand};
use uperf_runner::prelude::*;

const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = HarnessCli::parse();
    log::info!("{CRATE_NAME} {CRATE_VERSION}");

    match args.command {
        HarnessCommand::Profile { workload } => {
            let workload = load_workload(&workload)?;
            let document = ProfileDocument::emit(&workload)?;
            document
                .write(std::io::stdout().lock())
                .context("Failed to write profile to stdout")?;
        }
        HarnessCommand::Client { workload } => {
            let workload = load_workload(&workload)?;
            let runner = UperfRunner::new(runner_config(args.work_dir)?, start_shutdown_listener());

            let output = client_output(runner.run_client(&workload).await);
            print_output(&output)?;
            if !output.is_success() {
                anyhow::bail!("uperf client run failed");
            }
        }
        HarnessCommand::Server { run_duration } => {
            let runner = UperfRunner::new(runner_config(args.work_dir)?, start_shutdown_listener());

            let output = server_output(runner.run_server(Duration::from_secs(run_duration)).await);
            print_output(&output)?;
            if !output.is_success() {
                anyhow::bail!("uperf server exited before the run duration elapsed");
            }
        }
    }

    Ok(())
}

fn load_workload(path: &std::path::Path) -> HarnessResult<Workload> {
    log::debug!("Loading workload from {}", path.display());
    Workload::from_file(path)
        .with_context(|| format!("Failed to load workload from '{}'", path.display()))
}

fn runner_config(work_dir: Option<std::path::PathBuf>) -> HarnessResult<RunnerConfig> {
    let config = RunnerConfig::from_env()?;
    Ok(match work_dir {
        Some(work_dir) => config.with_work_dir(work_dir),
        None => config,
    })
}

fn print_output<S, E>(output: &Output<S, E>) -> HarnessResult<()>
where
    S: serde::Serialize,
    E: serde::Serialize,
{
    let mut stdout = std::io::stdout().lock();
    store_output(output, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}
