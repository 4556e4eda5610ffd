use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use uperf_core::prelude::ShutdownHandle;
use uperf_profile::{ProfileDocument, ProfileFile, Workload};
use uperf_results::{
    find_abort_marker, parse_output, Output, ServerError, ServerResults, UperfError, UperfResults,
};

use crate::bin_path::uperf_path;
use crate::process::{self, ServerOutcome};
use crate::types::{HarnessResult, RunError};

/// Where uperf is found and where it runs.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// The uperf binary.
    pub bin_path: PathBuf,
    /// Working directory of the client, which is also where the profile is written.
    ///
    /// Client runs that share a working directory share a profile path, so they must not
    /// overlap.
    pub work_dir: PathBuf,
}

impl RunnerConfig {
    pub fn new(bin_path: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_path: bin_path.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Locate uperf via [`uperf_path`] and run in the current directory.
    pub fn from_env() -> HarnessResult<Self> {
        let bin_path = uperf_path()?;
        let work_dir = std::env::current_dir().context("Failed to get the current directory")?;
        Ok(Self { bin_path, work_dir })
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }
}

/// Runs uperf workloads one at a time.
#[derive(Debug, Clone)]
pub struct UperfRunner {
    config: RunnerConfig,
    shutdown: ShutdownHandle,
}

impl UperfRunner {
    pub fn new(config: RunnerConfig, shutdown: ShutdownHandle) -> Self {
        Self { config, shutdown }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run `workload` with uperf in client mode and parse its output.
    pub async fn run_client(&self, workload: &Workload) -> Result<UperfResults, RunError> {
        log::info!("Running uperf profile '{}'", workload.name);

        ProfileFile::remove_stale(&self.config.work_dir).map_err(RunError::Profile)?;
        let document = ProfileDocument::emit(workload)?;

        let output = {
            let profile =
                ProfileFile::create(&self.config.work_dir, &document).map_err(RunError::Profile)?;
            let mut shutdown = self.shutdown.new_listener();
            process::run_client(
                &self.config.bin_path,
                &self.config.work_dir,
                profile.path(),
                &mut shutdown,
            )
            .await
            // The profile is removed here, whatever the outcome.
        }?;

        if !output.stderr.is_empty() {
            return Err(RunError::Stderr {
                output: output.combined(),
            });
        }

        if let Some(marker) = find_abort_marker(&output.stdout) {
            log::warn!("uperf reported '{marker}' during the run");
            return Err(RunError::SelfReported {
                marker,
                output: String::from_utf8_lossy(&output.stdout).into_owned(),
            });
        }

        log::debug!("uperf output:\n{}", String::from_utf8_lossy(&output.stdout));

        let results = parse_output(&output.stdout)?;
        log::info!(
            "Collected samples for {} transactions of profile '{}'",
            results.timeseries_data.len(),
            results.profile_name
        );
        Ok(results)
    }

    /// Run uperf in server mode for `run_duration`.
    ///
    /// The server never exits by itself, so being stopped after `run_duration` (or by the
    /// shutdown signal) is success and exiting before that is an error.
    pub async fn run_server(&self, run_duration: Duration) -> Result<(), RunError> {
        log::info!("Running uperf server for {run_duration:?}");

        let mut shutdown = self.shutdown.new_listener();
        match process::run_server(&self.config.bin_path, run_duration, &mut shutdown).await? {
            ServerOutcome::RanUntilCancelled => Ok(()),
            ServerOutcome::ExitedEarly { exit_code, output } => {
                log::error!("uperf server exited early with exit code {exit_code:?}");
                Err(RunError::ServerExitedEarly { exit_code, output })
            }
        }
    }
}

/// Map a client run to the result schema.
pub fn client_output(result: Result<UperfResults, RunError>) -> Output<UperfResults, UperfError> {
    match result {
        Ok(results) => Output::Success(results),
        Err(e) => Output::Error(UperfError {
            error_message: e.to_string(),
        }),
    }
}

/// Map a server run to the result schema.
pub fn server_output(result: Result<(), RunError>) -> Output<ServerResults, ServerError> {
    match result {
        Ok(()) => Output::Success(ServerResults::default()),
        Err(RunError::ServerExitedEarly { exit_code, output }) => {
            Output::Error(ServerError { exit_code, output })
        }
        Err(e) => Output::Error(ServerError {
            exit_code: None,
            output: e.to_string(),
        }),
    }
}
