use uperf_core::prelude::ShutdownSignalError;
use uperf_profile::ConfigError;
use uperf_results::ParseError;

/// Error type for the binary and for setup code that is not part of a run.
pub type HarnessResult<T> = anyhow::Result<T>;

/// Why a uperf run did not produce a result.
///
/// None of these are retried. The profile is removed whichever one is returned.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to write the uperf profile: {0}")]
    Profile(#[source] std::io::Error),
    #[error("Failed to launch uperf: {0}")]
    Launch(#[source] std::io::Error),
    #[error("Failed while waiting for uperf: {0}")]
    Wait(#[source] std::io::Error),
    #[error("uperf wrote to stderr.\nOutput: {output}")]
    Stderr { output: String },
    #[error("Errors found in run. Output:\n{output}")]
    SelfReported {
        /// The abort marker that was found in the output.
        marker: &'static str,
        output: String,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("uperf server exited before the run duration elapsed, exit code {exit_code:?}.\nOutput: {output}")]
    ServerExitedEarly {
        exit_code: Option<i32>,
        output: String,
    },
    #[error(transparent)]
    Interrupted(#[from] ShutdownSignalError),
}
