//! Drives uperf as a child process: writes the profile for a workload, runs the client or
//! server, and turns the client's output into a throughput and latency time series.

mod bin_path;
mod process;
mod run;
mod shutdown;
mod types;

pub mod cli;

pub mod prelude {
    pub use crate::bin_path::{uperf_path, UPERF_PATH_ENV};
    pub use crate::process::{ClientOutput, ServerOutcome};
    pub use crate::run::{client_output, server_output, RunnerConfig, UperfRunner};
    pub use crate::shutdown::start_shutdown_listener;
    pub use crate::types::{HarnessResult, RunError};
    pub use uperf_core::prelude::ShutdownHandle;
    pub use uperf_profile::{Group, Operation, Transaction, Workload};
    pub use uperf_results::{Output, UperfResults};
}
