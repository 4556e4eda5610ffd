use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(about, long_about = None)]
pub struct HarnessCli {
    /// Directory to run uperf in and to write the generated profile to.
    ///
    /// Defaults to the current directory. Client runs must not share a directory concurrently.
    #[arg(long, global = true)]
    pub work_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: HarnessCommand,
}

#[derive(Subcommand)]
pub enum HarnessCommand {
    /// Run a workload with uperf in active (client) mode and print the measured time series.
    Client {
        /// Path to a YAML or JSON workload description.
        workload: PathBuf,
    },
    /// Run uperf in passive (server) mode until the run duration has elapsed.
    Server {
        /// The number of seconds to keep the server running for.
        #[arg(long)]
        run_duration: u64,
    },
    /// Print the uperf profile generated for a workload without running it.
    Profile {
        /// Path to a YAML or JSON workload description.
        workload: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        HarnessCli::command().debug_assert();
    }

    #[test]
    fn parses_server_command() {
        let cli = HarnessCli::try_parse_from([
            "uperf-harness",
            "--work-dir",
            "/tmp/run",
            "server",
            "--run-duration",
            "30",
        ])
        .expect("failed to parse args");

        assert_eq!(cli.work_dir, Some(PathBuf::from("/tmp/run")));
        assert!(matches!(cli.command, HarnessCommand::Server { run_duration: 30 }));
    }

    #[test]
    fn parses_client_command() {
        let cli = HarnessCli::try_parse_from(["uperf-harness", "client", "tcp-rr.yaml"])
            .expect("failed to parse args");

        assert_eq!(cli.work_dir, None);
        match cli.command {
            HarnessCommand::Client { workload } => assert_eq!(workload, PathBuf::from("tcp-rr.yaml")),
            _ => panic!("expected client command"),
        }
    }
}
