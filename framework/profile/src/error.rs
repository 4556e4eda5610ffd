/// A workload description that cannot be turned into a profile.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Workload name must not be empty")]
    EmptyName,
    #[error("Workload '{0}' must contain at least one group")]
    NoGroups(String),
    #[error("Group sets both nthreads ({nthreads}) and nprocs ({nprocs}), only one is allowed")]
    ConflictingConcurrency { nthreads: u32, nprocs: u32 },
    #[error("Group must set one of nthreads or nprocs")]
    MissingConcurrency,
    #[error("Transaction must set one of iterations, duration or rate")]
    MissingTermination,
    #[error("Flowop option '{0}' is not a scalar value")]
    InvalidOption(String),
    #[error("Failed to read workload description: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse workload description: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
