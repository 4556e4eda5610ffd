use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// A uperf workload: named groups of concurrent actors, each running a list of transactions.
///
/// Order matters everywhere in this model. uperf executes transactions in the order they are
/// listed and the generated profile keeps the order exactly as given here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Workload {
    /// Written into the profile and echoed back by uperf as `running profile:<name> ...`.
    pub name: String,
    pub groups: Vec<Group>,
}

impl Workload {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    /// Check the parts of a workload that the type system cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.groups.is_empty() {
            return Err(ConfigError::NoGroups(self.name.clone()));
        }
        Ok(())
    }

    /// Load a workload from a YAML (or JSON) description.
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        let workload: Workload = serde_yaml::from_str(input)?;
        workload.validate()?;
        Ok(workload)
    }

    pub fn from_file<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let input = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&input)
    }
}

/// How many actors a group runs. uperf accepts exactly one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    Threads(u32),
    Processes(u32),
}

impl Concurrency {
    pub fn attribute(&self) -> (&'static str, String) {
        match self {
            Concurrency::Threads(n) => ("nthreads", n.to_string()),
            Concurrency::Processes(n) => ("nprocs", n.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "GroupDescription")]
pub struct Group {
    pub concurrency: Concurrency,
    pub transactions: Vec<Transaction>,
}

impl Group {
    pub fn threads(count: u32) -> Self {
        Self::new(Concurrency::Threads(count))
    }

    pub fn processes(count: u32) -> Self {
        Self::new(Concurrency::Processes(count))
    }

    pub fn new(concurrency: Concurrency) -> Self {
        Self {
            concurrency,
            transactions: Vec::new(),
        }
    }

    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transactions.push(transaction);
        self
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct GroupDescription {
    nthreads: Option<u32>,
    nprocs: Option<u32>,
    #[serde(default)]
    transactions: Vec<Transaction>,
}

impl TryFrom<GroupDescription> for Group {
    type Error = ConfigError;

    fn try_from(description: GroupDescription) -> Result<Self, Self::Error> {
        let concurrency = match (description.nthreads, description.nprocs) {
            (Some(nthreads), Some(nprocs)) => {
                return Err(ConfigError::ConflictingConcurrency { nthreads, nprocs })
            }
            (Some(nthreads), None) => Concurrency::Threads(nthreads),
            (None, Some(nprocs)) => Concurrency::Processes(nprocs),
            (None, None) => return Err(ConfigError::MissingConcurrency),
        };

        Ok(Self {
            concurrency,
            transactions: description.transactions,
        })
    }
}

/// When a transaction stops repeating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Iterations(u64),
    /// A uperf duration string such as `30s` or `1m`.
    Duration(String),
    Rate(u64),
}

impl Termination {
    pub fn attribute(&self) -> (&'static str, String) {
        match self {
            Termination::Iterations(n) => ("iterations", n.to_string()),
            Termination::Duration(d) => ("duration", d.clone()),
            Termination::Rate(n) => ("rate", n.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "TransactionDescription")]
pub struct Transaction {
    pub termination: Termination,
    pub operations: Vec<Operation>,
}

impl Transaction {
    pub fn iterations(count: u64) -> Self {
        Self::new(Termination::Iterations(count))
    }

    pub fn duration(duration: impl Into<String>) -> Self {
        Self::new(Termination::Duration(duration.into()))
    }

    pub fn rate(rate: u64) -> Self {
        Self::new(Termination::Rate(rate))
    }

    pub fn new(termination: Termination) -> Self {
        Self {
            termination,
            operations: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationDescription {
    /// Bare numbers are taken as seconds.
    Seconds(u64),
    Text(String),
}

impl From<DurationDescription> for String {
    fn from(duration: DurationDescription) -> Self {
        match duration {
            DurationDescription::Seconds(secs) => format!("{secs}s"),
            DurationDescription::Text(text) => text,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TransactionDescription {
    iterations: Option<u64>,
    duration: Option<DurationDescription>,
    rate: Option<u64>,
    #[serde(default, alias = "operations")]
    flowops: Vec<Operation>,
}

impl TryFrom<TransactionDescription> for Transaction {
    type Error = ConfigError;

    fn try_from(description: TransactionDescription) -> Result<Self, Self::Error> {
        let set = [
            description.iterations.is_some(),
            description.duration.is_some(),
            description.rate.is_some(),
        ]
        .into_iter()
        .filter(|is_set| *is_set)
        .count();
        if set > 1 {
            log::warn!(
                "Transaction sets {set} termination fields, using the first of iterations, duration, rate"
            );
        }

        let termination = if let Some(iterations) = description.iterations {
            Termination::Iterations(iterations)
        } else if let Some(duration) = description.duration {
            Termination::Duration(duration.into())
        } else if let Some(rate) = description.rate {
            Termination::Rate(rate)
        } else {
            return Err(ConfigError::MissingTermination);
        };

        Ok(Self {
            termination,
            operations: description.flowops,
        })
    }
}

/// A single uperf flowop, such as `connect`, `write`, `read` or `think`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "OperationDescription")]
pub struct Operation {
    pub kind: String,
    /// `key=value` strings, joined with spaces into the `options` attribute.
    pub options: Vec<String>,
}

impl Operation {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            options: Vec::new(),
        }
    }

    pub fn with_option(self, key: &str, value: impl std::fmt::Display) -> Self {
        self.with_raw_option(format!("{key}={value}"))
    }

    pub fn with_raw_option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OptionsDescription {
    List(Vec<String>),
    Map(serde_yaml::Mapping),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct OperationDescription {
    #[serde(rename = "type", alias = "kind")]
    kind: String,
    #[serde(default)]
    options: Option<OptionsDescription>,
}

impl TryFrom<OperationDescription> for Operation {
    type Error = ConfigError;

    fn try_from(description: OperationDescription) -> Result<Self, Self::Error> {
        let options = match description.options {
            None => Vec::new(),
            Some(OptionsDescription::List(options)) => options,
            Some(OptionsDescription::Map(mapping)) => mapping
                .iter()
                .map(|(key, value)| -> Result<String, ConfigError> {
                    let key = scalar_to_string(key)
                        .ok_or_else(|| ConfigError::InvalidOption(format!("{key:?}")))?;
                    let value = scalar_to_string(value)
                        .ok_or_else(|| ConfigError::InvalidOption(key.clone()))?;
                    Ok(format!("{key}={value}"))
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(Self {
            kind: description.kind,
            options,
        })
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
