//! Describes a uperf workload and renders it as the XML profile that `uperf -m` reads.

mod document;
mod error;
mod file;
mod model;

pub use crate::document::{Element, ProfileDocument};
pub use crate::error::ConfigError;
pub use crate::file::{profile_path, ProfileFile, PROFILE_FILE_NAME};
pub use crate::model::{Concurrency, Group, Operation, Termination, Transaction, Workload};
