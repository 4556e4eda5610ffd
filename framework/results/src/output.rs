use std::io::Write;

use serde::Serialize;

use crate::timeseries::TimeSeries;

/// The outcome of a step, tagged the way the host expects it.
///
/// Serializes as `{"output_id": "success" | "error", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "output_id", content = "data", rename_all = "snake_case")]
pub enum Output<S, E> {
    Success(S),
    Error(E),
}

impl<S, E> Output<S, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, Output::Success(_))
    }
}

/// Results of a client run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UperfResults {
    /// The profile name uperf reported running.
    pub profile_name: String,
    pub timeseries_data: TimeSeries,
}

/// A failed client run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UperfError {
    /// Includes the captured uperf output.
    pub error_message: String,
}

/// A server that ran until it was stopped. There is nothing else to report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerResults {}

/// A server that exited on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerError {
    /// `None` if the process was ended by a signal.
    pub exit_code: Option<i32>,
    /// stdout followed by stderr.
    pub output: String,
}

/// Serialize an output to a writer as pretty printed JSON, followed by a newline.
pub fn store_output<S, E, W>(output: &Output<S, E>, writer: &mut W) -> anyhow::Result<()>
where
    S: Serialize,
    E: Serialize,
    W: Write,
{
    serde_json::to_writer_pretty(&mut *writer, output)?;
    writer.write_all(b"\n")?;
    Ok(())
}
