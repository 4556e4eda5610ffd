//! Turns the text printed by `uperf -vaR -i 1` into a [`TimeSeries`].
//!
//! Two independent scans are made over the output. The first finds the single
//! `running profile:<name> ...` header. The second collects every
//! `timestamp_ms:<ms> name:Txn<n> nr_bytes:<bytes> nr_ops:<ops>` record, left to right.

use std::sync::OnceLock;

use regex::Regex;

use crate::output::UperfResults;
use crate::timeseries::TimeSeries;

/// Substrings uperf prints when it gives up on a run.
pub const ABORT_MARKERS: [&str; 2] = ["aborted", "WARNING: Errors detected during run"];

/// Output that does not follow the uperf log grammar.
///
/// Every variant carries the full output so that the cause can be seen from the error alone.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to parse output: could not find profile name.\nOutput: {output}")]
    NameNotFound { output: String },
    #[error("No results found.\nOutput: {output}")]
    NoResultsFound { output: String },
    #[error("Failed to parse sample '{record}': {reason}.\nOutput: {output}")]
    MalformedSample {
        record: String,
        reason: String,
        output: String,
    },
}

/// One `timestamp_ms:... name:TxnN ...` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// The reported milliseconds times 1000, truncated.
    pub timestamp: u64,
    pub transaction: u32,
    pub bytes: u64,
    pub ops: u64,
}

fn profile_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"running profile:(.+) \.\.\.").expect("profile name pattern is valid")
    })
}

fn sample_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"timestamp_ms:([\d\.]+) name:Txn(\d+) nr_bytes:(\d+) nr_ops:(\d+)")
            .expect("sample pattern is valid")
    })
}

/// Return the first abort marker found in the output, if any.
pub fn find_abort_marker(output: &[u8]) -> Option<&'static str> {
    ABORT_MARKERS.into_iter().find(|marker| {
        output
            .windows(marker.len())
            .any(|window| window == marker.as_bytes())
    })
}

/// Find the profile name that uperf announces before it starts sending traffic.
pub fn find_profile_name(output: &str) -> Option<&str> {
    profile_name_regex()
        .captures(output)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str())
}

/// Extract every sample record in the order it appears in the output.
pub fn find_samples(output: &str) -> Result<Vec<Sample>, ParseError> {
    sample_regex()
        .captures_iter(output)
        .map(|captures| {
            let record = &captures[0];
            let malformed = |reason: String| ParseError::MalformedSample {
                record: record.to_string(),
                reason,
                output: output.to_string(),
            };

            let millis = captures[1]
                .parse::<f64>()
                .map_err(|e| malformed(format!("invalid timestamp: {e}")))?;
            let transaction = captures[2]
                .parse::<u32>()
                .map_err(|e| malformed(format!("invalid transaction index: {e}")))?;
            let bytes = captures[3]
                .parse::<u64>()
                .map_err(|e| malformed(format!("invalid byte count: {e}")))?;
            let ops = captures[4]
                .parse::<u64>()
                .map_err(|e| malformed(format!("invalid operation count: {e}")))?;

            Ok(Sample {
                // Saturating float to int conversion, truncating the fraction.
                timestamp: (millis * 1000.0) as u64,
                transaction,
                bytes,
                ops,
            })
        })
        .collect()
}

/// Parse the captured stdout of a client run.
pub fn parse_output(raw: &[u8]) -> Result<UperfResults, ParseError> {
    let output = String::from_utf8_lossy(raw);

    let profile_name = find_profile_name(&output)
        .ok_or_else(|| ParseError::NameNotFound {
            output: output.to_string(),
        })?
        .to_string();

    let samples = find_samples(&output)?;
    if samples.is_empty() {
        return Err(ParseError::NoResultsFound {
            output: output.to_string(),
        });
    }
    log::debug!(
        "Found {} samples for profile '{profile_name}'",
        samples.len()
    );

    Ok(UperfResults {
        profile_name,
        timeseries_data: TimeSeries::from_samples(samples),
    })
}
