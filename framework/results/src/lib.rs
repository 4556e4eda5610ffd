mod output;
mod parse;
mod timeseries;

pub use crate::output::{store_output, Output, ServerError, ServerResults, UperfError, UperfResults};
pub use crate::parse::{find_abort_marker, parse_output, ParseError, Sample, ABORT_MARKERS};
pub use crate::timeseries::{Measurement, TimeSeries};
