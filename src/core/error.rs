use std::fmt::Display;

/// User-visible pipeline failures.
///
/// None of them is fatal for the process: the shell reports the message and waits for the next
/// interaction.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The export is unparsable or structured differently from what the provider produces.
    #[error("malformed export: {0}")]
    MalformedExport(String),

    /// The weather source has no coverage for the location or the requested range.
    #[error("weather is unavailable for postal code {postal_code}: {reason}")]
    WeatherUnavailable { postal_code: String, reason: String },

    /// Usage and weather series share no time window at all.
    #[error("usage ({usage}) and weather ({weather}) do not overlap in time")]
    RangeMismatch { usage: String, weather: String },
}

impl PipelineError {
    pub fn malformed(reason: impl Display) -> Self {
        Self::MalformedExport(reason.to_string())
    }

    pub fn malformed_at(line: u64, reason: impl Display) -> Self {
        Self::MalformedExport(format!("line {line}: {reason}"))
    }
}
