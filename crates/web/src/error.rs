use thiserror::Error;

/// Errors raised while setting filters up. Request processing never produces these.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid compressible type pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid settings: {source}")]
    InvalidSettings {
        #[from]
        source: serde_json::Error,
    },
}

impl FilterError {
    pub fn invalid_pattern<S: ToString>(pattern: S, source: regex::Error) -> Self {
        Self::InvalidPattern { pattern: pattern.to_string(), source }
    }
}
