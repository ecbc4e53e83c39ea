use thiserror::Error;

/// Failure of an exchange call, classified by how the core reacts to it
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    /// Network fault, rate limit or server error; worth retrying later
    #[error("transient exchange error: {0}")]
    Transient(String),

    /// The exchange (or simulated book) refused the request
    #[error("rejected by exchange: {0}")]
    Rejected(String),

    /// Bad credentials or an unusable response; trading cannot continue
    #[error("fatal exchange error: {0}")]
    Fatal(String),
}

impl ExchangeError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ExchangeError::Transient(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ExchangeError::Fatal(_))
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ExchangeError::Fatal(format!("malformed response: {}", e))
        } else {
            ExchangeError::Transient(e.to_string())
        }
    }
}

/// Invalid startup configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid coin: {0}")]
    InvalidCoin(String),

    #[error("invalid algorithm: {0}")]
    InvalidAlgorithm(String),

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("please specify more than {min} yen (got {amount})")]
    AmountBelowMinimum { amount: f64, min: f64 },

    #[error("invalid API key")]
    InvalidApiKey,

    #[error("missing credentials: {0}")]
    MissingCredentials(&'static str),

    #[error("exchange unavailable during startup checks: {0}")]
    ExchangeUnavailable(String),
}
