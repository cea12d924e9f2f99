use std::fmt;

/// Errors surfaced by the flow engine and its adapters.
///
/// Everything other than [`FlowError::Internal`] represents an external
/// failure (I/O, decode, configuration); `Internal` is reserved for the
/// "should be statically unreachable" conditions called out in the spec
/// (exporting a flow with no active segments, zero duration, and so on).
#[derive(Debug)]
pub enum FlowError {
    Io(String),
    Capture(String),
    Csv(String),
    Config(String),
    Internal(String),
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowError::Io(msg) => write!(f, "I/O error: {}", msg),
            FlowError::Capture(msg) => write!(f, "capture error: {}", msg),
            FlowError::Csv(msg) => write!(f, "CSV error: {}", msg),
            FlowError::Config(msg) => write!(f, "configuration error: {}", msg),
            FlowError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for FlowError {}

impl From<std::io::Error> for FlowError {
    fn from(err: std::io::Error) -> Self {
        FlowError::Io(err.to_string())
    }
}

impl From<csv::Error> for FlowError {
    fn from(err: csv::Error) -> Self {
        FlowError::Csv(err.to_string())
    }
}

impl From<pcap::Error> for FlowError {
    fn from(err: pcap::Error) -> Self {
        FlowError::Capture(err.to_string())
    }
}

impl From<ctrlc::Error> for FlowError {
    fn from(err: ctrlc::Error) -> Self {
        FlowError::Config(err.to_string())
    }
}

impl From<&str> for FlowError {
    fn from(msg: &str) -> Self {
        FlowError::Config(msg.to_string())
    }
}

impl From<String> for FlowError {
    fn from(msg: String) -> Self {
        FlowError::Config(msg)
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
