use thiserror::Error;

/// Failure classes a probe can hit. Probes turn these into a status and a
/// detail line; they never escape a probe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// I/O or timeout at the network layer.
    #[error("transport error: {0}")]
    Transport(String),
    /// The peer answered, but not in the expected protocol or shape.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Local OS state needed by the probe is absent.
    #[error("configuration unavailable: {0}")]
    ConfigurationUnavailable(String),
    /// A response arrived but does not settle presence or absence.
    #[error("ambiguous response: {0}")]
    Ambiguous(String),
}

impl ProbeError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ConfigurationUnavailable(msg.into())
    }

    pub fn ambiguous(msg: impl Into<String>) -> Self {
        Self::Ambiguous(msg.into())
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                Self::ConfigurationUnavailable(err.to_string())
            }
            _ => Self::Transport(err.to_string()),
        }
    }
}
