#[derive(Debug, thiserror::Error)]
pub enum SphError {
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("lattice generation stopped after reaching the cap of {cap} points")]
    LatticePointCapExceeded { cap: usize },

    #[error("simulation runner has stopped")]
    RunnerStopped,
}

impl SphError {
    pub(crate) fn invalid_config(message: impl Into<String>) -> SphError {
        SphError::InvalidConfig { message: message.into() }
    }
}
