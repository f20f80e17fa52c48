use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] cryptodash_core::ValidationError),

    #[error(transparent)]
    Core(#[from] cryptodash_core::CoreError),

    #[error("command error: {0}")]
    Command(String),

    #[error("strict mode failed: warnings={warning_count}")]
    StrictModeViolation { warning_count: usize },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<cryptodash_core::SourceError> for CliError {
    fn from(error: cryptodash_core::SourceError) -> Self {
        Self::Core(error.into())
    }
}

impl From<cryptodash_core::ScanError> for CliError {
    fn from(error: cryptodash_core::ScanError) -> Self {
        Self::Core(error.into())
    }
}

impl From<cryptodash_core::WarehouseError> for CliError {
    fn from(error: cryptodash_core::WarehouseError) -> Self {
        Self::Core(error.into())
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Command(_) => 2,
            Self::Core(cryptodash_core::CoreError::Validation(_))
            | Self::Core(cryptodash_core::CoreError::Config(_)) => 2,
            Self::Core(cryptodash_core::CoreError::Source(_))
            | Self::Core(cryptodash_core::CoreError::Scan(_)) => 3,
            Self::Serialization(_) => 4,
            Self::StrictModeViolation { .. } => 5,
            Self::Core(_) | Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptodash_core::{CoreError, SourceError, ValidationError};

    #[test]
    fn exit_codes_follow_error_category() {
        assert_eq!(CliError::from(ValidationError::EmptyTicker).exit_code(), 2);
        assert_eq!(CliError::from(SourceError::unavailable("down")).exit_code(), 3);
        assert_eq!(
            CliError::from(CoreError::Config(String::from("missing key"))).exit_code(),
            2
        );
        assert_eq!(
            CliError::StrictModeViolation { warning_count: 1 }.exit_code(),
            5
        );
    }
}
