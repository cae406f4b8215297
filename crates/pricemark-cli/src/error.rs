use pricemark_core::{CoreError, EnvelopeValidationError, ErrorKind, WarehouseError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeValidationError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Core(error) => exit_code_for(error.kind()),
            Self::Warehouse(_) => 6,
            Self::Envelope(_) | Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}

/// Exit code for a failed report.
pub const fn exit_code_for(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Format | ErrorKind::Validation | ErrorKind::OutOfRange => 2,
        ErrorKind::NoData | ErrorKind::EmptyInput => 3,
        ErrorKind::Overflow => 5,
        ErrorKind::Source => 6,
    }
}
