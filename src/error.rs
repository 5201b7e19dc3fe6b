//! Error types. Every variant is fatal; the driver maps each one to a process exit code.

use std::{io, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ArgError {
    #[error("Invalid number of arguments: {0}.")]
    Count(usize),
    #[error("time steps must be numeric.")]
    NonNumericSteps(String),
    #[error("Invalid number of time steps.")]
    NonPositiveSteps(i64),
    #[error("Cannot open {} for reading.", .0.display())]
    InputUnreadable(PathBuf),
    #[error("Cannot open {} for writing.", .0.display())]
    OutputExists(PathBuf),
}

impl ArgError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Count(_) | Self::NonNumericSteps(_) => -1,
            Self::NonPositiveSteps(_) => -2,
            Self::InputUnreadable(_) => -3,
            Self::OutputExists(_) => -4,
        }
    }
}

/// Particle file and trace snapshot errors.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("Cannot open {} for reading.", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("Encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("Invalid number of particles: {0}")]
    InvalidParticleCount(i64),
    #[error("Number of particles mismatch. Header: {declared}, Found: {found}")]
    CountMismatch { declared: i64, found: usize },
    #[error("Particle record {index} is truncated")]
    TruncatedRecord { index: usize },
    #[error("Invalid number of blocks in trace: {0}")]
    InvalidBlockCount(i32),
    #[error("Invalid number of particles in trace block: {0}")]
    InvalidTraceCount(i64),
    #[error("Trace doesn't match the grid: {0}")]
    TraceLayout(String),
}

impl FileError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidParticleCount(_) | Self::CountMismatch { .. } => -5,
            Self::TruncatedRecord { .. } | Self::Decode(_) => -5,
            Self::InvalidBlockCount(_) | Self::InvalidTraceCount(_) | Self::TraceLayout(_) => -5,
            Self::Read { .. } => -3,
            Self::Io(_) | Self::Encode(_) => -4,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("Encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),
}
