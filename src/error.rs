//! Error types for the crate.
//!
//! The differentiation engine itself never fails; everything here comes from
//! reading input files, wiring layers together, or validating configuration.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The input file could not be opened.
    #[error("unable to open {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be read (e.g. ragged row, invalid UTF-8).
    #[error("malformed record: {0}")]
    Csv(#[from] csv::Error),

    /// A field is not a valid floating point literal.
    #[error("row {row}, column {column}: {value:?} is not a number")]
    Parse {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("{path:?} contains no records")]
    EmptyDataset { path: PathBuf },

    /// Input vector width does not match what a neuron or network expects.
    #[error("shape mismatch: expected {expected} inputs, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("length mismatch: {predictions} predictions vs {targets} targets")]
    LengthMismatch { predictions: usize, targets: usize },

    #[error("cannot reduce an empty batch")]
    EmptyBatch,

    #[error("invalid architecture: {0}")]
    InvalidArchitecture(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Weight initialisation distribution could not be built.
    #[error("initialisation: {0}")]
    Init(String),
}

pub type Result<T> = std::result::Result<T, Error>;
