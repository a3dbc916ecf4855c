use thiserror::Error;

/// Errors that can occur while checking or exporting the flash layout.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to write CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("invalid flash layout: {0}")]
    Layout(#[from] brainre1_board::Error),

    #[error("invalid value: {0}")]
    InvalidValue(String),
}
