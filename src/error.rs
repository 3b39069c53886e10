//! Error types for Anchorage

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Duplicate component name: {0}")]
    DuplicateName(String),
}

pub type Result<T> = std::result::Result<T, Error>;
