//! Error types shared by every stage of a collection run

use std::time::Duration;

use fantoccini::error::{CmdError, NewSessionError};
use thiserror::Error;

use crate::parsing::ParseError;

pub type Result<T> = std::result::Result<T, CollectorError>;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error(
        "incorrect number of listing URIs collected for {make}/{model}; results: {advertised}, uris: {collected}"
    )]
    CountMismatch {
        make: String,
        model: String,
        advertised: usize,
        collected: usize,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("browser command failed: {0}")]
    Browser(#[from] CmdError),

    #[error("could not start browser session: {0}")]
    Session(#[from] NewSessionError),

    #[error("invalid selector `{0}`")]
    Selector(String),

    #[error("table error: {0}")]
    Table(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration for {key}: {reason}")]
    Config { key: &'static str, reason: String },
}
