//! Errors that stop the demo.

use std::fmt;

/// Fatal demo errors. Failed turns are reported and the demo carries on.
#[derive(Debug)]
pub enum DemoError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// A demo function could not be registered.
    Setup { details: String },
    /// The console could not be read.
    Console { details: String },
}

impl fmt::Display for DemoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "invalid configuration: {details}"),
            Self::Setup { details } => write!(f, "failed to set up functions: {details}"),
            Self::Console { details } => write!(f, "console error: {details}"),
        }
    }
}

impl std::error::Error for DemoError {}
