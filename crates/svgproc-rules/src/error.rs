//! Errors raised while applying rules to a document

use std::io;
use thiserror::Error;

/// Errors that abort a traversal
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to load resource '{name}': {source}")]
    Resource {
        name: String,
        #[source]
        source: io::Error,
    },
}
