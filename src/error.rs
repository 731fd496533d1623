//! Error taxonomy carried inside pipeline events.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::Stage;

/// Failure reported by a task. Never raised past the router: it becomes a `Failed` row
/// or a status message.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("unable to find valid files in directory {}: {reason}", .dir.display())]
    Discovery { dir: PathBuf, reason: String },

    #[error("{stage} read failed: {reason}")]
    Parse { stage: Stage, reason: String },

    #[error("historian insert failed: {reason}")]
    Insert { reason: String },

    #[error("failed to load tag map CSV {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    #[error("unable to connect to historian {target}: {reason}")]
    Connect { target: String, reason: String },
}

impl ConvertError {
    pub fn parse(stage: Stage, err: &anyhow::Error) -> Self {
        ConvertError::Parse {
            stage,
            reason: format!("{err:#}"),
        }
    }

    pub fn insert(err: &anyhow::Error) -> Self {
        ConvertError::Insert {
            reason: format!("{err:#}"),
        }
    }

    /// Stage and reason for a per-file failure row.
    pub fn stage_and_reason(&self) -> Option<(Stage, String)> {
        match self {
            ConvertError::Parse { stage, reason } => Some((*stage, reason.clone())),
            ConvertError::Insert { reason } => Some((Stage::Insert, reason.clone())),
            _ => None,
        }
    }
}
