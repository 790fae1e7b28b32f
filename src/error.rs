use thiserror::Error;

use crate::track::segment::SegmentType;

/// Failures surfaced by the game core. Configuration problems are caught at
/// construction; the other two at the point of use.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("no asset mapped for segment type {0:?}")]
    UnmappedType(SegmentType),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

pub(crate) fn invalid_config(msg: impl Into<String>) -> CoreError {
    CoreError::InvalidConfiguration(msg.into())
}
