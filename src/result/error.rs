//! StreamForwardError is the error every lambda in this service can fail with.
//! Malformed stream data and configuration defects get their own variants so
//! operators can tell a bad record apart from a bad deployment.

use lambda_runtime::Error as LambdaRuntimeError;
use std::fmt;
use std::fmt::{Display, Formatter};

pub type Result<T> = std::result::Result<T, StreamForwardError>;
pub type LambdaRuntimeResult = std::result::Result<(), LambdaRuntimeError>;

#[derive(Debug, thiserror::Error)]
pub enum StreamForwardError {
    /// Malformed wire data in a stream record. Never coerced to a default.
    Validation(String),

    /// The process configuration is defective, e.g. the detail-type template
    /// names a field the record does not have.
    Configuration(String),

    /// Anything else, including a failed put-events call.
    Unknown(#[source] anyhow::Error),
}

impl Display for StreamForwardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl From<anyhow::Error> for StreamForwardError {
    fn from(e: anyhow::Error) -> Self {
        Self::Unknown(e)
    }
}
